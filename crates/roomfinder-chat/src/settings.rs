//! Conversation limits derived from [`RoomfinderConfig`].

use std::time::Duration;

use roomfinder_core::config::RoomfinderConfig;

use crate::query::DEFAULT_RESULT_COUNT;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSettings {
    pub default_result_count: u32,
    /// Largest page size sent to the provider.
    pub max_results: u32,
    pub max_photos: u32,
    pub max_message_length: usize,
    /// Idle time after which a conversation is dropped.
    pub session_timeout: Duration,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            default_result_count: DEFAULT_RESULT_COUNT,
            max_results: 25,
            max_photos: 7,
            max_message_length: 2000,
            session_timeout: Duration::from_secs(30 * 60),
        }
    }
}

impl From<&RoomfinderConfig> for ChatSettings {
    fn from(config: &RoomfinderConfig) -> Self {
        Self {
            default_result_count: config.search.default_result_count.max(1),
            max_results: config.search.max_results.max(1),
            max_photos: config.search.max_photos.max(1),
            max_message_length: config.chat.max_message_length,
            session_timeout: Duration::from_secs(config.chat.session_timeout_minutes.max(1) * 60),
        }
    }
}
