use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, RoomfinderError};

/// Top-level configuration for the Roomfinder service.
///
/// Loaded from `~/.roomfinder/config.toml` by default. Each section maps to
/// one collaborator or cross-cutting concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoomfinderConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl RoomfinderConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: RoomfinderConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| RoomfinderError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Apply environment overrides (`ROOMFINDER_API_KEY`).
    ///
    /// The provider key is a secret and is normally kept out of the TOML file.
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("ROOMFINDER_API_KEY") {
            if !key.trim().is_empty() {
                self.provider.api_key = key.trim().to_string();
            }
        }
    }
}

/// General service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Base directory for history logs and other local files.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// HTTP port of the conversation API.
    pub port: u16,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.roomfinder/data".to_string(),
            log_level: "info".to_string(),
            port: 8080,
        }
    }
}

/// Hotel search provider (RapidAPI hotels4) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    /// Value of the `x-rapidapi-host` header.
    pub api_host: String,
    /// Value of the `x-rapidapi-key` header. Overridden by `ROOMFINDER_API_KEY`.
    pub api_key: String,
    /// Locale used for property searches and non-Cyrillic town lookups.
    pub search_locale: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://hotels4.p.rapidapi.com".to_string(),
            api_host: "hotels4.p.rapidapi.com".to_string(),
            api_key: String::new(),
            search_locale: "en_US".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Search limits applied by the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Result count used until the user enters one.
    pub default_result_count: u32,
    /// Upper bound on the page size sent to the provider.
    pub max_results: u32,
    /// Maximum number of photos per hotel lookup.
    pub max_photos: u32,
    /// Number of adults in the first room.
    pub adults: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_result_count: 25,
            max_results: 25,
            max_photos: 7,
            adults: 1,
        }
    }
}

/// Per-user search history logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Directory holding one log file per user, relative to `general.data_dir`
    /// unless absolute.
    pub dir: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            dir: "history".to_string(),
        }
    }
}

/// Voice message transcription.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Whether voice messages are transcribed at all.
    pub enabled: bool,
    /// HTTP endpoint accepting raw audio and answering `{"text": "..."}`.
    pub endpoint: String,
    /// Recognition language passed to the endpoint.
    pub language: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            language: "ru-RU".to_string(),
        }
    }
}

/// Chat surface limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Maximum accepted text message length in characters.
    pub max_message_length: usize,
    /// Conversations without activity for this long are dropped.
    pub session_timeout_minutes: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_length: 2000,
            session_timeout_minutes: 30,
        }
    }
}
