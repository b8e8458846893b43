//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use roomfinder_chat::ChatOrchestrator;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ChatOrchestrator>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(orchestrator: ChatOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            start_time: Instant::now(),
        }
    }
}
