//! In-memory history store for tests and ephemeral runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use roomfinder_core::types::UserId;

use crate::{check_user, single_line, HistoryError, HistoryLog};

#[derive(Debug, Default)]
pub struct MemoryHistory {
    logs: RwLock<HashMap<UserId, Vec<String>>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryLog for MemoryHistory {
    async fn append(&self, user: UserId, line: &str) -> Result<(), HistoryError> {
        check_user(user)?;
        self.logs
            .write()
            .await
            .entry(user)
            .or_default()
            .push(single_line(line));
        Ok(())
    }

    async fn read_lines(&self, user: UserId) -> Result<Vec<String>, HistoryError> {
        check_user(user)?;
        Ok(self
            .logs
            .read()
            .await
            .get(&user)
            .cloned()
            .unwrap_or_default())
    }
}
