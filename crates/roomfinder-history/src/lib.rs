//! Roomfinder history crate - append-only per-user search logs.
//!
//! Every search writes a header line (`YYYY-MM-DD HH:MM - /command`)
//! followed by detail lines. The log is read back grouped by header so a
//! user can replay earlier searches.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};

use roomfinder_core::error::RoomfinderError;
use roomfinder_core::types::UserId;

pub mod file;
pub mod memory;

pub use file::FileHistory;
pub use memory::MemoryHistory;

/// chrono format of the timestamp opening every header line.
pub const HEADER_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Matches timestamps written with [`HEADER_FORMAT`].
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}").expect("Invalid history header regex")
});

// =============================================================================
// Errors
// =============================================================================

/// Errors from the history store.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid user id for history: {0}")]
    InvalidUser(UserId),
}

impl From<HistoryError> for RoomfinderError {
    fn from(err: HistoryError) -> Self {
        RoomfinderError::History(err.to_string())
    }
}

// =============================================================================
// Trait
// =============================================================================

/// Append-only log of searches, one stream per user.
#[async_trait]
pub trait HistoryLog: Send + Sync {
    /// Append one line to the user's log.
    async fn append(&self, user: UserId, line: &str) -> Result<(), HistoryError>;

    /// All lines of the user's log, oldest first. A user without a log has
    /// no lines.
    async fn read_lines(&self, user: UserId) -> Result<Vec<String>, HistoryError>;

    /// The user's log grouped into searches.
    async fn entries(&self, user: UserId) -> Result<Vec<HistoryEntry>, HistoryError> {
        Ok(group_entries(&self.read_lines(user).await?))
    }
}

/// Chat users have positive ids; anything else never gets a log.
pub(crate) fn check_user(user: UserId) -> Result<(), HistoryError> {
    if user.0 <= 0 {
        return Err(HistoryError::InvalidUser(user));
    }
    Ok(())
}

/// Keep every appended line on one physical line.
pub(crate) fn single_line(line: &str) -> String {
    line.replace(['\r', '\n'], " ")
}

// =============================================================================
// Entries
// =============================================================================

/// One logged search: its header and the detail lines that follow it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub header: String,
    pub lines: Vec<String>,
}

impl HistoryEntry {
    /// A search that was started but never got past the header.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Format the header line that opens a logged search.
pub fn header_line(at: NaiveDateTime, command: &str) -> String {
    format!("{} - {}", at.format(HEADER_FORMAT), command)
}

/// Whether a log line opens a new search.
pub fn is_header(line: &str) -> bool {
    HEADER_RE.is_match(line)
}

/// Group raw log lines under their headers.
///
/// Lines before the first header belong to no search and are dropped.
pub fn group_entries(lines: &[String]) -> Vec<HistoryEntry> {
    let mut entries: Vec<HistoryEntry> = Vec::new();
    for line in lines {
        if is_header(line) {
            entries.push(HistoryEntry {
                header: line.clone(),
                lines: Vec::new(),
            });
        } else if let Some(current) = entries.last_mut() {
            if !line.trim().is_empty() {
                current.lines.push(line.clone());
            }
        } else {
            tracing::debug!(line = %line, "Dropping history line without a header");
        }
    }
    entries
}
