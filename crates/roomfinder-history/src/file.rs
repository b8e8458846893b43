//! File-backed history: one `User{id}.txt` per user.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use roomfinder_core::types::UserId;

use crate::{check_user, single_line, HistoryError, HistoryLog};

/// History store writing plain text files under one directory.
#[derive(Debug, Clone)]
pub struct FileHistory {
    dir: PathBuf,
}

impl FileHistory {
    /// Create a store rooted at `dir`. The directory is created lazily on
    /// first append.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, user: UserId) -> PathBuf {
        self.dir.join(format!("User{}.txt", user.0))
    }
}

#[async_trait]
impl HistoryLog for FileHistory {
    async fn append(&self, user: UserId, line: &str) -> Result<(), HistoryError> {
        check_user(user)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(user))
            .await?;
        let mut record = single_line(line);
        record.push('\n');
        file.write_all(record.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn read_lines(&self, user: UserId) -> Result<Vec<String>, HistoryError> {
        check_user(user)?;
        match tokio::fs::read_to_string(self.path_for(user)).await {
            Ok(content) => Ok(content.lines().map(str::to_string).collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}
