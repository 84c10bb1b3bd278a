//! Persistence of the resumption cursor between runs.
//!
//! A checkpoint is one opaque cursor string. It is read once when a run
//! starts and written once when a run completes successfully. No checkpoint
//! means "start from the beginning".

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// Storage for the last committed cursor.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Returns the stored cursor, or `None` if nothing was stored yet.
    async fn load(&self) -> SyncResult<Option<String>>;

    /// Replaces the stored cursor.
    async fn store(&self, cursor: &str) -> SyncResult<()>;
}

/// Keeps the cursor as the first line of a file.
///
/// Writes go to a sibling temporary file which is then renamed over the
/// target, so a crash never leaves a truncated cursor behind.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self) -> SyncResult<Option<String>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No checkpoint at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(SyncError::Checkpoint(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        let cursor = contents.lines().next().unwrap_or_default().trim();
        if cursor.is_empty() {
            Ok(None)
        } else {
            Ok(Some(cursor.to_string()))
        }
    }

    async fn store(&self, cursor: &str) -> SyncResult<()> {
        let temp = self.temp_path();
        tokio::fs::write(&temp, cursor).await.map_err(|e| {
            SyncError::Checkpoint(format!("failed to write {}: {e}", temp.display()))
        })?;
        tokio::fs::rename(&temp, &self.path).await.map_err(|e| {
            SyncError::Checkpoint(format!(
                "failed to replace {}: {e}",
                self.path.display()
            ))
        })?;
        debug!("Stored checkpoint in {}", self.path.display());
        Ok(())
    }
}

/// In-process checkpoint, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    cursor: RwLock<Option<String>>,
    writes: AtomicUsize,
}

impl MemoryCheckpointStore {
    pub fn new(cursor: Option<String>) -> Self {
        Self {
            cursor: RwLock::new(cursor),
            writes: AtomicUsize::new(0),
        }
    }

    pub async fn current(&self) -> Option<String> {
        self.cursor.read().await.clone()
    }

    /// Number of successful `store` calls.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self) -> SyncResult<Option<String>> {
        Ok(self.current().await)
    }

    async fn store(&self, cursor: &str) -> SyncResult<()> {
        *self.cursor.write().await = Some(cursor.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
