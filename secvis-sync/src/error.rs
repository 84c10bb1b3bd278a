//! Error types for the sync layer.

use std::fmt;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Token exchange failed or returned an unusable body.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Page envelope is malformed.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Network failure or non-success response from a collection endpoint.
    #[error("transport error: {0}")]
    Transport(String),

    /// Checkpoint could not be read or written.
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// `next()` called on an iterator with no items left.
    #[error("cursor exhausted")]
    Exhausted,

    /// Output rows could not be written.
    #[error("sink error: {0}")]
    Sink(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncError {
    /// Returns true if re-running later may succeed without any change.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Transport(_))
    }
}

/// Stage of a sync run, used to report where a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    CheckpointRead,
    Collect,
    BulkLoad,
    Join,
    CheckpointWrite,
}

impl RunPhase {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RunPhase::CheckpointRead => "checkpoint-read",
            RunPhase::Collect => "collect",
            RunPhase::BulkLoad => "bulk-load",
            RunPhase::Join => "join",
            RunPhase::CheckpointWrite => "checkpoint-write",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fatal error that aborted a run, tagged with the phase it happened in.
///
/// No checkpoint is ever written once a run has failed.
#[derive(Debug, Error)]
#[error("sync run failed during {phase}: {source}")]
pub struct RunError {
    pub phase: RunPhase,
    #[source]
    pub source: SyncError,
}

impl RunError {
    pub fn new(phase: RunPhase, source: SyncError) -> Self {
        Self { phase, source }
    }
}
