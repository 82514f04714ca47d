//! Error types for diff sync.

use cw_01_window_store::DagError;
use shared_types::Topic;
use thiserror::Error;

/// Malformed frames. Never fatal: the frame is dropped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("Frame too short: {len} bytes, need at least {min}")]
    TooShort { len: usize, min: usize },

    #[error("Count section of {len} bytes is not a multiple of 4")]
    Misaligned { len: usize },

    #[error("Status carries {got} counts, window holds {expected}")]
    CountMismatch { expected: usize, got: usize },
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Wire error: {0}")]
    Wire(#[from] WireError),

    #[error("Store error: {0}")]
    Store(#[from] DagError),

    #[error("No handler for topic {0}")]
    UnknownTopic(Topic),

    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),
}
