//! Error types for the window store.

use shared_types::Index;
use thiserror::Error;

/// Window store errors.
///
/// These are programmer or data errors. They abort the offending call and
/// leave the store untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DagError {
    #[error("cannot add box {key} with parent key set to itself")]
    SelfParent { key: String },

    #[error("cannot add node with index {node} to layer with index {layer}")]
    IndexMismatch { node: Index, layer: Index },

    #[error("status window size mismatch: expected {expected} counts, got {got}")]
    WindowSizeMismatch { expected: usize, got: usize },

    #[error("window capacity must be non-zero")]
    ZeroCapacity,
}
