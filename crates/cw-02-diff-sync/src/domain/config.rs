//! Per-viewer sync configuration.

use crate::errors::SyncError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of layer slots in a viewer's status cursor.
pub const DEFAULT_WINDOW_SIZE: usize = 100;

/// Sync configuration shared by every viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Slots in a status cursor. Status frames must carry exactly this many
    /// counts.
    pub window_size: usize,
    /// Pause after each diff before the next one may start.
    pub debounce: Duration,
    /// Wait after an idle trigger before re-checking the queue.
    pub batch_interval: Duration,
    /// Pending triggers kept per viewer before the oldest are overwritten.
    pub trigger_queue_capacity: usize,
    /// Encoded frames buffered per viewer ahead of the socket.
    pub outbound_queue_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            debounce: Duration::from_millis(100),
            batch_interval: Duration::from_secs(1),
            trigger_queue_capacity: 256,
            outbound_queue_capacity: 20,
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.window_size == 0 {
            return Err(SyncError::InvalidConfig(
                "window_size cannot be 0".into(),
            ));
        }
        if self.trigger_queue_capacity == 0 {
            return Err(SyncError::InvalidConfig(
                "trigger_queue_capacity cannot be 0".into(),
            ));
        }
        if self.outbound_queue_capacity == 0 {
            return Err(SyncError::InvalidConfig(
                "outbound_queue_capacity cannot be 0".into(),
            ));
        }
        Ok(())
    }
}
