//! # Hub
//!
//! Registry of connected viewers and the fan-out point for triggers.

use parking_lot::RwLock;
use serde::Serialize;
use shared_types::Trigger;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Identifier handed out on registration. Never reused within a process.
pub type ViewerId = u64;

/// Anything that accepts triggers on behalf of one viewer.
///
/// `trigger` is called from the insert path and must not block.
pub trait TriggerSink: Send + Sync {
    /// Hand a trigger to the viewer. Returns false if it was not accepted.
    fn trigger(&self, trigger: Trigger) -> bool;

    /// Release the viewer's queues. Called once on unregistration.
    fn close(&self);
}

/// Point-in-time hub counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub viewers: usize,
    pub published: u64,
    pub delivered: u64,
}

/// Broadcast hub.
pub struct Hub {
    viewers: RwLock<HashMap<ViewerId, Arc<dyn TriggerSink>>>,
    next_id: AtomicU64,
    published: AtomicU64,
    delivered: AtomicU64,
}

impl Hub {
    #[must_use]
    pub fn new() -> Self {
        Self {
            viewers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            published: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
        }
    }

    /// Registers a viewer and returns its id.
    pub fn register(&self, sink: Arc<dyn TriggerSink>) -> ViewerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let count = {
            let mut viewers = self.viewers.write();
            viewers.insert(id, sink);
            viewers.len()
        };
        info!(viewer_id = id, viewers = count, "Viewer registered");
        id
    }

    /// Removes a viewer and closes its sink. Returns false for unknown ids.
    pub fn unregister(&self, id: ViewerId) -> bool {
        let removed = self.viewers.write().remove(&id);
        match removed {
            Some(sink) => {
                sink.close();
                info!(viewer_id = id, "Viewer unregistered");
                true
            }
            None => false,
        }
    }

    /// Fans a trigger out to every registered viewer.
    ///
    /// Returns how many viewers accepted it.
    pub fn publish(&self, trigger: Trigger) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);
        let sinks: Vec<Arc<dyn TriggerSink>> = self.viewers.read().values().cloned().collect();

        let accepted = sinks.iter().filter(|sink| sink.trigger(trigger)).count();
        self.delivered.fetch_add(accepted as u64, Ordering::Relaxed);
        debug!(
            topic = %trigger.topic,
            index = trigger.index,
            viewers = sinks.len(),
            accepted,
            "Trigger published"
        );
        accepted
    }

    /// Unregisters every viewer, closing their sinks.
    pub fn close_all(&self) {
        let drained: Vec<(ViewerId, Arc<dyn TriggerSink>)> = self.viewers.write().drain().collect();
        for (_, sink) in &drained {
            sink.close();
        }
        if !drained.is_empty() {
            info!(viewers = drained.len(), "Closed all viewers");
        }
    }

    pub fn viewer_count(&self) -> usize {
        self.viewers.read().len()
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            viewers: self.viewer_count(),
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}
