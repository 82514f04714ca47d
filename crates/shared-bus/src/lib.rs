//! # Shared Bus - Trigger Fan-out to Viewers
//!
//! The hub every producer publishes to and every connected viewer registers
//! with. It carries no data, only `Trigger { topic, index }` hints telling a
//! viewer that something changed at `index` and its diff is worth re-checking.
//!
//! ```text
//!  insert path                          viewers
//! ┌──────────────┐   publish()   ┌──────────────┐   trigger()   ┌──────────────┐
//! │ event pipe   │ ────────────▶ │     Hub      │ ────────────▶ │ TriggerSink  │
//! └──────────────┘               │              │               │  (viewer 1)  │
//!                                │ id -> sink   │ ────────────▶ ├──────────────┤
//!                                └──────────────┘               │  (viewer n)  │
//!                                                               └──────────────┘
//! ```
//!
//! ## Backpressure
//!
//! Publishing never blocks. Each viewer drains its own bounded
//! [`TriggerQueue`]; when a viewer falls behind, the oldest triggers are
//! overwritten and the receiver is told how many it lost.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod hub;
pub mod queue;

pub use hub::{Hub, HubStats, TriggerSink, ViewerId};
pub use queue::{trigger_queue, QueueRecv, TriggerQueue, TriggerReceiver};

/// Default per-viewer trigger queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
