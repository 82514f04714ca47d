//! # Window Store Subsystem (cw-01)
//!
//! Keeps the latest `capacity` layers of a parent-linked item stream in memory
//! and computes incremental diffs against per-viewer status cursors.
//!
//! ## Architecture Role
//!
//! ```text
//! [Data Source] ──add_box──→ [Window Store (1)] ──Trigger──→ [Hub] ──→ viewers
//!                                   ↑
//!                 get_status_update │ (lock-free against a snapshot)
//!                                   │
//!                          [Diff Sync (2)]
//! ```
//!
//! ## Concurrency
//!
//! - One store-wide lock guards the ring's layer table and the orphan/key maps.
//! - Layers are append-only and replaced wholesale, so a snapshot of the layer
//!   table can be read after the lock is released.
//! - Eviction flips a liveness flag on each node; parent links held by newer
//!   nodes then resolve to `None` instead of a stale node.

pub mod domain;
pub mod errors;
pub mod ports;
pub mod service;

pub use domain::*;
pub use errors::DagError;
pub use ports::inbound::WindowStoreApi;
pub use service::{AddOutcome, GcReport, WindowDag};
