//! # Diff Sync Subsystem (cw-02)
//!
//! Keeps each viewer's mirror of the window store current.
//!
//! ## Per-viewer pipeline
//!
//! ```text
//!  Hub ──trigger──→ [TriggerQueue] ──→ coalescing loop ──raise──→ [PendingFlag]
//!                                                                      │
//!  viewer ──status frame──→ ClientState ──→ cursor + interest window   │
//!                                                 │                    ▼
//!                                                 └──────────────→ diff loop
//!                                                                      │
//!                                            outbound queue ←─diff frames┘
//! ```
//!
//! - The coalescing loop turns a stream of trigger indices into at most one
//!   pending signal per batch, and only for indices inside the viewer's
//!   interest window.
//! - The diff loop computes a diff against a store snapshot, encodes it and
//!   then sleeps a fixed debounce interval.
//! - Closing the trigger queue stops both loops.

pub mod client_state;
pub mod domain;
pub mod errors;
pub mod service;
pub mod wire;

pub use client_state::{peek_topic, ClientState};
pub use domain::{DataRequest, PendingFlag, SyncConfig};
pub use errors::{SyncError, WireError};
pub use service::{HandlerCounters, HandlerStats, RequestHandler};
pub use wire::{
    decode_diff, encode_diff, encode_status, parse_status, status_frame_len, DiffFrame,
    StatusMessage,
};
