//! # Shared Types Crate
//!
//! Types that cross crate boundaries in the Chainwatch workspace.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: `Index`, `Hash`, `Topic`, `Trigger` and `DagBox`
//!   are defined here and nowhere else.
//! - **Opaque payloads**: the window store never looks inside a box payload; it
//!   only asks the payload to encode itself when a diff frame is built.

pub mod entities;

pub use entities::*;
