//! # Viewer Gateway Subsystem (cw-03)
//!
//! Websocket transport between viewers and the diff sync pipeline, plus the
//! server state that feeds the window stores.
//!
//! ```text
//!  data sources ──DataEvent──→ [ServerState::pipe_events] ──add_box──→ WindowDag
//!                                          │
//!                                          └──Trigger──→ Hub ──→ ClientState (per viewer)
//!
//!  viewer ⇄ /ws ⇄ read pump ──status──→ ClientState
//!                 write pump ←─diff frames── RequestHandler
//! ```
//!
//! ## Routes
//!
//! | Path     | Method | Purpose                   |
//! |----------|--------|---------------------------|
//! | `/`      | GET    | home page                 |
//! | `/ws`    | GET    | viewer websocket          |
//! | `/stats` | GET    | hub, store and frame counters (JSON) |

pub mod connection;
pub mod domain;
pub mod errors;
pub mod server_state;
pub mod service;

pub use domain::GatewayConfig;
pub use errors::GatewayError;
pub use server_state::{ServerState, ServerStats, TopicStats, EVENT_CHANNEL_CAPACITY};
pub use service::{router, ViewerGateway};
