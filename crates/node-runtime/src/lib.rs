//! # Chainwatch Node Runtime
//!
//! Wires the window store, the trigger hub, the diff sync handlers and the
//! viewer gateway into one process.
//!
//! ## Modular Structure
//!
//! - `container/` - configuration loaded from the environment
//! - `datasrc/` - producers of boxes (the mock source for now)
//! - `runtime` - task ownership, startup and graceful shutdown

pub mod container;
pub mod datasrc;
pub mod runtime;

pub use container::NodeConfig;
pub use runtime::NodeRuntime;
