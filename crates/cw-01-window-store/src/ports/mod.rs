//! Ports for the window store.

pub mod inbound;
