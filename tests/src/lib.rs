//! # Chainwatch Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # criterion benchmarks for the window store
//! └── src/integration/  # cross-crate flows
//!     ├── flows.rs      # store → hub → handlers → wire frames
//!     └── websocket.rs  # real gateway, real websocket client
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p cw-tests
//! cargo test -p cw-tests integration::websocket::
//! cargo bench -p cw-tests
//! ```

pub mod integration;
