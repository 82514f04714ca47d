//! Runtime configuration.

pub mod config;

pub use config::{ConfigError, NetworkConfig, NodeConfig, SourceConfig, WindowConfig};
