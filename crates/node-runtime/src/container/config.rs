//! # Node Configuration
//!
//! Unified configuration for every subsystem. Defaults suit a local viewer
//! demo; each field listed below can be overridden from the environment.
//!
//! | Variable              | Field                  |
//! |-----------------------|------------------------|
//! | `CW_LISTEN_ADDR`      | `network.listen_addr`  |
//! | `CW_HOME_PAGE`        | `network.home_page`    |
//! | `CW_WINDOW_CAPACITY`  | `window.capacity`      |
//! | `CW_GC_INTERVAL_MS`   | `window.gc_interval`   |
//! | `CW_SYNC_WINDOW`      | `sync.window_size`     |
//! | `CW_MOCK_SOURCE`      | `source.enabled`       |
//! | `CW_MOCK_INTERVAL_MS` | `source.interval`      |
//!
//! `sync.window_size` is the exact number of counts every status frame must
//! carry. The gateway reports it under `window_size` in `/stats`, which is
//! where the bundled home page reads it from.

use cw_02_diff_sync::SyncConfig;
use cw_03_viewer_gateway::GatewayConfig;
use shared_types::Index;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has an invalid value: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete node configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    pub network: NetworkConfig,
    pub window: WindowConfig,
    pub sync: SyncConfig,
    pub source: SourceConfig,
}

/// Network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub listen_addr: SocketAddr,
    pub home_page: PathBuf,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        let gateway = GatewayConfig::default();
        Self {
            listen_addr: gateway.listen_addr,
            home_page: gateway.home_page,
        }
    }
}

/// Window store configuration.
#[derive(Debug, Clone)]
pub struct WindowConfig {
    /// Layers kept in memory.
    pub capacity: Index,
    /// Time between GC passes.
    pub gc_interval: Duration,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            capacity: 300,
            gc_interval: Duration::from_secs(1),
        }
    }
}

/// Mock data source configuration.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub enabled: bool,
    /// Time between two generated boxes.
    pub interval: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_millis(300),
        }
    }
}

impl NodeConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = parsed(&lookup, "CW_LISTEN_ADDR")? {
            config.network.listen_addr = addr;
        }
        if let Some(path) = lookup("CW_HOME_PAGE") {
            config.network.home_page = PathBuf::from(path);
        }
        if let Some(capacity) = parsed(&lookup, "CW_WINDOW_CAPACITY")? {
            config.window.capacity = capacity;
        }
        if let Some(ms) = parsed(&lookup, "CW_GC_INTERVAL_MS")? {
            config.window.gc_interval = Duration::from_millis(ms);
        }
        if let Some(window_size) = parsed(&lookup, "CW_SYNC_WINDOW")? {
            config.sync.window_size = window_size;
        }
        if let Some(enabled) = parsed(&lookup, "CW_MOCK_SOURCE")? {
            config.source.enabled = enabled;
        }
        if let Some(ms) = parsed(&lookup, "CW_MOCK_INTERVAL_MS")? {
            config.source.interval = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.capacity == 0 {
            return Err(ConfigError::Invalid("window capacity cannot be 0".into()));
        }
        if self.window.gc_interval.is_zero() {
            return Err(ConfigError::Invalid("gc interval cannot be 0".into()));
        }
        if self.source.enabled && self.source.interval.is_zero() {
            return Err(ConfigError::Invalid("source interval cannot be 0".into()));
        }
        self.sync
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.gateway_config()
            .validate()
            .map_err(ConfigError::Invalid)
    }

    /// Transport settings for the viewer gateway. The inbound frame limit
    /// grows with `sync.window_size` so a full status frame always fits.
    pub fn gateway_config(&self) -> GatewayConfig {
        let mut gateway = GatewayConfig {
            listen_addr: self.network.listen_addr,
            home_page: self.network.home_page.clone(),
            ..GatewayConfig::default()
        };
        gateway.max_message_size = gateway.frame_limit(self.sync.window_size);
        gateway
    }
}

fn parsed<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}
