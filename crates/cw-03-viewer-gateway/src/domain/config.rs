//! Gateway configuration with validation.

use cw_02_diff_sync::status_frame_len;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 4000;

/// Maximum inbound frame a viewer may send (bytes).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 512;

/// Websocket transport configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Bind address
    pub listen_addr: SocketAddr,
    /// File served at `/`
    pub home_page: PathBuf,
    /// Time allowed to write one batch of frames to a viewer
    pub write_wait: Duration,
    /// Time allowed between two reads from a viewer
    pub pong_wait: Duration,
    /// Ping period, must be less than `pong_wait`
    pub ping_period: Duration,
    /// Largest inbound frame accepted
    pub max_message_size: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let pong_wait = Duration::from_secs(60);
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            home_page: PathBuf::from("home.html"),
            write_wait: Duration::from_secs(10),
            pong_wait,
            ping_period: pong_wait * 9 / 10,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl GatewayConfig {
    /// Inbound frame limit for viewers of a `window_size` wide status: never
    /// below a full status frame.
    pub fn frame_limit(&self, window_size: usize) -> usize {
        self.max_message_size.max(status_frame_len(window_size))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.ping_period >= self.pong_wait {
            return Err("ping_period must be less than pong_wait".into());
        }
        if self.ping_period.is_zero() {
            return Err("ping_period cannot be 0".into());
        }
        if self.write_wait.is_zero() {
            return Err("write_wait cannot be 0".into());
        }
        if self.max_message_size == 0 {
            return Err("max_message_size cannot be 0".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.listen_addr.port(), 4000);
        assert_eq!(config.ping_period, Duration::from_secs(54));
        assert_eq!(config.max_message_size, 512);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ping_must_beat_pong() {
        let config = GatewayConfig {
            ping_period: Duration::from_secs(60),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_frame_limit_admits_full_status() {
        let config = GatewayConfig::default();
        assert_eq!(config.frame_limit(100), 512);
        assert_eq!(config.frame_limit(126), 512);
        assert_eq!(config.frame_limit(127), 516);
        assert_eq!(config.frame_limit(200), 808);
    }
}
