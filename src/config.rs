//! Driver configuration.

use crate::constants::{BAUD_RATE, DEFAULT_PORT, POLL_INTERVAL_MS, TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection and polling parameters. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub port: String,
    pub baud_rate: u32,
    /// Per-exchange read timeout
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl DriverConfig {
    pub fn with_port(port: impl Into<String>) -> Self {
        DriverConfig {
            port: port.into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            port: DEFAULT_PORT.to_string(),
            baud_rate: BAUD_RATE,
            timeout_ms: TIMEOUT_MS,
            poll_interval_ms: POLL_INTERVAL_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_protocol_constants() {
        let config = DriverConfig::default();
        assert_eq!(config.port, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 38_400);
        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
    }

    #[test]
    fn with_port_keeps_other_defaults() {
        let config = DriverConfig::with_port("COM3");
        assert_eq!(config.port, "COM3");
        assert_eq!(config.baud_rate, BAUD_RATE);
    }
}
