//! Helper bridge configuration with validation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the helper bridge core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HelperConfig {
    /// Unix socket path the helper process connects to
    pub socket_path: PathBuf,
    /// Default transaction timeout (per-call override available)
    #[serde(with = "humantime_serde")]
    pub default_timeout: Duration,
    /// Interval between timeout sweeps of the pending table
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
    /// Buffer size of the inbound message channel
    pub inbound_buffer: usize,
    /// Buffer size of the unsolicited-event broadcast channel
    pub event_buffer: usize,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("/tmp/chatbridge-helper.sock"),
            default_timeout: Duration::from_secs(15),
            sweep_interval: Duration::from_secs(1),
            inbound_buffer: 256,
            event_buffer: 64,
        }
    }
}

impl HelperConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_timeout.as_millis() == 0 {
            return Err(ConfigError::InvalidTimeout(
                "default_timeout cannot be 0".into(),
            ));
        }
        if self.sweep_interval.as_millis() == 0 {
            return Err(ConfigError::InvalidTimeout(
                "sweep_interval cannot be 0".into(),
            ));
        }
        if self.inbound_buffer == 0 || self.event_buffer == 0 {
            return Err(ConfigError::InvalidBuffer(
                "channel buffers cannot be 0".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    #[error("invalid buffer size: {0}")]
    InvalidBuffer(String),
}
