//! Uploader configuration.
//!
//! Can be loaded from TOML or constructed programmatically; every field has
//! a default matching the stock GEVCU7 setup, so a partial (or absent)
//! config file is fine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol::GEVCU_PORT;

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Controller hostname or IP address
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port of the controller's flashing service
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path to the firmware image
    #[serde(default = "default_firmware")]
    pub firmware: PathBuf,

    /// Settle/drain delays
    #[serde(default)]
    pub timing: TimingConfig,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            firmware: default_firmware(),
            timing: TimingConfig::default(),
        }
    }
}

fn default_host() -> String {
    "gevcu7.local".to_string()
}

fn default_port() -> u16 {
    GEVCU_PORT
}

fn default_firmware() -> PathBuf {
    PathBuf::from("GEVCU7.hex")
}

impl UploadConfig {
    /// Load configuration from a TOML file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Fixed delays used as crude synchronization with the controller.
///
/// The flasher gives no explicit readiness or completion signal; these
/// pauses are the documented substitute. All values are in milliseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Pause after connecting, before any byte is sent (default: 1s)
    #[serde(default = "default_connect_settle")]
    pub connect_settle_ms: u64,

    /// Pause after the start sentinel, before the first line (default: 1s)
    #[serde(default = "default_start_settle")]
    pub start_settle_ms: u64,

    /// Pause after the last acknowledged line, before teardown (default: 5s)
    #[serde(default = "default_drain")]
    pub drain_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            connect_settle_ms: default_connect_settle(),
            start_settle_ms: default_start_settle(),
            drain_ms: default_drain(),
        }
    }
}

fn default_connect_settle() -> u64 {
    1_000
}

fn default_start_settle() -> u64 {
    1_000
}

fn default_drain() -> u64 {
    5_000
}

impl TimingConfig {
    /// All delays zeroed; used by tests so they do not sleep.
    pub fn immediate() -> Self {
        Self {
            connect_settle_ms: 0,
            start_settle_ms: 0,
            drain_ms: 0,
        }
    }

    pub fn connect_settle(&self) -> Duration {
        Duration::from_millis(self.connect_settle_ms)
    }

    pub fn start_settle(&self) -> Duration {
        Duration::from_millis(self.start_settle_ms)
    }

    pub fn drain(&self) -> Duration {
        Duration::from_millis(self.drain_ms)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}
