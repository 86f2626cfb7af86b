//! Simulator settings file
//!
//! An optional TOML file with the driver sections from [`Config`] plus a
//! `[simulator]` section. Missing keys fall back to their defaults.
//!
//! ```toml
//! [sensor]
//! poll_interval_ms = 50
//! report_malformed_reads = true
//!
//! [simulator]
//! updates = 30
//! fail_every = 7
//! ```

use std::path::Path;

use aeropi_core::config::{Config, DisplayConfig, SensorConfig};
use serde::Deserialize;
use thiserror_no_std::Error;

use crate::devices::Faults;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("cannot read {path}: {kind}")]
    Read {
        path: String,
        kind: std::io::ErrorKind,
    },
    #[error("invalid settings in {path}: {message}")]
    Parse { path: String, message: String },
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub sensor: SensorConfig,
    pub display: DisplayConfig,
    pub simulator: SimulatorSettings,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SimulatorSettings {
    /// Display refreshes before the simulator shuts down
    pub updates: u32,
    pub update_interval_ms: u64,
    /// How long to wait for the poller to acknowledge a stop
    pub halt_timeout_ms: u32,
    /// NACK every Nth start-conversion command, 0 disables
    pub fail_every: u32,
    /// Truncate every Nth reading block, 0 disables
    pub short_read_every: u32,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            updates: 10,
            update_interval_ms: 1000,
            halt_timeout_ms: 500,
            fail_every: 0,
            short_read_every: 0,
        }
    }
}

impl SimulatorSettings {
    pub fn faults(&self) -> Faults {
        Faults {
            fail_every: self.fail_every,
            short_read_every: self.short_read_every,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.display().to_string(),
            kind: e.kind(),
        })?;
        Self::parse(&content).map_err(|message| SettingsError::Parse {
            path: path.display().to_string(),
            message,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    pub fn config(&self) -> Config {
        Config {
            sensor: self.sensor,
            display: self.display,
        }
    }
}
