use serde::{Deserialize, Serialize};

use crate::protocol::{jhd1313m1, mpl115a2};

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub sensor: SensorConfig,
    pub display: DisplayConfig,
}

/// Barometer driver settings
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct SensorConfig {
    pub address: u8,
    /// Wait between the end of one polling cycle and the start of the next
    pub poll_interval_ms: u32,
    /// Publish an event when a reading comes back short instead of skipping it silently
    pub report_malformed_reads: bool,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            address: mpl115a2::ADDRESS,
            poll_interval_ms: mpl115a2::DEFAULT_POLL_INTERVAL_MS,
            report_malformed_reads: false,
        }
    }
}

/// Character display driver settings
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    pub address: u8,
    pub backlight_address: u8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            address: jhd1313m1::LCD_ADDRESS,
            backlight_address: jhd1313m1::RGB_ADDRESS,
        }
    }
}
