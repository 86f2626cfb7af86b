//! Comfort assessment for temperature readings
//!
//! Maps a temperature onto a quality level and a backlight colour, so the
//! display can signal comfort at a glance.

use crate::units::Temperature;

/// Quality level assessment for a temperature reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityLevel {
    /// Optimal conditions
    Excellent,
    /// Acceptable conditions
    Good,
    /// Sub-optimal conditions
    Poor,
    /// Problematic conditions
    Bad,
}

impl QualityLevel {
    /// Assess indoor comfort for a temperature.
    ///
    /// - Excellent: 20-24 °C
    /// - Good: 18-26 °C
    /// - Poor: 15-28 °C
    /// - Bad: outside these ranges
    pub fn assess(temperature: Temperature) -> Self {
        let value = temperature.celsius();
        if (20.0..=24.0).contains(&value) {
            Self::Excellent
        } else if (18.0..=26.0).contains(&value) {
            Self::Good
        } else if (15.0..=28.0).contains(&value) {
            Self::Poor
        } else {
            Self::Bad
        }
    }

    /// Backlight colour for this quality level as (red, green, blue)
    pub const fn backlight(self) -> (u8, u8, u8) {
        match self {
            Self::Excellent => (0, 255, 0),
            Self::Good => (144, 238, 144),
            Self::Poor => (255, 165, 0),
            Self::Bad => (255, 0, 0),
        }
    }

    /// Get the display label for this quality level
    pub const fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Poor => "Poor",
            Self::Bad => "Bad",
        }
    }
}
