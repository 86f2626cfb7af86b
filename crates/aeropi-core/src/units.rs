//! Scalar unit wrappers for calibrated readings

/// Temperature, stored in degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Temperature(f32);

impl Temperature {
    pub const fn from_celsius(celsius: f32) -> Self {
        Self(celsius)
    }

    pub const fn celsius(self) -> f32 {
        self.0
    }

    pub fn fahrenheit(self) -> f32 {
        32.0 + self.0 * 9.0 / 5.0
    }

    pub fn kelvin(self) -> f32 {
        self.0 + 273.15
    }
}

/// Absolute pressure, stored in kilopascals.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Pressure(f32);

/// Millimetres of mercury per kilopascal.
const MM_HG_PER_KPA: f32 = 7.500_615_6;

impl Pressure {
    pub const fn from_kilopascals(kpa: f32) -> Self {
        Self(kpa)
    }

    pub const fn kilopascals(self) -> f32 {
        self.0
    }

    pub fn hectopascals(self) -> f32 {
        self.0 * 10.0
    }

    /// Same scale as hectopascals.
    pub fn millibars(self) -> f32 {
        self.hectopascals()
    }

    pub fn mm_hg(self) -> f32 {
        self.0 * MM_HG_PER_KPA
    }
}
