mod mpl115a2;
mod shared;

use thiserror_no_std::Error;

use crate::units::{Pressure, Temperature};

pub use mpl115a2::*;
pub use shared::SensorShared;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor}: bus error during {operation}")]
    Bus {
        sensor: &'static str,
        operation: &'static str,
    },
    #[error("{sensor}: short read during {operation} (expected {expected} bytes, got {got})")]
    ShortRead {
        sensor: &'static str,
        operation: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("{sensor}: poller did not stop within {timeout_ms} ms")]
    ShutdownTimeout {
        sensor: &'static str,
        timeout_ms: u32,
    },
}

/// Temperature and pressure after calibration and compensation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibratedReading {
    pub temperature: Temperature,
    pub pressure: Pressure,
}
