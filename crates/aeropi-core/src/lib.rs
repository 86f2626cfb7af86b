//! Hardware-independent core library for aeropi
//!
//! This crate contains the peripheral driver layer for the aeropi weather
//! display: an MPL115A2 barometer and a JHD1313M1 16x2 character LCD with an
//! RGB backlight, both sitting on one shared I²C bus.
//!
//! It is `#![no_std]` so it compiles on both embedded targets (ESP32-S3) and
//! desktop hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

pub mod async_i2c_bus;
pub mod bus;
pub mod config;
pub mod display;
pub mod events;
pub mod metrics;
pub mod protocol;
pub mod sensors;
pub mod units;

#[cfg(test)]
pub(crate) mod mock;
