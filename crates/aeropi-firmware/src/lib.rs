//! ESP32-S3 firmware-specific modules for aeropi
//!
//! Peripheral bring-up and the concrete driver types used by the firmware
//! binary. Nothing here compiles for desktop targets.

#![no_std]

pub mod hardware;
