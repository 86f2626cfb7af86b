//! Hardware initialization for the aeropi board
//!
//! The barometer and the display share I2C0. The bus lives in a `StaticCell`
//! so both drivers and the spawned poller task can hold `'static` handles.

use aeropi_core::async_i2c_bus::{BusMutex, SharedBus};
use aeropi_core::bus::I2cTransport;
use aeropi_core::display::JHD1313M1Display;
use aeropi_core::sensors::SensorPoller;
use embassy_time::Delay;
use esp_hal::{i2c::master::Config as I2cConfig, time::Rate};
use log::info;
use static_cell::StaticCell;

pub type I2c0 = esp_hal::i2c::master::I2c<'static, esp_hal::Async>;
pub type Bus = SharedBus<'static, I2cTransport<I2c0>>;
pub type Poller = SensorPoller<'static, Bus, Delay>;
pub type Display = JHD1313M1Display<Bus, Delay>;

/// Initialize the I2C bus hardware
///
/// 100 kHz keeps the LCD controller within its rated clock.
pub fn create_i2c_bus(
    i2c0: esp_hal::peripherals::I2C0<'static>,
    sda: esp_hal::peripherals::GPIO12<'static>,
    scl: esp_hal::peripherals::GPIO11<'static>,
) -> Result<I2c0, esp_hal::i2c::master::ConfigError> {
    Ok(
        esp_hal::i2c::master::I2c::new(
            i2c0,
            I2cConfig::default().with_frequency(Rate::from_khz(100)),
        )?
        .with_sda(sda)
        .with_scl(scl)
        .into_async(),
    )
}

/// Move the bus into static storage. Call once.
pub fn share_bus(i2c0: I2c0) -> &'static BusMutex<I2cTransport<I2c0>> {
    static I2C0_BUS: StaticCell<BusMutex<I2cTransport<I2c0>>> = StaticCell::new();
    info!("I2C0 shared between barometer and display");
    I2C0_BUS.init(BusMutex::new(I2cTransport::new(i2c0)))
}
