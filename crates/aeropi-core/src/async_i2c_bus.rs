//! Async bus sharing implementation
//!
//! Provides a per-driver handle onto one shared [`BusTransport`], serialising
//! every transport call behind a single Embassy async mutex.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;

use crate::bus::BusTransport;

/// The mutex that owns a bus transport. One per physical bus, never per device.
pub type BusMutex<T> = Mutex<CriticalSectionRawMutex, T>;

/// Shared bus handle using Embassy's async Mutex.
///
/// Every driver on the bus gets its own `SharedBus`, all pointing at the same
/// [`BusMutex`]. The lock is taken for exactly one transport call and released
/// before the call returns, so a multi-byte write always reaches the wire as
/// one unbroken transaction, and no driver holds the bus across a protocol
/// delay.
///
/// # Example
///
/// ```rust,ignore
/// use aeropi_core::async_i2c_bus::{BusMutex, SharedBus};
/// use aeropi_core::bus::I2cTransport;
/// use static_cell::StaticCell;
///
/// static I2C_BUS: StaticCell<BusMutex<I2cTransport<esp_hal::i2c::master::I2c<'static, esp_hal::Async>>>> = StaticCell::new();
///
/// let i2c = /* ... create async I2C ... */;
/// let i2c_bus = I2C_BUS.init(BusMutex::new(I2cTransport::new(i2c)));
///
/// let sensor_bus = SharedBus::new(i2c_bus);
/// let display_bus = SharedBus::new(i2c_bus);
/// ```
pub struct SharedBus<'a, T> {
    bus: &'a BusMutex<T>,
}

impl<'a, T> SharedBus<'a, T> {
    /// Create a new `SharedBus`.
    #[inline]
    pub const fn new(bus: &'a BusMutex<T>) -> Self {
        Self { bus }
    }
}

impl<T> Clone for SharedBus<'_, T> {
    fn clone(&self) -> Self {
        Self { bus: self.bus }
    }
}

impl<T> BusTransport for SharedBus<'_, T>
where
    T: BusTransport,
{
    type Error = T::Error;

    #[inline]
    async fn start(&mut self, address: u8) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.start(address).await
    }

    #[inline]
    async fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.write(address, bytes).await
    }

    #[inline]
    async fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.read(address, buf).await
    }
}
