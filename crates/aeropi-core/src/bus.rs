//! Bus transport abstraction
//!
//! Both drivers talk to their devices through [`BusTransport`], a small
//! address-per-call contract over the physical I²C bus. Reads report how many
//! bytes actually arrived so the drivers can tell a short read from a full one.

use embedded_hal_async::i2c::I2c;

/// Address-per-call access to a shared serial bus.
pub trait BusTransport {
    /// Error type for transport failures. Opaque to the drivers beyond "the bus failed".
    type Error: core::fmt::Debug;

    /// Open a session with the device at `address`, failing if it does not acknowledge.
    fn start(&mut self, address: u8) -> impl Future<Output = Result<(), Self::Error>>;

    /// Write `bytes` to the device at `address` as one transaction.
    fn write(&mut self, address: u8, bytes: &[u8]) -> impl Future<Output = Result<(), Self::Error>>;

    /// Read up to `buf.len()` bytes from the device at `address`.
    ///
    /// Returns the number of bytes actually read.
    fn read(
        &mut self,
        address: u8,
        buf: &mut [u8],
    ) -> impl Future<Output = Result<usize, Self::Error>>;
}

impl<T: BusTransport + ?Sized> BusTransport for &mut T {
    type Error = T::Error;

    async fn start(&mut self, address: u8) -> Result<(), Self::Error> {
        T::start(self, address).await
    }

    async fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        T::write(self, address, bytes).await
    }

    async fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<usize, Self::Error> {
        T::read(self, address, buf).await
    }
}

/// [`BusTransport`] over any `embedded-hal-async` I²C master.
///
/// `start` probes the address with an empty write, which only succeeds when
/// the device acknowledges its address. `embedded-hal` reads always fill the
/// whole buffer, so a successful read reports `buf.len()` bytes.
pub struct I2cTransport<I> {
    i2c: I,
}

impl<I: I2c> I2cTransport<I> {
    /// Wrap an I²C master.
    pub const fn new(i2c: I) -> Self {
        Self { i2c }
    }

    /// Give back the wrapped I²C master.
    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I: I2c> BusTransport for I2cTransport<I> {
    type Error = I::Error;

    async fn start(&mut self, address: u8) -> Result<(), Self::Error> {
        self.i2c.write(address, &[]).await
    }

    async fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        self.i2c.write(address, bytes).await
    }

    async fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.i2c.read(address, buf).await?;
        Ok(buf.len())
    }
}
