//! I2C bus abstraction.
//!
//! The SMBus framing in [`super::Smbus`] is written against this trait, so
//! the same code drives a Linux i2c-dev adapter and the in-memory test
//! device.

use super::Result;

/// Raw I2C bus
pub trait I2c {
    /// Write `data` to the device at `addr` in one transfer.
    fn write(&mut self, addr: u8, data: &[u8]) -> Result<()>;

    /// Write then read with a repeated start.
    fn write_read(&mut self, addr: u8, write: &[u8], read: &mut [u8]) -> Result<()>;
}

impl<T: I2c + ?Sized> I2c for &mut T {
    fn write(&mut self, addr: u8, data: &[u8]) -> Result<()> {
        (**self).write(addr, data)
    }

    fn write_read(&mut self, addr: u8, write: &[u8], read: &mut [u8]) -> Result<()> {
        (**self).write_read(addr, write, read)
    }
}
