//! Bus access.
//!
//! [`I2c`] is the raw bus. [`Smbus`] layers the SMBus transactions PMBus
//! uses (byte, little-endian word, length-prefixed block, send-byte) on
//! top of any [`I2c`] and exposes them through [`SmbusTransport`], which
//! is what the command layer talks to.

pub mod i2c;
pub mod linux;
#[cfg(test)]
pub mod mock;

pub use i2c::I2c;
pub use linux::LinuxI2c;

use std::io;
use std::path::{Path, PathBuf};

use crate::tracing::prelude::*;

/// Errors raised while talking to the bus
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The adapter device could not be opened
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No acknowledgment from device
    #[error("no acknowledgment from device at address 0x{0:02X}")]
    NoAck(u8),

    /// I/O error from underlying adapter
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An adapter ioctl failed
    #[error("{op} failed: {errno}")]
    Ioctl {
        op: &'static str,
        errno: nix::errno::Errno,
    },

    /// Block payload longer than SMBus allows
    #[error("block of {0} bytes exceeds the SMBus limit of 255")]
    BlockTooLong(usize),
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// SMBus transactions needed by PMBus commands.
pub trait SmbusTransport {
    fn read_byte(&mut self, cmd: u8) -> Result<u8>;

    /// Read a word; PMBus words are little-endian on the wire.
    fn read_word(&mut self, cmd: u8) -> Result<u16>;

    /// Read a block. The device reports the length; anything past `max`
    /// is dropped.
    fn read_block(&mut self, cmd: u8, max: usize) -> Result<Vec<u8>>;

    fn write_byte(&mut self, cmd: u8, value: u8) -> Result<()>;

    fn write_word(&mut self, cmd: u8, value: u16) -> Result<()>;

    fn write_block(&mut self, cmd: u8, data: &[u8]) -> Result<()>;

    /// Command code with no data.
    fn send_byte(&mut self, cmd: u8) -> Result<()>;
}

/// SMBus framing for one device on an I2C bus.
#[derive(Debug)]
pub struct Smbus<B> {
    bus: B,
    addr: u8,
}

impl<B: I2c> Smbus<B> {
    pub fn new(bus: B, addr: u8) -> Self {
        Self { bus, addr }
    }

    pub fn addr(&self) -> u8 {
        self.addr
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }
}

/// Open a Linux i2c-dev adapter and bind it to `addr`.
pub fn open(path: &Path, addr: u8) -> Result<Smbus<LinuxI2c>> {
    Ok(Smbus::new(LinuxI2c::open(path, addr)?, addr))
}

impl<B: I2c> SmbusTransport for Smbus<B> {
    fn read_byte(&mut self, cmd: u8) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.bus.write_read(self.addr, &[cmd], &mut buf)?;
        trace!("read_byte 0x{:02X} -> 0x{:02X}", cmd, buf[0]);
        Ok(buf[0])
    }

    fn read_word(&mut self, cmd: u8) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.bus.write_read(self.addr, &[cmd], &mut buf)?;
        let value = u16::from_le_bytes(buf);
        trace!("read_word 0x{:02X} -> 0x{:04X}", cmd, value);
        Ok(value)
    }

    fn read_block(&mut self, cmd: u8, max: usize) -> Result<Vec<u8>> {
        // First byte is the length, then data
        let mut buffer = vec![0u8; max + 1];
        self.bus.write_read(self.addr, &[cmd], &mut buffer)?;

        let reported = buffer[0] as usize;
        if reported > max {
            debug!(
                "Block 0x{:02X} reports {} bytes, keeping {}",
                cmd, reported, max
            );
        }
        let len = reported.min(max);
        let data = buffer[1..=len].to_vec();
        trace!("read_block 0x{:02X} -> {:02X?}", cmd, data);
        Ok(data)
    }

    fn write_byte(&mut self, cmd: u8, value: u8) -> Result<()> {
        trace!("write_byte 0x{:02X} <- 0x{:02X}", cmd, value);
        self.bus.write(self.addr, &[cmd, value])
    }

    fn write_word(&mut self, cmd: u8, value: u16) -> Result<()> {
        trace!("write_word 0x{:02X} <- 0x{:04X}", cmd, value);
        let [lo, hi] = value.to_le_bytes();
        self.bus.write(self.addr, &[cmd, lo, hi])
    }

    fn write_block(&mut self, cmd: u8, data: &[u8]) -> Result<()> {
        let len = u8::try_from(data.len()).map_err(|_| TransportError::BlockTooLong(data.len()))?;
        trace!("write_block 0x{:02X} <- {:02X?}", cmd, data);
        let mut frame = Vec::with_capacity(data.len() + 2);
        frame.push(cmd);
        frame.push(len);
        frame.extend_from_slice(data);
        self.bus.write(self.addr, &frame)
    }

    fn send_byte(&mut self, cmd: u8) -> Result<()> {
        trace!("send_byte 0x{:02X}", cmd);
        self.bus.write(self.addr, &[cmd])
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockDevice;
    use super::*;

    #[test]
    fn test_word_is_little_endian() {
        let mut dev = MockDevice::new();
        dev.set_word(0x8B, 0x0266);
        let mut smbus = Smbus::new(&mut dev, 0x40);
        assert_eq!(smbus.read_word(0x8B).unwrap(), 0x0266);

        smbus.write_word(0x21, 0x1234).unwrap();
        assert_eq!(dev.raw(0x21), Some(&[0x34, 0x12][..]));
    }

    #[test]
    fn test_block_read_truncates_to_max() {
        let mut dev = MockDevice::new();
        dev.set_block(0x9A, b"BMR4560002/851");
        let mut smbus = Smbus::new(&mut dev, 0x40);
        assert_eq!(smbus.read_block(0x9A, 32).unwrap(), b"BMR4560002/851");
        assert_eq!(smbus.read_block(0x9A, 6).unwrap(), b"BMR456");
    }

    #[test]
    fn test_block_write_frames_length() {
        let mut dev = MockDevice::new();
        let mut smbus = Smbus::new(&mut dev, 0x40);
        smbus.write_block(0xFE, b"ERIC").unwrap();
        smbus.send_byte(0x03).unwrap();
        assert_eq!(dev.writes()[0], (0xFE, vec![4, b'E', b'R', b'I', b'C']));
        assert_eq!(dev.writes()[1], (0x03, vec![]));
    }

    #[test]
    fn test_block_write_too_long() {
        let mut dev = MockDevice::new();
        let mut smbus = Smbus::new(&mut dev, 0x40);
        let err = smbus.write_block(0xB0, &[0u8; 300]).unwrap_err();
        assert!(matches!(err, TransportError::BlockTooLong(300)));
        assert!(dev.writes().is_empty());
    }

    #[test]
    fn test_missing_register_is_nack() {
        let mut dev = MockDevice::new();
        let mut smbus = Smbus::new(&mut dev, 0x40);
        assert!(matches!(smbus.read_byte(0x19), Err(TransportError::NoAck(0x40))));
    }
}
