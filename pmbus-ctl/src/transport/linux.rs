//! Linux i2c-dev backend.
//!
//! Transfers go through `I2C_RDWR` so a command write and its data read
//! share one repeated-start transaction. The descriptor is closed when the
//! [`LinuxI2c`] is dropped.

use nix::errno::Errno;
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use super::{I2c, Result, TransportError};
use crate::tracing::prelude::*;

const I2C_SLAVE: u16 = 0x0703;
const I2C_RDWR: u16 = 0x0707;
const I2C_M_RD: u16 = 0x0001;

#[repr(C)]
struct I2cMsg {
    addr: u16,
    flags: u16,
    len: u16,
    buf: *mut u8,
}

#[repr(C)]
struct I2cRdwrData {
    msgs: *mut I2cMsg,
    nmsgs: u32,
}

nix::ioctl_write_int_bad!(i2c_slave, I2C_SLAVE);
nix::ioctl_write_ptr_bad!(i2c_rdwr, I2C_RDWR, I2cRdwrData);

/// An open `/dev/i2c-N` adapter.
#[derive(Debug)]
pub struct LinuxI2c {
    file: File,
    path: PathBuf,
}

impl LinuxI2c {
    /// Open the adapter and check that `addr` can be bound.
    pub fn open(path: &Path, addr: u8) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| TransportError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        // SAFETY: the descriptor is owned by `file` and I2C_SLAVE takes an
        // integer argument.
        unsafe { i2c_slave(file.as_raw_fd(), i32::from(addr)) }
            .map_err(|errno| ioctl_error("I2C_SLAVE", addr, errno))?;

        debug!(path = %path.display(), addr = format_args!("0x{:02X}", addr), "Opened I2C adapter");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn transfer(&mut self, addr: u8, msgs: &mut [I2cMsg]) -> Result<()> {
        let data = I2cRdwrData {
            msgs: msgs.as_mut_ptr(),
            nmsgs: msgs.len() as u32,
        };
        // SAFETY: every message points at a live buffer of `len` bytes that
        // outlives the call.
        unsafe { i2c_rdwr(self.file.as_raw_fd(), &data) }
            .map_err(|errno| ioctl_error("I2C_RDWR", addr, errno))?;
        Ok(())
    }
}

fn ioctl_error(op: &'static str, addr: u8, errno: Errno) -> TransportError {
    match errno {
        Errno::ENXIO | Errno::EREMOTEIO => TransportError::NoAck(addr),
        errno => TransportError::Ioctl { op, errno },
    }
}

fn msg_len(len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| TransportError::BlockTooLong(len))
}

impl I2c for LinuxI2c {
    fn write(&mut self, addr: u8, data: &[u8]) -> Result<()> {
        let mut buf = data.to_vec();
        let mut msgs = [I2cMsg {
            addr: u16::from(addr),
            flags: 0,
            len: msg_len(buf.len())?,
            buf: buf.as_mut_ptr(),
        }];
        self.transfer(addr, &mut msgs)
    }

    fn write_read(&mut self, addr: u8, write: &[u8], read: &mut [u8]) -> Result<()> {
        let mut out = write.to_vec();
        let mut msgs = [
            I2cMsg {
                addr: u16::from(addr),
                flags: 0,
                len: msg_len(out.len())?,
                buf: out.as_mut_ptr(),
            },
            I2cMsg {
                addr: u16::from(addr),
                flags: I2C_M_RD,
                len: msg_len(read.len())?,
                buf: read.as_mut_ptr(),
            },
        ];
        self.transfer(addr, &mut msgs)
    }
}
