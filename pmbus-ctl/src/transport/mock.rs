//! In-memory PMBus device for tests.
//!
//! Registers hold the raw bytes that follow the command code on the wire,
//! so a block register keeps its length prefix. Writes overwrite the stored
//! bytes and are logged; reading a register that was never set is a NACK,
//! which is what real modules do for unimplemented commands.

use std::collections::{HashMap, HashSet};

use super::{I2c, Result, TransportError};

#[derive(Debug, Default)]
pub struct MockDevice {
    registers: HashMap<u8, Vec<u8>>,
    writes: Vec<(u8, Vec<u8>)>,
    failing: HashSet<u8>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_byte(&mut self, cmd: u8, value: u8) -> &mut Self {
        self.registers.insert(cmd, vec![value]);
        self
    }

    pub fn set_word(&mut self, cmd: u8, value: u16) -> &mut Self {
        self.registers.insert(cmd, value.to_le_bytes().to_vec());
        self
    }

    pub fn set_block(&mut self, cmd: u8, data: &[u8]) -> &mut Self {
        let mut raw = Vec::with_capacity(data.len() + 1);
        raw.push(data.len() as u8);
        raw.extend_from_slice(data);
        self.registers.insert(cmd, raw);
        self
    }

    /// Every transfer touching `cmd` is NACKed from now on.
    pub fn fail_on(&mut self, cmd: u8) -> &mut Self {
        self.failing.insert(cmd);
        self
    }

    pub fn raw(&self, cmd: u8) -> Option<&[u8]> {
        self.registers.get(&cmd).map(Vec::as_slice)
    }

    pub fn byte(&self, cmd: u8) -> Option<u8> {
        self.raw(cmd).and_then(|r| r.first().copied())
    }

    pub fn word(&self, cmd: u8) -> Option<u16> {
        match self.raw(cmd)? {
            [lo, hi, ..] => Some(u16::from_le_bytes([*lo, *hi])),
            _ => None,
        }
    }

    /// Writes in order as `(command, payload)`.
    pub fn writes(&self) -> &[(u8, Vec<u8>)] {
        &self.writes
    }

    /// Command codes written, in order.
    pub fn written_commands(&self) -> Vec<u8> {
        self.writes.iter().map(|(cmd, _)| *cmd).collect()
    }
}

impl I2c for MockDevice {
    fn write(&mut self, addr: u8, data: &[u8]) -> Result<()> {
        let Some((&cmd, payload)) = data.split_first() else {
            return Err(TransportError::NoAck(addr));
        };
        if self.failing.contains(&cmd) {
            return Err(TransportError::NoAck(addr));
        }
        self.writes.push((cmd, payload.to_vec()));
        if !payload.is_empty() {
            self.registers.insert(cmd, payload.to_vec());
        }
        Ok(())
    }

    fn write_read(&mut self, addr: u8, write: &[u8], read: &mut [u8]) -> Result<()> {
        let cmd = *write.first().ok_or(TransportError::NoAck(addr))?;
        if self.failing.contains(&cmd) {
            return Err(TransportError::NoAck(addr));
        }
        let stored = self.registers.get(&cmd).ok_or(TransportError::NoAck(addr))?;
        read.fill(0);
        let n = stored.len().min(read.len());
        read[..n].copy_from_slice(&stored[..n]);
        Ok(())
    }
}
