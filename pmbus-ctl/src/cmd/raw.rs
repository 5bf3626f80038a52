//! Single raw registers (`freq`, `salert`, `addr-offset`) and unchecked
//! byte/word access by command code (`rw`).

use clap::{Args, Subcommand, ValueEnum};
use serde_json::{json, Value};

use super::Session;
use crate::error::{Result, ValidationError};
use crate::parse::{parse_u16, parse_u8};
use crate::pmbus::{PmbusCommand, Width};
use crate::tracing::prelude::*;
use crate::transport::SmbusTransport;

/// A register exposed as a plain number, and the JSON key it is shown under.
#[derive(Debug, Clone, Copy)]
pub struct RawRegister {
    pub cmd: PmbusCommand,
    pub key: &'static str,
}

pub const FREQ: RawRegister = RawRegister {
    cmd: PmbusCommand::FrequencySwitch,
    key: "FREQUENCY_SWITCH_raw",
};

pub const SALERT: RawRegister = RawRegister {
    cmd: PmbusCommand::SmbalertMask,
    key: "SMBALERT_MASK",
};

pub const ADDR_OFFSET: RawRegister = RawRegister {
    cmd: PmbusCommand::MfrOffsetAddress,
    key: "MFR_OFFSET_ADDRESS",
};

#[derive(Subcommand, Debug)]
pub enum RawRegisterCommand {
    /// Read the register
    Get,
    /// Write a raw value and read it back
    Set {
        #[arg(long, value_parser = parse_u16)]
        raw: u16,
    },
}

impl RawRegister {
    fn read<T: SmbusTransport>(&self, session: &mut Session<T>) -> Result<u16> {
        match self.cmd.register().width {
            Width::Word => session.read_word(self.cmd),
            _ => session.read_byte(self.cmd).map(u16::from),
        }
    }

    fn write<T: SmbusTransport>(&self, session: &mut Session<T>, value: u16) -> Result<()> {
        match self.cmd.register().width {
            Width::Word => session.write_word(self.cmd, value),
            _ => {
                let byte = u8::try_from(value).map_err(|_| {
                    ValidationError::invalid("--raw", format!("{} is a byte register", self.cmd.name()))
                })?;
                session.write_byte(self.cmd, byte)
            }
        }
    }
}

pub fn run_register<T: SmbusTransport>(
    session: &mut Session<T>,
    reg: RawRegister,
    cmd: &RawRegisterCommand,
) -> Result<Value> {
    match cmd {
        RawRegisterCommand::Get => Ok(json!({ reg.key: reg.read(session)? })),
        RawRegisterCommand::Set { raw } => {
            reg.write(session, *raw)?;
            Ok(json!({ "changed": true, reg.key: reg.read(session)? }))
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RwWidth {
    Byte,
    Word,
}

#[derive(Args, Debug)]
pub struct RwTarget {
    #[arg(value_enum)]
    pub width: RwWidth,
    /// Command code, e.g. 0x8B
    #[arg(long = "cmd", value_parser = parse_u8)]
    pub code: u8,
}

#[derive(Subcommand, Debug)]
pub enum RwCommand {
    /// Read a byte or word
    Get(RwTarget),
    /// Write a byte or word
    Set {
        #[command(flatten)]
        target: RwTarget,
        #[arg(long, value_parser = parse_u16)]
        value: u16,
    },
}

/// Raw access. Goes straight to the transport without consulting the
/// register map.
pub fn run_rw<T: SmbusTransport>(session: &mut Session<T>, cmd: &RwCommand) -> Result<Value> {
    match cmd {
        RwCommand::Get(target) => {
            debug!("Unchecked read of 0x{:02X}", target.code);
            let bus = session.transport();
            let raw = match target.width {
                RwWidth::Byte => u16::from(bus.read_byte(target.code)?),
                RwWidth::Word => bus.read_word(target.code)?,
            };
            Ok(json!({ "raw": raw }))
        }
        RwCommand::Set { target, value } => {
            debug!("Unchecked write of 0x{:02X}", target.code);
            match target.width {
                RwWidth::Byte => {
                    let byte = u8::try_from(*value)
                        .map_err(|_| ValidationError::invalid("--value", "a byte write takes 0..0xFF"))?;
                    session.transport().write_byte(target.code, byte)?;
                }
                RwWidth::Word => session.transport().write_word(target.code, *value)?,
            }
            Ok(json!({ "raw": value }))
        }
    }
}
