//! Command handlers.
//!
//! Each verb group lives in its own module and exposes clap argument types
//! plus a `run` function that takes a [`Session`] and returns the JSON
//! document to print. Handlers never touch stdout.

pub mod capability;
pub mod control;
pub mod fault;
pub mod identity;
pub mod nvm;
pub mod options;
pub mod raw;
pub mod snapshot;
pub mod status;
pub mod telemetry;
pub mod temp;
pub mod timing;
pub mod vout;

use clap::Subcommand;
use serde_json::{json, Value};

use crate::config::FamilySelect;
use crate::error::{Error, Result};
use crate::pmbus::{linear11, Access, Family, PMBusError, PmbusCommand, Register, VoutMode, Width};
use crate::tracing::prelude::*;
use crate::transport::SmbusTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Read,
    Write,
    Send,
}

impl Op {
    fn as_str(self) -> &'static str {
        match self {
            Op::Read => "read",
            Op::Write => "write",
            Op::Send => "send",
        }
    }

    fn allowed(self, access: Access) -> bool {
        match self {
            Op::Read => access.readable(),
            Op::Write => access.writable(),
            Op::Send => access == Access::SendOnly,
        }
    }
}

/// An open device plus the family its registers are interpreted for.
///
/// Every register access goes through the register map first, so a
/// command that does not exist on the selected family, or that is used in
/// the wrong direction, fails before any bus traffic.
pub struct Session<T> {
    bus: T,
    family: Family,
}

impl<T: SmbusTransport> Session<T> {
    pub fn new(bus: T, family: Family) -> Self {
        Self { bus, family }
    }

    /// Resolve the family, reading MFR_MODEL when asked to detect it.
    pub fn connect(mut bus: T, select: FamilySelect) -> Self {
        let family = match select {
            FamilySelect::Fixed(family) => family,
            FamilySelect::Auto => detect_family(&mut bus),
        };
        Self::new(bus, family)
    }

    pub fn family(&self) -> Family {
        self.family
    }

    /// Unchecked access for raw register commands.
    pub fn transport(&mut self) -> &mut T {
        &mut self.bus
    }

    fn check(&self, cmd: PmbusCommand, width: Width, op: Op) -> Result<Register> {
        let reg = cmd.register();
        if !reg.supported_by(self.family) {
            return Err(PMBusError::UnsupportedOnFamily {
                register: reg.name,
                family: self.family,
            }
            .into());
        }
        let width_ok = match (reg.width, width) {
            (Width::Block(_), Width::Block(_)) => true,
            (have, want) => have == want,
        };
        if !op.allowed(reg.access) || !width_ok {
            return Err(PMBusError::AccessViolation {
                register: reg.name,
                op: op.as_str(),
            }
            .into());
        }
        Ok(reg)
    }

    pub fn read_byte(&mut self, cmd: PmbusCommand) -> Result<u8> {
        self.check(cmd, Width::Byte, Op::Read)?;
        Ok(self.bus.read_byte(cmd.as_u8())?)
    }

    pub fn read_word(&mut self, cmd: PmbusCommand) -> Result<u16> {
        self.check(cmd, Width::Word, Op::Read)?;
        Ok(self.bus.read_word(cmd.as_u8())?)
    }

    /// Read a block, capped at the register's maximum length.
    pub fn read_block(&mut self, cmd: PmbusCommand) -> Result<Vec<u8>> {
        let reg = self.check(cmd, Width::Block(0), Op::Read)?;
        let max = match reg.width {
            Width::Block(max) => max,
            _ => 0,
        };
        Ok(self.bus.read_block(cmd.as_u8(), max)?)
    }

    /// Read a block and decode it as text, dropping NULs and trailing spaces.
    pub fn read_string(&mut self, cmd: PmbusCommand) -> Result<String> {
        let data = self.read_block(cmd)?;
        Ok(block_to_string(&data))
    }

    pub fn write_byte(&mut self, cmd: PmbusCommand, value: u8) -> Result<()> {
        self.check(cmd, Width::Byte, Op::Write)?;
        Ok(self.bus.write_byte(cmd.as_u8(), value)?)
    }

    pub fn write_word(&mut self, cmd: PmbusCommand, value: u16) -> Result<()> {
        self.check(cmd, Width::Word, Op::Write)?;
        Ok(self.bus.write_word(cmd.as_u8(), value)?)
    }

    pub fn write_block(&mut self, cmd: PmbusCommand, data: &[u8]) -> Result<()> {
        let reg = self.check(cmd, Width::Block(0), Op::Write)?;
        if let Width::Block(max) = reg.width {
            if data.len() > max {
                return Err(PMBusError::ValueOutOfRange.into());
            }
        }
        Ok(self.bus.write_block(cmd.as_u8(), data)?)
    }

    pub fn send(&mut self, cmd: PmbusCommand) -> Result<()> {
        self.check(cmd, Width::Send, Op::Send)?;
        Ok(self.bus.send_byte(cmd.as_u8())?)
    }

    /// Issue a STORE/RESTORE command the way this family expects it.
    pub fn send_nvm(&mut self, cmd: PmbusCommand) -> Result<()> {
        if self.family.store_is_send_byte() {
            self.send(cmd)
        } else {
            self.check(cmd, Width::Send, Op::Send)?;
            Ok(self.bus.write_byte(cmd.as_u8(), 0x01)?)
        }
    }

    pub fn vout_mode(&mut self) -> Result<VoutMode> {
        let mode = VoutMode::new(self.read_byte(PmbusCommand::VoutMode)?);
        if !mode.is_linear() {
            warn!(
                "VOUT_MODE 0x{:02X} is {} mode, using its exponent as linear",
                mode.0,
                mode.mode()
            );
        }
        Ok(mode)
    }

    /// Read a Linear11 register into engineering units.
    pub fn read_linear11(&mut self, cmd: PmbusCommand) -> Result<f64> {
        Ok(linear11::decode(self.read_word(cmd)?))
    }
}

fn detect_family<T: SmbusTransport>(bus: &mut T) -> Family {
    let cmd = PmbusCommand::MfrModel;
    match bus.read_block(cmd.as_u8(), crate::pmbus::ID_BLOCK_MAX) {
        Ok(data) => {
            let model = block_to_string(&data);
            let family = Family::from_model(&model);
            debug!(model = %model, family = %family, "Detected device family");
            family
        }
        Err(e) => {
            warn!("Cannot read MFR_MODEL ({}), assuming {}", e, Family::Bmr685);
            Family::Bmr685
        }
    }
}

pub fn block_to_string(data: &[u8]) -> String {
    String::from_utf8_lossy(data)
        .trim_end_matches(&['\0', ' '][..])
        .to_string()
}

/// Insert `key: value` when the read worked; log and skip it otherwise.
/// Validation errors are not tolerated.
pub fn insert_or_warn(obj: &mut Value, key: &str, value: Result<Value>) -> Result<()> {
    match value {
        Ok(v) => {
            obj[key] = v;
            Ok(())
        }
        Err(Error::Transport(e)) => {
            warn!("Skipping {}: {}", key, e);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Insert `key: value`, or `key: {"error": msg}` when the read failed.
pub fn insert_or_error(obj: &mut Value, key: &str, value: Result<Value>) -> Result<()> {
    match value {
        Ok(v) => {
            obj[key] = v;
            Ok(())
        }
        Err(Error::Transport(e)) => {
            warn!("Reading {} failed: {}", key, e);
            obj[key] = json!({ "error": e.to_string() });
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Every verb of the tool.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read telemetry (Linear11 / Linear16U)
    Read(telemetry::ReadArgs),
    /// Decode all status registers
    Status,
    /// Dump the MFR_GET_STATUS_DATA log
    StatusData,
    /// Read a parametric snapshot
    Snapshot(snapshot::SnapshotArgs),
    /// Decode or check CAPABILITY
    #[command(subcommand)]
    Capability(capability::CapabilityCommand),
    /// Fault response registers
    #[command(subcommand)]
    Fault(fault::FaultCommand),
    /// Temperature limits and readings
    #[command(subcommand)]
    Temp(temp::TempCommand),
    /// Turn-on / turn-off timing
    #[command(subcommand)]
    Timing(timing::TimingCommand),
    /// VOUT_COMMAND and margins
    #[command(subcommand)]
    Vout(vout::VoutCommand),
    /// VIN_ON / VIN_OFF thresholds
    #[command(subcommand)]
    Vin(vout::VinCommand),
    /// POWER_GOOD_ON / POWER_GOOD_OFF thresholds
    #[command(subcommand)]
    Pgood(vout::PgoodCommand),
    /// ON_OFF_CONFIG
    #[command(subcommand)]
    Onoff(control::OnOffCommand),
    /// OPERATION
    #[command(subcommand)]
    Operation(control::OperationCommand),
    /// INTERLEAVE
    #[command(subcommand)]
    Interleave(control::InterleaveCommand),
    /// MFR_SPECIAL_OPTIONS (PEC, HRR, droop, DBV)
    #[command(subcommand)]
    Hrr(options::HrrCommand),
    /// MFR_MULTI_PIN_CONFIG
    #[command(subcommand)]
    MultiPin(options::MultiPinCommand),
    /// WRITE_PROTECT
    #[command(subcommand)]
    WriteProtect(control::WriteProtectCommand),
    /// FREQUENCY_SWITCH
    #[command(subcommand)]
    Freq(raw::RawRegisterCommand),
    /// SMBALERT_MASK
    #[command(subcommand)]
    Salert(raw::RawRegisterCommand),
    /// MFR_OFFSET_ADDRESS
    #[command(subcommand)]
    AddrOffset(raw::RawRegisterCommand),
    /// PMBus revision and manufacturer strings
    Id,
    /// MFR_FIRMWARE_DATA
    Fwdata,
    /// Restart the module
    Restart,
    /// MFR_USER_DATA_00
    #[command(subcommand)]
    UserData(identity::UserDataCommand),
    /// Dump the MFR_GET_RAMP_DATA log
    RampData,
    /// STORE_USER_ALL
    Save,
    /// RESTORE_USER_ALL, or RESTORE_DEFAULT_ALL with `default`
    Restore(nvm::RestoreArgs),
    /// CLEAR_FAULTS
    ClearFaults,
    /// Raw byte/word access by command code
    #[command(subcommand)]
    Rw(raw::RwCommand),
    /// Print the register map
    Registers,
}

impl Command {
    /// Whether the command talks to the device at all.
    pub fn needs_bus(&self) -> bool {
        !matches!(self, Self::Registers)
    }
}

/// The register map for `--family`, or every register for `auto`.
pub fn registers(select: FamilySelect) -> Value {
    let family = match select {
        FamilySelect::Auto => None,
        FamilySelect::Fixed(f) => Some(f),
    };
    crate::pmbus::register_map_json(family)
}

/// Run one command against an open session.
pub fn run<T: SmbusTransport>(session: &mut Session<T>, command: &Command) -> Result<Value> {
    match command {
        Command::Read(args) => telemetry::run(session, args),
        Command::Status => status::run(session),
        Command::StatusData => status::status_data(session),
        Command::Snapshot(args) => snapshot::run(session, args),
        Command::Capability(cmd) => capability::run(session, cmd),
        Command::Fault(cmd) => fault::run(session, cmd),
        Command::Temp(cmd) => temp::run(session, cmd),
        Command::Timing(cmd) => timing::run(session, cmd),
        Command::Vout(cmd) => vout::run_vout(session, cmd),
        Command::Vin(cmd) => vout::run_vin(session, cmd),
        Command::Pgood(cmd) => vout::run_pgood(session, cmd),
        Command::Onoff(cmd) => control::run_onoff(session, cmd),
        Command::Operation(cmd) => control::run_operation(session, cmd),
        Command::Interleave(cmd) => control::run_interleave(session, cmd),
        Command::Hrr(cmd) => options::run_hrr(session, cmd),
        Command::MultiPin(cmd) => options::run_multi_pin(session, cmd),
        Command::WriteProtect(cmd) => control::run_write_protect(session, cmd),
        Command::Freq(cmd) => raw::run_register(session, raw::FREQ, cmd),
        Command::Salert(cmd) => raw::run_register(session, raw::SALERT, cmd),
        Command::AddrOffset(cmd) => raw::run_register(session, raw::ADDR_OFFSET, cmd),
        Command::Id => identity::id(session),
        Command::Fwdata => identity::fwdata(session),
        Command::Restart => nvm::restart(session),
        Command::UserData(cmd) => identity::run_user_data(session, cmd),
        Command::RampData => identity::ramp_data(session),
        Command::Save => nvm::save(session),
        Command::Restore(args) => nvm::restore(session, args),
        Command::ClearFaults => status::clear_faults(session),
        Command::Rw(cmd) => raw::run_rw(session, cmd),
        Command::Registers => Ok(registers(FamilySelect::Fixed(session.family()))),
    }
}
