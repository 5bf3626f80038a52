//! `onoff`, `operation`, `interleave` and `write-protect`.

use clap::{Args, Subcommand};
use serde_json::{json, Value};

use super::{insert_or_warn, Session};
use crate::error::{Result, ValidationError};
use crate::parse::parse_u8;
use crate::pmbus::fields::{
    Interleave, Margin, OffBehavior, OnOffConfig, OnOffSource, OnOffUpdate, Operation,
    OperationUpdate, PinPolarity, PowerUp, WriteProtect,
};
use crate::pmbus::PmbusCommand;
use crate::transport::SmbusTransport;

fn read_decoded<T: SmbusTransport, F>(session: &mut Session<T>, cmd: PmbusCommand, decode: F) -> Result<Value>
where
    F: FnOnce(u8) -> Value,
{
    Ok(decode(session.read_byte(cmd)?))
}

// ============================================================================
// onoff
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum OnOffCommand {
    /// Decode ON_OFF_CONFIG, plus the on bit of OPERATION
    Get,
    /// Change ON_OFF_CONFIG fields, or write a raw byte
    Set(OnOffSetArgs),
}

#[derive(Args, Debug, Default)]
pub struct OnOffSetArgs {
    /// always or controlled
    #[arg(long)]
    pub powerup: Option<PowerUp>,
    /// none, operation, pin or both
    #[arg(long)]
    pub source: Option<OnOffSource>,
    /// Control pin polarity: high or low
    #[arg(long)]
    pub en_active: Option<PinPolarity>,
    /// soft or immediate
    #[arg(long)]
    pub off: Option<OffBehavior>,
    #[arg(long, value_parser = parse_u8, conflicts_with_all = ["powerup", "source", "en_active", "off"])]
    pub raw: Option<u8>,
}

impl OnOffSetArgs {
    fn update(&self) -> OnOffUpdate {
        OnOffUpdate {
            powerup: self.powerup,
            source: self.source,
            polarity: self.en_active,
            off: self.off,
        }
    }
}

fn polarity_short(p: PinPolarity) -> &'static str {
    match p {
        PinPolarity::ActiveHigh => "high",
        PinPolarity::ActiveLow => "low",
    }
}

pub fn run_onoff<T: SmbusTransport>(session: &mut Session<T>, cmd: &OnOffCommand) -> Result<Value> {
    match cmd {
        OnOffCommand::Get => {
            let mut out = OnOffConfig::from_raw(session.read_byte(PmbusCommand::OnOffConfig)?).to_json();
            let op = read_decoded(session, PmbusCommand::Operation, |raw| {
                json!({ "raw": raw, "on": Operation::from_raw(raw).on })
            });
            insert_or_warn(&mut out, "OPERATION", op)?;
            Ok(out)
        }
        OnOffCommand::Set(args) => {
            let changed = match args.raw {
                Some(raw) => {
                    session.write_byte(PmbusCommand::OnOffConfig, raw)?;
                    json!({ "raw": raw })
                }
                None => {
                    let update = args.update();
                    if update.is_empty() {
                        return Err(ValidationError::NothingToDo(
                            "give --powerup, --source, --en-active, --off or --raw",
                        )
                        .into());
                    }
                    let current = OnOffConfig::from_raw(session.read_byte(PmbusCommand::OnOffConfig)?);
                    let next = update.apply(current);
                    session.write_byte(PmbusCommand::OnOffConfig, next.to_raw())?;
                    json!({
                        "raw": next.to_raw(),
                        "powerup": next.powerup.to_string(),
                        "source": next.source().to_string(),
                        "en_active": polarity_short(next.polarity),
                        "off": next.off.to_string(),
                    })
                }
            };
            let mut out = json!({ "changed": changed });
            let readback = read_decoded(session, PmbusCommand::OnOffConfig, |raw| {
                OnOffConfig::from_raw(raw).to_json()
            });
            insert_or_warn(&mut out, "readback", readback)?;
            Ok(out)
        }
    }
}

// ============================================================================
// operation
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum OperationCommand {
    /// Decode OPERATION
    Get,
    /// Turn the output on/off, select a margin, or write a raw byte
    Set(OperationSetArgs),
}

#[derive(Args, Debug, Default)]
pub struct OperationSetArgs {
    #[arg(long, conflicts_with = "off")]
    pub on: bool,
    #[arg(long)]
    pub off: bool,
    /// normal, low or high
    #[arg(long)]
    pub margin: Option<Margin>,
    #[arg(long, value_parser = parse_u8, conflicts_with_all = ["on", "off", "margin"])]
    pub raw: Option<u8>,
}

impl OperationSetArgs {
    fn update(&self) -> OperationUpdate {
        let on = match (self.on, self.off) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        OperationUpdate {
            on,
            margin: self.margin,
        }
    }
}

pub fn run_operation<T: SmbusTransport>(session: &mut Session<T>, cmd: &OperationCommand) -> Result<Value> {
    match cmd {
        OperationCommand::Get => {
            let raw = session.read_byte(PmbusCommand::Operation)?;
            Ok(Operation::from_raw(raw).to_json())
        }
        OperationCommand::Set(args) => {
            let changed = match args.raw {
                Some(raw) => {
                    session.write_byte(PmbusCommand::Operation, raw)?;
                    json!({ "raw": raw })
                }
                None => {
                    let update = args.update();
                    if update.is_empty() {
                        return Err(ValidationError::NothingToDo("give --on, --off, --margin or --raw").into());
                    }
                    let current = Operation::from_raw(session.read_byte(PmbusCommand::Operation)?);
                    let next = update.apply(current);
                    session.write_byte(PmbusCommand::Operation, next.to_raw())?;
                    next.to_json()
                }
            };
            let mut out = json!({ "changed": changed });
            let readback = read_decoded(session, PmbusCommand::Operation, |raw| {
                Operation::from_raw(raw).to_json()
            });
            insert_or_warn(&mut out, "readback", readback)?;
            Ok(out)
        }
    }
}

// ============================================================================
// interleave
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum InterleaveCommand {
    /// Decode INTERLEAVE
    Get,
    /// Write a raw byte, or a phase count and index
    Set(InterleaveSetArgs),
}

#[derive(Args, Debug, Default)]
pub struct InterleaveSetArgs {
    /// Raw INTERLEAVE byte
    #[arg(long = "set", value_parser = parse_u8, conflicts_with_all = ["phases", "index"])]
    pub raw: Option<u8>,
    /// Phases in the group, 1..16
    #[arg(long, requires = "index")]
    pub phases: Option<u8>,
    /// This unit's phase, 0..15
    #[arg(long, requires = "phases")]
    pub index: Option<u8>,
}

pub fn run_interleave<T: SmbusTransport>(session: &mut Session<T>, cmd: &InterleaveCommand) -> Result<Value> {
    match cmd {
        InterleaveCommand::Get => {
            let raw = session.read_byte(PmbusCommand::Interleave)?;
            Ok(Interleave::from_raw(raw).to_json())
        }
        InterleaveCommand::Set(args) => {
            let raw = match (args.raw, args.phases, args.index) {
                (Some(raw), _, _) => raw,
                (None, Some(phases), Some(index)) => Interleave::new(phases, index)
                    .map_err(|_| ValidationError::invalid("--phases/--index", "need phases 1..16 and index 0..15"))?
                    .to_raw(),
                _ => return Err(ValidationError::NothingToDo("give --set or --phases with --index").into()),
            };
            session.write_byte(PmbusCommand::Interleave, raw)?;
            let readback = Interleave::from_raw(session.read_byte(PmbusCommand::Interleave)?);
            Ok(json!({ "changed": true, "readback": readback.to_json() }))
        }
    }
}

// ============================================================================
// write-protect
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum WriteProtectCommand {
    /// Decode WRITE_PROTECT
    Get,
    /// Select a protection level
    Set(WriteProtectSetArgs),
}

#[derive(Args, Debug, Default)]
#[group(required = true, multiple = false)]
pub struct WriteProtectSetArgs {
    /// Everything writable
    #[arg(long)]
    pub none: bool,
    /// Only OPERATION and WRITE_PROTECT writable
    #[arg(long)]
    pub ctrl: bool,
    /// Only WRITE_PROTECT, OPERATION, ON_OFF_CONFIG and VOUT_COMMAND writable
    #[arg(long)]
    pub nvm: bool,
    /// Only WRITE_PROTECT writable
    #[arg(long)]
    pub all: bool,
    #[arg(long, value_parser = parse_u8)]
    pub raw: Option<u8>,
}

impl WriteProtectSetArgs {
    fn level(&self) -> Option<WriteProtect> {
        if let Some(raw) = self.raw {
            return Some(WriteProtect::from_raw(raw));
        }
        [
            (self.none, WriteProtect::None),
            (self.ctrl, WriteProtect::Ctrl),
            (self.nvm, WriteProtect::Nvm),
            (self.all, WriteProtect::All),
        ]
        .into_iter()
        .find_map(|(set, level)| set.then_some(level))
    }
}

pub fn run_write_protect<T: SmbusTransport>(session: &mut Session<T>, cmd: &WriteProtectCommand) -> Result<Value> {
    match cmd {
        WriteProtectCommand::Get => {
            let raw = session.read_byte(PmbusCommand::WriteProtect)?;
            Ok(WriteProtect::from_raw(raw).to_json())
        }
        WriteProtectCommand::Set(args) => {
            let level = args.level().ok_or(ValidationError::NothingToDo(
                "give --none, --ctrl, --nvm, --all or --raw",
            ))?;
            session.write_byte(PmbusCommand::WriteProtect, level.to_raw())?;
            let mut out = WriteProtect::from_raw(session.read_byte(PmbusCommand::WriteProtect)?).to_json();
            out["changed"] = json!(true);
            Ok(out)
        }
    }
}
