//! `temp get|set|read`: temperature limits and sensors.

use clap::{Args, Subcommand, ValueEnum};
use serde_json::{json, Value};

use super::{insert_or_error, Session};
use crate::error::{Result, ValidationError};
use crate::parse::parse_temperature;
use crate::pmbus::{Linear11, PmbusCommand};
use crate::transport::SmbusTransport;

#[derive(Subcommand, Debug)]
pub enum TempCommand {
    /// Read and decode temperature limits
    Get {
        #[arg(value_enum, default_value_t = LimitGroup::All)]
        group: LimitGroup,
    },
    /// Write temperature limits (°C by default, K or F suffix)
    Set(TempSetArgs),
    /// Read temperature sensors
    Read {
        #[arg(value_enum, default_value_t = Sensor::All)]
        sensor: Sensor,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitGroup {
    All,
    Ot,
    Ut,
    Warn,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sensor {
    All,
    T1,
    T2,
    T3,
}

#[derive(Args, Debug, Default)]
pub struct TempSetArgs {
    #[arg(long, value_parser = parse_temperature, allow_hyphen_values = true)]
    pub ot_fault: Option<f64>,
    #[arg(long, value_parser = parse_temperature, allow_hyphen_values = true)]
    pub ut_fault: Option<f64>,
    #[arg(long, value_parser = parse_temperature, allow_hyphen_values = true)]
    pub ot_warn: Option<f64>,
    #[arg(long, value_parser = parse_temperature, allow_hyphen_values = true)]
    pub ut_warn: Option<f64>,
}

const LIMIT_GROUPS: &[(LimitGroup, &str, [PmbusCommand; 2])] = &[
    (LimitGroup::Ot, "ot", [PmbusCommand::OtFaultLimit, PmbusCommand::OtWarnLimit]),
    (LimitGroup::Ut, "ut", [PmbusCommand::UtWarnLimit, PmbusCommand::UtFaultLimit]),
    (LimitGroup::Warn, "warn", [PmbusCommand::OtWarnLimit, PmbusCommand::UtWarnLimit]),
];

const SENSORS: [(Sensor, PmbusCommand); 3] = [
    (Sensor::T1, PmbusCommand::ReadTemperature1),
    (Sensor::T2, PmbusCommand::ReadTemperature2),
    (Sensor::T3, PmbusCommand::ReadTemperature3),
];

fn decoded(raw: u16) -> Value {
    let lin = Linear11::new(raw);
    json!({
        "raw": raw,
        "C": lin.to_f64(),
        "lin11_exp": lin.exponent(),
        "lin11_man": lin.mantissa(),
    })
}

fn read_decoded<T: SmbusTransport>(session: &mut Session<T>, cmd: PmbusCommand) -> Result<Value> {
    Ok(decoded(session.read_word(cmd)?))
}

fn get<T: SmbusTransport>(session: &mut Session<T>, group: LimitGroup) -> Result<Value> {
    let mut out = json!({});
    for &(g, key, cmds) in LIMIT_GROUPS {
        if group != LimitGroup::All && group != g {
            continue;
        }
        let mut obj = json!({});
        for cmd in cmds {
            let value = read_decoded(session, cmd);
            insert_or_error(&mut obj, cmd.name(), value)?;
        }
        out[key] = obj;
    }
    Ok(out)
}

fn set<T: SmbusTransport>(session: &mut Session<T>, args: &TempSetArgs) -> Result<Value> {
    let requested = [
        (PmbusCommand::OtFaultLimit, args.ot_fault),
        (PmbusCommand::UtFaultLimit, args.ut_fault),
        (PmbusCommand::OtWarnLimit, args.ot_warn),
        (PmbusCommand::UtWarnLimit, args.ut_warn),
    ];
    if requested.iter().all(|(_, v)| v.is_none()) {
        return Err(ValidationError::NothingToDo(
            "give --ot-fault, --ut-fault, --ot-warn or --ut-warn",
        )
        .into());
    }

    let mut changed = json!({});
    let mut readback = json!({});
    for (cmd, celsius) in requested {
        let Some(celsius) = celsius else { continue };
        let raw = Linear11::from_f64(celsius).0;
        session.write_word(cmd, raw)?;
        changed[cmd.name()] = json!({ "C": celsius, "raw": raw });

        let back = session.read_word(cmd)?;
        readback[cmd.name()] = json!({ "C": Linear11::new(back).to_f64(), "raw": back });
    }
    Ok(json!({ "changed": changed, "readback": readback }))
}

fn read<T: SmbusTransport>(session: &mut Session<T>, sensor: Sensor) -> Result<Value> {
    let mut out = json!({});
    for (s, cmd) in SENSORS {
        if sensor == Sensor::All || sensor == s {
            let value = read_decoded(session, cmd);
            insert_or_error(&mut out, cmd.name(), value)?;
        }
    }
    Ok(out)
}

pub fn run<T: SmbusTransport>(session: &mut Session<T>, cmd: &TempCommand) -> Result<Value> {
    match cmd {
        TempCommand::Get { group } => get(session, *group),
        TempCommand::Set(args) => set(session, args),
        TempCommand::Read { sensor } => read(session, *sensor),
    }
}
