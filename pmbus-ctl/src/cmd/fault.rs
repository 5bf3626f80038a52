//! `fault get|set` and `fault temp set`: fault response bytes.

use clap::{Args, Subcommand, ValueEnum};
use serde_json::{json, Value};

use super::{insert_or_error, Session};
use crate::error::{Error, Result, ValidationError};
use crate::pmbus::fault::{parse_temp_delay, DelayUnit, FaultMode, FaultResponse, Retries};
use crate::pmbus::{PMBusError, PmbusCommand};
use crate::transport::SmbusTransport;

#[derive(Subcommand, Debug)]
pub enum FaultCommand {
    /// Decode fault response bytes
    Get {
        #[arg(value_enum, default_value_t = FaultGroup::All)]
        group: FaultGroup,
    },
    /// Over/under-temperature responses
    #[command(subcommand)]
    Temp(TempFaultCommand),
    /// Change one voltage, current or turn-on response, keeping unspecified fields
    Set(SetArgs),
}

#[derive(Subcommand, Debug)]
pub enum TempFaultCommand {
    /// Program OT_FAULT_RESPONSE and UT_FAULT_RESPONSE
    Set(TempSetArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultGroup {
    All,
    Temp,
    Vout,
    Vin,
    Tonmax,
    Iout,
}

/// Unset fields default to disable-and-retry, 16 s, continuous retries.
#[derive(Args, Debug, Default)]
pub struct TempSetArgs {
    /// 16s, 32s, 2^n, n=N or N
    #[arg(long)]
    pub ot_delay: Option<String>,
    #[arg(long)]
    pub ut_delay: Option<String>,
    /// ignore, delay-retry, disable-retry, disable-until-clear or latchoff
    #[arg(long)]
    pub ot_mode: Option<String>,
    #[arg(long)]
    pub ut_mode: Option<String>,
    /// 0..6, cont or continuous
    #[arg(long)]
    pub ot_retries: Option<String>,
    #[arg(long)]
    pub ut_retries: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultTarget {
    VoutOv,
    VoutUv,
    VinOv,
    VinUv,
    IoutOc,
    Tonmax,
}

impl FaultTarget {
    fn command(self) -> PmbusCommand {
        match self {
            Self::VoutOv => PmbusCommand::VoutOvFaultResponse,
            Self::VoutUv => PmbusCommand::VoutUvFaultResponse,
            Self::VinOv => PmbusCommand::VinOvFaultResponse,
            Self::VinUv => PmbusCommand::VinUvFaultResponse,
            Self::IoutOc => PmbusCommand::IoutOcFaultResponse,
            Self::Tonmax => PmbusCommand::TonMaxFaultResponse,
        }
    }
}

#[derive(Args, Debug)]
pub struct SetArgs {
    #[arg(value_enum)]
    pub target: FaultTarget,
    #[arg(long)]
    pub mode: Option<String>,
    #[arg(long)]
    pub retries: Option<String>,
    /// Delay in 10 ms ticks, 0..7
    #[arg(long)]
    pub delay_ticks: Option<u8>,
}

const GROUPS: &[(FaultGroup, &str, &[PmbusCommand])] = &[
    (
        FaultGroup::Temp,
        "temperature",
        &[PmbusCommand::OtFaultResponse, PmbusCommand::UtFaultResponse],
    ),
    (
        FaultGroup::Vout,
        "vout",
        &[PmbusCommand::VoutOvFaultResponse, PmbusCommand::VoutUvFaultResponse],
    ),
    (
        FaultGroup::Vin,
        "vin",
        &[PmbusCommand::VinOvFaultResponse, PmbusCommand::VinUvFaultResponse],
    ),
    (FaultGroup::Tonmax, "tonmax", &[PmbusCommand::TonMaxFaultResponse]),
    (FaultGroup::Iout, "iout", &[PmbusCommand::IoutOcFaultResponse]),
];

fn unit_of(cmd: PmbusCommand) -> DelayUnit {
    DelayUnit::for_response(cmd).unwrap_or(DelayUnit::TenMilliseconds)
}

fn read_response<T: SmbusTransport>(session: &mut Session<T>, cmd: PmbusCommand) -> Result<Value> {
    let raw = session.read_byte(cmd)?;
    Ok(FaultResponse::from_raw(raw).to_json(unit_of(cmd)))
}

fn get<T: SmbusTransport>(session: &mut Session<T>, group: FaultGroup) -> Result<Value> {
    let mut out = json!({});
    for &(g, key, cmds) in GROUPS {
        if group != FaultGroup::All && group != g {
            continue;
        }
        let mut obj = json!({});
        for &cmd in cmds {
            let value = read_response(session, cmd);
            insert_or_error(&mut obj, cmd.name(), value)?;
        }
        out[key] = obj;
    }
    Ok(out)
}

fn arg_err(arg: &'static str, e: PMBusError, input: &str) -> Error {
    ValidationError::invalid(arg, format!("'{input}': {e}")).into()
}

fn parse_mode(arg: &'static str, s: Option<&str>) -> Result<Option<FaultMode>> {
    s.map(|s| FaultMode::parse(s).map_err(|e| arg_err(arg, e, s)))
        .transpose()
}

fn parse_retries(arg: &'static str, s: Option<&str>) -> Result<Option<Retries>> {
    s.map(|s| Retries::parse(s).map_err(|e| arg_err(arg, e, s)))
        .transpose()
}

fn parse_delay(arg: &'static str, s: Option<&str>) -> Result<Option<u8>> {
    s.map(|s| parse_temp_delay(s).map_err(|e| arg_err(arg, e, s)))
        .transpose()
}

fn temp_set<T: SmbusTransport>(session: &mut Session<T>, args: &TempSetArgs) -> Result<Value> {
    let compose = |mode: Option<FaultMode>, retries: Option<Retries>, delay: Option<u8>| {
        FaultResponse::new(
            mode.unwrap_or(FaultMode::DisableAndRetry),
            retries.unwrap_or(Retries::Continuous),
            delay.unwrap_or(4),
        )
    };

    // Validate both before writing either.
    let ot = compose(
        parse_mode("--ot-mode", args.ot_mode.as_deref())?,
        parse_retries("--ot-retries", args.ot_retries.as_deref())?,
        parse_delay("--ot-delay", args.ot_delay.as_deref())?,
    )?;
    let ut = compose(
        parse_mode("--ut-mode", args.ut_mode.as_deref())?,
        parse_retries("--ut-retries", args.ut_retries.as_deref())?,
        parse_delay("--ut-delay", args.ut_delay.as_deref())?,
    )?;

    session.write_byte(PmbusCommand::OtFaultResponse, ot.to_raw())?;
    session.write_byte(PmbusCommand::UtFaultResponse, ut.to_raw())?;

    let mut readback = json!({});
    for cmd in [PmbusCommand::OtFaultResponse, PmbusCommand::UtFaultResponse] {
        let value = read_response(session, cmd);
        insert_or_error(&mut readback, cmd.name(), value)?;
    }
    Ok(json!({
        "changed": {
            "OT_FAULT_RESPONSE": ot.to_raw(),
            "UT_FAULT_RESPONSE": ut.to_raw(),
        },
        "readback": readback,
    }))
}

fn set<T: SmbusTransport>(session: &mut Session<T>, args: &SetArgs) -> Result<Value> {
    let mode = parse_mode("--mode", args.mode.as_deref())?;
    let retries = parse_retries("--retries", args.retries.as_deref())?;
    if mode.is_none() && retries.is_none() && args.delay_ticks.is_none() {
        return Err(ValidationError::NothingToDo("give --mode, --retries or --delay-ticks").into());
    }
    if let Some(ticks) = args.delay_ticks {
        if ticks > 7 {
            return Err(ValidationError::invalid("--delay-ticks", format!("{ticks} is not in 0..7")).into());
        }
    }

    let cmd = args.target.command();
    let current = FaultResponse::from_raw(session.read_byte(cmd)?);
    let next = FaultResponse::new(
        mode.unwrap_or(current.mode),
        retries.unwrap_or(current.retries),
        args.delay_ticks.unwrap_or(current.delay),
    )?;
    session.write_byte(cmd, next.to_raw())?;

    Ok(json!({
        "changed": { cmd.name(): next.to_raw() },
        "readback": { cmd.name(): read_response(session, cmd)? },
    }))
}

pub fn run<T: SmbusTransport>(session: &mut Session<T>, cmd: &FaultCommand) -> Result<Value> {
    match cmd {
        FaultCommand::Get { group } => get(session, *group),
        FaultCommand::Temp(TempFaultCommand::Set(args)) => temp_set(session, args),
        FaultCommand::Set(args) => set(session, args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::testing::session;
    use crate::pmbus::Family;
    use crate::transport::mock::MockDevice;

    fn device() -> MockDevice {
        let mut dev = MockDevice::new();
        dev.set_byte(0x50, 0xBC)
            .set_byte(0x54, 0x80)
            .set_byte(0x41, 0x80)
            .set_byte(0x45, 0xBA)
            .set_byte(0x56, 0xC0)
            .set_byte(0x5A, 0x00)
            .set_byte(0x63, 0x9B)
            .set_byte(0x47, 0x7F);
        dev
    }

    #[test]
    fn test_get_all_groups() {
        let mut dev = device();
        let mut s = session(&mut dev, Family::Bmr685);
        let v = run(&mut s, &FaultCommand::Get { group: FaultGroup::All }).unwrap();

        let ot = &v["temperature"]["OT_FAULT_RESPONSE"];
        assert_eq!(ot["mode"], "disable-and-retry");
        assert_eq!(ot["retries"], "continuous");
        assert_eq!(ot["delay_unit"], "2^n seconds");
        assert_eq!(ot["delay_seconds"], 16);

        let uv = &v["vout"]["VOUT_UV_FAULT_RESPONSE"];
        assert_eq!(uv["delay_unit"], "10ms");
        assert_eq!(uv["delay_ms"], 20);
        assert_eq!(v["tonmax"]["TON_MAX_FAULT_RESPONSE"]["retries"], 3);
        assert_eq!(v["iout"]["IOUT_OC_FAULT_RESPONSE"]["mode"], "delay-then-retry");
        assert_eq!(v["vin"]["VIN_OV_FAULT_RESPONSE"]["mode"], "disable-until-clear");
    }

    #[test]
    fn test_get_group_marks_failed_read() {
        let mut dev = device();
        dev.fail_on(0x54);
        let mut s = session(&mut dev, Family::Bmr685);
        let v = run(&mut s, &FaultCommand::Get { group: FaultGroup::Temp }).unwrap();
        assert!(v["temperature"]["UT_FAULT_RESPONSE"]["error"].is_string());
        assert_eq!(v["temperature"]["OT_FAULT_RESPONSE"]["raw"], 0xBC);
        assert!(v.get("vout").is_none());
    }

    #[test]
    fn test_temp_set_defaults() {
        let mut dev = MockDevice::new();
        let mut s = session(&mut dev, Family::Bmr685);
        let v = run(&mut s, &FaultCommand::Temp(TempFaultCommand::Set(TempSetArgs::default()))).unwrap();
        assert_eq!(v["changed"]["OT_FAULT_RESPONSE"], 0xBC);
        assert_eq!(v["changed"]["UT_FAULT_RESPONSE"], 0xBC);
        assert_eq!(v["readback"]["OT_FAULT_RESPONSE"]["delay_n"], 4);
    }

    #[test]
    fn test_temp_set_options() {
        let mut dev = MockDevice::new();
        let mut s = session(&mut dev, Family::Bmr456);
        let args = TempSetArgs {
            ot_delay: Some("32s".into()),
            ot_mode: Some("latchoff".into()),
            ot_retries: Some("0".into()),
            ut_mode: Some("ignore".into()),
            ..Default::default()
        };
        let v = run(&mut s, &FaultCommand::Temp(TempFaultCommand::Set(args))).unwrap();
        assert_eq!(v["changed"]["OT_FAULT_RESPONSE"], 0xC5);
        assert_eq!(v["changed"]["UT_FAULT_RESPONSE"], 0x3C);
        drop(s);
        assert_eq!(dev.written_commands(), vec![0x50, 0x54]);
    }

    #[test]
    fn test_temp_set_bad_delay_writes_nothing() {
        let mut dev = MockDevice::new();
        let mut s = session(&mut dev, Family::Bmr685);
        let args = TempSetArgs {
            ut_delay: Some("20s".into()),
            ..Default::default()
        };
        let err = run(&mut s, &FaultCommand::Temp(TempFaultCommand::Set(args))).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        drop(s);
        assert!(dev.writes().is_empty());
    }

    #[test]
    fn test_set_keeps_unspecified_fields() {
        let mut dev = device();
        let mut s = session(&mut dev, Family::Bmr685);
        let args = SetArgs {
            target: FaultTarget::VoutUv,
            mode: Some("ignore".into()),
            retries: None,
            delay_ticks: Some(5),
        };
        let v = run(&mut s, &FaultCommand::Set(args)).unwrap();
        // 0xBA had retries 7; mode and delay replaced
        assert_eq!(v["changed"]["VOUT_UV_FAULT_RESPONSE"], 0x3D);
        assert_eq!(v["readback"]["VOUT_UV_FAULT_RESPONSE"]["delay_ms"], 50);
    }

    #[test]
    fn test_set_needs_a_field() {
        let mut dev = device();
        let mut s = session(&mut dev, Family::Bmr685);
        let args = SetArgs {
            target: FaultTarget::Tonmax,
            mode: None,
            retries: None,
            delay_ticks: None,
        };
        assert_eq!(run(&mut s, &FaultCommand::Set(args)).unwrap_err().exit_code(), 2);
    }
}
