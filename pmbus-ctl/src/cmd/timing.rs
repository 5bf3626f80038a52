//! `timing get|set`: turn-on and turn-off sequencing.

use clap::{Args, Subcommand, ValueEnum};
use serde_json::{json, Value};

use super::{insert_or_warn, Session};
use crate::error::{Result, ValidationError};
use crate::parse::parse_u8;
use crate::pmbus::fault::{FaultMode, FaultResponse, Retries};
use crate::pmbus::PmbusCommand;
use crate::transport::SmbusTransport;

/// Timing words are milliseconds and limited to 15 bits.
pub const MS_MAX: u16 = 32767;

#[derive(Subcommand, Debug)]
pub enum TimingCommand {
    /// Read the timing registers
    Get,
    /// Apply a profile, then explicit overrides
    Set(TimingSetArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Bounded start-up, a few retries
    Safe,
    /// Staggered multi-rail start
    Sequenced,
    /// Latency sensitive, latch off on TON_MAX
    Fast,
    /// Slow soft-stop for pre-biased loads
    Prebias,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingProfile {
    pub ton_delay: u16,
    pub ton_rise: u16,
    pub ton_max_fault_limit: u16,
    pub ton_max_fault_response: u8,
    pub toff_delay: u16,
    pub toff_fall: u16,
    pub toff_max_warn_limit: u16,
}

impl Profile {
    pub fn values(self) -> TimingProfile {
        let (ton_delay, ton_rise, ton_max_fault_limit, ton_max_fault_response, toff_delay, toff_fall, toff_max_warn_limit) =
            match self {
                Self::Safe => (250, 100, 50, 0x9B, 5, 20, 30),
                Self::Sequenced => (500, 200, 100, 0xAB, 20, 50, 50),
                Self::Fast => (10, 20, 20, 0xC3, 0, 20, 30),
                Self::Prebias => (250, 150, 50, 0x9B, 10, 80, 100),
            };
        TimingProfile {
            ton_delay,
            ton_rise,
            ton_max_fault_limit,
            ton_max_fault_response,
            toff_delay,
            toff_fall,
            toff_max_warn_limit,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Sequenced => "sequenced",
            Self::Fast => "fast",
            Self::Prebias => "prebias",
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct TimingSetArgs {
    #[arg(long, value_enum)]
    pub profile: Option<Profile>,
    /// Milliseconds; clamped to 0..32767
    #[arg(long, allow_hyphen_values = true)]
    pub ton_delay: Option<i64>,
    #[arg(long, allow_hyphen_values = true)]
    pub ton_rise: Option<i64>,
    #[arg(long, allow_hyphen_values = true)]
    pub ton_max_fault: Option<i64>,
    #[arg(long, allow_hyphen_values = true)]
    pub toff_delay: Option<i64>,
    #[arg(long, allow_hyphen_values = true)]
    pub toff_fall: Option<i64>,
    #[arg(long, allow_hyphen_values = true)]
    pub toff_max_warn: Option<i64>,
    /// Literal TON_MAX_FAULT_RESPONSE byte
    #[arg(long, value_parser = parse_u8, conflicts_with_all = ["fault_response", "retries", "delay_units"])]
    pub fault_byte: Option<u8>,
    /// TON_MAX response mode (ignore, disable-retry, disable-until-cleared, ...)
    #[arg(long)]
    pub fault_response: Option<String>,
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=7))]
    pub retries: Option<u8>,
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=7))]
    pub delay_units: Option<u8>,
}

const WORDS: [(&str, PmbusCommand); 6] = [
    ("TON_DELAY", PmbusCommand::TonDelay),
    ("TON_RISE", PmbusCommand::TonRise),
    ("TON_MAX_FAULT_LIMIT", PmbusCommand::TonMaxFaultLimit),
    ("TOFF_DELAY", PmbusCommand::ToffDelay),
    ("TOFF_FALL", PmbusCommand::ToffFall),
    ("TOFF_MAX_WARN_LIMIT", PmbusCommand::ToffMaxWarnLimit),
];

fn clamp_ms(ms: i64) -> u16 {
    ms.clamp(0, i64::from(MS_MAX)) as u16
}

fn read_word<T: SmbusTransport>(session: &mut Session<T>, cmd: PmbusCommand) -> Result<Value> {
    Ok(json!(session.read_word(cmd)?))
}

fn get<T: SmbusTransport>(session: &mut Session<T>) -> Result<Value> {
    let mut out = json!({});
    for (name, cmd) in WORDS {
        let value = read_word(session, cmd);
        insert_or_warn(&mut out, &format!("{name}_ms"), value)?;
    }
    let fault = session
        .read_byte(PmbusCommand::TonMaxFaultResponse)
        .map(|raw| json!(raw));
    insert_or_warn(&mut out, "TON_MAX_FAULT_RESPONSE", fault)?;
    Ok(out)
}

/// Response byte from `--fault-response/--retries/--delay-units`, if any was given.
fn composed_fault(args: &TimingSetArgs) -> Result<Option<u8>> {
    if args.fault_response.is_none() && args.retries.is_none() && args.delay_units.is_none() {
        return Ok(None);
    }
    let mode = match args.fault_response.as_deref() {
        Some(s) => FaultMode::parse(s)
            .map_err(|e| ValidationError::invalid("--fault-response", format!("'{s}': {e}")))?,
        None => FaultMode::Ignore,
    };
    let response = FaultResponse::new(
        mode,
        Retries::from_bits(args.retries.unwrap_or(0)),
        args.delay_units.unwrap_or(3),
    )?;
    Ok(Some(response.to_raw()))
}

fn set<T: SmbusTransport>(session: &mut Session<T>, args: &TimingSetArgs) -> Result<Value> {
    let fault = match args.fault_byte {
        Some(raw) => Some(raw),
        None => composed_fault(args)?,
    };

    let mut changed = json!({});

    if let Some(profile) = args.profile {
        let p = profile.values();
        session.write_word(PmbusCommand::TonDelay, p.ton_delay)?;
        session.write_word(PmbusCommand::TonRise, p.ton_rise)?;
        session.write_word(PmbusCommand::TonMaxFaultLimit, p.ton_max_fault_limit)?;
        session.write_byte(PmbusCommand::TonMaxFaultResponse, p.ton_max_fault_response)?;
        session.write_word(PmbusCommand::ToffDelay, p.toff_delay)?;
        session.write_word(PmbusCommand::ToffFall, p.toff_fall)?;
        session.write_word(PmbusCommand::ToffMaxWarnLimit, p.toff_max_warn_limit)?;
        changed["profile"] = json!(profile.name());
    }

    let overrides = [
        args.ton_delay,
        args.ton_rise,
        args.ton_max_fault,
        args.toff_delay,
        args.toff_fall,
        args.toff_max_warn,
    ];
    for ((name, cmd), ms) in WORDS.into_iter().zip(overrides) {
        if let Some(ms) = ms {
            let word = clamp_ms(ms);
            session.write_word(cmd, word)?;
            changed[name] = json!(word);
        }
    }

    if let Some(raw) = fault {
        session.write_byte(PmbusCommand::TonMaxFaultResponse, raw)?;
        changed["TON_MAX_FAULT_RESPONSE"] = json!(raw);
    }

    Ok(json!({
        "changed": changed,
        "readback": get(session)?,
    }))
}

pub fn run<T: SmbusTransport>(session: &mut Session<T>, cmd: &TimingCommand) -> Result<Value> {
    match cmd {
        TimingCommand::Get => get(session),
        TimingCommand::Set(args) => set(session, args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::testing::session;
    use crate::pmbus::Family;
    use crate::transport::mock::MockDevice;

    #[test]
    fn test_get_skips_failed_register() {
        let mut dev = MockDevice::new();
        dev.set_word(0x60, 250)
            .set_word(0x61, 100)
            .set_word(0x62, 50)
            .set_byte(0x63, 0x9B)
            .set_word(0x65, 20)
            .set_word(0x66, 30);
        let mut s = session(&mut dev, Family::Bmr685);
        let v = run(&mut s, &TimingCommand::Get).unwrap();
        assert_eq!(
            v,
            json!({
                "TON_DELAY_ms": 250,
                "TON_RISE_ms": 100,
                "TON_MAX_FAULT_LIMIT_ms": 50,
                "TON_MAX_FAULT_RESPONSE": 0x9B,
                "TOFF_FALL_ms": 20,
                "TOFF_MAX_WARN_LIMIT_ms": 30,
            })
        );
    }

    #[test]
    fn test_profile_then_override() {
        let mut dev = MockDevice::new();
        let mut s = session(&mut dev, Family::Bmr685);
        let args = TimingSetArgs {
            profile: Some(Profile::Sequenced),
            ton_rise: Some(40000),
            toff_delay: Some(-5),
            ..Default::default()
        };
        let v = run(&mut s, &TimingCommand::Set(args)).unwrap();
        assert_eq!(
            v["changed"],
            json!({ "profile": "sequenced", "TON_RISE": 32767, "TOFF_DELAY": 0 })
        );
        assert_eq!(v["readback"]["TON_DELAY_ms"], 500);
        assert_eq!(v["readback"]["TON_RISE_ms"], 32767);
        assert_eq!(v["readback"]["TON_MAX_FAULT_RESPONSE"], 0xAB);
        assert_eq!(v["readback"]["TOFF_DELAY_ms"], 0);
        assert_eq!(v["readback"]["TOFF_MAX_WARN_LIMIT_ms"], 50);
    }

    #[test]
    fn test_fault_fields_default_delay() {
        let mut dev = MockDevice::new();
        let mut s = session(&mut dev, Family::Bmr456);
        let args = TimingSetArgs {
            fault_response: Some("disable-retry".into()),
            retries: Some(3),
            ..Default::default()
        };
        let v = run(&mut s, &TimingCommand::Set(args)).unwrap();
        assert_eq!(v["changed"], json!({ "TON_MAX_FAULT_RESPONSE": 0x9B }));
        drop(s);
        assert_eq!(dev.writes(), &[(0x63, vec![0x9B])]);
    }

    #[test]
    fn test_fault_byte_literal() {
        let mut dev = MockDevice::new();
        let mut s = session(&mut dev, Family::Bmr685);
        let args = TimingSetArgs {
            fault_byte: Some(0xC3),
            ..Default::default()
        };
        let v = run(&mut s, &TimingCommand::Set(args)).unwrap();
        assert_eq!(v["changed"]["TON_MAX_FAULT_RESPONSE"], 0xC3);
    }

    #[test]
    fn test_bad_fault_response_writes_nothing() {
        let mut dev = MockDevice::new();
        let mut s = session(&mut dev, Family::Bmr685);
        let args = TimingSetArgs {
            profile: Some(Profile::Safe),
            fault_response: Some("explode".into()),
            ..Default::default()
        };
        assert_eq!(run(&mut s, &TimingCommand::Set(args)).unwrap_err().exit_code(), 2);
        drop(s);
        assert!(dev.writes().is_empty());
    }

    #[test]
    fn test_profiles() {
        assert_eq!(Profile::Fast.values().ton_max_fault_response, 0xC3);
        assert_eq!(Profile::Prebias.values().toff_fall, 80);
        assert_eq!(Profile::Safe.values().toff_delay, 5);
    }
}
