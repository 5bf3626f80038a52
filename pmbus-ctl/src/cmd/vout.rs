//! `vout`, `vin` and `pgood`: voltage set-points and thresholds.

use clap::{Args, Subcommand};
use serde_json::{json, Value};

use super::{insert_or_warn, Session};
use crate::error::{Result, ValidationError};
use crate::parse::{parse_f64, parse_u16};
use crate::pmbus::{linear11, PmbusCommand, VoutMode};
use crate::tracing::prelude::*;
use crate::transport::SmbusTransport;

// ============================================================================
// vout
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum VoutCommand {
    /// Read VOUT_COMMAND and the margins in volts
    Get,
    /// Write VOUT_COMMAND and/or the margins
    Set(VoutSetArgs),
}

#[derive(Args, Debug, Default)]
pub struct VoutSetArgs {
    #[arg(long, value_parser = parse_f64)]
    pub command: Option<f64>,
    #[arg(long, value_parser = parse_f64)]
    pub mhigh: Option<f64>,
    #[arg(long, value_parser = parse_f64)]
    pub mlow: Option<f64>,
    /// Nominal voltage; margins follow from --margin-pct unless given
    #[arg(long, value_parser = parse_f64, requires = "margin_pct")]
    pub set_all: Option<f64>,
    #[arg(long, value_parser = parse_f64)]
    pub margin_pct: Option<f64>,
}

const VOUT_REGS: [(&str, PmbusCommand); 3] = [
    ("VOUT_COMMAND", PmbusCommand::VoutCommand),
    ("VOUT_MARGIN_HIGH", PmbusCommand::VoutMarginHigh),
    ("VOUT_MARGIN_LOW", PmbusCommand::VoutMarginLow),
];

fn read_volts<T: SmbusTransport>(
    session: &mut Session<T>,
    cmd: PmbusCommand,
    mode: VoutMode,
) -> Result<Value> {
    Ok(json!(mode.decode_linear16(session.read_word(cmd)?)))
}

fn vout_readback<T: SmbusTransport>(session: &mut Session<T>, mode: VoutMode) -> Result<Value> {
    let mut out = json!({});
    for (name, cmd) in VOUT_REGS {
        let value = read_volts(session, cmd, mode);
        insert_or_warn(&mut out, &format!("{name}_V"), value)?;
    }
    Ok(out)
}

/// Resolve `--set-all` into the three targets; explicit flags win.
fn vout_targets(args: &VoutSetArgs) -> Result<[Option<f64>; 3]> {
    let mut targets = [args.command, args.mhigh, args.mlow];
    if let Some(nominal) = args.set_all {
        let pct = args.margin_pct.ok_or_else(|| {
            ValidationError::invalid("--margin-pct", "required with --set-all")
        })?;
        let derived = [
            nominal,
            nominal * (1.0 + pct / 100.0),
            nominal * (1.0 - pct / 100.0),
        ];
        for (target, value) in targets.iter_mut().zip(derived) {
            target.get_or_insert(value);
        }
    }
    if targets.iter().all(Option::is_none) {
        return Err(ValidationError::NothingToDo("give --command, --mhigh, --mlow or --set-all").into());
    }
    Ok(targets)
}

pub fn run_vout<T: SmbusTransport>(session: &mut Session<T>, cmd: &VoutCommand) -> Result<Value> {
    match cmd {
        VoutCommand::Get => {
            let mode = session.vout_mode()?;
            let mut out = vout_readback(session, mode)?;
            out["VOUT_MODE_exp"] = json!(mode.exponent());
            Ok(out)
        }
        VoutCommand::Set(args) => {
            let targets = vout_targets(args)?;
            let mode = session.vout_mode()?;

            let mut changed = json!({});
            for ((name, cmd), volts) in VOUT_REGS.into_iter().zip(targets) {
                if let Some(volts) = volts {
                    session.write_word(cmd, mode.encode_linear16(volts))?;
                    changed[format!("{name}_V_set")] = json!(volts);
                }
            }
            Ok(json!({
                "changed": changed,
                "readback": vout_readback(session, mode)?,
            }))
        }
    }
}

// ============================================================================
// vin
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum VinCommand {
    /// Read VIN_ON and VIN_OFF
    Get,
    /// Write VIN_ON and/or VIN_OFF in volts
    Set {
        #[arg(long, value_parser = parse_f64)]
        on: Option<f64>,
        #[arg(long, value_parser = parse_f64)]
        off: Option<f64>,
    },
}

const VIN_REGS: [(&str, PmbusCommand); 2] = [
    ("VIN_ON_V", PmbusCommand::VinOn),
    ("VIN_OFF_V", PmbusCommand::VinOff),
];

fn vin_readback<T: SmbusTransport>(session: &mut Session<T>) -> Result<Value> {
    let mut out = json!({});
    for (key, cmd) in VIN_REGS {
        let value = session.read_linear11(cmd).map(|v| json!(v));
        insert_or_warn(&mut out, key, value)?;
    }
    Ok(out)
}

pub fn run_vin<T: SmbusTransport>(session: &mut Session<T>, cmd: &VinCommand) -> Result<Value> {
    match cmd {
        VinCommand::Get => vin_readback(session),
        VinCommand::Set { on, off } => {
            if on.is_none() && off.is_none() {
                return Err(ValidationError::NothingToDo("give --on or --off").into());
            }
            let mut changed = json!({});
            for ((key, cmd), volts) in VIN_REGS.into_iter().zip([*on, *off]) {
                if let Some(volts) = volts {
                    session.write_word(cmd, linear11::encode(volts))?;
                    changed[key] = json!(volts);
                }
            }
            Ok(json!({
                "changed": changed,
                "readback": vin_readback(session)?,
            }))
        }
    }
}

// ============================================================================
// pgood
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum PgoodCommand {
    /// Read POWER_GOOD_ON and POWER_GOOD_OFF
    Get {
        /// Exponent to scale with instead of VOUT_MODE
        #[arg(long, allow_hyphen_values = true, value_parser = clap::value_parser!(i8).range(-16..=15))]
        exp5: Option<i8>,
        /// Only print raw words
        #[arg(long)]
        raw: bool,
    },
    /// Write the thresholds in volts or as raw words
    Set(PgoodSetArgs),
}

#[derive(Args, Debug, Default)]
pub struct PgoodSetArgs {
    #[arg(long, value_parser = parse_f64, conflicts_with = "on_raw")]
    pub on: Option<f64>,
    #[arg(long, value_parser = parse_f64, conflicts_with = "off_raw")]
    pub off: Option<f64>,
    #[arg(long, value_parser = parse_u16)]
    pub on_raw: Option<u16>,
    #[arg(long, value_parser = parse_u16)]
    pub off_raw: Option<u16>,
    #[arg(long, allow_hyphen_values = true, value_parser = clap::value_parser!(i8).range(-16..=15))]
    pub exp5: Option<i8>,
}

const PGOOD_REGS: [(&str, PmbusCommand); 2] = [
    ("PGOOD_ON", PmbusCommand::PowerGoodOn),
    ("PGOOD_OFF", PmbusCommand::PowerGoodOff),
];

/// `--exp5` if given, otherwise the VOUT_MODE exponent if it can be read.
fn pgood_mode<T: SmbusTransport>(session: &mut Session<T>, exp5: Option<i8>) -> Option<VoutMode> {
    if let Some(exp) = exp5 {
        return Some(VoutMode::linear(exp));
    }
    match session.vout_mode() {
        Ok(mode) => Some(mode),
        Err(e) => {
            warn!("VOUT_MODE unavailable ({}), no exponent", e);
            None
        }
    }
}

fn pgood_get<T: SmbusTransport>(session: &mut Session<T>, exp5: Option<i8>, raw_only: bool) -> Result<Value> {
    let mut out = json!({});
    let mut words = [0u16; 2];
    for ((name, cmd), word) in PGOOD_REGS.into_iter().zip(words.iter_mut()) {
        *word = session.read_word(cmd)?;
        out[format!("{name}_raw")] = json!(*word);
    }
    if !raw_only {
        if let Some(mode) = pgood_mode(session, exp5) {
            for ((name, _), word) in PGOOD_REGS.into_iter().zip(words) {
                out[format!("{name}_V")] = json!(mode.decode_linear16(word));
            }
            out["exp5"] = json!(mode.exponent());
        }
    }
    Ok(out)
}

fn pgood_set<T: SmbusTransport>(session: &mut Session<T>, args: &PgoodSetArgs) -> Result<Value> {
    let volts = [args.on, args.off];
    let raws = [args.on_raw, args.off_raw];
    if volts.iter().all(Option::is_none) && raws.iter().all(Option::is_none) {
        return Err(ValidationError::NothingToDo("give --on, --off, --on-raw or --off-raw").into());
    }

    let mode = if volts.iter().any(Option::is_some) {
        let mode = pgood_mode(session, args.exp5).ok_or_else(|| {
            ValidationError::invalid("--exp5", "required when VOUT_MODE cannot be read")
        })?;
        Some(mode)
    } else {
        args.exp5.map(VoutMode::linear)
    };

    let mut changed = json!({});
    for (i, (name, cmd)) in PGOOD_REGS.into_iter().enumerate() {
        let word = match (volts[i], raws[i], mode) {
            (Some(v), _, Some(mode)) => Some(mode.encode_linear16(v)),
            (_, raw, _) => raw,
        };
        if let Some(word) = word {
            session.write_word(cmd, word)?;
            changed[format!("{name}_raw")] = json!(word);
        }
    }

    let mut readback = json!({});
    for (name, cmd) in PGOOD_REGS {
        let value = session.read_word(cmd).map(|w| json!(w));
        insert_or_warn(&mut readback, &format!("{name}_raw"), value)?;
    }

    let mut out = json!({ "changed": changed, "readback": readback });
    if let Some(mode) = mode {
        out["exp5"] = json!(mode.exponent());
    }
    Ok(out)
}

pub fn run_pgood<T: SmbusTransport>(session: &mut Session<T>, cmd: &PgoodCommand) -> Result<Value> {
    match cmd {
        PgoodCommand::Get { exp5, raw } => pgood_get(session, *exp5, *raw),
        PgoodCommand::Set(args) => pgood_set(session, args),
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
        dev.set_byte(0x20, 0x17)
            .set_word(0x21, 0x0200)
            .set_word(0x25, 0x0219)
            .set_word(0x26, 0x01E6)
            .set_word(0x35, linear11::encode(9.0))
            .set_word(0x36, linear11::encode(8.5))
            .set_word(0x5E, 0x01CD)
            .set_word(0x5F, 0x01B3);
        dev
    }

    #[test]
    fn test_vout_get() {
        let mut dev = device();
        let mut s = session(&mut dev, Family::Bmr685);
        let v = run_vout(&mut s, &VoutCommand::Get).unwrap();
        assert_eq!(v["VOUT_MODE_exp"], -9);
        assert_eq!(v["VOUT_COMMAND_V"], 1.0);
        assert_eq!(v["VOUT_MARGIN_HIGH_V"], 0x0219 as f64 / 512.0);
        assert_eq!(v["VOUT_MARGIN_LOW_V"], 0x01E6 as f64 / 512.0);
    }

    #[test]
    fn test_vout_get_needs_vout_mode() {
        let mut dev = device();
        dev.fail_on(0x20);
        let mut s = session(&mut dev, Family::Bmr685);
        assert_eq!(run_vout(&mut s, &VoutCommand::Get).unwrap_err().exit_code(), 1);
    }

    #[test]
    fn test_vout_set_all_with_override() {
        let mut dev = device();
        let mut s = session(&mut dev, Family::Bmr685);
        let args = VoutSetArgs {
            set_all: Some(1.0),
            margin_pct: Some(5.0),
            mlow: Some(0.9),
            ..Default::default()
        };
        let v = run_vout(&mut s, &VoutCommand::Set(args)).unwrap();
        assert_eq!(v["changed"]["VOUT_COMMAND_V_set"], 1.0);
        assert_eq!(v["changed"]["VOUT_MARGIN_HIGH_V_set"], 1.05);
        assert_eq!(v["changed"]["VOUT_MARGIN_LOW_V_set"], 0.9);
        assert_eq!(v["readback"]["VOUT_COMMAND_V"], 1.0);
        drop(s);
        assert_eq!(dev.word(0x25), Some(538)); // round(1.05 * 512)
        assert_eq!(dev.word(0x26), Some(461)); // round(0.9 * 512)
    }

    #[test]
    fn test_vout_set_all_needs_pct() {
        let mut dev = device();
        let mut s = session(&mut dev, Family::Bmr685);
        let args = VoutSetArgs {
            set_all: Some(1.0),
            ..Default::default()
        };
        assert_eq!(run_vout(&mut s, &VoutCommand::Set(args)).unwrap_err().exit_code(), 2);
        drop(s);
        assert!(dev.writes().is_empty());
    }

    #[test]
    fn test_vin_get_and_set() {
        let mut dev = device();
        let mut s = session(&mut dev, Family::Bmr456);
        let v = run_vin(&mut s, &VinCommand::Get).unwrap();
        assert_eq!(v, json!({ "VIN_ON_V": 9.0, "VIN_OFF_V": 8.5 }));

        let v = run_vin(&mut s, &VinCommand::Set { on: Some(10.0), off: None }).unwrap();
        assert_eq!(v["changed"], json!({ "VIN_ON_V": 10.0 }));
        assert_eq!(v["readback"]["VIN_ON_V"], 10.0);
        assert_eq!(v["readback"]["VIN_OFF_V"], 8.5);
    }

    #[test]
    fn test_pgood_get_scaled_and_raw() {
        let mut dev = device();
        let mut s = session(&mut dev, Family::Bmr685);
        let v = run_pgood(&mut s, &PgoodCommand::Get { exp5: None, raw: false }).unwrap();
        assert_eq!(v["PGOOD_ON_raw"], 0x01CD);
        assert_eq!(v["PGOOD_ON_V"], 0x01CD as f64 / 512.0);
        assert_eq!(v["exp5"], -9);

        let v = run_pgood(&mut s, &PgoodCommand::Get { exp5: None, raw: true }).unwrap();
        assert_eq!(v, json!({ "PGOOD_ON_raw": 0x01CD, "PGOOD_OFF_raw": 0x01B3 }));

        let v = run_pgood(&mut s, &PgoodCommand::Get { exp5: Some(-8), raw: false }).unwrap();
        assert_eq!(v["PGOOD_OFF_V"], 0x01B3 as f64 / 256.0);
    }

    #[test]
    fn test_pgood_set_volts_and_raw() {
        let mut dev = device();
        let mut s = session(&mut dev, Family::Bmr685);
        let args = PgoodSetArgs {
            on: Some(0.9),
            off_raw: Some(0x0190),
            ..Default::default()
        };
        let v = run_pgood(&mut s, &PgoodCommand::Set(args)).unwrap();
        assert_eq!(v["changed"], json!({ "PGOOD_ON_raw": 461, "PGOOD_OFF_raw": 0x0190 }));
        assert_eq!(v["readback"]["PGOOD_ON_raw"], 461);
        assert_eq!(v["exp5"], -9);
    }

    #[test]
    fn test_pgood_set_volts_without_exponent() {
        let mut dev = device();
        dev.fail_on(0x20);
        let mut s = session(&mut dev, Family::Bmr685);
        let args = PgoodSetArgs {
            on: Some(0.9),
            ..Default::default()
        };
        assert_eq!(run_pgood(&mut s, &PgoodCommand::Set(args)).unwrap_err().exit_code(), 2);

        let args = PgoodSetArgs {
            on: Some(0.9),
            exp5: Some(-9),
            ..Default::default()
        };
        let v = run_pgood(&mut s, &PgoodCommand::Set(args)).unwrap();
        assert_eq!(v["changed"]["PGOOD_ON_raw"], 461);
    }
}
