//! `hrr` (MFR_SPECIAL_OPTIONS) and `multi-pin` (MFR_MULTI_PIN_CONFIG).

use clap::{Args, Subcommand};
use serde_json::{json, Value};

use super::Session;
use crate::error::{Result, ValidationError};
use crate::parse::{parse_bool, parse_u8};
use crate::pmbus::fields::{
    DroopSlope, MultiPinConfig, MultiPinMode, MultiPinUpdate, PgDrive, SpecialOptions,
    SpecialOptionsUpdate,
};
use crate::pmbus::PmbusCommand;
use crate::tracing::prelude::*;
use crate::transport::SmbusTransport;

#[derive(Subcommand, Debug)]
pub enum HrrCommand {
    /// Decode MFR_SPECIAL_OPTIONS
    Get,
    /// Change individual options, or write a raw byte
    Set(HrrSetArgs),
}

#[derive(Args, Debug, Default)]
pub struct HrrSetArgs {
    /// Require PEC on every transaction (on/off)
    #[arg(long, value_parser = parse_bool)]
    pub pec: Option<bool>,
    /// Hybrid regulated ratio (on/off)
    #[arg(long, value_parser = parse_bool)]
    pub hrr: Option<bool>,
    /// Droop slope: linear or nonlinear
    #[arg(long)]
    pub dls: Option<DroopSlope>,
    /// Adaptive ramp-up / dynamic loop compensation (on/off)
    #[arg(long, value_parser = parse_bool)]
    pub artdlc: Option<bool>,
    /// Dynamic bus voltage (on/off)
    #[arg(long, value_parser = parse_bool)]
    pub dbv: Option<bool>,
    #[arg(long, value_parser = parse_u8, conflicts_with_all = ["pec", "hrr", "dls", "artdlc", "dbv"])]
    pub raw: Option<u8>,
}

impl HrrSetArgs {
    fn update(&self) -> Option<SpecialOptionsUpdate> {
        let update = SpecialOptionsUpdate {
            require_pec: self.pec,
            hrr: self.hrr,
            dls: self.dls,
            artdlc: self.artdlc,
            dbv: self.dbv,
        };
        let any = update.require_pec.is_some()
            || update.hrr.is_some()
            || update.dls.is_some()
            || update.artdlc.is_some()
            || update.dbv.is_some();
        any.then_some(update)
    }
}

pub fn run_hrr<T: SmbusTransport>(session: &mut Session<T>, cmd: &HrrCommand) -> Result<Value> {
    match cmd {
        HrrCommand::Get => {
            let raw = session.read_byte(PmbusCommand::MfrSpecialOptions)?;
            Ok(SpecialOptions::from_raw(raw).to_json())
        }
        HrrCommand::Set(args) => {
            let update = args.update();
            if update.is_none() && args.raw.is_none() {
                return Err(ValidationError::NothingToDo(
                    "give --pec, --hrr, --dls, --artdlc, --dbv or --raw",
                )
                .into());
            }

            let current = session.read_byte(PmbusCommand::MfrSpecialOptions)?;
            let next = match (args.raw, update) {
                (Some(raw), _) => raw,
                (None, Some(update)) => update.apply(SpecialOptions::from_raw(current)).to_raw(),
                (None, None) => current,
            };
            let changed = next != current;
            if changed {
                if next & 0x80 != 0 && current & 0x80 == 0 {
                    warn!("Enabling require-PEC; later transactions without PEC will be rejected");
                }
                session.write_byte(PmbusCommand::MfrSpecialOptions, next)?;
            } else {
                debug!("MFR_SPECIAL_OPTIONS already 0x{:02X}, not writing", current);
            }

            let mut out = SpecialOptions::from_raw(session.read_byte(PmbusCommand::MfrSpecialOptions)?).to_json();
            out["changed"] = json!(changed);
            Ok(out)
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum MultiPinCommand {
    /// Decode MFR_MULTI_PIN_CONFIG
    Get,
    /// Change mode and power-good pin behaviour
    Set(MultiPinSetArgs),
}

#[derive(Args, Debug, Default)]
pub struct MultiPinSetArgs {
    /// standalone, slave, dls or master
    #[arg(long)]
    pub mode: Option<MultiPinMode>,
    /// Power-good drive when active: pushpull or highz
    #[arg(long)]
    pub pg: Option<PgDrive>,
    #[arg(long, value_parser = parse_bool)]
    pub pg_enable: Option<bool>,
    #[arg(long, value_parser = parse_bool)]
    pub sec_rc_pull: Option<bool>,
}

pub fn run_multi_pin<T: SmbusTransport>(session: &mut Session<T>, cmd: &MultiPinCommand) -> Result<Value> {
    match cmd {
        MultiPinCommand::Get => {
            let raw = session.read_byte(PmbusCommand::MfrMultiPinConfig)?;
            Ok(MultiPinConfig::from_raw(raw).to_json())
        }
        MultiPinCommand::Set(args) => {
            let update = MultiPinUpdate {
                mode: args.mode,
                pg: args.pg,
                pg_enable: args.pg_enable,
                sec_rc_pull: args.sec_rc_pull,
            };
            if update.is_empty() {
                return Err(ValidationError::NothingToDo(
                    "give --mode, --pg, --pg-enable or --sec-rc-pull",
                )
                .into());
            }
            let current = MultiPinConfig::from_raw(session.read_byte(PmbusCommand::MfrMultiPinConfig)?);
            let next = update.apply(current);
            session.write_byte(PmbusCommand::MfrMultiPinConfig, next.to_raw())?;

            let readback = MultiPinConfig::from_raw(session.read_byte(PmbusCommand::MfrMultiPinConfig)?);
            Ok(json!({
                "changed": next.to_json(),
                "readback": readback.to_json(),
            }))
        }
    }
}
