//! `read`: telemetry registers.

use clap::{Args, ValueEnum};
use serde_json::{json, Value};

use super::{insert_or_warn, Session};
use crate::error::Result;
use crate::pmbus::{linear11, PmbusCommand, VoutMode};
use crate::tracing::prelude::*;
use crate::transport::SmbusTransport;

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Which value to read
    #[arg(value_enum, default_value_t = ReadWhat::All)]
    pub what: ReadWhat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadWhat {
    Vin,
    Vout,
    Iout,
    Temp1,
    Temp2,
    Duty,
    Freq,
    All,
}

#[derive(Debug, Clone, Copy)]
enum Encoding {
    Linear11,
    /// Linear16U with the VOUT_MODE exponent
    Vout,
    /// Integer as read
    Raw,
}

const FIELDS: &[(ReadWhat, &str, PmbusCommand, Encoding)] = &[
    (ReadWhat::Vin, "vin_V", PmbusCommand::ReadVin, Encoding::Linear11),
    (ReadWhat::Vout, "vout_V", PmbusCommand::ReadVout, Encoding::Vout),
    (ReadWhat::Iout, "iout_A", PmbusCommand::ReadIout, Encoding::Linear11),
    (ReadWhat::Temp1, "temp1_C", PmbusCommand::ReadTemperature1, Encoding::Linear11),
    (ReadWhat::Temp2, "temp2_C", PmbusCommand::ReadTemperature2, Encoding::Linear11),
    (ReadWhat::Duty, "duty_pct", PmbusCommand::ReadDutyCycle, Encoding::Linear11),
    (ReadWhat::Freq, "freq_khz_raw", PmbusCommand::ReadFrequency, Encoding::Raw),
];

fn read_field<T: SmbusTransport>(
    session: &mut Session<T>,
    cmd: PmbusCommand,
    encoding: Encoding,
    mode: VoutMode,
) -> Result<Value> {
    let raw = session.read_word(cmd)?;
    Ok(match encoding {
        Encoding::Linear11 => json!(linear11::decode(raw)),
        Encoding::Vout => json!(mode.decode_linear16(raw)),
        Encoding::Raw => json!(raw),
    })
}

pub fn run<T: SmbusTransport>(session: &mut Session<T>, args: &ReadArgs) -> Result<Value> {
    let needs_mode = matches!(args.what, ReadWhat::Vout | ReadWhat::All);
    let mode = if needs_mode {
        // A missing VOUT_MODE leaves the exponent at 0.
        session.vout_mode().unwrap_or_else(|e| {
            warn!("VOUT_MODE unavailable ({}), using exponent 0", e);
            VoutMode::new(0)
        })
    } else {
        VoutMode::new(0)
    };

    let mut out = json!({});
    for &(what, key, cmd, encoding) in FIELDS {
        if args.what == ReadWhat::All {
            let value = read_field(session, cmd, encoding, mode);
            insert_or_warn(&mut out, key, value)?;
        } else if args.what == what {
            out[key] = read_field(session, cmd, encoding, mode)?;
        }
    }
    Ok(out)
}
