//! Fault response bytes
//!
//! `mode[7:6] | retries[5:3] | delay[2:0]`. The delay selector's unit
//! depends on which limit the response belongs to.

use serde_json::{json, Value};
use strum::{Display, EnumString, FromRepr, IntoStaticStr};

use super::{PMBusError, PmbusCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, Display, EnumString, IntoStaticStr)]
#[repr(u8)]
pub enum FaultMode {
    #[strum(to_string = "ignore")]
    Ignore = 0,
    #[strum(to_string = "delay-then-retry", serialize = "delay-retry")]
    DelayThenRetry = 1,
    #[strum(to_string = "disable-and-retry", serialize = "disable-retry")]
    DisableAndRetry = 2,
    #[strum(
        to_string = "disable-until-clear",
        serialize = "disable-until-cleared",
        serialize = "latchoff"
    )]
    DisableUntilClear = 3,
}

impl FaultMode {
    /// Accepts a mode name, an alias, or the numeric code 0..=3.
    pub fn parse(s: &str) -> Result<Self, PMBusError> {
        if let Ok(mode) = s.parse::<Self>() {
            return Ok(mode);
        }
        s.parse::<u8>()
            .ok()
            .and_then(Self::from_repr)
            .ok_or(PMBusError::InvalidDataFormat)
    }
}

/// Retry count field; 7 means retry forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retries {
    Count(u8),
    Continuous,
}

impl Retries {
    pub const CONTINUOUS: u8 = 7;

    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            Self::CONTINUOUS => Self::Continuous,
            n => Self::Count(n),
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            Self::Count(n) => n & 0x07,
            Self::Continuous => Self::CONTINUOUS,
        }
    }

    /// `0`..`6`, `7`, `cont` or `continuous`.
    pub fn parse(s: &str) -> Result<Self, PMBusError> {
        match s.trim() {
            "cont" | "continuous" => Ok(Self::Continuous),
            other => match other.parse::<u8>() {
                Ok(n) if n <= 7 => Ok(Self::from_bits(n)),
                Ok(_) => Err(PMBusError::ValueOutOfRange),
                Err(_) => Err(PMBusError::InvalidDataFormat),
            },
        }
    }

    pub fn to_json(self) -> Value {
        match self {
            Self::Count(n) => json!(n),
            Self::Continuous => json!("continuous"),
        }
    }
}

/// How the 3-bit delay selector is scaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayUnit {
    /// `2^n` seconds (temperature limits)
    PowerOfTwoSeconds,
    /// `n * 10 ms` (voltage, current and turn-on limits)
    TenMilliseconds,
}

impl DelayUnit {
    /// Delay unit used by the response register `cmd`, if it is one.
    pub fn for_response(cmd: PmbusCommand) -> Option<Self> {
        use PmbusCommand::*;
        match cmd {
            OtFaultResponse | UtFaultResponse => Some(Self::PowerOfTwoSeconds),
            VoutOvFaultResponse | VoutUvFaultResponse | VinOvFaultResponse
            | VinUvFaultResponse | IoutOcFaultResponse | TonMaxFaultResponse => {
                Some(Self::TenMilliseconds)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultResponse {
    pub mode: FaultMode,
    pub retries: Retries,
    pub delay: u8,
}

impl FaultResponse {
    pub fn new(mode: FaultMode, retries: Retries, delay: u8) -> Result<Self, PMBusError> {
        if delay > 7 {
            return Err(PMBusError::ValueOutOfRange);
        }
        if let Retries::Count(n) = retries {
            if n > 7 {
                return Err(PMBusError::ValueOutOfRange);
            }
        }
        Ok(Self { mode, retries, delay })
    }

    pub fn from_raw(raw: u8) -> Self {
        Self {
            mode: FaultMode::from_repr(raw >> 6).unwrap_or(FaultMode::Ignore),
            retries: Retries::from_bits(raw >> 3),
            delay: raw & 0x07,
        }
    }

    pub fn to_raw(&self) -> u8 {
        ((self.mode as u8) << 6) | (self.retries.bits() << 3) | (self.delay & 0x07)
    }

    pub fn to_json(&self, unit: DelayUnit) -> Value {
        let mut v = json!({
            "raw": self.to_raw(),
            "mode": self.mode.to_string(),
            "retries": self.retries.to_json(),
        });
        match unit {
            DelayUnit::PowerOfTwoSeconds => {
                v["delay_unit"] = json!("2^n seconds");
                v["delay_n"] = json!(self.delay);
                v["delay_seconds"] = json!(1u32 << self.delay);
            }
            DelayUnit::TenMilliseconds => {
                v["delay_unit"] = json!("10ms");
                v["delay_ticks"] = json!(self.delay);
                v["delay_ms"] = json!(u32::from(self.delay) * 10);
            }
        }
        v
    }
}

/// Parse a temperature fault delay into its 3-bit exponent.
///
/// Accepted forms: `16s`, `2^4`, `n=4` or `4`. A seconds value must be an
/// exact power of two between 1 and 128.
pub fn parse_temp_delay(s: &str) -> Result<u8, PMBusError> {
    let s = s.trim();

    let n = if let Some(secs) = s.strip_suffix('s') {
        let secs: u32 = secs.trim().parse().map_err(|_| PMBusError::InvalidDataFormat)?;
        if !secs.is_power_of_two() {
            return Err(PMBusError::ValueOutOfRange);
        }
        secs.trailing_zeros()
    } else if let Some(exp) = s.strip_prefix("2^").or_else(|| s.strip_prefix("n=")) {
        exp.trim().parse().map_err(|_| PMBusError::InvalidDataFormat)?
    } else {
        s.parse().map_err(|_| PMBusError::InvalidDataFormat)?
    };

    if n > 7 {
        return Err(PMBusError::ValueOutOfRange);
    }
    Ok(n as u8)
}
