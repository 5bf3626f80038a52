//! PMBus Protocol Support
//!
//! Register map and value codecs for Flex BMR4xx/BMR6xx power modules.
//! The register map is the single source of truth for command codes,
//! transfer widths, access direction and which device families implement
//! a register.
//!
//! PMBus is a variant of SMBus with extensions for power management.
//! Specification: <https://pmbus.org/specification-documents/>

use bitflags::bitflags;
use serde_json::{json, Value};
use std::fmt;
use strum::{Display, EnumString, IntoStaticStr};
use thiserror::Error;

pub mod fault;
pub mod fields;
pub mod linear;
pub mod status;

pub use linear::{linear11, linear16u, Linear11, Linear16, VoutMode};

// ============================================================================
// Constants
// ============================================================================

/// Largest SMBus block transfer.
pub const BLOCK_MAX: usize = 255;

/// Length of the identification strings (MFR_ID .. MFR_SERIAL).
pub const ID_BLOCK_MAX: usize = 32;

// ============================================================================
// Device Families
// ============================================================================

/// Supported module families. Vendor registers in 0xC0..=0xFF differ
/// between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Family {
    Bmr685,
    Bmr456,
}

impl Family {
    pub fn flag(self) -> Families {
        match self {
            Self::Bmr685 => Families::BMR685,
            Self::Bmr456 => Families::BMR456,
        }
    }

    /// Guess the family from the MFR_MODEL string.
    pub fn from_model(model: &str) -> Self {
        if model.trim_start().to_ascii_uppercase().starts_with("BMR456") {
            Self::Bmr456
        } else {
            Self::Bmr685
        }
    }

    /// Block payload that MFR_RESTART expects.
    pub fn restart_magic(self) -> &'static [u8] {
        match self {
            Self::Bmr685 => b"ERIC",
            Self::Bmr456 => b"00000000",
        }
    }

    /// Whether STORE/RESTORE commands are sent as a bare command code.
    /// The legacy family wants a write-byte with a dummy 0x01 instead.
    pub fn store_is_send_byte(self) -> bool {
        matches!(self, Self::Bmr685)
    }
}

bitflags! {
    /// Set of families implementing a register
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Families: u8 {
        const BMR685 = 0x01;
        const BMR456 = 0x02;
        const ALL = Self::BMR685.bits() | Self::BMR456.bits();
    }
}

// ============================================================================
// Register Metadata
// ============================================================================

/// Transfer width of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    /// Command code only, no data
    Send,
    Byte,
    Word,
    /// SMBus block with a maximum length
    Block(usize),
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Width::Send => write!(f, "send"),
            Width::Byte => write!(f, "byte"),
            Width::Word => write!(f, "word"),
            Width::Block(max) => write!(f, "block({max})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Access {
    #[strum(to_string = "ro")]
    ReadOnly,
    #[strum(to_string = "rw")]
    ReadWrite,
    #[strum(to_string = "wo")]
    WriteOnly,
    #[strum(to_string = "send")]
    SendOnly,
}

impl Access {
    pub fn readable(self) -> bool {
        matches!(self, Self::ReadOnly | Self::ReadWrite)
    }

    pub fn writable(self) -> bool {
        matches!(self, Self::ReadWrite | Self::WriteOnly)
    }
}

/// One entry of the register map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    pub code: u8,
    pub name: &'static str,
    pub width: Width,
    pub access: Access,
    pub families: Families,
    pub description: &'static str,
}

impl Register {
    pub fn supported_by(&self, family: Family) -> bool {
        self.families.contains(family.flag())
    }

    pub fn to_json(&self) -> Value {
        let families: Vec<&'static str> = [Family::Bmr685, Family::Bmr456]
            .into_iter()
            .filter(|f| self.supported_by(*f))
            .map(Into::into)
            .collect();
        json!({
            "code": format!("0x{:02X}", self.code),
            "width": self.width.to_string(),
            "access": self.access.to_string(),
            "families": families,
            "description": self.description,
        })
    }
}

// ============================================================================
// PMBus Commands
// ============================================================================

/// Macro to define PMBus commands with metadata in one place
macro_rules! define_pmbus_commands {
    (
        $(
            $variant:ident = $value:literal,
            $name:literal,
            $width:expr,
            $access:ident,
            $families:ident,
            $desc:literal
        ),* $(,)?
    ) => {
        /// PMBus standard and vendor command codes
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum PmbusCommand {
            $(
                $variant = $value,
            )*
        }

        impl PmbusCommand {
            /// Every command, in register-code order
            pub const ALL: &'static [PmbusCommand] = &[
                $(
                    PmbusCommand::$variant,
                )*
            ];

            /// Register map entry for this command
            pub fn register(self) -> Register {
                match self {
                    $(
                        Self::$variant => Register {
                            code: $value,
                            name: $name,
                            width: $width,
                            access: Access::$access,
                            families: Families::$families,
                            description: $desc,
                        },
                    )*
                }
            }

            /// Get the command name as a string
            pub fn name(self) -> &'static str {
                self.register().name
            }

            /// Convert to u8 command code
            pub fn as_u8(self) -> u8 {
                self as u8
            }
        }

        impl fmt::Display for PmbusCommand {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.name())
            }
        }

        impl TryFrom<u8> for PmbusCommand {
            type Error = PMBusError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $(
                        $value => Ok(Self::$variant),
                    )*
                    _ => Err(PMBusError::CommandNotSupported(value)),
                }
            }
        }

        impl From<PmbusCommand> for u8 {
            fn from(cmd: PmbusCommand) -> Self {
                cmd.as_u8()
            }
        }
    };
}

define_pmbus_commands! {
    Operation = 0x01, "OPERATION", Width::Byte, ReadWrite, ALL, "on/off and margin control",
    OnOffConfig = 0x02, "ON_OFF_CONFIG", Width::Byte, ReadWrite, ALL, "on/off source configuration",
    ClearFaults = 0x03, "CLEAR_FAULTS", Width::Send, SendOnly, ALL, "clear all fault status bits",
    WriteProtect = 0x10, "WRITE_PROTECT", Width::Byte, ReadWrite, ALL, "write protection level",
    StoreDefaultAll = 0x11, "STORE_DEFAULT_ALL", Width::Send, SendOnly, ALL, "store all to default NVM",
    RestoreDefaultAll = 0x12, "RESTORE_DEFAULT_ALL", Width::Send, SendOnly, ALL, "restore all from default NVM",
    StoreUserAll = 0x15, "STORE_USER_ALL", Width::Send, SendOnly, ALL, "store all to user NVM",
    RestoreUserAll = 0x16, "RESTORE_USER_ALL", Width::Send, SendOnly, ALL, "restore all from user NVM",
    Capability = 0x19, "CAPABILITY", Width::Byte, ReadOnly, ALL, "device capability",
    SmbalertMask = 0x1B, "SMBALERT_MASK", Width::Byte, ReadWrite, ALL, "SMBALERT# mask",
    VoutMode = 0x20, "VOUT_MODE", Width::Byte, ReadOnly, ALL, "output voltage data format",
    VoutCommand = 0x21, "VOUT_COMMAND", Width::Word, ReadWrite, ALL, "commanded output voltage",
    VoutMax = 0x24, "VOUT_MAX", Width::Word, ReadWrite, ALL, "maximum output voltage",
    VoutMarginHigh = 0x25, "VOUT_MARGIN_HIGH", Width::Word, ReadWrite, ALL, "margin high voltage",
    VoutMarginLow = 0x26, "VOUT_MARGIN_LOW", Width::Word, ReadWrite, ALL, "margin low voltage",
    FrequencySwitch = 0x33, "FREQUENCY_SWITCH", Width::Word, ReadWrite, ALL, "switching frequency",
    VinOn = 0x35, "VIN_ON", Width::Word, ReadWrite, ALL, "input turn-on voltage",
    VinOff = 0x36, "VIN_OFF", Width::Word, ReadWrite, ALL, "input turn-off voltage",
    Interleave = 0x37, "INTERLEAVE", Width::Byte, ReadWrite, ALL, "phase interleave configuration",
    VoutOvFaultLimit = 0x40, "VOUT_OV_FAULT_LIMIT", Width::Word, ReadWrite, ALL, "output overvoltage fault limit",
    VoutOvFaultResponse = 0x41, "VOUT_OV_FAULT_RESPONSE", Width::Byte, ReadWrite, ALL, "output overvoltage fault response",
    VoutOvWarnLimit = 0x42, "VOUT_OV_WARN_LIMIT", Width::Word, ReadWrite, ALL, "output overvoltage warning limit",
    VoutUvWarnLimit = 0x43, "VOUT_UV_WARN_LIMIT", Width::Word, ReadWrite, ALL, "output undervoltage warning limit",
    VoutUvFaultLimit = 0x44, "VOUT_UV_FAULT_LIMIT", Width::Word, ReadWrite, ALL, "output undervoltage fault limit",
    VoutUvFaultResponse = 0x45, "VOUT_UV_FAULT_RESPONSE", Width::Byte, ReadWrite, ALL, "output undervoltage fault response",
    IoutOcFaultLimit = 0x46, "IOUT_OC_FAULT_LIMIT", Width::Word, ReadWrite, ALL, "output overcurrent fault limit",
    IoutOcFaultResponse = 0x47, "IOUT_OC_FAULT_RESPONSE", Width::Byte, ReadWrite, ALL, "output overcurrent fault response",
    IoutOcWarnLimit = 0x4A, "IOUT_OC_WARN_LIMIT", Width::Word, ReadWrite, ALL, "output overcurrent warning limit",
    OtFaultLimit = 0x4F, "OT_FAULT_LIMIT", Width::Word, ReadWrite, ALL, "overtemperature fault limit",
    OtFaultResponse = 0x50, "OT_FAULT_RESPONSE", Width::Byte, ReadWrite, ALL, "overtemperature fault response",
    OtWarnLimit = 0x51, "OT_WARN_LIMIT", Width::Word, ReadWrite, ALL, "overtemperature warning limit",
    UtWarnLimit = 0x52, "UT_WARN_LIMIT", Width::Word, ReadWrite, ALL, "undertemperature warning limit",
    UtFaultLimit = 0x53, "UT_FAULT_LIMIT", Width::Word, ReadWrite, ALL, "undertemperature fault limit",
    UtFaultResponse = 0x54, "UT_FAULT_RESPONSE", Width::Byte, ReadWrite, ALL, "undertemperature fault response",
    VinOvFaultLimit = 0x55, "VIN_OV_FAULT_LIMIT", Width::Word, ReadWrite, ALL, "input overvoltage fault limit",
    VinOvFaultResponse = 0x56, "VIN_OV_FAULT_RESPONSE", Width::Byte, ReadWrite, ALL, "input overvoltage fault response",
    VinOvWarnLimit = 0x57, "VIN_OV_WARN_LIMIT", Width::Word, ReadWrite, ALL, "input overvoltage warning limit",
    VinUvWarnLimit = 0x58, "VIN_UV_WARN_LIMIT", Width::Word, ReadWrite, ALL, "input undervoltage warning limit",
    VinUvFaultLimit = 0x59, "VIN_UV_FAULT_LIMIT", Width::Word, ReadWrite, ALL, "input undervoltage fault limit",
    VinUvFaultResponse = 0x5A, "VIN_UV_FAULT_RESPONSE", Width::Byte, ReadWrite, ALL, "input undervoltage fault response",
    PowerGoodOn = 0x5E, "POWER_GOOD_ON", Width::Word, ReadWrite, ALL, "power good assert threshold",
    PowerGoodOff = 0x5F, "POWER_GOOD_OFF", Width::Word, ReadWrite, ALL, "power good deassert threshold",
    TonDelay = 0x60, "TON_DELAY", Width::Word, ReadWrite, ALL, "turn-on delay",
    TonRise = 0x61, "TON_RISE", Width::Word, ReadWrite, ALL, "turn-on rise time",
    TonMaxFaultLimit = 0x62, "TON_MAX_FAULT_LIMIT", Width::Word, ReadWrite, ALL, "maximum turn-on time limit",
    TonMaxFaultResponse = 0x63, "TON_MAX_FAULT_RESPONSE", Width::Byte, ReadWrite, ALL, "maximum turn-on fault response",
    ToffDelay = 0x64, "TOFF_DELAY", Width::Word, ReadWrite, ALL, "turn-off delay",
    ToffFall = 0x65, "TOFF_FALL", Width::Word, ReadWrite, ALL, "turn-off fall time",
    ToffMaxWarnLimit = 0x66, "TOFF_MAX_WARN_LIMIT", Width::Word, ReadWrite, ALL, "maximum turn-off time warning",
    StatusByte = 0x78, "STATUS_BYTE", Width::Byte, ReadOnly, ALL, "status summary byte",
    StatusWord = 0x79, "STATUS_WORD", Width::Word, ReadOnly, ALL, "status summary",
    StatusVout = 0x7A, "STATUS_VOUT", Width::Byte, ReadOnly, ALL, "output voltage status",
    StatusIout = 0x7B, "STATUS_IOUT", Width::Byte, ReadOnly, ALL, "output current status",
    StatusInput = 0x7C, "STATUS_INPUT", Width::Byte, ReadOnly, ALL, "input status",
    StatusTemperature = 0x7D, "STATUS_TEMPERATURE", Width::Byte, ReadOnly, ALL, "temperature status",
    StatusCml = 0x7E, "STATUS_CML", Width::Byte, ReadOnly, ALL, "communication/logic/memory status",
    ReadVin = 0x88, "READ_VIN", Width::Word, ReadOnly, ALL, "input voltage",
    ReadVout = 0x8B, "READ_VOUT", Width::Word, ReadOnly, ALL, "output voltage",
    ReadIout = 0x8C, "READ_IOUT", Width::Word, ReadOnly, ALL, "output current",
    ReadTemperature1 = 0x8D, "READ_TEMPERATURE_1", Width::Word, ReadOnly, ALL, "temperature 1",
    ReadTemperature2 = 0x8E, "READ_TEMPERATURE_2", Width::Word, ReadOnly, ALL, "temperature 2",
    ReadTemperature3 = 0x8F, "READ_TEMPERATURE_3", Width::Word, ReadOnly, ALL, "temperature 3",
    ReadDutyCycle = 0x94, "READ_DUTY_CYCLE", Width::Word, ReadOnly, ALL, "duty cycle",
    ReadFrequency = 0x95, "READ_FREQUENCY", Width::Word, ReadOnly, ALL, "switching frequency",
    PmbusRevision = 0x98, "PMBUS_REVISION", Width::Byte, ReadOnly, ALL, "PMBus revision",
    MfrId = 0x99, "MFR_ID", Width::Block(ID_BLOCK_MAX), ReadOnly, ALL, "manufacturer ID",
    MfrModel = 0x9A, "MFR_MODEL", Width::Block(ID_BLOCK_MAX), ReadOnly, ALL, "manufacturer model",
    MfrRevision = 0x9B, "MFR_REVISION", Width::Block(ID_BLOCK_MAX), ReadOnly, ALL, "manufacturer revision",
    MfrLocation = 0x9C, "MFR_LOCATION", Width::Block(ID_BLOCK_MAX), ReadOnly, ALL, "manufacturing location",
    MfrDate = 0x9D, "MFR_DATE", Width::Block(ID_BLOCK_MAX), ReadOnly, ALL, "manufacturing date",
    MfrSerial = 0x9E, "MFR_SERIAL", Width::Block(ID_BLOCK_MAX), ReadOnly, ALL, "serial number",
    MfrUserData00 = 0xB0, "MFR_USER_DATA_00", Width::Block(64), ReadWrite, ALL, "user data scratch block",
    MfrVinOvWarnResponse = 0xC4, "MFR_VIN_OV_WARN_RESPONSE", Width::Byte, ReadWrite, BMR685, "input overvoltage warning response",
    MfrFastVinOffOffset = 0xC8, "MFR_FAST_VIN_OFF_OFFSET", Width::Word, ReadWrite, BMR685, "fast VIN off offset",
    MfrPgoodPolarity = 0xD0, "MFR_PGOOD_POLARITY", Width::Byte, ReadWrite, ALL, "power good pin polarity",
    MfrFastOcpCfg = 0xD1, "MFR_FAST_OCP_CFG", Width::Word, ReadWrite, ALL, "fast overcurrent protection",
    MfrResponseUnitCfg = 0xD2, "MFR_RESPONSE_UNIT_CFG", Width::Byte, ReadWrite, ALL, "fault response time unit",
    MfrVinScaleMonitor = 0xD3, "MFR_VIN_SCALE_MONITOR", Width::Word, ReadWrite, ALL, "input voltage monitor scale",
    MfrSnapshotCyclesSelect = 0xD5, "MFR_SNAPSHOT_CYCLES_SELECT", Width::Byte, ReadWrite, ALL, "snapshot cycle selector",
    MfrGetSnapshot = 0xD7, "MFR_GET_SNAPSHOT", Width::Block(64), ReadOnly, ALL, "parametric snapshot",
    MfrTempCompensation = 0xD8, "MFR_TEMP_COMPENSATION", Width::Word, ReadWrite, ALL, "temperature compensation",
    MfrSetRomMode = 0xD9, "MFR_SET_ROM_MODE", Width::Byte, WriteOnly, ALL, "enter boot ROM",
    MfrGetRampData = 0xDB, "MFR_GET_RAMP_DATA", Width::Block(BLOCK_MAX), ReadOnly, BMR685, "ramp-up data log",
    MfrSelectTemperatureSensor = 0xDC, "MFR_SELECT_TEMPERATURE_SENSOR", Width::Byte, ReadWrite, ALL, "temperature sensor selection",
    MfrVinOffset = 0xDD, "MFR_VIN_OFFSET", Width::Word, ReadWrite, ALL, "input voltage offset",
    MfrVoutOffsetMonitor = 0xDE, "MFR_VOUT_OFFSET_MONITOR", Width::Word, ReadWrite, ALL, "output voltage monitor offset",
    MfrGetStatusData = 0xDF, "MFR_GET_STATUS_DATA", Width::Block(BLOCK_MAX), ReadOnly, BMR685, "status data log",
    MfrSpecialOptions = 0xE0, "MFR_SPECIAL_OPTIONS", Width::Byte, ReadWrite, ALL, "PEC, HRR, droop and DBV options",
    MfrTempOffsetInt = 0xE1, "MFR_TEMP_OFFSET_INT", Width::Word, ReadWrite, ALL, "internal temperature offset",
    MfrRemoteTempCal = 0xE2, "MFR_REMOTE_TEMP_CAL", Width::Word, ReadWrite, ALL, "remote temperature calibration",
    MfrRemoteCtrl = 0xE3, "MFR_REMOTE_CTRL", Width::Byte, ReadWrite, ALL, "remote control pin configuration",
    MfrTempCoeff = 0xE7, "MFR_TEMP_COEFF", Width::Word, ReadWrite, ALL, "temperature coefficient",
    MfrFilterCoeff = 0xE8, "MFR_FILTER_COEFF", Width::Word, ReadWrite, ALL, "telemetry filter coefficient",
    MfrMinDuty = 0xEB, "MFR_MIN_DUTY", Width::Word, ReadWrite, ALL, "minimum duty cycle",
    MfrOffsetAddress = 0xEE, "MFR_OFFSET_ADDRESS", Width::Byte, ReadWrite, ALL, "PMBus address offset",
    MfrSetupPassword = 0xF1, "MFR_SETUP_PASSWORD", Width::Block(4), WriteOnly, ALL, "setup password",
    MfrSecurityBitMask = 0xF4, "MFR_SECURITY_BIT_MASK", Width::Block(32), ReadWrite, ALL, "command security mask",
    MfrIlimSoftstart = 0xF8, "MFR_ILIM_SOFTSTART", Width::Byte, ReadWrite, ALL, "current limit during soft start",
    MfrMultiPinConfig = 0xF9, "MFR_MULTI_PIN_CONFIG", Width::Byte, ReadWrite, ALL, "multi-pin and paralleling configuration",
    MfrFirmwareData = 0xFD, "MFR_FIRMWARE_DATA", Width::Block(32), ReadOnly, ALL, "firmware identification blob",
    MfrRestart = 0xFE, "MFR_RESTART", Width::Block(8), WriteOnly, ALL, "restart the module",
}

impl std::str::FromStr for PmbusCommand {
    type Err = PMBusError;

    /// Accepts a register name (`READ_VOUT`, case-insensitive) or a code
    /// (`0x8B`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            let code = u8::from_str_radix(hex, 16).map_err(|_| PMBusError::InvalidDataFormat)?;
            return Self::try_from(code);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|cmd| cmd.name().eq_ignore_ascii_case(s))
            .ok_or(PMBusError::InvalidDataFormat)
    }
}

/// Register map as JSON, optionally limited to one family.
pub fn register_map_json(family: Option<Family>) -> Value {
    let map = PmbusCommand::ALL
        .iter()
        .map(|cmd| cmd.register())
        .filter(|reg| family.map_or(true, |f| reg.supported_by(f)))
        .map(|reg| (reg.name.to_string(), reg.to_json()))
        .collect();
    Value::Object(map)
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum PMBusError {
    #[error("Invalid data format")]
    InvalidDataFormat,
    #[error("Value out of range")]
    ValueOutOfRange,
    #[error("Command 0x{0:02X} not supported")]
    CommandNotSupported(u8),
    #[error("{register} is not available on {family}")]
    UnsupportedOnFamily {
        register: &'static str,
        family: Family,
    },
    #[error("{register} does not support {op}")]
    AccessViolation {
        register: &'static str,
        op: &'static str,
    },
    #[error("{0} is not part of this device's register layout")]
    FieldNotInSchema(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_command_codes_are_unique_and_sorted() {
        let codes: Vec<u8> = PmbusCommand::ALL.iter().map(|c| c.as_u8()).collect();
        let unique: HashSet<u8> = codes.iter().copied().collect();
        assert_eq!(unique.len(), codes.len());
        assert!(codes.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_register_metadata_matches_variant() {
        for cmd in PmbusCommand::ALL {
            let reg = cmd.register();
            assert_eq!(reg.code, cmd.as_u8());
            assert_eq!(PmbusCommand::try_from(reg.code).unwrap(), *cmd);
            assert!(!reg.families.is_empty(), "{} has no family", reg.name);
            if let Width::Block(max) = reg.width {
                assert!(max > 0 && max <= BLOCK_MAX);
            }
            if reg.width == Width::Send {
                assert_eq!(reg.access, Access::SendOnly);
            }
        }
    }

    #[test]
    fn test_command_lookup() {
        assert_eq!(PmbusCommand::ReadVout.name(), "READ_VOUT");
        assert_eq!(format!("{}", PmbusCommand::StatusCml), "STATUS_CML");
        assert_eq!("read_vout".parse::<PmbusCommand>().unwrap(), PmbusCommand::ReadVout);
        assert_eq!("0x8B".parse::<PmbusCommand>().unwrap(), PmbusCommand::ReadVout);
        assert!(matches!(
            PmbusCommand::try_from(0x04),
            Err(PMBusError::CommandNotSupported(0x04))
        ));
        assert!("NOT_A_REGISTER".parse::<PmbusCommand>().is_err());
    }

    #[test]
    fn test_family_availability() {
        let ramp = PmbusCommand::MfrGetRampData.register();
        assert!(ramp.supported_by(Family::Bmr685));
        assert!(!ramp.supported_by(Family::Bmr456));
        assert_eq!(ramp.width, Width::Block(255));

        for cmd in [
            PmbusCommand::MfrVinOvWarnResponse,
            PmbusCommand::MfrFastVinOffOffset,
            PmbusCommand::MfrGetStatusData,
        ] {
            assert!(!cmd.register().supported_by(Family::Bmr456));
        }
        assert!(PmbusCommand::MfrSpecialOptions.register().supported_by(Family::Bmr456));
    }

    #[test]
    fn test_family_from_model() {
        assert_eq!(Family::from_model("BMR4560002/851"), Family::Bmr456);
        assert_eq!(Family::from_model("bmr456"), Family::Bmr456);
        assert_eq!(Family::from_model("BMR6850000/001"), Family::Bmr685);
        assert_eq!(Family::from_model(""), Family::Bmr685);
        assert_eq!("bmr456".parse::<Family>().unwrap(), Family::Bmr456);
        assert_eq!(Family::Bmr685.to_string(), "bmr685");
    }

    #[test]
    fn test_family_payloads() {
        assert_eq!(Family::Bmr685.restart_magic(), b"ERIC");
        assert_eq!(Family::Bmr456.restart_magic().len(), 8);
        assert!(Family::Bmr685.store_is_send_byte());
        assert!(!Family::Bmr456.store_is_send_byte());
    }

    #[test]
    fn test_register_map_json() {
        let all = register_map_json(None);
        let legacy = register_map_json(Some(Family::Bmr456));
        assert_eq!(all.as_object().unwrap().len(), PmbusCommand::ALL.len());
        assert!(legacy.get("MFR_GET_RAMP_DATA").is_none());
        assert_eq!(all["READ_VOUT"]["code"], "0x8B");
        assert_eq!(all["READ_VOUT"]["access"], "ro");
        assert_eq!(all["MFR_USER_DATA_00"]["width"], "block(64)");
        assert_eq!(all["MFR_GET_STATUS_DATA"]["families"], json!(["bmr685"]));
    }
}
