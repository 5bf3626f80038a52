//! Status register decoding
//!
//! Every status register is described by a [`BitTable`]: a list of
//! `(name, bit)` pairs. One generic decoder turns a raw value into named
//! flags and one generic encoder turns them back. Bits that no table entry
//! names are kept as a numeric `reserved_bits` residue so nothing is dropped.

use serde_json::{json, Map, Value};

use super::PmbusCommand;

/// One named bit of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    pub name: &'static str,
    pub bit: u8,
    /// Short human-readable reason, used where a register decodes to a list.
    pub reason: &'static str,
}

/// Field layout of a byte- or word-wide register.
#[derive(Debug, Clone, Copy)]
pub struct BitTable {
    pub register: &'static str,
    pub width: u8,
    pub fields: &'static [BitField],
}

macro_rules! bit_table {
    ($register:literal, $width:literal, {
        $($name:literal => $bit:literal, $reason:literal),* $(,)?
    }) => {
        BitTable {
            register: $register,
            width: $width,
            fields: &[
                $(BitField { name: $name, bit: $bit, reason: $reason },)*
            ],
        }
    };
}

pub const STATUS_BYTE: BitTable = bit_table!("STATUS_BYTE", 8, {
    "BUSY" => 7, "device busy",
    "OFF" => 6, "output off",
    "VOUT_OV" => 5, "output overvoltage fault",
    "IOUT_OC" => 4, "output overcurrent fault",
    "VIN_UV" => 3, "input undervoltage fault",
    "TEMPERATURE" => 2, "temperature fault/warning",
    "CML" => 1, "communication/memory/logic fault",
    "OTHER" => 0, "other fault",
});

// The low byte mirrors STATUS_BYTE; the high-byte OTHER bit is renamed so
// the two stay distinct in a flat object.
pub const STATUS_WORD: BitTable = bit_table!("STATUS_WORD", 16, {
    "VOUT" => 15, "output voltage fault/warning",
    "IOUT_POUT" => 14, "output current/power fault/warning",
    "INPUT" => 13, "input fault/warning",
    "MFR_SPECIFIC" => 12, "manufacturer specific",
    "POWER_GOOD" => 11, "power good negated",
    "FANS" => 10, "fan fault/warning",
    "OTHER_HIGH" => 9, "other fault/warning",
    "UNKNOWN" => 8, "unknown fault/warning",
    "BUSY" => 7, "device busy",
    "OFF" => 6, "output off",
    "VOUT_OV" => 5, "output overvoltage fault",
    "IOUT_OC" => 4, "output overcurrent fault",
    "VIN_UV" => 3, "input undervoltage fault",
    "TEMPERATURE" => 2, "temperature fault/warning",
    "CML" => 1, "communication/memory/logic fault",
    "OTHER" => 0, "other fault",
});

pub const STATUS_VOUT: BitTable = bit_table!("STATUS_VOUT", 8, {
    "VOUT_OV_FAULT" => 7, "overvoltage fault",
    "VOUT_OV_WARN" => 6, "overvoltage warning",
    "VOUT_UV_WARN" => 5, "undervoltage warning",
    "VOUT_UV_FAULT" => 4, "undervoltage fault",
    "VOUT_MAX_WARN" => 3, "VOUT_MAX warning",
    "TON_MAX_FAULT" => 2, "TON_MAX fault",
    "TOFF_MAX_WARN" => 1, "TOFF_MAX warning",
    "OTHER" => 0, "other",
});

pub const STATUS_IOUT: BitTable = bit_table!("STATUS_IOUT", 8, {
    "IOUT_OC_FAULT" => 7, "overcurrent fault",
    "IOUT_OC_LV_FAULT" => 6, "overcurrent and low voltage fault",
    "IOUT_OC_WARN" => 5, "overcurrent warning",
    "IOUT_UC_FAULT" => 4, "undercurrent fault",
});

pub const STATUS_INPUT: BitTable = bit_table!("STATUS_INPUT", 8, {
    "VIN_OV_FAULT" => 7, "input overvoltage fault",
    "VIN_OV_WARN" => 6, "input overvoltage warning",
    "VIN_UV_WARN" => 5, "input undervoltage warning",
    "VIN_UV_FAULT" => 4, "input undervoltage fault",
    "INSUFFICIENT_VIN" => 3, "unit off for insufficient input voltage",
});

pub const STATUS_TEMPERATURE: BitTable = bit_table!("STATUS_TEMPERATURE", 8, {
    "OT_FAULT" => 7, "overtemperature fault",
    "OT_WARN" => 6, "overtemperature warning",
    "UT_WARN" => 5, "undertemperature warning",
    "UT_FAULT" => 4, "undertemperature fault",
});

pub const STATUS_CML: BitTable = bit_table!("STATUS_CML", 8, {
    "INVALID_COMMAND" => 7, "invalid or unsupported command",
    "INVALID_DATA" => 6, "invalid or unsupported data",
    "PEC_FAILED" => 5, "packet error check failed",
    "MEMORY_FAULT" => 4, "memory fault",
    "OTHER_COMM_FAULT" => 1, "other communication fault",
    "MEMORY_LOGIC_FAULT" => 0, "other memory or logic fault",
});

/// Named flags decoded from one raw value, plus any unnamed residue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSet {
    pub flags: Vec<(&'static str, bool)>,
    pub reserved: u16,
}

impl FlagSet {
    pub fn get(&self, name: &str) -> Option<bool> {
        self.flags.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }

    pub fn set(&mut self, name: &str, value: bool) -> bool {
        match self.flags.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => {
                entry.1 = value;
                true
            }
            None => false,
        }
    }

    /// Names of the flags that are set, most significant first.
    pub fn active(&self) -> Vec<&'static str> {
        self.flags.iter().filter(|(_, v)| *v).map(|(n, _)| *n).collect()
    }
}

impl BitTable {
    /// Bits covered by a named field.
    pub fn mask(&self) -> u16 {
        self.fields.iter().fold(0u16, |m, f| m | (1 << f.bit))
    }

    fn width_mask(&self) -> u16 {
        if self.width >= 16 {
            u16::MAX
        } else {
            (1u16 << self.width) - 1
        }
    }

    /// True if every bit of the register has a name.
    pub fn is_complete(&self) -> bool {
        self.mask() == self.width_mask()
    }

    pub fn reserved(&self, raw: u16) -> u16 {
        raw & self.width_mask() & !self.mask()
    }

    pub fn decode(&self, raw: u16) -> FlagSet {
        FlagSet {
            flags: self
                .fields
                .iter()
                .map(|f| (f.name, raw & (1 << f.bit) != 0))
                .collect(),
            reserved: self.reserved(raw),
        }
    }

    pub fn encode(&self, set: &FlagSet) -> u16 {
        let named = self
            .fields
            .iter()
            .filter(|f| set.get(f.name).unwrap_or(false))
            .fold(0u16, |acc, f| acc | (1 << f.bit));
        named | (set.reserved & !self.mask() & self.width_mask())
    }

    /// Flags as a JSON object; incomplete tables also carry `reserved_bits`.
    pub fn to_json(&self, raw: u16) -> Value {
        let set = self.decode(raw);
        let mut obj = Map::new();
        for (name, value) in &set.flags {
            obj.insert((*name).to_string(), Value::Bool(*value));
        }
        if !self.is_complete() {
            obj.insert("reserved_bits".into(), json!(set.reserved));
        }
        Value::Object(obj)
    }

    /// Set bits as a list of reasons; unnamed set bits are listed by position.
    pub fn reasons(&self, raw: u16) -> Vec<String> {
        let mut out = Vec::new();
        for bit in (0..self.width).rev() {
            if raw & (1 << bit) == 0 {
                continue;
            }
            match self.fields.iter().find(|f| f.bit == bit) {
                Some(f) => out.push(f.reason.to_string()),
                None => out.push(format!("reserved bit {}", bit)),
            }
        }
        out
    }
}

/// The seven status registers read by `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusRegister {
    Byte,
    Word,
    Vout,
    Iout,
    Input,
    Temperature,
    Cml,
}

impl StatusRegister {
    pub const ALL: [StatusRegister; 7] = [
        Self::Byte,
        Self::Word,
        Self::Vout,
        Self::Iout,
        Self::Input,
        Self::Temperature,
        Self::Cml,
    ];

    pub fn table(self) -> &'static BitTable {
        match self {
            Self::Byte => &STATUS_BYTE,
            Self::Word => &STATUS_WORD,
            Self::Vout => &STATUS_VOUT,
            Self::Iout => &STATUS_IOUT,
            Self::Input => &STATUS_INPUT,
            Self::Temperature => &STATUS_TEMPERATURE,
            Self::Cml => &STATUS_CML,
        }
    }

    pub fn command(self) -> PmbusCommand {
        match self {
            Self::Byte => PmbusCommand::StatusByte,
            Self::Word => PmbusCommand::StatusWord,
            Self::Vout => PmbusCommand::StatusVout,
            Self::Iout => PmbusCommand::StatusIout,
            Self::Input => PmbusCommand::StatusInput,
            Self::Temperature => PmbusCommand::StatusTemperature,
            Self::Cml => PmbusCommand::StatusCml,
        }
    }

    pub fn name(self) -> &'static str {
        self.table().register
    }

    /// JSON decode. CML is a list of reasons, everything else an object of flags.
    pub fn decode(self, raw: u16) -> Value {
        match self {
            Self::Cml => json!(self.table().reasons(raw)),
            _ => self.table().to_json(raw),
        }
    }
}
