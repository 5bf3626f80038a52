//! Configuration register layouts
//!
//! Each register's bit positions are declared once in a [`Layout`] built by
//! `field_layout!`: a list of `(name, shift, width)` fields. The typed
//! structs decode through those fields and keep a `reserved` residue holding
//! the bits no field covers. `to_raw()` rebuilds the byte from the same
//! fields, so decode followed by encode is the identity. The `*Update` types
//! change only the fields they name.

use serde_json::{json, Value};
use strum::{Display, EnumString, FromRepr, IntoStaticStr};

use super::{Family, PMBusError};

/// `width` bits of a byte register, starting at bit `shift`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Key used for the field in JSON output
    pub name: &'static str,
    pub shift: u8,
    pub width: u8,
}

impl Field {
    pub const fn mask(self) -> u8 {
        (((1u16 << self.width) - 1) as u8) << self.shift
    }

    pub fn get(self, raw: u8) -> u8 {
        (raw & self.mask()) >> self.shift
    }

    pub fn is_set(self, raw: u8) -> bool {
        raw & self.mask() != 0
    }

    /// Place `value` in the field; bits that do not fit are dropped.
    pub fn put(self, value: u8) -> u8 {
        (((value as u16) << self.shift) as u8) & self.mask()
    }

    pub fn flag(self, on: bool) -> u8 {
        self.put(u8::from(on))
    }
}

/// All named fields of one configuration register.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub register: &'static str,
    pub fields: &'static [Field],
}

impl Layout {
    /// Bits covered by some field.
    pub const fn mask(&self) -> u8 {
        let mut mask = 0;
        let mut i = 0;
        while i < self.fields.len() {
            mask |= self.fields[i].mask();
            i += 1;
        }
        mask
    }

    /// Bits no field names.
    pub fn reserved(&self, raw: u8) -> u8 {
        raw & !self.mask()
    }
}

/// Declares a module holding one `Field` constant per field and the
/// register's `LAYOUT`.
macro_rules! field_layout {
    ($module:ident, $register:literal, {
        $($konst:ident = $name:literal @ $shift:literal : $width:literal),* $(,)?
    }) => {
        pub mod $module {
            use super::{Field, Layout};

            $(pub const $konst: Field = Field { name: $name, shift: $shift, width: $width };)*

            pub const LAYOUT: Layout = Layout {
                register: $register,
                fields: &[$($konst),*],
            };
        }
    };
}

field_layout!(capability_full, "CAPABILITY", {
    PEC = "pec_supported" @ 7:1,
    SPEED = "max_bus_speed" @ 5:2,
    SMBALERT = "smbalert_supported" @ 4:1,
    NUMERIC_FORMAT = "numeric_format" @ 3:1,
    AVSBUS = "avsbus_supported" @ 2:1,
});

field_layout!(capability_legacy, "CAPABILITY", {
    PEC = "pec_supported" @ 7:1,
    SPEED = "max_bus_speed" @ 5:2,
    SMBALERT = "smbalert_supported" @ 4:1,
});

field_layout!(on_off_config, "ON_OFF_CONFIG", {
    POWERUP = "powerup" @ 4:1,
    USE_OPERATION = "use_operation" @ 3:1,
    USE_PIN = "use_pin" @ 2:1,
    POLARITY = "pin_polarity" @ 1:1,
    OFF = "off_behavior" @ 0:1,
});

field_layout!(operation, "OPERATION", {
    ON = "on" @ 7:1,
    MARGIN = "margin" @ 5:2,
});

field_layout!(multi_pin_config, "MFR_MULTI_PIN_CONFIG", {
    MODE = "mode" @ 6:2,
    PG_HIGHZ = "pg_highz_when_active" @ 5:1,
    PG_ENABLE = "pg_enable" @ 2:1,
    SEC_RC_PULL = "sec_rc_pull_enable" @ 0:1,
});

field_layout!(special_options, "MFR_SPECIAL_OPTIONS", {
    REQUIRE_PEC = "require_pec" @ 7:1,
    HRR = "hrr_enabled" @ 6:1,
    DLS = "dls_mode" @ 5:1,
    ARTDLC = "artdlc_enabled" @ 3:1,
    DBV = "dbv_enabled" @ 2:1,
});

// PHASES holds the phase count minus one.
field_layout!(interleave, "INTERLEAVE", {
    PHASES = "phases" @ 4:4,
    INDEX = "phase_index" @ 0:4,
});

field_layout!(pmbus_revision, "PMBUS_REVISION", {
    MAJOR = "major" @ 4:4,
    MINOR = "minor" @ 0:4,
});

// ============================================================================
// CAPABILITY (0x19)
// ============================================================================

/// Which CAPABILITY layout a device family uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilitySchema {
    /// PEC, speed, SMBALERT#, numeric format, AVSBus, reserved [1:0]
    Full,
    /// PEC, speed, SMBALERT#, reserved [3:0]
    Legacy,
}

impl From<Family> for CapabilitySchema {
    fn from(family: Family) -> Self {
        match family {
            Family::Bmr685 => Self::Full,
            Family::Bmr456 => Self::Legacy,
        }
    }
}

impl CapabilitySchema {
    pub fn layout(self) -> &'static Layout {
        match self {
            Self::Full => &capability_full::LAYOUT,
            Self::Legacy => &capability_legacy::LAYOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u8)]
pub enum BusSpeed {
    Khz100 = 0,
    Khz400 = 1,
    Mhz1 = 2,
    Reserved = 3,
}

impl BusSpeed {
    pub fn khz(self) -> Option<u16> {
        match self {
            Self::Khz100 => Some(100),
            Self::Khz400 => Some(400),
            Self::Mhz1 => Some(1000),
            Self::Reserved => None,
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            Self::Khz100 => "100 kHz",
            Self::Khz400 => "400 kHz",
            Self::Mhz1 => "1 MHz",
            Self::Reserved => "reserved",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    pub raw: u8,
    pub schema: CapabilitySchema,
}

impl Capability {
    pub fn new(raw: u8, schema: CapabilitySchema) -> Self {
        Self { raw, schema }
    }

    pub fn pec_supported(&self) -> bool {
        capability_full::PEC.is_set(self.raw)
    }

    pub fn speed_code(&self) -> u8 {
        capability_full::SPEED.get(self.raw)
    }

    pub fn bus_speed(&self) -> BusSpeed {
        BusSpeed::from_repr(self.speed_code()).unwrap_or(BusSpeed::Reserved)
    }

    pub fn smbalert_supported(&self) -> bool {
        capability_full::SMBALERT.is_set(self.raw)
    }

    /// `Some(true)` for IEEE-754 half precision; `None` on the legacy layout.
    pub fn ieee754_half(&self) -> Option<bool> {
        match self.schema {
            CapabilitySchema::Full => Some(capability_full::NUMERIC_FORMAT.is_set(self.raw)),
            CapabilitySchema::Legacy => None,
        }
    }

    pub fn avsbus_supported(&self) -> Option<bool> {
        match self.schema {
            CapabilitySchema::Full => Some(capability_full::AVSBUS.is_set(self.raw)),
            CapabilitySchema::Legacy => None,
        }
    }

    pub fn reserved_mask(&self) -> u8 {
        !self.schema.layout().mask()
    }

    pub fn reserved_low_bits(&self) -> u8 {
        self.schema.layout().reserved(self.raw)
    }

    pub fn to_json(&self) -> Value {
        use capability_full::*;
        let speed = self.bus_speed();
        let mut v = json!({
            "raw": self.raw,
            PEC.name: self.pec_supported(),
            SPEED.name: {
                "code": self.speed_code(),
                "khz": speed.khz(),
                "text": speed.text(),
            },
            SMBALERT.name: self.smbalert_supported(),
            "reserved_low_bits": self.reserved_low_bits(),
        });
        if let Some(fp) = self.ieee754_half() {
            v[NUMERIC_FORMAT.name] = json!(if fp { "ieee754_half" } else { "linear/direct" });
        }
        if let Some(avs) = self.avsbus_supported() {
            v[AVSBUS.name] = json!(avs);
        }
        v
    }

    /// Evaluate requirements. Only the requested checks appear in the report.
    pub fn check(&self, req: &CapabilityRequirements) -> Result<CheckReport, PMBusError> {
        let mut report = CheckReport::default();

        if let Some(want) = req.pec {
            report.add("pec_ok", want == self.pec_supported());
        }
        if let Some(min_khz) = req.min_speed_khz {
            let ok = self.bus_speed().khz().is_some_and(|khz| khz >= min_khz);
            report.add("bus_speed_ok", ok);
        }
        if let Some(want) = req.alert {
            report.add("alert_ok", want == self.smbalert_supported());
        }
        if let Some(want) = req.ieee754_half {
            let have = self
                .ieee754_half()
                .ok_or(PMBusError::FieldNotInSchema("numeric_format"))?;
            report.add("numeric_format_ok", want == have);
        }
        if let Some(want) = req.avsbus {
            let have = self
                .avsbus_supported()
                .ok_or(PMBusError::FieldNotInSchema("avsbus_supported"))?;
            report.add("avsbus_ok", want == have);
        }
        if req.strict {
            report.add("reserved_low_zero", self.reserved_low_bits() == 0);
            report.add("speed_code_valid", self.bus_speed() != BusSpeed::Reserved);
        }

        Ok(report)
    }
}

/// Requested capability properties; `None` means "don't care".
#[derive(Debug, Clone, Default)]
pub struct CapabilityRequirements {
    pub pec: Option<bool>,
    pub min_speed_khz: Option<u16>,
    pub alert: Option<bool>,
    pub ieee754_half: Option<bool>,
    pub avsbus: Option<bool>,
    pub strict: bool,
}

/// Named pass/fail results; failures are also listed in `mismatches`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub checks: Vec<(&'static str, bool)>,
    pub mismatches: Vec<&'static str>,
}

impl CheckReport {
    fn add(&mut self, name: &'static str, ok: bool) {
        self.checks.push((name, ok));
        if !ok {
            self.mismatches.push(name);
        }
    }

    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn checks_json(&self) -> Value {
        Value::Object(
            self.checks
                .iter()
                .map(|(k, ok)| ((*k).to_string(), Value::Bool(*ok)))
                .collect(),
        )
    }
}

// ============================================================================
// ON_OFF_CONFIG (0x02)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
pub enum PowerUp {
    /// Output comes up whenever input power is present
    #[strum(to_string = "always")]
    Always,
    /// Output waits for OPERATION and/or the control pin
    #[strum(to_string = "controlled")]
    Controlled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
pub enum OnOffSource {
    #[strum(to_string = "none")]
    None,
    #[strum(to_string = "operation")]
    Operation,
    #[strum(to_string = "pin")]
    Pin,
    #[strum(to_string = "both")]
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
pub enum PinPolarity {
    #[strum(to_string = "active_low", serialize = "low")]
    ActiveLow,
    #[strum(to_string = "active_high", serialize = "high")]
    ActiveHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
pub enum OffBehavior {
    #[strum(to_string = "soft")]
    Soft,
    #[strum(to_string = "immediate")]
    Immediate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnOffConfig {
    pub powerup: PowerUp,
    pub use_operation: bool,
    pub use_pin: bool,
    pub polarity: PinPolarity,
    pub off: OffBehavior,
    pub reserved: u8,
}

impl OnOffConfig {
    pub fn from_raw(raw: u8) -> Self {
        use on_off_config::*;
        Self {
            powerup: if POWERUP.is_set(raw) { PowerUp::Controlled } else { PowerUp::Always },
            use_operation: USE_OPERATION.is_set(raw),
            use_pin: USE_PIN.is_set(raw),
            polarity: if POLARITY.is_set(raw) { PinPolarity::ActiveHigh } else { PinPolarity::ActiveLow },
            off: if OFF.is_set(raw) { OffBehavior::Immediate } else { OffBehavior::Soft },
            reserved: LAYOUT.reserved(raw),
        }
    }

    pub fn to_raw(&self) -> u8 {
        use on_off_config::*;
        LAYOUT.reserved(self.reserved)
            | POWERUP.flag(self.powerup == PowerUp::Controlled)
            | USE_OPERATION.flag(self.use_operation)
            | USE_PIN.flag(self.use_pin)
            | POLARITY.flag(self.polarity == PinPolarity::ActiveHigh)
            | OFF.flag(self.off == OffBehavior::Immediate)
    }

    pub fn source(&self) -> OnOffSource {
        match (self.use_operation, self.use_pin) {
            (false, false) => OnOffSource::None,
            (true, false) => OnOffSource::Operation,
            (false, true) => OnOffSource::Pin,
            (true, true) => OnOffSource::Both,
        }
    }

    pub fn to_json(&self) -> Value {
        use on_off_config::*;
        json!({
            "raw": self.to_raw(),
            POWERUP.name: self.powerup.to_string(),
            USE_OPERATION.name: self.use_operation,
            USE_PIN.name: self.use_pin,
            POLARITY.name: self.polarity.to_string(),
            OFF.name: self.off.to_string(),
            "reserved_bits": self.reserved,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OnOffUpdate {
    pub powerup: Option<PowerUp>,
    pub source: Option<OnOffSource>,
    pub polarity: Option<PinPolarity>,
    pub off: Option<OffBehavior>,
}

impl OnOffUpdate {
    pub fn is_empty(&self) -> bool {
        self.powerup.is_none() && self.source.is_none() && self.polarity.is_none() && self.off.is_none()
    }

    pub fn apply(&self, mut cfg: OnOffConfig) -> OnOffConfig {
        if let Some(p) = self.powerup {
            cfg.powerup = p;
        }
        if let Some(s) = self.source {
            cfg.use_operation = matches!(s, OnOffSource::Operation | OnOffSource::Both);
            cfg.use_pin = matches!(s, OnOffSource::Pin | OnOffSource::Both);
        }
        if let Some(p) = self.polarity {
            cfg.polarity = p;
        }
        if let Some(o) = self.off {
            cfg.off = o;
        }
        cfg
    }
}

// ============================================================================
// OPERATION (0x01)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, Display, IntoStaticStr)]
#[repr(u8)]
pub enum Margin {
    #[strum(to_string = "normal")]
    Normal = 0,
    #[strum(to_string = "low")]
    Low = 1,
    #[strum(to_string = "high")]
    High = 2,
    #[strum(to_string = "reserved")]
    Reserved = 3,
}

impl std::str::FromStr for Margin {
    type Err = PMBusError;

    // "reserved" is decodable but never a valid request
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "low" => Ok(Self::Low),
            "high" => Ok(Self::High),
            _ => Err(PMBusError::InvalidDataFormat),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub on: bool,
    pub margin: Margin,
    pub reserved: u8,
}

impl Operation {
    pub fn from_raw(raw: u8) -> Self {
        use operation::*;
        Self {
            on: ON.is_set(raw),
            margin: Margin::from_repr(MARGIN.get(raw)).unwrap_or(Margin::Reserved),
            reserved: LAYOUT.reserved(raw),
        }
    }

    pub fn to_raw(&self) -> u8 {
        use operation::*;
        LAYOUT.reserved(self.reserved) | ON.flag(self.on) | MARGIN.put(self.margin as u8)
    }

    pub fn to_json(&self) -> Value {
        use operation::*;
        json!({
            "raw": self.to_raw(),
            ON.name: self.on,
            MARGIN.name: self.margin.to_string(),
            "reserved_bits": self.reserved,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OperationUpdate {
    pub on: Option<bool>,
    pub margin: Option<Margin>,
}

impl OperationUpdate {
    pub fn is_empty(&self) -> bool {
        self.on.is_none() && self.margin.is_none()
    }

    pub fn apply(&self, mut op: Operation) -> Operation {
        if let Some(on) = self.on {
            op.on = on;
        }
        if let Some(m) = self.margin {
            op.margin = m;
        }
        op
    }
}

// ============================================================================
// MFR_MULTI_PIN_CONFIG (0xF9)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, Display, EnumString, IntoStaticStr)]
#[repr(u8)]
pub enum MultiPinMode {
    #[strum(to_string = "standalone")]
    Standalone = 0,
    #[strum(to_string = "slave")]
    Slave = 1,
    #[strum(to_string = "dls")]
    Dls = 2,
    #[strum(to_string = "master")]
    Master = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
pub enum PgDrive {
    #[strum(to_string = "pushpull")]
    PushPull,
    #[strum(to_string = "highz")]
    HighZ,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiPinConfig {
    pub mode: MultiPinMode,
    pub pg_highz: bool,
    pub pg_enable: bool,
    pub sec_rc_pull: bool,
    pub reserved: u8,
}

impl MultiPinConfig {
    pub fn from_raw(raw: u8) -> Self {
        use multi_pin_config::*;
        Self {
            // two bits, so every value has a mode
            mode: MultiPinMode::from_repr(MODE.get(raw)).unwrap_or(MultiPinMode::Standalone),
            pg_highz: PG_HIGHZ.is_set(raw),
            pg_enable: PG_ENABLE.is_set(raw),
            sec_rc_pull: SEC_RC_PULL.is_set(raw),
            reserved: LAYOUT.reserved(raw),
        }
    }

    pub fn to_raw(&self) -> u8 {
        use multi_pin_config::*;
        LAYOUT.reserved(self.reserved)
            | MODE.put(self.mode as u8)
            | PG_HIGHZ.flag(self.pg_highz)
            | PG_ENABLE.flag(self.pg_enable)
            | SEC_RC_PULL.flag(self.sec_rc_pull)
    }

    pub fn to_json(&self) -> Value {
        use multi_pin_config::*;
        json!({
            "raw": self.to_raw(),
            MODE.name: self.mode.to_string(),
            PG_HIGHZ.name: self.pg_highz,
            PG_ENABLE.name: self.pg_enable,
            SEC_RC_PULL.name: self.sec_rc_pull,
            "reserved_bits": self.reserved,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MultiPinUpdate {
    pub mode: Option<MultiPinMode>,
    pub pg: Option<PgDrive>,
    pub pg_enable: Option<bool>,
    pub sec_rc_pull: Option<bool>,
}

impl MultiPinUpdate {
    pub fn is_empty(&self) -> bool {
        self.mode.is_none() && self.pg.is_none() && self.pg_enable.is_none() && self.sec_rc_pull.is_none()
    }

    pub fn apply(&self, mut cfg: MultiPinConfig) -> MultiPinConfig {
        if let Some(m) = self.mode {
            cfg.mode = m;
        }
        if let Some(pg) = self.pg {
            cfg.pg_highz = pg == PgDrive::HighZ;
        }
        if let Some(en) = self.pg_enable {
            cfg.pg_enable = en;
        }
        if let Some(sec) = self.sec_rc_pull {
            cfg.sec_rc_pull = sec;
        }
        cfg
    }
}

// ============================================================================
// MFR_SPECIAL_OPTIONS (0xE0)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
pub enum DroopSlope {
    #[strum(to_string = "linear")]
    Linear,
    #[strum(to_string = "nonlinear")]
    Nonlinear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialOptions {
    pub require_pec: bool,
    pub hrr: bool,
    pub dls: DroopSlope,
    pub artdlc: bool,
    pub dbv: bool,
    pub reserved: u8,
}

impl SpecialOptions {
    pub fn from_raw(raw: u8) -> Self {
        use special_options::*;
        Self {
            require_pec: REQUIRE_PEC.is_set(raw),
            hrr: HRR.is_set(raw),
            dls: if DLS.is_set(raw) { DroopSlope::Nonlinear } else { DroopSlope::Linear },
            artdlc: ARTDLC.is_set(raw),
            dbv: DBV.is_set(raw),
            reserved: LAYOUT.reserved(raw),
        }
    }

    pub fn to_raw(&self) -> u8 {
        use special_options::*;
        LAYOUT.reserved(self.reserved)
            | REQUIRE_PEC.flag(self.require_pec)
            | HRR.flag(self.hrr)
            | DLS.flag(self.dls == DroopSlope::Nonlinear)
            | ARTDLC.flag(self.artdlc)
            | DBV.flag(self.dbv)
    }

    pub fn to_json(&self) -> Value {
        use special_options::*;
        json!({
            "MFR_SPECIAL_OPTIONS_raw": self.to_raw(),
            REQUIRE_PEC.name: self.require_pec,
            HRR.name: self.hrr,
            DLS.name: self.dls.to_string(),
            ARTDLC.name: self.artdlc,
            DBV.name: self.dbv,
            "reserved_bits": self.reserved,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpecialOptionsUpdate {
    pub require_pec: Option<bool>,
    pub hrr: Option<bool>,
    pub dls: Option<DroopSlope>,
    pub artdlc: Option<bool>,
    pub dbv: Option<bool>,
}

impl SpecialOptionsUpdate {
    pub fn apply(&self, mut opts: SpecialOptions) -> SpecialOptions {
        if let Some(v) = self.require_pec {
            opts.require_pec = v;
        }
        if let Some(v) = self.hrr {
            opts.hrr = v;
        }
        if let Some(v) = self.dls {
            opts.dls = v;
        }
        if let Some(v) = self.artdlc {
            opts.artdlc = v;
        }
        if let Some(v) = self.dbv {
            opts.dbv = v;
        }
        opts
    }
}

// ============================================================================
// WRITE_PROTECT (0x10)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteProtect {
    None,
    Ctrl,
    Nvm,
    All,
    NonStandard(u8),
}

impl WriteProtect {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0x00 => Self::None,
            0x40 => Self::Ctrl,
            0x80 => Self::Nvm,
            0xFF => Self::All,
            other => Self::NonStandard(other),
        }
    }

    pub fn to_raw(self) -> u8 {
        match self {
            Self::None => 0x00,
            Self::Ctrl => 0x40,
            Self::Nvm => 0x80,
            Self::All => 0xFF,
            Self::NonStandard(raw) => raw,
        }
    }

    pub fn to_json(self) -> Value {
        json!({
            "WRITE_PROTECT": self.to_raw(),
            "none": self == Self::None,
            "ctrl": self == Self::Ctrl,
            "nvm": self == Self::Nvm,
            "all": self == Self::All,
        })
    }
}

// ============================================================================
// INTERLEAVE (0x37)
// ============================================================================

/// Built only by [`Interleave::new`] or [`Interleave::from_raw`], so
/// `phases` is always 1..=16.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interleave {
    phases: u8,
    phase_index: u8,
}

impl Interleave {
    pub fn from_raw(raw: u8) -> Self {
        use interleave::*;
        Self {
            phases: PHASES.get(raw) + 1,
            phase_index: INDEX.get(raw),
        }
    }

    pub fn new(phases: u8, phase_index: u8) -> Result<Self, PMBusError> {
        if !(1..=16).contains(&phases) || phase_index > 15 {
            return Err(PMBusError::ValueOutOfRange);
        }
        Ok(Self { phases, phase_index })
    }

    /// Number of phases in the group, 1..=16
    pub fn phases(&self) -> u8 {
        self.phases
    }

    /// This unit's position, 0..=15
    pub fn phase_index(&self) -> u8 {
        self.phase_index
    }

    pub fn to_raw(&self) -> u8 {
        use interleave::*;
        PHASES.put(self.phases.saturating_sub(1)) | INDEX.put(self.phase_index)
    }

    pub fn to_json(&self) -> Value {
        use interleave::*;
        json!({
            "raw": self.to_raw(),
            PHASES.name: self.phases,
            INDEX.name: self.phase_index,
        })
    }
}

// ============================================================================
// PMBUS_REVISION (0x98)
// ============================================================================

pub fn pmbus_revision_json(raw: u8) -> Value {
    use pmbus_revision::*;
    json!({
        "raw": raw,
        MAJOR.name: MAJOR.get(raw),
        MINOR.name: MINOR.get(raw),
    })
}
