//! PMBus Linear11 and Linear16-Unsigned numeric formats
//!
//! Both formats scale an integer mantissa by a power of two. Scaling is done
//! by building the power of two directly from its IEEE-754 bit pattern, so
//! decode is exact for every raw word and never goes through `powf`/`log`.

use std::fmt;

/// Smallest and largest Linear11 exponent.
pub const EXPONENT_MIN: i8 = -16;
pub const EXPONENT_MAX: i8 = 15;

/// Linear11 mantissa range (11-bit two's complement).
pub const MANTISSA_MIN: i32 = -1024;
pub const MANTISSA_MAX: i32 = 1023;

const EXPONENT_SHIFT: u32 = 11;
const MANTISSA_MASK: u16 = 0x07FF;

/// Sign-extend a 5-bit two's complement exponent.
pub fn extract_5bit_exponent(raw_exp: u8) -> i8 {
    if raw_exp & 0x10 != 0 {
        (raw_exp | 0xE0) as i8
    } else {
        (raw_exp & 0x1F) as i8
    }
}

/// Sign-extend an 11-bit two's complement mantissa.
fn extract_11bit_mantissa(raw: u16) -> i16 {
    let m = raw & MANTISSA_MASK;
    if m & 0x0400 != 0 {
        (m | 0xF800) as i16
    } else {
        m as i16
    }
}

/// `x * 2^e`, exact for the exponent range PMBus uses.
pub fn ldexp(x: f64, e: i32) -> f64 {
    // 2^e as a normal double; PMBus never needs more than +-32.
    let e = e.clamp(-1022, 1023);
    let scale = f64::from_bits(((1023 + e) as u64) << 52);
    x * scale
}

/// SLINEAR11: 5-bit signed exponent in [15:11], 11-bit signed mantissa in [10:0]
pub mod linear11 {
    use super::*;

    /// Exponent field of a raw Linear11 word.
    pub fn exponent(raw: u16) -> i8 {
        extract_5bit_exponent(((raw >> EXPONENT_SHIFT) & 0x1F) as u8)
    }

    /// Mantissa field of a raw Linear11 word.
    pub fn mantissa(raw: u16) -> i16 {
        extract_11bit_mantissa(raw)
    }

    /// Pack an exponent/mantissa pair. Both are truncated to their field widths.
    pub fn pack(exponent: i8, mantissa: i32) -> u16 {
        let e = (exponent as u16) & 0x1F;
        let y = (mantissa as u16) & MANTISSA_MASK;
        (e << EXPONENT_SHIFT) | y
    }

    /// Convert a raw Linear11 word to engineering units.
    pub fn decode(raw: u16) -> f64 {
        ldexp(mantissa(raw) as f64, exponent(raw) as i32)
    }

    fn mantissa_at(value: f64, exponent: i8) -> i64 {
        // f64::round rounds half away from zero; `as` saturates on overflow.
        ldexp(value, -(exponent as i32)).round() as i64
    }

    fn in_range(y: i64) -> bool {
        (MANTISSA_MIN as i64..=MANTISSA_MAX as i64).contains(&y)
    }

    /// Convert engineering units to the Linear11 word with the finest
    /// resolution that still fits the mantissa.
    ///
    /// The exponent scan runs upward from -16 and only replaces the current
    /// best on a strictly larger |Y|, so the smaller exponent wins a tie.
    /// Values too large for any exponent saturate the mantissa at E=15.
    pub fn encode(value: f64) -> u16 {
        if value == 0.0 || value.is_nan() {
            return 0;
        }

        let mut best: Option<(i8, i64)> = None;
        for e in EXPONENT_MIN..=EXPONENT_MAX {
            let y = mantissa_at(value, e);
            if !in_range(y) {
                continue;
            }
            if best.map_or(true, |(_, best_y)| y.abs() > best_y.abs()) {
                best = Some((e, y));
                if y.abs() == MANTISSA_MAX as i64 {
                    break;
                }
            }
        }

        match best {
            // Rounded away to nothing; report a plain zero.
            Some((_, 0)) => 0,
            Some((e, y)) => pack(e, y as i32),
            None => {
                let (e, y) = (EXPONENT_MIN..=EXPONENT_MAX)
                    .rev()
                    .map(|e| (e, mantissa_at(value, e)))
                    .find(|&(_, y)| in_range(y))
                    .unwrap_or((EXPONENT_MAX, mantissa_at(value, EXPONENT_MAX)));
                pack(e, y.clamp(MANTISSA_MIN as i64, MANTISSA_MAX as i64) as i32)
            }
        }
    }
}

/// ULINEAR16: unsigned mantissa, exponent supplied by VOUT_MODE
pub mod linear16u {
    use super::ldexp;

    /// `raw * 2^exp`
    pub fn decode(raw: u16, exp: i8) -> f64 {
        ldexp(raw as f64, exp as i32)
    }

    /// `round(value * 2^-exp)` saturated to `[0, 65535]`; NaN maps to 0.
    pub fn encode(value: f64, exp: i8) -> u16 {
        let scaled = ldexp(value, -(exp as i32));
        if scaled.is_nan() || scaled <= 0.0 {
            return 0;
        }
        if scaled >= u16::MAX as f64 {
            return u16::MAX;
        }
        scaled.round() as u16
    }
}

/// PMBus VOUT_MODE format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoutModeFormat {
    Linear,
    Vid,
    Direct,
    Ieee754Half,
    Reserved(u8),
}

impl fmt::Display for VoutModeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => write!(f, "linear"),
            Self::Vid => write!(f, "vid"),
            Self::Direct => write!(f, "direct"),
            Self::Ieee754Half => write!(f, "ieee754_half"),
            Self::Reserved(m) => write!(f, "reserved({})", m),
        }
    }
}

/// PMBus VOUT_MODE register (command 0x20)
///
/// Bits [7:5] select the data format, bits [4:0] hold the Linear16
/// exponent shared by every VOUT-family register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoutMode(pub u8);

impl VoutMode {
    pub fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// Linear mode with the given exponent (-16..=15).
    pub fn linear(exponent: i8) -> Self {
        Self((exponent as u8) & 0x1F)
    }

    pub fn mode(&self) -> VoutModeFormat {
        match (self.0 >> 5) & 0x07 {
            0b000 => VoutModeFormat::Linear,
            0b001 => VoutModeFormat::Vid,
            0b010 => VoutModeFormat::Direct,
            0b011 => VoutModeFormat::Ieee754Half,
            m => VoutModeFormat::Reserved(m),
        }
    }

    /// The 5-bit exponent, sign-extended from bit 4.
    pub fn exponent(&self) -> i8 {
        extract_5bit_exponent(self.0 & 0x1F)
    }

    pub fn is_linear(&self) -> bool {
        self.mode() == VoutModeFormat::Linear
    }

    pub fn decode_linear16(&self, raw: u16) -> f64 {
        linear16u::decode(raw, self.exponent())
    }

    pub fn encode_linear16(&self, volts: f64) -> u16 {
        linear16u::encode(volts, self.exponent())
    }
}

/// Linear11 word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Linear11(pub u16);

impl Linear11 {
    pub fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub fn from_f64(value: f64) -> Self {
        Self(linear11::encode(value))
    }

    pub fn to_f64(self) -> f64 {
        linear11::decode(self.0)
    }

    pub fn exponent(self) -> i8 {
        linear11::exponent(self.0)
    }

    pub fn mantissa(self) -> i16 {
        linear11::mantissa(self.0)
    }
}

impl From<Linear11> for f64 {
    fn from(value: Linear11) -> Self {
        value.to_f64()
    }
}

/// Linear16-Unsigned word together with the VOUT_MODE that scales it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Linear16 {
    pub value: u16,
    pub mode: VoutMode,
}

impl Linear16 {
    pub fn new(value: u16, mode: VoutMode) -> Self {
        Self { value, mode }
    }

    pub fn from_f64(volts: f64, mode: VoutMode) -> Self {
        Self {
            value: mode.encode_linear16(volts),
            mode,
        }
    }

    pub fn to_f64(self) -> f64 {
        self.mode.decode_linear16(self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_extract_5bit_exponent_positive() {
        assert_eq!(extract_5bit_exponent(0x00), 0);
        assert_eq!(extract_5bit_exponent(0x0F), 15);
        assert_eq!(extract_5bit_exponent(0x07), 7);
    }

    #[test]
    fn test_extract_5bit_exponent_negative() {
        assert_eq!(extract_5bit_exponent(0x10), -16);
        assert_eq!(extract_5bit_exponent(0x1F), -1);
        assert_eq!(extract_5bit_exponent(0x17), -9);
    }

    #[test]
    fn test_ldexp_exact() {
        assert_eq!(ldexp(3.0, 4), 48.0);
        assert_eq!(ldexp(1.0, -16), 1.0 / 65536.0);
        assert_eq!(ldexp(-1024.0, 15), -33_554_432.0);
    }

    #[test]
    fn test_linear11_decode_scenarios() {
        // E=-1, Y=0
        assert_eq!(linear11::decode(0xF000), 0.0);
        // E=0, Y=1
        assert_eq!(linear11::decode(0x0001), 1.0);
        // E=-3 (0b11101), Y=100 -> 12.5
        assert_eq!(linear11::decode(0xE864), 12.5);
        // E=0, Y=-1
        assert_eq!(linear11::decode(0x07FF), -1.0);
        // E=-2, Y=-1024
        assert_eq!(linear11::decode(0xF400), -256.0);
    }

    #[test]
    fn test_linear11_field_accessors() {
        let raw = linear11::pack(-3, 100);
        assert_eq!(raw, 0xE864);
        assert_eq!(linear11::exponent(raw), -3);
        assert_eq!(linear11::mantissa(raw), 100);
        assert_eq!(Linear11(raw).exponent(), -3);
        assert_eq!(Linear11(raw).mantissa(), 100);
    }

    #[test]
    fn test_linear11_encode_zero() {
        assert_eq!(linear11::encode(0.0), 0);
        assert_eq!(linear11::encode(-0.0), 0);
        assert_eq!(linear11::encode(f64::NAN), 0);
        // Rounds to zero mantissa at every exponent.
        assert_eq!(linear11::encode(1e-9), 0);
    }

    #[test]
    fn test_linear11_encode_prefers_finest_resolution() {
        // 85.0 fits as 680 * 2^-3; the scan stops there (next step exceeds 1023).
        let raw = linear11::encode(85.0);
        assert_eq!(linear11::exponent(raw), -3);
        assert_eq!(linear11::mantissa(raw), 680);
        assert_eq!(linear11::decode(raw), 85.0);

        let raw = linear11::encode(-40.0);
        assert_eq!(linear11::decode(raw), -40.0);
        assert_eq!(linear11::mantissa(raw), -640);
    }

    #[test]
    fn test_linear11_encode_rounds_half_away_from_zero() {
        // 2^-16 * 0.5 at the finest exponent is the only candidate.
        let half_step = ldexp(1.5, -16);
        let raw = linear11::encode(half_step);
        assert_eq!(linear11::exponent(raw), -16);
        assert_eq!(linear11::mantissa(raw), 2);

        let raw = linear11::encode(-half_step);
        assert_eq!(linear11::mantissa(raw), -2);
    }

    #[test]
    fn test_linear11_encode_saturates_large_values() {
        let raw = linear11::encode(1e12);
        assert_eq!(linear11::exponent(raw), 15);
        assert_eq!(linear11::mantissa(raw), 1023);

        let raw = linear11::encode(-1e12);
        assert_eq!(linear11::exponent(raw), 15);
        assert_eq!(linear11::mantissa(raw), -1024);

        let raw = linear11::encode(f64::INFINITY);
        assert_eq!(linear11::mantissa(raw), 1023);
    }

    #[test]
    fn test_linear11_largest_representable() {
        let max = ldexp(1023.0, 15);
        assert_eq!(linear11::decode(linear11::encode(max)), max);
        let min = ldexp(-1024.0, 15);
        assert_eq!(linear11::decode(linear11::encode(min)), min);
    }

    #[quickcheck]
    fn prop_linear11_roundtrip_on_grid(mantissa: i16, exponent: i8) -> bool {
        let y = (mantissa as i32).rem_euclid(2048) - 1024;
        let e = (exponent as i32).rem_euclid(32) - 16;
        let v = ldexp(y as f64, e);
        linear11::decode(linear11::encode(v)) == v
    }

    #[quickcheck]
    fn prop_linear11_decode_encode_preserves_value(raw: u16) -> bool {
        let v = linear11::decode(raw);
        linear11::decode(linear11::encode(v)) == v
    }

    #[test]
    fn test_linear16u_boundary_clamp() {
        assert_eq!(linear16u::encode(-5.0, 0), 0);
        assert_eq!(linear16u::encode(1e9, 0), 65535);
        assert_eq!(linear16u::encode(f64::NAN, -9), 0);
        assert_eq!(linear16u::encode(65535.0, 0), 65535);
    }

    #[test]
    fn test_linear16u_scaling() {
        // 0x0266 * 2^-9 = 614 / 512
        assert_eq!(linear16u::decode(0x0266, -9), 614.0 / 512.0);
        assert_eq!(linear16u::encode(1.2, -9), 614);
        assert_eq!(linear16u::decode(3, 2), 12.0);
    }

    #[quickcheck]
    fn prop_linear16u_roundtrip_on_grid(raw: u16, exponent: i8) -> bool {
        let n = ((exponent as i32).rem_euclid(32) - 16) as i8;
        let v = linear16u::decode(raw, n);
        linear16u::decode(linear16u::encode(v, n), n) == v
    }

    #[test]
    fn test_vout_mode_fields() {
        let mode = VoutMode::new(0x17);
        assert_eq!(mode.exponent(), -9);
        assert_eq!(mode.mode(), VoutModeFormat::Linear);
        assert!(mode.is_linear());

        let mode = VoutMode::new(0x40 | 0x0C);
        assert_eq!(mode.mode(), VoutModeFormat::Direct);
        assert_eq!(mode.exponent(), 12);

        assert_eq!(VoutMode::new(0xE0).mode(), VoutModeFormat::Reserved(7));
    }

    #[test]
    fn test_linear16_with_mode() {
        let mode = VoutMode::new(0x17);
        let l16 = Linear16::from_f64(0.75, mode);
        assert_eq!(l16.value, 384);
        assert_eq!(l16.to_f64(), 0.75);
    }
}
