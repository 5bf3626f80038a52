//! Command-line value parsers.
//!
//! Each parser is usable as a clap `value_parser` and reports a
//! [`ValidationError`] naming what was expected.

use crate::error::ValidationError;

fn strip_hex(s: &str) -> Option<&str> {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
}

/// Unsigned integer in decimal or `0x` hex.
pub fn parse_uint(s: &str, max: u32, what: &'static str) -> Result<u32, ValidationError> {
    let s = s.trim();
    let value = match strip_hex(s) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    }
    .map_err(|_| ValidationError::invalid(what, format!("'{s}' is not a number")))?;

    if value > max {
        return Err(ValidationError::invalid(
            what,
            format!("{s} is larger than 0x{max:X}"),
        ));
    }
    Ok(value)
}

pub fn parse_u8(s: &str) -> Result<u8, ValidationError> {
    parse_uint(s, 0xFF, "byte").map(|v| v as u8)
}

pub fn parse_u16(s: &str) -> Result<u16, ValidationError> {
    parse_uint(s, 0xFFFF, "word").map(|v| v as u16)
}

/// 7-bit device address, 0x03..=0x77.
pub fn parse_addr(s: &str) -> Result<u8, ValidationError> {
    let value = parse_uint(s, 0xFFFF, "address")?;
    match u8::try_from(value) {
        Ok(addr) if (0x03..=0x77).contains(&addr) => Ok(addr),
        _ => Err(ValidationError::InvalidAddress(value as u16)),
    }
}

/// `on/yes/true/1/enable(d)` or `off/no/false/0/disable(d)`.
pub fn parse_bool(s: &str) -> Result<bool, ValidationError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "on" | "yes" | "true" | "1" | "enable" | "enabled" => Ok(true),
        "off" | "no" | "false" | "0" | "disable" | "disabled" => Ok(false),
        other => Err(ValidationError::invalid(
            "flag",
            format!("'{other}' is not on/off"),
        )),
    }
}

/// Finite floating-point number.
pub fn parse_f64(s: &str) -> Result<f64, ValidationError> {
    match s.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ValidationError::invalid("value", format!("'{s}' is not a number"))),
    }
}

/// Temperature in degrees Celsius. A trailing `C`, `K` or `F` selects the
/// unit; no suffix means Celsius.
pub fn parse_temperature(s: &str) -> Result<f64, ValidationError> {
    let s = s.trim();
    let (number, unit) = match s.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => (&s[..i], c.to_ascii_uppercase()),
        _ => (s, 'C'),
    };
    let value = parse_f64(number.trim_end_matches('°'))
        .map_err(|_| ValidationError::invalid("temperature", format!("'{s}' is not a temperature")))?;
    match unit {
        'C' => Ok(value),
        'K' => Ok(value - 273.15),
        'F' => Ok((value - 32.0) * 5.0 / 9.0),
        _ => Err(ValidationError::invalid(
            "temperature",
            format!("unknown unit '{unit}', expected C, K or F"),
        )),
    }
}

/// Hex byte string with an optional `0x` prefix, e.g. `DEADBEEF`.
pub fn parse_hex_bytes(s: &str) -> Result<Vec<u8>, ValidationError> {
    let s = s.trim();
    let s = strip_hex(s).unwrap_or(s);
    if s.len() % 2 != 0 {
        return Err(ValidationError::invalid("--hex", "odd number of hex digits"));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            s.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| ValidationError::invalid("--hex", format!("'{s}' is not hex")))
        })
        .collect()
}

/// Uppercase hex without separators.
pub fn to_hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02X}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integers() {
        assert_eq!(parse_u8("0x9B").unwrap(), 0x9B);
        assert_eq!(parse_u8("155").unwrap(), 155);
        assert!(parse_u8("0x100").is_err());
        assert!(parse_u8("-1").is_err());
        assert_eq!(parse_u16("0xFFFF").unwrap(), 0xFFFF);
        assert!(parse_u16("65536").is_err());
        assert!(parse_u16("twelve").is_err());
    }

    #[test]
    fn test_parse_addr_range() {
        assert_eq!(parse_addr("0x40").unwrap(), 0x40);
        assert_eq!(parse_addr("0x03").unwrap(), 0x03);
        assert_eq!(parse_addr("0x77").unwrap(), 0x77);
        assert!(matches!(parse_addr("0x78"), Err(ValidationError::InvalidAddress(0x78))));
        assert!(matches!(parse_addr("0x02"), Err(ValidationError::InvalidAddress(0x02))));
        assert!(parse_addr("0x1FF").is_err());
    }

    #[test]
    fn test_parse_bool() {
        for s in ["on", "YES", "true", "1", "enable", "enabled"] {
            assert!(parse_bool(s).unwrap(), "{s}");
        }
        for s in ["off", "no", "False", "0", "disable", "disabled"] {
            assert!(!parse_bool(s).unwrap(), "{s}");
        }
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn test_parse_temperature_units() {
        assert_eq!(parse_temperature("110").unwrap(), 110.0);
        assert_eq!(parse_temperature("-40C").unwrap(), -40.0);
        assert!((parse_temperature("383.15K").unwrap() - 110.0).abs() < 1e-9);
        assert!((parse_temperature("212F").unwrap() - 100.0).abs() < 1e-9);
        assert!((parse_temperature("-40f").unwrap() + 40.0).abs() < 1e-9);
        assert!(parse_temperature("hot").is_err());
        assert!(parse_temperature("10X").is_err());
        assert!(parse_temperature("").is_err());
    }

    #[test]
    fn test_hex_bytes() {
        assert_eq!(parse_hex_bytes("DEADbeef").unwrap(), vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(parse_hex_bytes("0x0102").unwrap(), vec![1, 2]);
        assert!(parse_hex_bytes("ABC").is_err());
        assert!(parse_hex_bytes("ZZ").is_err());
        assert_eq!(to_hex(&[0x0A, 0xFF]), "0AFF");
    }
}
