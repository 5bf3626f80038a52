//! Connection and output settings.
//!
//! Built once in `main` from defaults, then the environment, then explicit
//! command-line flags, and handed to every command.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::output::OutputConfig;
use crate::parse::parse_addr;
use crate::pmbus::Family;

pub const DEFAULT_BUS: &str = "/dev/i2c-1";
pub const DEFAULT_ADDR: u8 = 0x40;

/// How the device family is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FamilySelect {
    /// Read MFR_MODEL and decide
    #[default]
    Auto,
    Fixed(Family),
}

impl FromStr for FamilySelect {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "auto" {
            return Ok(Self::Auto);
        }
        s.parse::<Family>().map(Self::Fixed).map_err(|_| {
            ValidationError::invalid("--family", format!("'{s}' is not auto, bmr685 or bmr456"))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// i2c-dev adapter path
    pub bus: PathBuf,
    /// 7-bit device address
    pub addr: u8,
    pub pretty: bool,
    pub family: FamilySelect,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bus: PathBuf::from(DEFAULT_BUS),
            addr: DEFAULT_ADDR,
            pretty: true,
            family: FamilySelect::Auto,
        }
    }
}

impl Config {
    /// Defaults overlaid with environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `PMBUS_BUS`: adapter path
    /// - `PMBUS_ADDR`: device address, decimal or `0x` hex
    /// - `PMBUS_FAMILY`: `auto`, `bmr685` or `bmr456`
    /// - `PMBUS_COMPACT`: any value other than empty or `0` disables
    ///   pretty printing
    pub fn from_env() -> Result<Self, ValidationError> {
        let mut config = Self::default();

        if let Ok(bus) = std::env::var("PMBUS_BUS") {
            if !bus.is_empty() {
                config.bus = PathBuf::from(bus);
            }
        }
        if let Ok(addr) = std::env::var("PMBUS_ADDR") {
            config.addr = parse_addr(&addr)?;
        }
        if let Ok(family) = std::env::var("PMBUS_FAMILY") {
            config.family = family.parse()?;
        }
        if let Ok(compact) = std::env::var("PMBUS_COMPACT") {
            if !compact.is_empty() && compact != "0" {
                config.pretty = false;
            }
        }

        Ok(config)
    }

    pub fn output(&self) -> OutputConfig {
        OutputConfig {
            pretty: self.pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in ["PMBUS_BUS", "PMBUS_ADDR", "PMBUS_FAMILY", "PMBUS_COMPACT"] {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_env() {
        clear_env();
        let config = Config::from_env().unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.bus, PathBuf::from("/dev/i2c-1"));
        assert_eq!(config.addr, 0x40);
        assert!(config.pretty);
        assert_eq!(config.family, FamilySelect::Auto);
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var("PMBUS_BUS", "/dev/i2c-220");
        std::env::set_var("PMBUS_ADDR", "0x15");
        std::env::set_var("PMBUS_FAMILY", "BMR456");
        std::env::set_var("PMBUS_COMPACT", "1");

        let config = Config::from_env().unwrap();
        assert_eq!(config.bus, PathBuf::from("/dev/i2c-220"));
        assert_eq!(config.addr, 0x15);
        assert_eq!(config.family, FamilySelect::Fixed(Family::Bmr456));
        assert!(!config.pretty);
        assert!(!config.output().pretty);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_bad_address_is_rejected() {
        clear_env();
        std::env::set_var("PMBUS_ADDR", "0x80");
        assert!(matches!(
            Config::from_env(),
            Err(ValidationError::InvalidAddress(0x80))
        ));
        clear_env();
    }

    #[test]
    fn test_family_select_parse() {
        assert_eq!("auto".parse::<FamilySelect>().unwrap(), FamilySelect::Auto);
        assert_eq!(
            "bmr685".parse::<FamilySelect>().unwrap(),
            FamilySelect::Fixed(Family::Bmr685)
        );
        assert!("bmr999".parse::<FamilySelect>().is_err());
    }
}
