//! `capability get|check`

use clap::Subcommand;
use serde_json::{json, Value};

use super::Session;
use crate::error::{Result, ValidationError};
use crate::parse::parse_bool;
use crate::pmbus::fields::{Capability, CapabilityRequirements};
use crate::pmbus::PmbusCommand;
use crate::transport::SmbusTransport;

#[derive(Subcommand, Debug)]
pub enum CapabilityCommand {
    /// Decode CAPABILITY
    Get,
    /// Decode CAPABILITY and compare it against requirements
    Check {
        #[arg(long, value_parser = parse_bool)]
        need_pec: Option<bool>,
        /// Minimum bus speed in kHz: 100, 400 or 1000
        #[arg(long)]
        min_speed: Option<u16>,
        #[arg(long, value_parser = parse_bool)]
        need_alert: Option<bool>,
        /// Require IEEE-754 half precision numeric format
        #[arg(long, value_parser = parse_bool)]
        need_fp: Option<bool>,
        #[arg(long, value_parser = parse_bool)]
        need_avsbus: Option<bool>,
        /// Also require zero reserved bits and a valid speed code
        #[arg(long)]
        strict: bool,
    },
}

fn read<T: SmbusTransport>(session: &mut Session<T>) -> Result<Capability> {
    let raw = session.read_byte(PmbusCommand::Capability)?;
    Ok(Capability::new(raw, session.family().into()))
}

pub fn run<T: SmbusTransport>(session: &mut Session<T>, cmd: &CapabilityCommand) -> Result<Value> {
    match cmd {
        CapabilityCommand::Get => {
            let cap = read(session)?;
            Ok(json!({ "capability": cap.to_json() }))
        }
        CapabilityCommand::Check {
            need_pec,
            min_speed,
            need_alert,
            need_fp,
            need_avsbus,
            strict,
        } => {
            if let Some(khz) = min_speed {
                if !matches!(khz, 100 | 400 | 1000) {
                    return Err(ValidationError::invalid(
                        "--min-speed",
                        format!("{khz} is not one of 100, 400, 1000"),
                    )
                    .into());
                }
            }
            let req = CapabilityRequirements {
                pec: *need_pec,
                min_speed_khz: *min_speed,
                alert: *need_alert,
                ieee754_half: *need_fp,
                avsbus: *need_avsbus,
                strict: *strict,
            };

            let cap = read(session)?;
            let report = cap.check(&req)?;
            Ok(json!({
                "capability": cap.to_json(),
                "checks": report.checks_json(),
                "mismatches": report.mismatches,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::testing::session;
    use crate::pmbus::Family;
    use crate::transport::mock::MockDevice;

    fn check(need_pec: Option<bool>, min_speed: Option<u16>, strict: bool) -> CapabilityCommand {
        CapabilityCommand::Check {
            need_pec,
            min_speed,
            need_alert: None,
            need_fp: None,
            need_avsbus: None,
            strict,
        }
    }

    #[test]
    fn test_get_full_schema() {
        let mut dev = MockDevice::new();
        dev.set_byte(0x19, 0xB0);
        let mut s = session(&mut dev, Family::Bmr685);
        let v = run(&mut s, &CapabilityCommand::Get).unwrap();
        let cap = &v["capability"];
        assert_eq!(cap["pec_supported"], true);
        assert_eq!(cap["max_bus_speed"]["khz"], 400);
        assert_eq!(cap["smbalert_supported"], true);
        assert_eq!(cap["numeric_format"], "linear/direct");
        assert_eq!(cap["avsbus_supported"], false);
        assert!(v.get("checks").is_none());
    }

    #[test]
    fn test_get_legacy_schema_omits_new_fields() {
        let mut dev = MockDevice::new();
        dev.set_byte(0x19, 0xB0);
        let mut s = session(&mut dev, Family::Bmr456);
        let v = run(&mut s, &CapabilityCommand::Get).unwrap();
        assert!(v["capability"].get("numeric_format").is_none());
        assert!(v["capability"].get("avsbus_supported").is_none());
    }

    #[test]
    fn test_check_reports_mismatches() {
        let mut dev = MockDevice::new();
        // PEC off, 100 kHz, reserved bits set
        dev.set_byte(0x19, 0x13);
        let mut s = session(&mut dev, Family::Bmr685);
        let v = run(&mut s, &check(Some(true), Some(400), true)).unwrap();
        assert_eq!(v["checks"]["pec_ok"], false);
        assert_eq!(v["checks"]["bus_speed_ok"], false);
        assert_eq!(v["checks"]["reserved_low_zero"], false);
        assert_eq!(v["checks"]["speed_code_valid"], true);
        assert_eq!(
            v["mismatches"],
            json!(["pec_ok", "bus_speed_ok", "reserved_low_zero"])
        );
    }

    #[test]
    fn test_check_passes() {
        let mut dev = MockDevice::new();
        dev.set_byte(0x19, 0xD0);
        let mut s = session(&mut dev, Family::Bmr685);
        let v = run(&mut s, &check(Some(true), Some(1000), true)).unwrap();
        assert_eq!(v["mismatches"], json!([]));
    }

    #[test]
    fn test_check_rejects_new_fields_on_legacy() {
        let mut dev = MockDevice::new();
        dev.set_byte(0x19, 0xB0);
        let mut s = session(&mut dev, Family::Bmr456);
        let cmd = CapabilityCommand::Check {
            need_pec: None,
            min_speed: None,
            need_alert: None,
            need_fp: Some(false),
            need_avsbus: None,
            strict: false,
        };
        assert_eq!(run(&mut s, &cmd).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn test_check_rejects_unknown_speed() {
        let mut dev = MockDevice::new();
        dev.set_byte(0x19, 0xB0);
        let mut s = session(&mut dev, Family::Bmr685);
        assert_eq!(run(&mut s, &check(None, Some(200), false)).unwrap_err().exit_code(), 2);
    }
}
