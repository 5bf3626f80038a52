//! Identification strings, firmware blob, user scratch data and the ramp
//! log.

use clap::{Args, Subcommand};
use serde_json::{json, Value};

use super::status::block_json;
use super::{insert_or_warn, Session};
use crate::error::{Result, ValidationError};
use crate::output;
use crate::parse::{parse_hex_bytes, to_hex};
use crate::pmbus::fields::pmbus_revision_json;
use crate::pmbus::PmbusCommand;
use crate::transport::SmbusTransport;

/// Largest payload `user-data set` writes.
pub const USER_DATA_MAX: usize = 32;

const ID_STRINGS: [PmbusCommand; 6] = [
    PmbusCommand::MfrId,
    PmbusCommand::MfrModel,
    PmbusCommand::MfrRevision,
    PmbusCommand::MfrLocation,
    PmbusCommand::MfrDate,
    PmbusCommand::MfrSerial,
];

pub fn id<T: SmbusTransport>(session: &mut Session<T>) -> Result<Value> {
    let mut out = json!({});
    let revision = session
        .read_byte(PmbusCommand::PmbusRevision)
        .map(pmbus_revision_json);
    insert_or_warn(&mut out, "PMBUS_REVISION", revision)?;
    for cmd in ID_STRINGS {
        let value = session.read_string(cmd).map(Value::from);
        insert_or_warn(&mut out, cmd.name(), value)?;
    }
    Ok(out)
}

/// Printable ASCII runs of at least three characters.
fn ascii_runs(data: &[u8]) -> Vec<String> {
    data.split(|b| !(32..=126).contains(b))
        .filter(|run| run.len() >= 3)
        .map(|run| String::from_utf8_lossy(run).into_owned())
        .collect()
}

pub fn fwdata<T: SmbusTransport>(session: &mut Session<T>) -> Result<Value> {
    let data = session.read_block(PmbusCommand::MfrFirmwareData)?;
    let mut out = block_json(&data);
    out["ascii_runs"] = json!(ascii_runs(&data));
    Ok(out)
}

pub fn ramp_data<T: SmbusTransport>(session: &mut Session<T>) -> Result<Value> {
    let data = session.read_block(PmbusCommand::MfrGetRampData)?;
    Ok(block_json(&data))
}

#[derive(Subcommand, Debug)]
pub enum UserDataCommand {
    /// Read MFR_USER_DATA_00
    Get,
    /// Write MFR_USER_DATA_00
    Set(UserDataSetArgs),
}

#[derive(Args, Debug, Default)]
pub struct UserDataSetArgs {
    /// Hex bytes, at most 32
    #[arg(long, conflicts_with = "ascii", required_unless_present = "ascii")]
    pub hex: Option<String>,
    /// Text, truncated to 32 bytes
    #[arg(long)]
    pub ascii: Option<String>,
    /// Follow with STORE_USER_ALL
    #[arg(long)]
    pub store: bool,
    /// Follow with RESTORE_USER_ALL
    #[arg(long)]
    pub restore: bool,
}

impl UserDataSetArgs {
    fn payload(&self) -> Result<Vec<u8>> {
        match (&self.hex, &self.ascii) {
            (Some(hex), _) => {
                let data = parse_hex_bytes(hex)?;
                if data.len() > USER_DATA_MAX {
                    return Err(ValidationError::invalid(
                        "--hex",
                        format!("{} bytes given, at most {USER_DATA_MAX}", data.len()),
                    )
                    .into());
                }
                Ok(data)
            }
            (None, Some(text)) => {
                let bytes = text.as_bytes();
                Ok(bytes[..bytes.len().min(USER_DATA_MAX)].to_vec())
            }
            (None, None) => Err(ValidationError::NothingToDo("give --hex or --ascii").into()),
        }
    }
}

pub fn run_user_data<T: SmbusTransport>(session: &mut Session<T>, cmd: &UserDataCommand) -> Result<Value> {
    match cmd {
        UserDataCommand::Get => {
            let data = session.read_block(PmbusCommand::MfrUserData00)?;
            Ok(json!({
                "len": data.len(),
                "ascii": String::from_utf8_lossy(&data),
                "hex": to_hex(&data),
            }))
        }
        UserDataCommand::Set(args) => {
            let data = args.payload()?;
            session.write_block(PmbusCommand::MfrUserData00, &data)?;
            if args.store {
                session.send_nvm(PmbusCommand::StoreUserAll)?;
            }
            if args.restore {
                session.send_nvm(PmbusCommand::RestoreUserAll)?;
            }
            Ok(output::ok())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::testing::session;
    use crate::pmbus::Family;
    use crate::transport::mock::MockDevice;

    #[test]
    fn test_id_skips_missing_strings() {
        let mut dev = MockDevice::new();
        dev.set_byte(0x98, 0x33)
            .set_block(0x99, b"Flex")
            .set_block(0x9A, b"BMR6850000/001  ")
            .set_block(0x9E, b"A1B2C3\0\0");
        let mut s = session(&mut dev, Family::Bmr685);
        let v = id(&mut s).unwrap();
        assert_eq!(v["PMBUS_REVISION"], json!({ "raw": 0x33, "major": 3, "minor": 3 }));
        assert_eq!(v["MFR_ID"], "Flex");
        assert_eq!(v["MFR_MODEL"], "BMR6850000/001");
        assert_eq!(v["MFR_SERIAL"], "A1B2C3");
        assert!(v.get("MFR_DATE").is_none());
    }

    #[test]
    fn test_ascii_runs() {
        let data = b"\x01\x02FW1\x00ab\xffRev-C7\x10";
        assert_eq!(ascii_runs(data), vec!["FW1", "Rev-C7"]);
        assert!(ascii_runs(b"").is_empty());
        assert_eq!(ascii_runs(b"tail"), vec!["tail"]);
    }

    #[test]
    fn test_fwdata() {
        let mut dev = MockDevice::new();
        dev.set_block(0xFD, b"\x00ABC\x01");
        let mut s = session(&mut dev, Family::Bmr456);
        let v = fwdata(&mut s).unwrap();
        assert_eq!(v, json!({ "len": 5, "hex": "0041424301", "ascii_runs": ["ABC"] }));
    }

    #[test]
    fn test_ramp_data_is_bmr685_only() {
        let mut dev = MockDevice::new();
        dev.set_block(0xDB, &[0x10, 0x20]);
        let v = ramp_data(&mut session(&mut dev, Family::Bmr685)).unwrap();
        assert_eq!(v, json!({ "len": 2, "hex": "1020" }));
        let err = ramp_data(&mut session(&mut dev, Family::Bmr456)).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_user_data_set_hex_and_store() {
        let mut dev = MockDevice::new();
        let mut s = session(&mut dev, Family::Bmr456);
        let args = UserDataSetArgs {
            hex: Some("DEADBEEF".into()),
            store: true,
            ..Default::default()
        };
        let v = run_user_data(&mut s, &UserDataCommand::Set(args)).unwrap();
        assert_eq!(v, json!({ "result": "OK" }));
        let v = run_user_data(&mut s, &UserDataCommand::Get).unwrap();
        assert_eq!(v["len"], 4);
        assert_eq!(v["hex"], "DEADBEEF");
        drop(s);
        assert_eq!(dev.written_commands(), vec![0xB0, 0x15]);
        assert_eq!(dev.writes()[1], (0x15, vec![0x01]));
    }

    #[test]
    fn test_user_data_set_limits() {
        let mut dev = MockDevice::new();
        let mut s = session(&mut dev, Family::Bmr685);

        let args = UserDataSetArgs {
            hex: Some("00".repeat(33)),
            ..Default::default()
        };
        assert_eq!(run_user_data(&mut s, &UserDataCommand::Set(args)).unwrap_err().exit_code(), 2);

        let args = UserDataSetArgs {
            hex: Some("ABC".into()),
            ..Default::default()
        };
        assert_eq!(run_user_data(&mut s, &UserDataCommand::Set(args)).unwrap_err().exit_code(), 2);

        let args = UserDataSetArgs {
            ascii: Some("x".repeat(40)),
            ..Default::default()
        };
        run_user_data(&mut s, &UserDataCommand::Set(args)).unwrap();
        let v = run_user_data(&mut s, &UserDataCommand::Get).unwrap();
        assert_eq!(v["len"], 32);
        assert_eq!(v["ascii"], "x".repeat(32));
    }
}
