//! `snapshot`: MFR_GET_SNAPSHOT, optionally for a past cycle.

use clap::Args;
use serde_json::{json, Value};

use super::status::block_json;
use super::Session;
use crate::error::{Result, ValidationError};
use crate::pmbus::status::StatusRegister;
use crate::pmbus::{linear11, PmbusCommand, VoutMode};
use crate::tracing::prelude::*;
use crate::transport::SmbusTransport;

/// Bytes the decoded layout needs.
pub const SNAPSHOT_LEN: usize = 32;

/// Last selectable snapshot cycle.
pub const CYCLE_MAX: u8 = 19;

#[derive(Args, Debug, Default)]
pub struct SnapshotArgs {
    /// Select a stored cycle (0..19) before reading
    #[arg(long)]
    pub cycle: Option<u8>,

    /// Decode the block into named fields
    #[arg(long)]
    pub decode: bool,
}

fn le16(b: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([b[at], b[at + 1]])
}

fn le32(b: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

/// Decode a snapshot block. Short blocks decode to an error entry.
pub fn decode(block: &[u8], mode: VoutMode) -> Value {
    if block.len() < SNAPSHOT_LEN {
        return json!({ "error": "short block" });
    }
    let lin11 = |at| linear11::decode(le16(block, at));
    let vout = |at| mode.decode_linear16(le16(block, at));
    let status = |reg: StatusRegister, at: usize| reg.decode(u16::from(block[at]));

    json!({
        "vin_old_V": lin11(0),
        "vout_old_V": vout(2),
        "iout_old_A": lin11(4),
        "duty_old_pct": lin11(6),
        "vin_V": lin11(8),
        "vout_V": vout(10),
        "iout_A": lin11(12),
        "temp1_C": lin11(14),
        "temp2_C": lin11(16),
        "time_in_operation_s": le16(block, 18),
        "status_word": le16(block, 20),
        "status_byte": block[22],
        "status_vout": status(StatusRegister::Vout, 23),
        "status_iout": status(StatusRegister::Iout, 24),
        "status_vin": status(StatusRegister::Input, 25),
        "status_temperature": status(StatusRegister::Temperature, 26),
        "status_cml": status(StatusRegister::Cml, 27),
        "snapshot_cycles": le32(block, 28),
    })
}

pub fn run<T: SmbusTransport>(session: &mut Session<T>, args: &SnapshotArgs) -> Result<Value> {
    if let Some(cycle) = args.cycle {
        if cycle > CYCLE_MAX {
            return Err(ValidationError::invalid("--cycle", format!("{cycle} is not in 0..19")).into());
        }
        session.write_byte(PmbusCommand::MfrSnapshotCyclesSelect, cycle)?;
    }

    let block = session.read_block(PmbusCommand::MfrGetSnapshot)?;
    let mut out = block_json(&block);

    if args.decode {
        let mode = if block.len() >= SNAPSHOT_LEN {
            session.vout_mode().unwrap_or_else(|e| {
                warn!("VOUT_MODE unavailable ({}), using exponent 0", e);
                VoutMode::new(0)
            })
        } else {
            VoutMode::new(0)
        };
        out["decoded"] = decode(&block, mode);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::testing::session;
    use crate::pmbus::Family;
    use crate::transport::mock::MockDevice;

    fn sample_block() -> Vec<u8> {
        let mut b = vec![0u8; 32];
        let mut put = |at: usize, w: u16| b[at..at + 2].copy_from_slice(&w.to_le_bytes());
        put(0, linear11::encode(53.5));
        put(2, 0x0266);
        put(4, linear11::encode(10.0));
        put(6, linear11::encode(25.0));
        put(8, linear11::encode(54.0));
        put(10, 0x0200);
        put(12, linear11::encode(20.5));
        put(14, linear11::encode(60.0));
        put(16, linear11::encode(61.5));
        put(18, 3600);
        put(20, 0x0840);
        b[22] = 0x40;
        b[23] = 0x80;
        b[24] = 0x00;
        b[25] = 0x10;
        b[26] = 0x40;
        b[27] = 0x20;
        b[28..32].copy_from_slice(&1234u32.to_le_bytes());
        b
    }

    #[test]
    fn test_decode_layout() {
        let v = decode(&sample_block(), VoutMode::new(0x17));
        assert_eq!(v["vin_old_V"], 53.5);
        assert_eq!(v["vout_old_V"], 0x0266 as f64 / 512.0);
        assert_eq!(v["vout_V"], 1.0);
        assert_eq!(v["iout_A"], 20.5);
        assert_eq!(v["temp2_C"], 61.5);
        assert_eq!(v["time_in_operation_s"], 3600);
        assert_eq!(v["status_word"], 0x0840);
        assert_eq!(v["status_byte"], 0x40);
        assert_eq!(v["status_vout"]["VOUT_OV_FAULT"], true);
        assert_eq!(v["status_vin"]["VIN_UV_FAULT"], true);
        assert_eq!(v["status_temperature"]["OT_WARN"], true);
        assert_eq!(v["status_cml"], json!(["packet error check failed"]));
        assert_eq!(v["snapshot_cycles"], 1234);
    }

    #[test]
    fn test_short_block() {
        let v = decode(&[0u8; 31], VoutMode::new(0x17));
        assert_eq!(v, json!({ "error": "short block" }));
    }

    #[test]
    fn test_run_selects_cycle_and_decodes() {
        let mut dev = MockDevice::new();
        dev.set_byte(0x20, 0x17).set_block(0xD7, &sample_block());
        let mut s = session(&mut dev, Family::Bmr685);
        let v = run(&mut s, &SnapshotArgs { cycle: Some(3), decode: true }).unwrap();
        assert_eq!(v["len"], 32);
        assert_eq!(v["hex"].as_str().unwrap().len(), 64);
        assert_eq!(v["decoded"]["snapshot_cycles"], 1234);
        assert_eq!(dev.writes(), &[(0xD5, vec![3])]);
    }

    #[test]
    fn test_run_without_decode() {
        let mut dev = MockDevice::new();
        dev.set_block(0xD7, &[0xAB; 4]);
        let mut s = session(&mut dev, Family::Bmr456);
        let v = run(&mut s, &SnapshotArgs::default()).unwrap();
        assert_eq!(v, json!({ "len": 4, "hex": "ABABABAB" }));

        let v = run(&mut s, &SnapshotArgs { cycle: None, decode: true }).unwrap();
        assert_eq!(v["decoded"]["error"], "short block");
    }

    #[test]
    fn test_cycle_out_of_range() {
        let mut dev = MockDevice::new();
        let mut s = session(&mut dev, Family::Bmr685);
        let err = run(&mut s, &SnapshotArgs { cycle: Some(20), decode: false }).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        drop(s);
        assert!(dev.writes().is_empty());
    }
}
