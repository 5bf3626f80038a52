//! `status`, `status-data` and `clear-faults`.

use serde_json::{json, Value};

use super::{insert_or_warn, Session};
use crate::error::Result;
use crate::output;
use crate::parse::to_hex;
use crate::pmbus::status::StatusRegister;
use crate::pmbus::{PmbusCommand, Width};
use crate::transport::SmbusTransport;

fn read_status<T: SmbusTransport>(session: &mut Session<T>, reg: StatusRegister) -> Result<Value> {
    let cmd = reg.command();
    let raw = match cmd.register().width {
        Width::Word => session.read_word(cmd)?,
        _ => u16::from(session.read_byte(cmd)?),
    };
    Ok(reg.decode(raw))
}

pub fn run<T: SmbusTransport>(session: &mut Session<T>) -> Result<Value> {
    let mut out = json!({});
    for reg in StatusRegister::ALL {
        let value = read_status(session, reg);
        insert_or_warn(&mut out, reg.name(), value)?;
    }
    Ok(out)
}

/// `{len, hex}` view of a log block.
pub fn block_json(data: &[u8]) -> Value {
    json!({
        "len": data.len(),
        "hex": to_hex(data),
    })
}

pub fn status_data<T: SmbusTransport>(session: &mut Session<T>) -> Result<Value> {
    let data = session.read_block(PmbusCommand::MfrGetStatusData)?;
    Ok(block_json(&data))
}

pub fn clear_faults<T: SmbusTransport>(session: &mut Session<T>) -> Result<Value> {
    session.send(PmbusCommand::ClearFaults)?;
    Ok(output::ok())
}
