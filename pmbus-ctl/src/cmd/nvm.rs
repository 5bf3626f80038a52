//! Restart and non-volatile memory store/restore.

use clap::{Args, ValueEnum};
use serde_json::Value;

use super::Session;
use crate::error::Result;
use crate::output;
use crate::pmbus::PmbusCommand;
use crate::tracing::prelude::*;
use crate::transport::SmbusTransport;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestoreSource {
    /// RESTORE_USER_ALL
    #[default]
    User,
    /// RESTORE_DEFAULT_ALL
    Default,
}

#[derive(Args, Debug, Default)]
pub struct RestoreArgs {
    #[arg(value_enum, default_value_t = RestoreSource::User)]
    pub source: RestoreSource,
}

pub fn restart<T: SmbusTransport>(session: &mut Session<T>) -> Result<Value> {
    let magic = session.family().restart_magic();
    info!("Restarting {} module", session.family());
    session.write_block(PmbusCommand::MfrRestart, magic)?;
    Ok(output::ok())
}

pub fn save<T: SmbusTransport>(session: &mut Session<T>) -> Result<Value> {
    session.send_nvm(PmbusCommand::StoreUserAll)?;
    Ok(output::ok())
}

pub fn restore<T: SmbusTransport>(session: &mut Session<T>, args: &RestoreArgs) -> Result<Value> {
    let cmd = match args.source {
        RestoreSource::User => PmbusCommand::RestoreUserAll,
        RestoreSource::Default => PmbusCommand::RestoreDefaultAll,
    };
    session.send_nvm(cmd)?;
    Ok(output::ok())
}
