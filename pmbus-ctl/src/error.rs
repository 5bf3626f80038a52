//! Error types shared by the command layer.
//!
//! Transport failures exit with 1. Anything the user can fix by changing
//! the command line exits with 2 and is raised before the bus is touched
//! where possible.

use crate::pmbus::PMBusError;
use crate::transport::TransportError;

/// Malformed or out-of-range command-line input
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("{arg}: {reason}")]
    InvalidArgument { arg: &'static str, reason: String },

    #[error("address 0x{0:02X} is outside the 7-bit range 0x03..=0x77")]
    InvalidAddress(u16),

    #[error("nothing to do: {0}")]
    NothingToDo(&'static str),

    #[error(transparent)]
    Register(#[from] PMBusError),
}

impl ValidationError {
    pub fn invalid(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl From<PMBusError> for Error {
    fn from(err: PMBusError) -> Self {
        Self::Validation(err.into())
    }
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Transport(_) => 1,
            Self::Validation(_) => 2,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Exit code for an error chain: 2 if any link is a validation error.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<Error>() {
            return e.exit_code();
        }
        if cause.downcast_ref::<ValidationError>().is_some() {
            return 2;
        }
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_exit_codes() {
        let transport: Error = TransportError::NoAck(0x40).into();
        assert_eq!(transport.exit_code(), 1);

        let validation: Error = PMBusError::ValueOutOfRange.into();
        assert_eq!(validation.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_through_context() {
        let result: std::result::Result<(), Error> =
            Err(ValidationError::invalid("--margin", "expected normal, low or high").into());
        let err = result.context("operation set").unwrap_err();
        assert_eq!(exit_code_for(&err), 2);

        let result: std::result::Result<(), Error> = Err(TransportError::NoAck(0x40).into());
        let err = result.context("status").unwrap_err();
        assert_eq!(exit_code_for(&err), 1);

        assert_eq!(exit_code_for(&anyhow::anyhow!("other")), 1);
    }

    #[test]
    fn test_messages() {
        let err = ValidationError::invalid("--phases", "expected 1..16");
        assert_eq!(err.to_string(), "--phases: expected 1..16");
        assert_eq!(
            ValidationError::InvalidAddress(0x80).to_string(),
            "address 0x80 is outside the 7-bit range 0x03..=0x77"
        );
    }
}
