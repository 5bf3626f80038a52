//! PMBus register access and decoding for Flex BMR power modules.
//!
//! The binary in `main.rs` is a thin clap front end; everything it does is
//! reachable from here so handlers can be tested against
//! [`transport::mock::MockDevice`](crate::transport) without hardware.

pub mod cmd;
pub mod config;
pub mod error;
pub mod output;
pub mod parse;
pub mod pmbus;
pub mod tracing;
pub mod transport;
