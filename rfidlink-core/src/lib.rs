//! # rfidlink-core
//!
//! Reader session primitives for rfidlink.
//!
//! This crate provides the driver-independent pieces:
//! - Session state machine
//! - Command names accepted by the gateway
//! - Caller-facing error taxonomy
//! - The configuration sequence applied after connect
//! - Reader selection rules for discovery results

pub mod command;
pub mod configure;
pub mod constants;
pub mod error;
pub mod select;
pub mod session;

pub use command::Command;
pub use configure::ConfigStep;
pub use error::{Error, ErrorKind, Result};
pub use select::select_reader;
pub use session::{Session, SessionSnapshot, SessionState};
