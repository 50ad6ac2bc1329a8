//! Logging utilities.
//!
//! Libraries in this workspace only talk to the `log` facade; binaries call
//! [`init_logging`] once to install `env_logger` behind it.

mod init;

pub use init::{init_logging, LoggingConfig};
