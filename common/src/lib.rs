//! Shared utilities for the mysql-migrate tools
//!
//! This crate provides common functionality used by the export and import binaries:
//! - Logging initialization (console plus per-run log file)
//! - Environment variable parsing helpers
//! - Child process execution with timeouts

pub mod command;
pub mod config;
pub mod logging;

pub use command::{
    CommandError, CommandOutput, CommandSpec, Input, Output, ProcessRunner, TokioRunner,
};
pub use config::ConfigExt;
pub use logging::{init_logging, LogGuard};
