//! Environment variable parsing helpers
//!
//! Every setting has a built-in default; environment variables only override.

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Extension trait for parsing environment variables.
pub trait ConfigExt {
    /// Get an environment variable with a default value.
    ///
    /// # Example
    /// ```ignore
    /// let dir = String::env_or("MYSQL_MIGRATE_BACKUP_DIR", "backups");
    /// ```
    fn env_or(name: &str, default: &str) -> String {
        env::var(name).unwrap_or_else(|_| default.to_string())
    }

    /// Get a required environment variable, returning an error if not set.
    fn env_required(name: &str) -> Result<String> {
        env::var(name).context(format!("{} must be set", name))
    }

    /// Get an environment variable parsed as a specific type.
    ///
    /// Returns `default` if the variable is not set or fails to parse.
    fn env_parse<T: FromStr>(name: &str, default: T) -> T {
        env::var(name)
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Get an environment variable holding a number of seconds.
    fn env_secs(name: &str, default_secs: u64) -> Duration {
        Duration::from_secs(u64::env_parse(name, default_secs))
    }
}

// Blanket implementation for all types
impl<T> ConfigExt for T {}
