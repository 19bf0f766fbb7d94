//! MySQL fleet migration
//!
//! Reads a sheet of per-database credentials, dumps every database with
//! mysqldump on the source server, and on the target server provisions each
//! schema and user before replaying its dump with mysql.

pub mod admin;
pub mod artifact;
pub mod context;
pub mod credentials;
pub mod export;
pub mod import;
pub mod mysql;
pub mod summary;
pub mod template;

#[cfg(test)]
mod testing;

use nix::sys::stat::{umask, Mode};

pub use admin::{AdminCredentials, AdminCredentialsProvider, EnvProvider, FixedProvider, PromptProvider};
pub use context::{RunContext, Timeouts};
pub use credentials::{load_credentials, DatabaseRecord};
pub use export::Exporter;
pub use import::Importer;
pub use summary::{RecordOutcome, RunSummary};

/// Keep dumps and option files readable by the current user only.
pub fn restrict_umask() {
    umask(Mode::from_bits_truncate(0o077));
}
