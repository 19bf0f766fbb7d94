//! Run context shared by the export and import tools

use common::ConfigExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CREDENTIALS_FILE: &str = "database_credentials.xlsx";
pub const BACKUP_DIR: &str = "backups";
pub const LOG_DIR: &str = "logs";

/// Per-child wall-clock limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub dump: Duration,
    pub provision: Duration,
    pub restore: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            dump: Duration::from_secs(300),
            provision: Duration::from_secs(30),
            restore: Duration::from_secs(600),
        }
    }
}

/// Paths, limits and binaries for one run, passed to every component.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub credentials_file: PathBuf,
    pub backup_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Set once logging is initialized.
    pub log_file: Option<PathBuf>,
    pub timeouts: Timeouts,
    pub mysqldump_bin: String,
    pub mysql_bin: String,
}

impl RunContext {
    /// Context with the built-in defaults, rooted at `backup_dir`.
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            credentials_file: PathBuf::from(CREDENTIALS_FILE),
            backup_dir: backup_dir.into(),
            log_dir: PathBuf::from(LOG_DIR),
            log_file: None,
            timeouts: Timeouts::default(),
            mysqldump_bin: "mysqldump".to_string(),
            mysql_bin: "mysql".to_string(),
        }
    }

    /// Load the context from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Timeouts::default();
        Self {
            credentials_file: PathBuf::from(String::env_or(
                "MYSQL_MIGRATE_CREDENTIALS_FILE",
                CREDENTIALS_FILE,
            )),
            backup_dir: PathBuf::from(String::env_or("MYSQL_MIGRATE_BACKUP_DIR", BACKUP_DIR)),
            log_dir: PathBuf::from(String::env_or("MYSQL_MIGRATE_LOG_DIR", LOG_DIR)),
            log_file: None,
            timeouts: Timeouts {
                dump: Duration::env_secs("MYSQL_MIGRATE_DUMP_TIMEOUT", defaults.dump.as_secs()),
                provision: Duration::env_secs(
                    "MYSQL_MIGRATE_PROVISION_TIMEOUT",
                    defaults.provision.as_secs(),
                ),
                restore: Duration::env_secs(
                    "MYSQL_MIGRATE_RESTORE_TIMEOUT",
                    defaults.restore.as_secs(),
                ),
            },
            mysqldump_bin: String::env_or("MYSQL_MIGRATE_MYSQLDUMP_BIN", "mysqldump"),
            mysql_bin: String::env_or("MYSQL_MIGRATE_MYSQL_BIN", "mysql"),
        }
    }

    pub fn with_log_file(mut self, log_file: Option<&Path>) -> Self {
        self.log_file = log_file.map(Path::to_path_buf);
        self
    }

    /// Log file path for summaries, or a placeholder when console-only.
    pub fn log_file_display(&self) -> String {
        self.log_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(console only)".to_string())
    }
}
