//! Structured logging initialization
//!
//! Console output plus a per-run log file that mirrors it.

use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Guard that keeps the tracing subscriber active.
/// Drop this at the end of main to flush the log file.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
    log_file: Option<PathBuf>,
}

impl LogGuard {
    /// Path of this run's log file, if file logging could be set up.
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}

/// Name of the log file for a run of `component` started at `started`.
pub fn log_file_name(component: &str, started: DateTime<Local>) -> String {
    format!("{}_{}.log", component, started.format("%Y%m%d_%H%M%S"))
}

/// Initialize logging for a component.
///
/// Log lines go to stdout and to `{log_dir}/{component}_{timestamp}.log`.
/// If the log directory cannot be created the run continues with console
/// output only.
///
/// # Example
/// ```ignore
/// let guard = init_logging("export", "logs");
/// info!(log_file = ?guard.log_file(), "Starting up...");
/// ```
pub fn init_logging(component: &str, log_dir: impl AsRef<Path>) -> LogGuard {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let console = fmt::layer().with_target(false);

    let log_dir = log_dir.as_ref();
    let log_file = log_dir.join(log_file_name(component, Local::now()));
    let opened = fs::create_dir_all(log_dir).and_then(|_| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
    });

    let (file_layer, file_guard, open_error) = match opened {
        Ok(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard), None)
        }
        Err(e) => (None, None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();

    if let Some(e) = open_error {
        warn!(path = %log_file.display(), error = %e, "Log file unavailable, logging to console only");
        return LogGuard {
            _file_guard: None,
            log_file: None,
        };
    }

    LogGuard {
        _file_guard: file_guard,
        log_file: Some(log_file),
    }
}
