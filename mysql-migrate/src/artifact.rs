//! Backup artifact naming and lookup
//!
//! Artifacts live flat in the backup directory as `{database}_{timestamp}.sql`.
//! The most recent artifact is chosen by filesystem creation time, not by name.

use chrono::{DateTime, Local};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
pub const EXTENSION: &str = "sql";
const PARTIAL_SUFFIX: &str = ".partial";

/// File name of a dump of `database` taken at `taken_at`.
pub fn artifact_file_name(database: &str, taken_at: DateTime<Local>) -> String {
    format!(
        "{}_{}.{}",
        database,
        taken_at.format(TIMESTAMP_FORMAT),
        EXTENSION
    )
}

/// Path a dump is written to before it is known to be complete.
pub fn partial_path(artifact: &Path) -> PathBuf {
    let mut name = OsString::from(artifact.as_os_str());
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Whether `file_name` is an artifact of `database`.
///
/// The part between `{database}_` and `.sql` must be a timestamp of the form
/// `<digits>_<digits>`, so `app` does not pick up `app_2_*.sql` or
/// `app_archive_*.sql`.
pub fn matches_database(file_name: &str, database: &str) -> bool {
    let Some(rest) = file_name
        .strip_prefix(database)
        .and_then(|rest| rest.strip_prefix('_'))
    else {
        return false;
    };
    let Some(stamp) = rest
        .strip_suffix(EXTENSION)
        .and_then(|rest| rest.strip_suffix('.'))
    else {
        return false;
    };

    is_timestamp(stamp)
}

fn is_timestamp(stamp: &str) -> bool {
    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    match stamp.split_once('_') {
        Some((date, time)) => all_digits(date) && all_digits(time),
        None => false,
    }
}

/// Leftover `.partial` dumps of `database` from interrupted runs.
pub fn stale_partials(dir: &Path, database: &str) -> io::Result<Vec<PathBuf>> {
    let mut stale = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(artifact_name) = file_name
            .to_str()
            .and_then(|name| name.strip_suffix(PARTIAL_SUFFIX))
        else {
            continue;
        };
        if matches_database(artifact_name, database) {
            stale.push(entry.path());
        }
    }
    stale.sort();
    Ok(stale)
}

/// Find the most recently created artifact of `database` in `dir`.
pub fn find_latest_artifact(dir: &Path, database: &str) -> io::Result<Option<PathBuf>> {
    let mut candidates = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if !matches_database(file_name, database) {
            continue;
        }

        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let created = metadata.created().or_else(|_| metadata.modified())?;
        candidates.push((entry.path(), created));
    }

    Ok(select_latest(candidates))
}

/// Pick the candidate with the latest time, ties broken by path.
fn select_latest(candidates: Vec<(PathBuf, SystemTime)>) -> Option<PathBuf> {
    candidates
        .into_iter()
        .max_by(|(a_path, a_time), (b_path, b_time)| {
            a_time.cmp(b_time).then_with(|| a_path.cmp(b_path))
        })
        .map(|(path, _)| path)
}

/// Bytes to megabytes for log lines.
pub fn size_mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
