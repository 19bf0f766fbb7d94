//! Export orchestration
//!
//! Dumps every database in input order, one at a time. A dump is written to
//! a `.partial` file and only renamed to its final `.sql` name once
//! mysqldump exits 0, so failed or timed out dumps never leave an artifact.

use crate::artifact::{artifact_file_name, partial_path, size_mb, stale_partials};
use crate::context::RunContext;
use crate::credentials::DatabaseRecord;
use crate::mysql::{dump_command, OptionFile};
use crate::summary::{RecordOutcome, RunSummary};
use anyhow::{anyhow, Context, Result};
use chrono::Local;
use common::ProcessRunner;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, warn};

pub struct Exporter<'a, R: ProcessRunner + ?Sized> {
    ctx: &'a RunContext,
    runner: &'a R,
}

impl<'a, R: ProcessRunner + ?Sized> Exporter<'a, R> {
    pub fn new(ctx: &'a RunContext, runner: &'a R) -> Self {
        Self { ctx, runner }
    }

    /// Dump every record. Only backup directory setup is fatal.
    pub async fn run(&self, records: &[DatabaseRecord]) -> Result<RunSummary> {
        self.ensure_backup_dir().await?;

        let total = records.len();
        let mut summary = RunSummary::new(total);

        for (idx, record) in records.iter().enumerate() {
            info!("[{}/{}] Processing {}", idx + 1, total, record.name);
            summary.record(self.export_one(record).await);
        }

        Ok(summary)
    }

    async fn ensure_backup_dir(&self) -> Result<()> {
        let dir = &self.ctx.backup_dir;
        if !dir.exists() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create backup directory {}", dir.display()))?;
            info!(path = %dir.display(), "Created backup directory");
        }
        Ok(())
    }

    pub async fn export_one(&self, record: &DatabaseRecord) -> RecordOutcome {
        let artifact = self
            .ctx
            .backup_dir
            .join(artifact_file_name(&record.name, Local::now()));

        info!(database = %record.name, "Starting backup");
        self.remove_stale_partials(record).await;

        match self.dump(record, &artifact).await {
            Ok(bytes) => {
                info!(
                    database = %record.name,
                    file = %artifact.display(),
                    size_mb = %format!("{:.2}", size_mb(bytes)),
                    "Backup successful"
                );
                RecordOutcome::Succeeded
            }
            Err(e) => {
                error!(database = %record.name, error = %format!("{:#}", e), "Backup failed");
                RecordOutcome::Failed
            }
        }
    }

    /// Drop `.partial` dumps of this database left by an interrupted run.
    async fn remove_stale_partials(&self, record: &DatabaseRecord) {
        match stale_partials(&self.ctx.backup_dir, &record.name) {
            Ok(stale) => {
                for partial in stale {
                    info!(path = %partial.display(), "Removing unfinished backup from an earlier run");
                    discard(&partial).await;
                }
            }
            Err(e) => warn!(database = %record.name, error = %e, "Failed to scan for unfinished backups"),
        }
    }

    /// Dump into the partial file, then publish it. Returns the artifact size.
    async fn dump(&self, record: &DatabaseRecord, artifact: &Path) -> Result<u64> {
        let partial = partial_path(artifact);

        let result = match self.dump_to(record, &partial).await {
            Ok(()) => fs::rename(&partial, artifact)
                .await
                .context("Failed to move finished dump into place"),
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            discard(&partial).await;
            return Err(e);
        }

        let metadata = fs::metadata(artifact)
            .await
            .context("Failed to stat backup file")?;
        Ok(metadata.len())
    }

    async fn dump_to(&self, record: &DatabaseRecord, partial: &Path) -> Result<()> {
        let options = OptionFile::create(&record.host, &record.username, record.password())?;
        let spec = dump_command(self.ctx, record, &options, partial);

        let output = self.runner.run(&spec).await?;
        if output.success {
            Ok(())
        } else {
            Err(anyhow!(
                "{} failed (exit {}): {}",
                spec.program,
                output.code_display(),
                output.stderr
            ))
        }
    }
}

async fn discard(partial: &Path) {
    match fs::remove_file(partial).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %partial.display(), error = %e, "Failed to remove partial backup"),
    }
}
