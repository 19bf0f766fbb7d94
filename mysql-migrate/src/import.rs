//! Import orchestration
//!
//! For every record, in order:
//! 1. locate the newest artifact in the backup directory (none: skipped)
//! 2. provision the schema, user and grants as the admin account
//! 3. replay the artifact as the record's own user

use crate::admin::{AdminCredentials, AdminCredentialsProvider};
use crate::artifact::{find_latest_artifact, size_mb};
use crate::context::RunContext;
use crate::credentials::{load_credentials, DatabaseRecord};
use crate::mysql::{provision_command, restore_command, OptionFile};
use crate::summary::{RecordOutcome, RunSummary};
use anyhow::{anyhow, bail, Context, Result};
use common::{CommandSpec, ProcessRunner};
use std::path::Path;
use tracing::{error, info, warn};

/// Fail when there is no backup directory to import from.
pub fn check_backup_dir(ctx: &RunContext) -> Result<()> {
    let dir = &ctx.backup_dir;
    if !dir.is_dir() {
        bail!("Backup directory not found: {}", dir.display());
    }
    Ok(())
}

/// Run setup in order: backup directory, credential sheet, then admin
/// credentials. The provider is only consulted once the others succeeded.
pub fn prepare(
    ctx: &RunContext,
    provider: &mut dyn AdminCredentialsProvider,
) -> Result<(Vec<DatabaseRecord>, AdminCredentials)> {
    check_backup_dir(ctx)?;

    info!(path = %ctx.credentials_file.display(), "Reading credentials");
    let records = load_credentials(&ctx.credentials_file)?;
    info!("Found {} databases to import", records.len());

    info!("MySQL root credentials are required to create databases and users");
    let admin = provider.obtain()?;
    Ok((records, admin))
}

pub struct Importer<'a, R: ProcessRunner + ?Sized> {
    ctx: &'a RunContext,
    runner: &'a R,
    admin: AdminCredentials,
}

impl<'a, R: ProcessRunner + ?Sized> Importer<'a, R> {
    pub fn new(ctx: &'a RunContext, runner: &'a R, admin: AdminCredentials) -> Self {
        Self { ctx, runner, admin }
    }

    /// Import every record. A missing backup directory is fatal.
    pub async fn run(&self, records: &[DatabaseRecord]) -> Result<RunSummary> {
        check_backup_dir(self.ctx)?;

        let total = records.len();
        let mut summary = RunSummary::new(total);

        for (idx, record) in records.iter().enumerate() {
            let rule = "=".repeat(60);
            info!("{}", rule);
            info!("[{}/{}] Processing {}", idx + 1, total, record.name);
            info!("{}", rule);
            summary.record(self.import_one(record).await);
        }

        Ok(summary)
    }

    pub async fn import_one(&self, record: &DatabaseRecord) -> RecordOutcome {
        let artifact = match find_latest_artifact(&self.ctx.backup_dir, &record.name) {
            Ok(Some(path)) => path,
            Ok(None) => {
                warn!(database = %record.name, "No backup file found, skipping");
                return RecordOutcome::Skipped;
            }
            Err(e) => {
                error!(database = %record.name, error = %e, "Failed to scan backup directory");
                return RecordOutcome::Failed;
            }
        };

        info!(
            database = %record.name,
            backup = %artifact.file_name().unwrap_or_default().to_string_lossy(),
            "Found backup"
        );

        if let Err(e) = self.provision(record).await {
            error!(
                database = %record.name,
                error = %format!("{:#}", e),
                "Database/user setup failed, skipping import"
            );
            return RecordOutcome::Failed;
        }

        match self.restore(record, &artifact).await {
            Ok(bytes) => {
                info!(
                    database = %record.name,
                    size_mb = %format!("{:.2}", size_mb(bytes)),
                    "Import successful"
                );
                RecordOutcome::Succeeded
            }
            Err(e) => {
                error!(database = %record.name, error = %format!("{:#}", e), "Import failed");
                RecordOutcome::Failed
            }
        }
    }

    async fn provision(&self, record: &DatabaseRecord) -> Result<()> {
        info!(database = %record.name, user = %record.username, host = %record.host, "Creating database and user");

        let options = OptionFile::create(&self.admin.host, &self.admin.user, self.admin.password())?;
        let spec = provision_command(self.ctx, record, &options);
        self.run_checked(&spec).await?;

        info!(database = %record.name, "Database and user ready");
        Ok(())
    }

    async fn restore(&self, record: &DatabaseRecord, artifact: &Path) -> Result<u64> {
        info!(database = %record.name, "Importing backup");

        let bytes = std::fs::metadata(artifact)
            .with_context(|| format!("Failed to stat {}", artifact.display()))?
            .len();

        let options = OptionFile::create(&record.host, &record.username, record.password())?;
        let spec = restore_command(self.ctx, record, &options, artifact);
        self.run_checked(&spec).await?;

        Ok(bytes)
    }

    async fn run_checked(&self, spec: &CommandSpec) -> Result<()> {
        let output = self.runner.run(spec).await?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedRunner, Step};
    use common::Input;
    use tempfile::TempDir;

    fn admin() -> AdminCredentials {
        AdminCredentials::new("target", "root", "rootpw")
    }

    fn sales() -> DatabaseRecord {
        DatabaseRecord::new("sales", "alice", "pw1", "localhost")
    }

    fn backup_dir(tmp: &TempDir) -> RunContext {
        let dir = tmp.path().join("backups");
        std::fs::create_dir_all(&dir).unwrap();
        RunContext::new(dir)
    }

    #[tokio::test]
    async fn test_missing_artifact_is_skipped_without_processes() {
        let tmp = TempDir::new().unwrap();
        let ctx = backup_dir(&tmp);
        std::fs::write(ctx.backup_dir.join("hr_20240101_000000.sql"), "-- hr").unwrap();
        let runner = ScriptedRunner::new(vec![]);

        let summary = Importer::new(&ctx, &runner, admin())
            .run(&[sales()])
            .await
            .unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.succeeded, 0);
        assert!(!summary.all_succeeded());
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_provisioning_skips_restore() {
        let tmp = TempDir::new().unwrap();
        let ctx = backup_dir(&tmp);
        std::fs::write(ctx.backup_dir.join("sales_20240101_000000.sql"), "-- sales").unwrap();
        let runner = ScriptedRunner::new(vec![Step::fail(1)]);

        let summary = Importer::new(&ctx, &runner, admin())
            .run(&[sales()])
            .await
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_provision_then_restore() {
        let tmp = TempDir::new().unwrap();
        let ctx = backup_dir(&tmp);
        let artifact = ctx.backup_dir.join("sales_20240101_000000.sql");
        std::fs::write(&artifact, "CREATE TABLE orders (id INT);\n").unwrap();
        let runner = ScriptedRunner::new(vec![Step::ok(""), Step::ok("")]);

        let summary = Importer::new(&ctx, &runner, admin())
            .run(&[sales()])
            .await
            .unwrap();

        assert_eq!(summary.succeeded, 1);
        assert!(summary.all_succeeded());

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);

        let provision = &calls[0];
        assert_eq!(provision.spec.program, "mysql");
        assert_eq!(provision.spec.args.len(), 1);
        assert!(provision.option_file.contains("host=\"target\""));
        assert!(provision.option_file.contains("password=\"rootpw\""));
        assert!(provision
            .stdin_text()
            .contains("CREATE DATABASE IF NOT EXISTS `sales`;"));
        assert!(provision
            .stdin_text()
            .contains("GRANT ALL PRIVILEGES ON `sales`.* TO 'alice'@'localhost';"));

        let restore = &calls[1];
        assert_eq!(restore.spec.args.last().unwrap(), "sales");
        assert_eq!(restore.spec.stdin, Input::File(artifact));
        assert_eq!(restore.stdin_text(), "CREATE TABLE orders (id INT);\n");
        assert!(restore.option_file.contains("user=\"alice\""));
        assert!(restore.option_file.contains("password=\"pw1\""));
        assert_eq!(restore.spec.timeout, ctx.timeouts.restore);
    }

    #[tokio::test]
    async fn test_restore_timeout_is_failure() {
        let tmp = TempDir::new().unwrap();
        let ctx = backup_dir(&tmp);
        std::fs::write(ctx.backup_dir.join("sales_20240101_000000.sql"), "-- sales").unwrap();
        let runner = ScriptedRunner::new(vec![Step::ok(""), Step::Hang { body: "" }]);

        let summary = Importer::new(&ctx, &runner, admin())
            .run(&[sales()])
            .await
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(runner.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_mixed_outcomes_are_counted_separately() {
        let tmp = TempDir::new().unwrap();
        let ctx = backup_dir(&tmp);
        std::fs::write(ctx.backup_dir.join("sales_20240101_000000.sql"), "-- sales").unwrap();
        std::fs::write(ctx.backup_dir.join("hr_20240101_000000.sql"), "-- hr").unwrap();
        let runner = ScriptedRunner::new(vec![
            Step::ok(""),
            Step::ok(""),
            Step::ok(""),
            Step::fail(1),
        ]);
        let records = vec![
            sales(),
            DatabaseRecord::new("crm", "carol", "pw3", ""),
            DatabaseRecord::new("hr", "bob", "pw2", ""),
        ];

        let summary = Importer::new(&ctx, &runner, admin())
            .run(&records)
            .await
            .unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(runner.calls().len(), 4);
    }

    struct CountingProvider {
        calls: usize,
    }

    impl AdminCredentialsProvider for CountingProvider {
        fn obtain(&mut self) -> Result<AdminCredentials> {
            self.calls += 1;
            Ok(admin())
        }
    }

    fn write_sheet(path: &Path) {
        std::fs::write(
            path,
            "database_name,username,password,host\nsales,alice,pw1,localhost\n",
        )
        .unwrap();
    }

    #[test]
    fn test_prepare_checks_backup_dir_before_prompting() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = RunContext::new(tmp.path().join("absent"));
        ctx.credentials_file = tmp.path().join("database_credentials.csv");
        write_sheet(&ctx.credentials_file);
        let mut provider = CountingProvider { calls: 0 };

        let err = prepare(&ctx, &mut provider).unwrap_err();

        assert!(err.to_string().starts_with("Backup directory not found"));
        assert_eq!(provider.calls, 0);
    }

    #[test]
    fn test_prepare_reads_sheet_before_prompting() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = backup_dir(&tmp);
        ctx.credentials_file = tmp.path().join("missing.csv");
        let mut provider = CountingProvider { calls: 0 };

        assert!(prepare(&ctx, &mut provider).is_err());
        assert_eq!(provider.calls, 0);
    }

    #[test]
    fn test_prepare_obtains_admin_last() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = backup_dir(&tmp);
        ctx.credentials_file = tmp.path().join("database_credentials.csv");
        write_sheet(&ctx.credentials_file);
        let mut provider = CountingProvider { calls: 0 };

        let (records, admin) = prepare(&ctx, &mut provider).unwrap();

        assert_eq!(provider.calls, 1);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "sales");
        assert_eq!(admin.user, "root");
    }

    #[tokio::test]
    async fn test_missing_backup_dir_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let ctx = RunContext::new(tmp.path().join("absent"));
        let runner = ScriptedRunner::new(vec![]);

        let err = Importer::new(&ctx, &runner, admin())
            .run(&[sales()])
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("Backup directory not found"));
        assert!(runner.calls().is_empty());
    }
}
