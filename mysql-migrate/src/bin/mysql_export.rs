//! Export every database listed in the credential sheet with mysqldump
//!
//! Exits 1 if any dump failed, on fatal setup errors, or when interrupted.

use anyhow::Result;
use common::{init_logging, TokioRunner};
use mysql_migrate::{load_credentials, restrict_umask, Exporter, RunContext};
use std::process::ExitCode;
use tokio::signal;
use tracing::{error, info, warn};

async fn run(ctx: &RunContext) -> Result<bool> {
    let rule = "=".repeat(60);
    info!("{}", rule);
    info!("MySQL Database Export Tool");
    info!("{}", rule);

    info!(path = %ctx.credentials_file.display(), "Reading credentials");
    let records = load_credentials(&ctx.credentials_file)?;
    info!("Found {} databases to backup", records.len());

    let summary = Exporter::new(ctx, &TokioRunner).run(&records).await?;

    summary.log("Backup Summary", false);
    info!(
        "Backup location: {}",
        std::fs::canonicalize(&ctx.backup_dir)
            .unwrap_or_else(|_| ctx.backup_dir.clone())
            .display()
    );
    info!("Log file: {}", ctx.log_file_display());
    info!("{}", rule);

    if summary.all_succeeded() {
        info!("All backups completed successfully");
    } else {
        warn!("Some backups failed. Please check the log file for details.");
    }
    Ok(summary.all_succeeded())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    restrict_umask();

    let ctx = RunContext::from_env();
    let guard = init_logging("export", &ctx.log_dir);
    let ctx = ctx.with_log_file(guard.log_file());

    let outcome = tokio::select! {
        result = run(&ctx) => Some(result),
        _ = signal::ctrl_c() => None,
    };

    let code = match outcome {
        Some(Ok(true)) => ExitCode::SUCCESS,
        Some(Ok(false)) => ExitCode::FAILURE,
        Some(Err(e)) => {
            error!(error = %format!("{:#}", e), "Export aborted");
            ExitCode::FAILURE
        }
        None => {
            warn!("Backup interrupted by user");
            ExitCode::FAILURE
        }
    };

    drop(guard);
    code
}
