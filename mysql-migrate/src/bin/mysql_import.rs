//! Import the latest dump of every database listed in the credential sheet
//!
//! Creates each database and user with administrative credentials before
//! replaying its dump. Exits 1 if any import failed or was skipped, on fatal
//! setup errors, or when interrupted.

use anyhow::{Context, Result};
use common::{init_logging, TokioRunner};
use mysql_migrate::import::prepare;
use mysql_migrate::{
    restrict_umask, AdminCredentialsProvider, EnvProvider, Importer, PromptProvider, RunContext,
};
use std::process::ExitCode;
use tokio::signal;
use tracing::{error, info, warn};

fn admin_provider() -> Box<dyn AdminCredentialsProvider> {
    if EnvProvider::is_configured() {
        info!("Using MySQL root credentials from the environment");
        Box::new(EnvProvider)
    } else {
        Box::new(PromptProvider::stdio())
    }
}

async fn run(ctx: &RunContext) -> Result<bool> {
    let rule = "=".repeat(60);
    info!("{}", rule);
    info!("MySQL Database Import Tool");
    info!("{}", rule);

    // The prompt blocks on stdin, so setup runs off the runtime thread.
    let setup_ctx = ctx.clone();
    let (records, admin) = tokio::task::spawn_blocking(move || {
        let mut provider = admin_provider();
        prepare(&setup_ctx, provider.as_mut())
    })
    .await
    .context("Import setup aborted")??;

    let summary = Importer::new(ctx, &TokioRunner, admin).run(&records).await?;

    summary.log("Import Summary", true);
    info!("Log file: {}", ctx.log_file_display());
    info!("{}", rule);

    if summary.all_succeeded() {
        info!("All imports completed successfully");
    } else {
        warn!("Some imports failed or were skipped. Please check the log file for details.");
    }
    Ok(summary.all_succeeded())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    restrict_umask();

    let ctx = RunContext::from_env();
    let guard = init_logging("import", &ctx.log_dir);
    let ctx = ctx.with_log_file(guard.log_file());

    let outcome = tokio::select! {
        result = run(&ctx) => Some(result),
        _ = signal::ctrl_c() => None,
    };

    let code = match outcome {
        Some(Ok(true)) => ExitCode::SUCCESS,
        Some(Ok(false)) => ExitCode::FAILURE,
        Some(Err(e)) => {
            error!(error = %format!("{:#}", e), "Import aborted");
            ExitCode::FAILURE
        }
        None => {
            warn!("Import interrupted by user");
            drop(guard);
            // A pending console prompt would otherwise hold the runtime open.
            std::process::exit(1);
        }
    };

    drop(guard);
    code
}
