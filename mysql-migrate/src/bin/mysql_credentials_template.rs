//! Write a sample credential sheet to fill in and rename
//!
//! The output path defaults to `database_credentials_SAMPLE.xlsx` and can be
//! overridden with `MYSQL_MIGRATE_TEMPLATE_FILE`.

use common::{init_logging, ConfigExt};
use mysql_migrate::template::{write_template, HEADERS, TEMPLATE_FILE};
use mysql_migrate::{restrict_umask, RunContext};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

fn main() -> ExitCode {
    restrict_umask();

    let ctx = RunContext::from_env();
    let _guard = init_logging("template", &ctx.log_dir);

    let path = PathBuf::from(String::env_or("MYSQL_MIGRATE_TEMPLATE_FILE", TEMPLATE_FILE));
    if let Err(e) = write_template(&path) {
        error!(error = %format!("{:#}", e), "Template not written");
        return ExitCode::FAILURE;
    }

    info!(path = %path.display(), "Sample credential sheet created");
    info!("Columns: {}", HEADERS.join(", "));
    info!(
        "Fill in your database credentials and save the file as '{}'",
        ctx.credentials_file.display()
    );
    ExitCode::SUCCESS
}
