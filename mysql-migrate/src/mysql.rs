//! mysqldump / mysql invocations
//!
//! Credentials reach the client through a private option file passed with
//! `--defaults-extra-file`, never through argv. The provisioning script is
//! streamed on stdin with quoted identifiers and literals.

use crate::context::RunContext;
use crate::credentials::DatabaseRecord;
use anyhow::{Context, Result};
use common::{CommandSpec, Input, Output};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Temporary `[client]` option file, removed when dropped.
///
/// Created with mode 0600 on unix.
pub struct OptionFile {
    file: NamedTempFile,
}

impl OptionFile {
    pub fn create(host: &str, user: &str, password: &str) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("mysql-migrate-")
            .suffix(".cnf")
            .tempfile()
            .context("Failed to create MySQL option file")?;

        file.write_all(option_file_contents(host, user, password).as_bytes())
            .context("Failed to write MySQL option file")?;
        file.flush().context("Failed to write MySQL option file")?;

        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Must be the first argument given to the client.
    pub fn defaults_arg(&self) -> String {
        format!("--defaults-extra-file={}", self.path().display())
    }
}

pub fn option_file_contents(host: &str, user: &str, password: &str) -> String {
    format!(
        "[client]\nhost={}\nuser={}\npassword={}\n",
        escape_option_value(host),
        escape_option_value(user),
        escape_option_value(password)
    )
}

/// Double-quote a value for a MySQL option file.
pub fn escape_option_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Backtick-quote a schema name.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Single-quote a string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

/// Idempotent DDL/DCL creating the record's schema, user and grants.
pub fn provision_script(record: &DatabaseRecord) -> String {
    let db = quote_identifier(&record.name);
    let account = format!(
        "{}@{}",
        quote_literal(&record.username),
        quote_literal(&record.host)
    );

    format!(
        "CREATE DATABASE IF NOT EXISTS {db};\n\
         CREATE USER IF NOT EXISTS {account} IDENTIFIED BY {password};\n\
         GRANT ALL PRIVILEGES ON {db}.* TO {account};\n\
         FLUSH PRIVILEGES;\n",
        db = db,
        account = account,
        password = quote_literal(record.password()),
    )
}

/// `mysqldump` of one database streamed into `output`.
pub fn dump_command(
    ctx: &RunContext,
    record: &DatabaseRecord,
    options: &OptionFile,
    output: &Path,
) -> CommandSpec {
    CommandSpec::new(&ctx.mysqldump_bin, ctx.timeouts.dump)
        .arg(options.defaults_arg())
        .args([
            "--single-transaction",
            "--routines",
            "--triggers",
            "--events",
            "--add-drop-database",
            "--databases",
        ])
        .arg(&record.name)
        .stdout(Output::File(output.to_path_buf()))
}

/// `mysql` as the admin account, reading the provisioning script on stdin.
pub fn provision_command(
    ctx: &RunContext,
    record: &DatabaseRecord,
    admin_options: &OptionFile,
) -> CommandSpec {
    CommandSpec::new(&ctx.mysql_bin, ctx.timeouts.provision)
        .arg(admin_options.defaults_arg())
        .stdin(Input::Bytes(provision_script(record).into_bytes()))
}

/// `mysql` as the record's own user, replaying `artifact` on stdin.
pub fn restore_command(
    ctx: &RunContext,
    record: &DatabaseRecord,
    options: &OptionFile,
    artifact: &Path,
) -> CommandSpec {
    CommandSpec::new(&ctx.mysql_bin, ctx.timeouts.restore)
        .arg(options.defaults_arg())
        .arg(&record.name)
        .stdin(Input::File(artifact.to_path_buf()))
}
