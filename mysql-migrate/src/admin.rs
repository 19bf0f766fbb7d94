//! Administrative credentials for provisioning databases and users

use anyhow::{bail, Context, Result};
use common::ConfigExt;
use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::fmt;
use std::io::{self, BufRead, Write};

pub const ADMIN_HOST_ENV: &str = "MYSQL_MIGRATE_ADMIN_HOST";
pub const ADMIN_USER_ENV: &str = "MYSQL_MIGRATE_ADMIN_USER";
pub const ADMIN_PASSWORD_ENV: &str = "MYSQL_MIGRATE_ADMIN_PASSWORD";

const DEFAULT_ADMIN_HOST: &str = "localhost";
const DEFAULT_ADMIN_USER: &str = "root";

/// Privileged account used only to create schemas, users and grants.
pub struct AdminCredentials {
    pub host: String,
    pub user: String,
    pub password: SecretString,
}

impl AdminCredentials {
    pub fn new(host: &str, user: &str, password: &str) -> Self {
        Self {
            host: host.to_string(),
            user: user.to_string(),
            password: SecretString::new(password.to_string()),
        }
    }

    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Source of administrative credentials, consulted once at run start.
pub trait AdminCredentialsProvider {
    fn obtain(&mut self) -> Result<AdminCredentials>;
}

/// Prompts for host, user and password on a console.
pub struct PromptProvider<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptProvider<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        self.input
            .read_line(&mut line)
            .context("Failed to read from console")?;
        Ok(line.trim().to_string())
    }
}

impl PromptProvider<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> AdminCredentialsProvider for PromptProvider<R, W> {
    fn obtain(&mut self) -> Result<AdminCredentials> {
        let host = self.ask("MySQL Root Host [localhost]: ")?;
        let user = self.ask("MySQL Root Username [root]: ")?;
        let password = self.ask("MySQL Root Password: ")?;

        if password.is_empty() {
            bail!("Root password cannot be empty");
        }

        Ok(AdminCredentials::new(
            or_default(&host, DEFAULT_ADMIN_HOST),
            or_default(&user, DEFAULT_ADMIN_USER),
            &password,
        ))
    }
}

/// Reads credentials from `MYSQL_MIGRATE_ADMIN_*` for unattended runs.
#[derive(Debug, Default)]
pub struct EnvProvider;

impl EnvProvider {
    /// Whether the environment carries an admin password.
    pub fn is_configured() -> bool {
        env::var_os(ADMIN_PASSWORD_ENV).is_some()
    }
}

impl AdminCredentialsProvider for EnvProvider {
    fn obtain(&mut self) -> Result<AdminCredentials> {
        let password = String::env_required(ADMIN_PASSWORD_ENV)?;
        if password.trim().is_empty() {
            bail!("Root password cannot be empty");
        }

        let host = String::env_or(ADMIN_HOST_ENV, DEFAULT_ADMIN_HOST);
        let user = String::env_or(ADMIN_USER_ENV, DEFAULT_ADMIN_USER);
        Ok(AdminCredentials::new(
            or_default(host.trim(), DEFAULT_ADMIN_HOST),
            or_default(user.trim(), DEFAULT_ADMIN_USER),
            password.trim(),
        ))
    }
}

/// Returns the same credentials every time.
pub struct FixedProvider {
    host: String,
    user: String,
    password: SecretString,
}

impl FixedProvider {
    pub fn new(host: &str, user: &str, password: &str) -> Self {
        Self {
            host: host.to_string(),
            user: user.to_string(),
            password: SecretString::new(password.to_string()),
        }
    }
}

impl AdminCredentialsProvider for FixedProvider {
    fn obtain(&mut self) -> Result<AdminCredentials> {
        Ok(AdminCredentials::new(
            &self.host,
            &self.user,
            self.password.expose_secret(),
        ))
    }
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.is_empty() {
        default
    } else {
        value
    }
}
