//! Command execution utilities
//!
//! Child processes are described by a [`CommandSpec`] and executed through a
//! [`ProcessRunner`], so callers can inject a scripted runner in tests.
//! Every invocation carries its own wall-clock timeout.

use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Source of a child's standard input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Null,
    File(PathBuf),
    Bytes(Vec<u8>),
}

/// Destination of a child's standard output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Capture,
    /// Truncate or create the file and stream stdout into it.
    File(PathBuf),
}

/// A fully described child process invocation.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Input,
    pub stdout: Output,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: Input::Null,
            stdout: Output::Capture,
            timeout,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin(mut self, stdin: Input) -> Self {
        self.stdin = stdin;
        self
    }

    pub fn stdout(mut self, stdout: Output) -> Self {
        self.stdout = stdout;
        self
    }
}

/// Result of a command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub code: Option<i32>,
}

impl CommandOutput {
    /// Exit code for log lines, `signal` when the child was killed.
    pub fn code_display(&self) -> String {
        self.code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string())
    }
}

/// Errors raised before a child produced an exit status.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program}: failed to {action}: {source}")]
    Io {
        program: String,
        action: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{program} timed out after {}s", after.as_secs())]
    TimedOut { program: String, after: Duration },
}

impl CommandError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// Capability to run a child process to completion.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError>;
}

/// Runs commands as real child processes on the tokio runtime.
///
/// Children are spawned with `kill_on_drop`, so a timed out or abandoned
/// invocation does not leave the process running.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioRunner;

#[async_trait]
impl ProcessRunner for TokioRunner {
    #[instrument(skip_all, fields(cmd = %spec.program))]
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        debug!(args = ?spec.args, timeout = ?spec.timeout, "Running command");

        let io_err = |action: &'static str| {
            let program = spec.program.clone();
            move |source: io::Error| CommandError::Io {
                program,
                action,
                source,
            }
        };

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut pending_input = None;
        match &spec.stdin {
            Input::Null => {
                cmd.stdin(Stdio::null());
            }
            Input::File(path) => {
                let file = File::open(path).map_err(io_err("open stdin file"))?;
                cmd.stdin(Stdio::from(file));
            }
            Input::Bytes(bytes) => {
                pending_input = Some(bytes.clone());
                cmd.stdin(Stdio::piped());
            }
        }

        match &spec.stdout {
            Output::Capture => {
                cmd.stdout(Stdio::piped());
            }
            Output::File(path) => {
                let file = OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(path)
                    .map_err(io_err("create stdout file"))?;
                cmd.stdout(Stdio::from(file));
            }
        }

        let mut child = cmd.spawn().map_err(|source| CommandError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        let stdin = child.stdin.take();
        let feed = async move {
            match (stdin, pending_input) {
                (Some(mut stdin), Some(bytes)) => {
                    let written = stdin.write_all(&bytes).await;
                    drop(stdin);
                    match written {
                        // The child may exit without reading its input.
                        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                        other => other,
                    }
                }
                _ => Ok(()),
            }
        };

        let finished = async {
            let (fed, output) = tokio::join!(feed, child.wait_with_output());
            fed.map_err(io_err("write stdin"))?;
            output.map_err(io_err("wait for child"))
        };

        let output = tokio::time::timeout(spec.timeout, finished)
            .await
            .map_err(|_| CommandError::TimedOut {
                program: spec.program.clone(),
                after: spec.timeout,
            })??;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            success: output.status.success(),
            code: output.status.code(),
        })
    }
}
