//! Scripted process runner for orchestrator tests

use async_trait::async_trait;
use common::{CommandError, CommandOutput, CommandSpec, Input, Output, ProcessRunner};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// What the next invocation does.
pub enum Step {
    /// Exit with `code`, writing `body` to stdout.
    Exit { code: i32, body: &'static str },
    /// Write `body` to stdout, then time out.
    Hang { body: &'static str },
    /// Fail to spawn.
    Missing,
}

impl Step {
    pub fn ok(body: &'static str) -> Self {
        Self::Exit { code: 0, body }
    }

    pub fn fail(code: i32) -> Self {
        Self::Exit {
            code,
            body: "-- partial dump",
        }
    }
}

/// One recorded call: the spec plus what the child could see of it.
pub struct Call {
    pub spec: CommandSpec,
    pub option_file: String,
    pub stdin: Vec<u8>,
}

impl Call {
    pub fn stdin_text(&self) -> String {
        String::from_utf8_lossy(&self.stdin).into_owned()
    }
}

#[derive(Default)]
pub struct ScriptedRunner {
    steps: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedRunner {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> std::sync::MutexGuard<'_, Vec<Call>> {
        self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        // Option files only exist while the child runs, so read them now.
        let option_file = spec
            .args
            .first()
            .and_then(|arg| arg.strip_prefix("--defaults-extra-file="))
            .and_then(|path| std::fs::read_to_string(path).ok())
            .unwrap_or_default();
        let stdin = match &spec.stdin {
            Input::Null => Vec::new(),
            Input::Bytes(bytes) => bytes.clone(),
            Input::File(path) => std::fs::read(path).unwrap_or_default(),
        };
        self.calls.lock().unwrap().push(Call {
            spec: spec.clone(),
            option_file,
            stdin,
        });

        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Step::ok(""));

        let write_stdout = |body: &str| {
            if let Output::File(path) = &spec.stdout {
                std::fs::write(path, body).unwrap();
            }
        };

        match step {
            Step::Exit { code, body } => {
                write_stdout(body);
                Ok(CommandOutput {
                    stdout: String::new(),
                    stderr: if code == 0 {
                        String::new()
                    } else {
                        "ERROR 1045 (28000): Access denied".to_string()
                    },
                    success: code == 0,
                    code: Some(code),
                })
            }
            Step::Hang { body } => {
                write_stdout(body);
                Err(CommandError::TimedOut {
                    program: spec.program.clone(),
                    after: Duration::from_secs(300),
                })
            }
            Step::Missing => Err(CommandError::Spawn {
                program: spec.program.clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
        }
    }
}
