//! # Process Invocation
//!
//! Thin async wrapper over `tokio::process` shared by the log sources and the
//! daemon control glue: optional privilege prefix, working directory, time budget,
//! captured output. Spawn failures and timeouts come back as [`AgentError`]s,
//! a non-zero exit is a normal [`CmdOutput`].

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::core::error::AgentError;
use crate::core::outcome::Outcome;

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Stderr if there is any, otherwise stdout. Used as failure detail.
    pub fn error_text(&self) -> &str {
        if self.stderr.trim().is_empty() { self.stdout.trim() } else { self.stderr.trim() }
    }
}

/// A command line to run once.
#[derive(Debug, Clone)]
pub struct Cmd {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new(), cwd: None, timeout: None }
    }

    /// `prefix[0] prefix[1..] program`; with an empty prefix this is just `program`.
    pub fn prefixed(prefix: &[String], program: impl Into<String>) -> Self {
        match prefix.split_first() {
            None => Self::new(program),
            Some((head, rest)) => {
                let mut cmd = Self::new(head.clone());
                cmd.args.extend(rest.iter().cloned());
                cmd.args.push(program.into());
                cmd
            }
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

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().to_string())
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Shell-like rendering for diagnostics.
    pub fn describe(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Runs to completion, capturing both streams.
    ///
    /// # Errors
    /// [`AgentError::ProcessError`] when the program cannot be spawned,
    /// [`AgentError::Timeout`] when the budget is exceeded (the child is killed).
    pub async fn run(&self) -> Result<CmdOutput, AgentError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.cwd {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|e| AgentError::ProcessError {
            program: self.program.clone(),
            details: e.to_string(),
        })?;

        let output = match self.timeout {
            Some(budget) => match tokio::time::timeout(budget, child.wait_with_output()).await {
                Ok(res) => res,
                Err(_) => {
                    return Err(AgentError::Timeout {
                        operation: self.describe(),
                        secs: budget.as_secs(),
                    });
                }
            },
            None => child.wait_with_output().await,
        }
        .map_err(|e| AgentError::ProcessError {
            program: self.program.clone(),
            details: e.to_string(),
        })?;

        Ok(CmdOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Runs and folds every result into an [`Outcome`] named after `description`.
    pub async fn run_step(&self, description: &str) -> Outcome {
        match self.run().await {
            Ok(out) if out.success() => Outcome::success(format!("{} completed", description)),
            Ok(out) => Outcome::failure(format!("Error in {}", description), out.error_text()),
            Err(AgentError::Timeout { .. }) => Outcome::timeout(format!("Timeout in {}", description)),
            Err(e) => Outcome::failure(format!("Exception in {}", description), e.to_string()),
        }
    }
}
