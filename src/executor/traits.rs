//! Command description and the runner seam
//!
//! Every external tool invocation in btbuild goes through a [`CommandRunner`].
//! The builder and bootstrapper are generic over it so tests can script the
//! expected invocations instead of spawning real toolchains.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use crate::error::{suggest_fix, BuildError};

use super::runner::{exec_command_sync, ExecOptions, ExecResult};
use super::stream::run_streaming;

/// A fully described external command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to execute (resolved through PATH)
    pub program: String,
    /// Arguments after the program name
    pub args: Vec<String>,
    /// Working directory (None = current directory)
    pub cwd: Option<PathBuf>,
    /// Complete environment for the child (None = inherit ours)
    pub env: Option<BTreeMap<OsString, OsString>>,
}

impl CommandSpec {
    /// Create a command for `program` with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Add a single argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Replace the child's environment
    pub fn with_env(mut self, env: BTreeMap<OsString, OsString>) -> Self {
        self.env = Some(env);
        self
    }

    /// First argument, if any
    pub fn first_arg(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    /// Human-readable command line
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    /// Build a std command with cwd and environment applied
    pub(crate) fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(ref dir) = self.cwd {
            cmd.current_dir(dir);
        }
        if let Some(ref env) = self.env {
            cmd.env_clear();
            cmd.envs(env);
        }
        cmd
    }
}

/// Interface for running external tools
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner {
    /// Run a build step, echoing stdout to the console and to `<label>.log`
    ///
    /// # Errors
    /// * `BuildError::CommandFailed` - the process exited non-zero
    /// * `BuildError::SpawnFailed` - the program could not be started
    /// * `BuildError::Io` - console or log file writes failed
    fn run_logged(&self, label: &str, spec: &CommandSpec) -> Result<(), BuildError>;

    /// Run a command with inherited stdio and an optional wall-clock limit
    ///
    /// # Errors
    /// * `BuildError::Timeout` - the limit expired; the child was killed
    /// * `BuildError::CommandFailed` - the process exited non-zero
    fn run(&self, spec: &CommandSpec, timeout: Option<Duration>) -> Result<(), BuildError>;

    /// Run a command and return its combined stdout and stderr
    ///
    /// # Errors
    /// * `BuildError::CommandFailed` - the process exited non-zero
    fn output(&self, spec: &CommandSpec) -> Result<String, BuildError>;

    /// Run a command and return its stdout alone
    fn stdout(&self, spec: &CommandSpec) -> Result<String, BuildError>;
}

/// Runner that spawns real processes
#[derive(Debug, Clone)]
pub struct SystemRunner {
    /// Directory receiving per-label log files
    log_dir: PathBuf,
}

impl SystemRunner {
    /// Create a runner writing step logs under `log_dir`
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
        }
    }

    /// Run `spec` to completion, failing on a non-zero exit
    fn exec(
        &self,
        spec: &CommandSpec,
        timeout: Option<Duration>,
        capture_output: bool,
    ) -> Result<ExecResult, BuildError> {
        let options = ExecOptions {
            timeout,
            capture_output,
        };
        let result = exec_command_sync(spec, &options)?;
        if result.success {
            return Ok(result);
        }

        let command = spec.display();
        Err(BuildError::CommandFailed {
            suggestion: suggest_fix(&command, &result.stderr),
            command,
            exit_code: result.exit_code,
        })
    }
}

impl CommandRunner for SystemRunner {
    fn run_logged(&self, label: &str, spec: &CommandSpec) -> Result<(), BuildError> {
        run_streaming(label, spec, &self.log_dir)
    }

    fn run(&self, spec: &CommandSpec, timeout: Option<Duration>) -> Result<(), BuildError> {
        self.exec(spec, timeout, false).map(|_| ())
    }

    fn output(&self, spec: &CommandSpec) -> Result<String, BuildError> {
        let result = self.exec(spec, None, true)?;
        Ok(format!("{}{}", result.stdout, result.stderr))
    }

    fn stdout(&self, spec: &CommandSpec) -> Result<String, BuildError> {
        Ok(self.exec(spec, None, true)?.stdout)
    }
}
