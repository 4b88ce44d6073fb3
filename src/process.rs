//! External command execution with cancellation and timeouts.

use std::{
    ffi::{OsStr, OsString},
    fmt,
    path::Path,
    process::{Output, Stdio},
    time::Duration,
};

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::GgifError;

/// A program and its arguments, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl Invocation {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_os_string()));
        self
    }

    /// Program name for log and error messages.
    pub fn program_name(&self) -> String {
        Path::new(&self.program)
            .file_name()
            .unwrap_or(&self.program)
            .to_string_lossy()
            .into_owned()
    }

    /// Arguments as UTF-8, lossily.
    pub fn arg_strings(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Exit status and combined stdout/stderr of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub output: String,
}

impl CommandOutput {
    pub fn success() -> Self {
        Self {
            success: true,
            code: Some(0),
            output: String::new(),
        }
    }

    pub fn failure(code: i32) -> Self {
        Self {
            success: false,
            code: Some(code),
            output: String::new(),
        }
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Self {
            success: output.status.success(),
            code: output.status.code(),
            output: combined,
        }
    }
}

/// Seam between the pipeline and the operating system's process table.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the invocation to completion. A nonzero exit is not an error at
    /// this level; see [`execute`].
    async fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, GgifError>;
}

/// Runs commands with `tokio::process`, killing them on cancel or timeout.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, GgifError> {
        let program = invocation.program_name();
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Dropping the output future drops the child, which kills it.
        let output = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(GgifError::Cancelled),
            output = wait_output(&mut command, self.timeout, &program) => output?,
        };
        Ok(output.into())
    }
}

async fn wait_output(
    command: &mut Command,
    timeout: Option<Duration>,
    program: &str,
) -> Result<Output, GgifError> {
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, command.output())
            .await
            .map_err(|_| GgifError::Timeout {
                program: program.to_string(),
                seconds: limit.as_secs(),
            })?,
        None => command.output().await,
    };
    result.map_err(|err| GgifError::Spawn {
        program: program.to_string(),
        message: err.to_string(),
    })
}

/// Runs `invocation`, logs its output, and turns a nonzero exit into
/// [`GgifError::Command`].
pub async fn execute(
    runner: &dyn CommandRunner,
    invocation: &Invocation,
    cancel: &CancellationToken,
) -> Result<CommandOutput, GgifError> {
    debug!(command = %invocation, "running external command");
    let output = runner.run(invocation, cancel).await?;
    if !output.output.trim().is_empty() {
        debug!(program = %invocation.program_name(), output = %output.output.trim_end());
    }
    if output.success {
        Ok(output)
    } else {
        error!(
            program = %invocation.program_name(),
            code = ?output.code,
            output = %output.output.trim_end(),
            "external command failed"
        );
        Err(GgifError::Command {
            program: invocation.program_name(),
            code: output.code,
        })
    }
}
