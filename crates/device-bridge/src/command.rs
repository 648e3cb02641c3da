//! Device Command Execution
//!
//! Runs external device-control commands and captures their output.

use std::fmt;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, warn};

/// Command execution errors
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with code {code:?}: {stderr}")]
    NonZeroExit {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

impl ExecError {
    /// Exit code of the failed command, if it ran at all.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecError::NonZeroExit { code, .. } => *code,
            ExecError::Spawn { .. } => None,
        }
    }
}

/// A fully-formed external command invocation.
///
/// Stateless; built per call with the builder methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCommand {
    program: String,
    args: Vec<String>,
}

impl DeviceCommand {
    /// Create a command for the given program
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append a single argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The program being invoked
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The argument vector
    pub fn argv(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured output of a finished command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Executes device commands.
///
/// Implementations must surface non-zero exits and spawn failures as
/// [`ExecError`]; retry policy belongs to callers.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion, capturing stdout and stderr.
    async fn run(&self, command: &DeviceCommand) -> Result<CommandOutput, ExecError>;

    /// Run the command to completion, tracing each output line as it
    /// arrives. Returns the exit code (always 0 on success).
    async fn run_streamed(&self, command: &DeviceCommand) -> Result<i32, ExecError>;
}

/// Runs commands as real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &DeviceCommand) -> Result<CommandOutput, ExecError> {
        debug!("Executing: {}", command);

        let output = Command::new(command.program())
            .args(command.argv())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ExecError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !stdout.is_empty() {
            debug!("stdout: {}", stdout.trim_end());
        }
        if !stderr.is_empty() {
            warn!("stderr: {}", stderr.trim_end());
        }

        if !output.status.success() {
            error!("Command failed ({}): {}", output.status, command);
            return Err(ExecError::NonZeroExit {
                command: command.to_string(),
                code: output.status.code(),
                stderr,
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }

    async fn run_streamed(&self, command: &DeviceCommand) -> Result<i32, ExecError> {
        debug!("Executing (streamed): {}", command);

        let mut child = Command::new(command.program())
            .args(command.argv())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExecError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut captured = String::new();
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!("stderr: {}", line);
                    captured.push_str(&line);
                    captured.push('\n');
                }
                captured
            })
        });

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("stdout: {}", line);
            }
        }

        let status = child.wait().await.map_err(|source| ExecError::Spawn {
            command: command.to_string(),
            source,
        })?;

        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            error!("Command failed ({}): {}", status, command);
            return Err(ExecError::NonZeroExit {
                command: command.to_string(),
                code: status.code(),
                stderr,
            });
        }

        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_display() {
        let cmd = DeviceCommand::new("adb").args(["shell", "getprop", "sys.boot_completed"]);
        assert_eq!(cmd.to_string(), "adb shell getprop sys.boot_completed");
        assert_eq!(cmd.program(), "adb");
        assert_eq!(cmd.argv().len(), 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captures_stdout() {
        let runner = ProcessRunner::new();
        let cmd = DeviceCommand::new("echo").arg("hello");
        let output = runner.run(&cmd).await.unwrap();
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_nonzero_exit_carries_code_and_stderr() {
        let runner = ProcessRunner::new();
        let cmd = DeviceCommand::new("sh").args(["-c", "echo oops >&2; exit 3"]);
        let err = runner.run(&cmd).await.unwrap_err();
        match err {
            ExecError::NonZeroExit { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert!(stderr.contains("oops"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_spawn_failure() {
        let runner = ProcessRunner::new();
        let cmd = DeviceCommand::new("/nonexistent/avdpilot-no-such-binary");
        let err = runner.run(&cmd).await.unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
        assert_eq!(err.exit_code(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_streamed_exit_codes() {
        let runner = ProcessRunner::new();

        let ok = DeviceCommand::new("sh").args(["-c", "echo line1; echo line2"]);
        assert_eq!(runner.run_streamed(&ok).await.unwrap(), 0);

        let failing = DeviceCommand::new("sh").args(["-c", "echo bad >&2; exit 7"]);
        let err = runner.run_streamed(&failing).await.unwrap_err();
        assert_eq!(err.exit_code(), Some(7));
    }
}
