//! Command execution backends
//!
//! The core hands literal command text to a [`CommandExecutor`]; quoting,
//! sandboxing and allow-listing belong to the backend.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use metaagent_config::{ExecutorBackend, ExecutorConfig};

pub mod docker;
pub mod local;
pub mod policy;

pub use docker::DockerExecutor;
pub use local::LocalExecutor;
pub use policy::{CommandPolicy, GuardedExecutor};

/// Maximum bytes kept from each captured stream
pub const MAX_OUTPUT_BYTES: usize = 10_000;

/// Backend failures. A command that runs and fails is not an error.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("◆ EXECUTOR UNAVAILABLE: {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// How a command finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Code(i32),
    /// Terminated by a signal, no exit code.
    Signaled,
    TimedOut,
    /// Rejected before running.
    Denied,
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Code(code) => write!(f, "exit code {}", code),
            ExitStatus::Signaled => write!(f, "killed by signal"),
            ExitStatus::TimedOut => write!(f, "timed out"),
            ExitStatus::Denied => write!(f, "denied"),
        }
    }
}

/// Captured result of one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.status == ExitStatus::Code(0)
    }

    pub fn completed(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            status: ExitStatus::Code(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            status: ExitStatus::Denied,
            stdout: String::new(),
            stderr: reason.into(),
        }
    }

    pub fn timed_out(after: Duration) -> Self {
        Self {
            status: ExitStatus::TimedOut,
            stdout: String::new(),
            stderr: format!("Command timed out after {} seconds", after.as_secs()),
        }
    }

    /// Text reported for this command: stdout on success, otherwise the
    /// error stream (falling back to stdout, then to the exit status)
    pub fn report(&self) -> String {
        if self.success() {
            if self.stdout.is_empty() {
                "(no output)".to_string()
            } else {
                self.stdout.clone()
            }
        } else if !self.stderr.trim().is_empty() {
            self.stderr.clone()
        } else if !self.stdout.trim().is_empty() {
            self.stdout.clone()
        } else {
            format!("Command failed ({})", self.status)
        }
    }
}

/// Runs one shell command string
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, command: &str) -> Result<ExecOutput, ExecError>;

    /// One-line description of the environment, shown to the model
    fn describe(&self) -> String;
}

/// Build the configured backend behind the allow-list
pub fn from_config(config: &ExecutorConfig, working_dir: PathBuf) -> Arc<dyn CommandExecutor> {
    let policy = CommandPolicy::new(config.allowed_commands.clone());
    match config.backend {
        ExecutorBackend::Local => {
            info!("◆ EXECUTOR: LOCAL SHELL IN {}", working_dir.display());
            Arc::new(GuardedExecutor::new(
                LocalExecutor::new(config.timeout_secs, Some(working_dir)),
                policy,
            ))
        }
        ExecutorBackend::Docker => {
            info!("◆ EXECUTOR: DOCKER IMAGE {}", config.docker_image);
            Arc::new(GuardedExecutor::new(
                DockerExecutor::new(config.docker_image.clone(), config.timeout_secs),
                policy,
            ))
        }
    }
}

/// Cut `text` to at most `max` bytes on a char boundary, noting what was dropped
pub fn truncate_output(text: String, max: usize) -> String {
    if text.len() <= max {
        return text;
    }
    let mut cut = max;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!(
        "{}\n◆ OUTPUT TRUNCATED: {} BYTES REMAINING",
        &text[..cut],
        text.len() - cut
    )
}

/// Spawn `cmd` with piped output and wait for it, bounded by `timeout`
pub(crate) async fn run_process(
    mut cmd: Command,
    program: &str,
    timeout: Duration,
) -> Result<ExecOutput, ExecError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|source| ExecError::Spawn {
        program: program.to_string(),
        source,
    })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(source)) => {
            return Err(ExecError::Spawn {
                program: program.to_string(),
                source,
            })
        }
        Err(_) => {
            debug!("◆ {} TIMED OUT AFTER {:?}", program, timeout);
            return Ok(ExecOutput::timed_out(timeout));
        }
    };

    let status = match output.status.code() {
        Some(code) => ExitStatus::Code(code),
        None => ExitStatus::Signaled,
    };

    Ok(ExecOutput {
        status,
        stdout: truncate_output(
            String::from_utf8_lossy(&output.stdout).into_owned(),
            MAX_OUTPUT_BYTES,
        ),
        stderr: truncate_output(
            String::from_utf8_lossy(&output.stderr).into_owned(),
            MAX_OUTPUT_BYTES,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_success_uses_stdout() {
        let out = ExecOutput::completed(0, "file.txt\n", "warning");
        assert!(out.success());
        assert_eq!(out.report(), "file.txt\n");
    }

    #[test]
    fn test_report_success_without_output() {
        assert_eq!(ExecOutput::completed(0, "", "").report(), "(no output)");
    }

    #[test]
    fn test_report_failure_prefers_stderr() {
        let out = ExecOutput::completed(2, "partial", "ls: cannot access 'x'");
        assert!(!out.success());
        assert_eq!(out.report(), "ls: cannot access 'x'");
    }

    #[test]
    fn test_report_failure_falls_back() {
        assert_eq!(ExecOutput::completed(1, "oops", "").report(), "oops");
        assert_eq!(
            ExecOutput::completed(3, "", "").report(),
            "Command failed (exit code 3)"
        );
    }

    #[test]
    fn test_denied_and_timeout_are_failures() {
        let denied = ExecOutput::denied("nope");
        assert!(!denied.success());
        assert_eq!(denied.report(), "nope");

        let timed_out = ExecOutput::timed_out(Duration::from_secs(5));
        assert!(!timed_out.success());
        assert!(timed_out.report().contains("5 seconds"));
    }

    #[test]
    fn test_truncate_output_short_is_untouched() {
        assert_eq!(truncate_output("abc".to_string(), 10), "abc");
    }

    #[test]
    fn test_truncate_output_respects_char_boundary() {
        let text = "ééééé".to_string(); // 10 bytes
        let cut = truncate_output(text, 3);
        assert!(cut.starts_with('é'));
        assert!(cut.contains("8 BYTES REMAINING"));
    }
}
