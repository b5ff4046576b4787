//! Allow-list hook in front of an executor.

use async_trait::async_trait;
use tracing::warn;

use super::{CommandExecutor, ExecError, ExecOutput};

/// Permitted first words of a command.
///
/// Rules:
/// - empty list -> everything passes
/// - `"*"` in the list -> everything passes
/// - otherwise the first whitespace-separated word must be listed
#[derive(Debug, Clone, Default)]
pub struct CommandPolicy {
    allowed: Vec<String>,
}

impl CommandPolicy {
    pub fn new(allowed: Vec<String>) -> Self {
        Self { allowed }
    }

    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.allowed.is_empty() || self.allowed.iter().any(|a| a == "*")
    }

    /// `Err` carries the message reported back to the model
    pub fn check(&self, command: &str) -> Result<(), String> {
        if self.is_open() {
            return Ok(());
        }
        let program = command.split_whitespace().next().unwrap_or("");
        if self.allowed.iter().any(|a| a == program) {
            Ok(())
        } else {
            Err(format!(
                "Error: Command '{}' is not allowed (allowed: {})",
                program,
                self.allowed.join(", ")
            ))
        }
    }
}

/// Executor wrapper that rejects commands the policy does not allow
pub struct GuardedExecutor<E> {
    inner: E,
    policy: CommandPolicy,
}

impl<E: CommandExecutor> GuardedExecutor<E> {
    pub fn new(inner: E, policy: CommandPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<E: CommandExecutor> CommandExecutor for GuardedExecutor<E> {
    async fn execute(&self, command: &str) -> Result<ExecOutput, ExecError> {
        if let Err(reason) = self.policy.check(command) {
            warn!("◆ COMMAND DENIED: {}", command);
            return Ok(ExecOutput::denied(reason));
        }
        self.inner.execute(command).await
    }

    fn describe(&self) -> String {
        if self.policy.is_open() {
            self.inner.describe()
        } else {
            format!(
                "{}. Only these commands are allowed: {}",
                self.inner.describe(),
                self.policy.allowed.join(", ")
            )
        }
    }
}
