//! Host shell backend

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{run_process, CommandExecutor, ExecError, ExecOutput};

/// Runs directives with `sh -c` in a fixed working directory
pub struct LocalExecutor {
    timeout: Duration,
    working_dir: Option<PathBuf>,
}

impl LocalExecutor {
    pub fn new(timeout_secs: u64, working_dir: Option<PathBuf>) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
            working_dir,
        }
    }

    pub fn with_working_dir(working_dir: PathBuf) -> Self {
        Self::new(60, Some(working_dir))
    }
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new(60, None)
    }
}

#[async_trait]
impl CommandExecutor for LocalExecutor {
    async fn execute(&self, command: &str) -> Result<ExecOutput, ExecError> {
        debug!("◆ EXECUTING: {}", command);
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        run_process(cmd, "sh", self.timeout).await
    }

    fn describe(&self) -> String {
        match &self.working_dir {
            Some(dir) => format!("Commands run with `sh -c` on the host in {}", dir.display()),
            None => "Commands run with `sh -c` on the host".to_string(),
        }
    }
}
