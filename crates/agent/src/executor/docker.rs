//! Container backend: one throwaway container per command.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{run_process, CommandExecutor, ExecError, ExecOutput};

pub struct DockerExecutor {
    image: String,
    timeout: Duration,
    docker_bin: String,
}

impl DockerExecutor {
    pub fn new(image: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            image: image.into(),
            timeout: Duration::from_secs(timeout_secs),
            docker_bin: "docker".to_string(),
        }
    }

    /// Use a different client binary (e.g. `podman`)
    pub fn with_binary(mut self, docker_bin: impl Into<String>) -> Self {
        self.docker_bin = docker_bin.into();
        self
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    /// Arguments passed to the client binary
    pub fn args(&self, command: &str) -> Vec<String> {
        vec![
            "run".to_string(),
            "--rm".to_string(),
            self.image.clone(),
            "sh".to_string(),
            "-c".to_string(),
            command.to_string(),
        ]
    }
}

#[async_trait]
impl CommandExecutor for DockerExecutor {
    async fn execute(&self, command: &str) -> Result<ExecOutput, ExecError> {
        debug!("◆ EXECUTING IN {}: {}", self.image, command);
        let mut cmd = Command::new(&self.docker_bin);
        cmd.args(self.args(command));
        run_process(cmd, &self.docker_bin, self.timeout).await
    }

    fn describe(&self) -> String {
        format!(
            "Commands run with `sh -c` in a fresh `{}` container; files do not persist between commands",
            self.image
        )
    }
}
