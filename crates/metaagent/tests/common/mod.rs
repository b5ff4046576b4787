//! Common test utilities for metaagent integration tests
#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

/// Isolated home directory for one test
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub data_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = tempdir()?;
        let data_dir = temp_dir.path().join(".metaagent");
        Ok(Self { temp_dir, data_dir })
    }

    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    /// Command with HOME pointed at the temp dir and no provider overrides
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_metaagent"));
        cmd.env("HOME", self.temp_dir.path());
        for key in [
            "OPENROUTER_API_KEY",
            "OPENROUTER_API_BASE",
            "OPENROUTER_MODEL",
            "OPENROUTER_SUMMARY_MODEL",
            "DOCKER_IMAGE",
            "MAX_RECURSION_DEPTH",
            "MAX_HISTORY_ITEMS",
        ] {
            cmd.env_remove(key);
        }
        cmd
    }

    pub fn write_config(&self, json: &str) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::write(self.config_file(), json)?;
        Ok(())
    }
}
