//! Configuration management for metaagent
//!
//! Loads static per-process settings from `~/.metaagent/config.json`, then
//! applies environment overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod paths;

pub use paths::{config_path, data_dir, workspace_path};

/// Errors in configuration loading and saving
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("CONFIG I/O ERROR: {0}")]
    Io(#[from] std::io::Error),

    #[error("CONFIG PARSE FAILED: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CONFIG NOT FOUND: {0}")]
    NotFound(PathBuf),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Completion backend credentials
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

/// Feedback loop parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefaults {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_summary_model")]
    pub summary_model: String,
    #[serde(default = "default_max_recursion_depth")]
    pub max_recursion_depth: u32,
    #[serde(default = "default_max_history_items")]
    pub max_history_items: usize,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            model: default_model(),
            summary_model: default_summary_model(),
            max_recursion_depth: default_max_recursion_depth(),
            max_history_items: default_max_history_items(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

fn default_model() -> String {
    "anthropic/claude-3.5-sonnet".to_string()
}

fn default_summary_model() -> String {
    "anthropic/claude-3-haiku".to_string()
}

fn default_max_recursion_depth() -> u32 {
    3
}

fn default_max_history_items() -> usize {
    10
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

/// Where shell directives run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorBackend {
    /// `sh -c` on the host
    #[default]
    Local,
    /// `docker run --rm <image> sh -c`
    Docker,
}

/// Command execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default)]
    pub backend: ExecutorBackend,
    #[serde(default = "default_docker_image")]
    pub docker_image: String,
    /// First words permitted in shell directives. Empty allows everything.
    #[serde(default)]
    pub allowed_commands: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_working_dir")]
    pub working_dir: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            backend: ExecutorBackend::default(),
            docker_image: default_docker_image(),
            allowed_commands: Vec::new(),
            timeout_secs: default_timeout_secs(),
            working_dir: default_working_dir(),
        }
    }
}

fn default_docker_image() -> String {
    "meta-agent-env".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_working_dir() -> String {
    "~/.metaagent/workspace".to_string()
}

/// HTTP ingress binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub agent: AgentDefaults,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load from the default location and apply process environment overrides
    pub async fn load() -> Result<Self> {
        let path = config_path();
        let mut config = Self::load_from(&path).await?;
        config.apply_env();
        Ok(config)
    }

    /// Load from specific location
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("◆ NO CONFIG AT {:?}, USING DEFAULTS", path);
            return Ok(Config::default());
        }

        debug!("◆ READING CONFIG FROM {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load from a location that must exist
    pub async fn load_existing(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        Self::load_from(path).await
    }

    pub async fn save(&self) -> Result<()> {
        let path = config_path();
        self.save_to(&path).await
    }

    pub async fn save_to(&self, path: &Path) -> Result<()> {
        debug!("◆ WRITING CONFIG TO {:?}", path);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENROUTER_API_KEY") {
            self.provider.api_key = key;
        }
        if let Some(base) = get("OPENROUTER_API_BASE") {
            self.provider.api_base = Some(base);
        }
        if let Some(model) = get("OPENROUTER_MODEL") {
            self.agent.model = model;
        }
        if let Some(model) = get("OPENROUTER_SUMMARY_MODEL") {
            self.agent.summary_model = model;
        }
        if let Some(image) = get("DOCKER_IMAGE") {
            self.executor.docker_image = image;
        }
        if let Some(raw) = get("MAX_RECURSION_DEPTH") {
            match raw.trim().parse() {
                Ok(depth) => self.agent.max_recursion_depth = depth,
                Err(_) => warn!("◆ IGNORING MAX_RECURSION_DEPTH={:?}", raw),
            }
        }
        if let Some(raw) = get("MAX_HISTORY_ITEMS") {
            match raw.trim().parse() {
                Ok(items) => self.agent.max_history_items = items,
                Err(_) => warn!("◆ IGNORING MAX_HISTORY_ITEMS={:?}", raw),
            }
        }
    }

    pub fn api_key(&self) -> Option<String> {
        if self.provider.api_key.is_empty() {
            None
        } else {
            Some(self.provider.api_key.clone())
        }
    }

    pub fn api_base(&self) -> Option<String> {
        self.provider
            .api_base
            .clone()
            .filter(|b| !b.is_empty())
            .or_else(|| Some("https://openrouter.ai/api/v1".to_string()))
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    pub fn model(&self) -> String {
        self.agent.model.clone()
    }

    pub fn summary_model(&self) -> String {
        self.agent.summary_model.clone()
    }

    pub fn max_recursion_depth(&self) -> u32 {
        self.agent.max_recursion_depth
    }

    pub fn max_history_items(&self) -> usize {
        self.agent.max_history_items
    }

    /// Working directory for local execution, with `~` expanded
    pub fn working_dir(&self) -> PathBuf {
        let path = &self.executor.working_dir;
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        } else if path == "~" {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        }
        PathBuf::from(path)
    }
}

/// Write a default config (if absent) and create the workspace
pub async fn init() -> Result<Config> {
    let config_path = config_path();

    if config_path.exists() {
        warn!("◆ CONFIG ALREADY EXISTS AT {:?}", config_path);
    } else {
        let config = Config::default();
        config.save().await?;
        info!("◆ CONFIG WRITTEN TO {:?}", config_path);
    }

    let workspace = workspace_path();
    tokio::fs::create_dir_all(&workspace).await?;
    info!("◆ WORKSPACE READY AT {:?}", workspace);

    Config::load().await
}
