//! Path utilities

use std::path::PathBuf;

/// Data directory (~/.metaagent), falling back to the current directory
/// when no home directory can be determined
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".metaagent")
}

/// Config file location
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// Default working directory for shell directives
pub fn workspace_path() -> PathBuf {
    data_dir().join("workspace")
}
