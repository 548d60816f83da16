//! Configuration loading and database path resolution
//!
//! Missing configuration never stops the tools: an absent TOML file means
//! compiled defaults. A file that exists but does not parse is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the database path
pub const DATABASE_ENV_VAR: &str = "ACU_DATABASE";

/// Environment variable overriding the config file location
pub const CONFIG_ENV_VAR: &str = "ACU_CONFIG";

/// Compiled default for completion record polling attempts
pub const DEFAULT_POLL_ATTEMPTS: u32 = 10;

/// Compiled default for the wait between completion record polls
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// SQLite database file
    pub database_path: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub import: ImportConfig,
    pub completion_poll: PollConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing level when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Defaults for the import command line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Course column used to match the `course` cell
    pub course_field: String,
    /// User column used to match the `user` cell
    pub user_field: String,
    /// Role shortname used when enrolling users
    pub student_role: String,
    /// Username of the operator on whose authority completions are overridden
    pub operator: Option<String>,
    /// CSV delimiter (first character is used)
    pub delimiter: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            course_field: "shortname".to_string(),
            user_field: "username".to_string(),
            student_role: "student".to_string(),
            operator: None,
            delimiter: ",".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub attempts: Option<u32>,
    pub interval_ms: Option<u64>,
}

/// Locate the config file
///
/// `ACU_CONFIG` wins; otherwise `<config_dir>/acu/config.toml`.
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|d| d.join("acu").join("config.toml"))
}

/// Load a TOML config file, falling back to defaults when it does not exist
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file {} not found, using defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str::<TomlConfig>(&content).map_err(|e| {
        Error::Config(format!("Parse {} failed: {}", path.display(), e))
    })?;

    debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Load config from an explicit path or the default location
pub fn load_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    match explicit {
        Some(path) => load_toml_config(path),
        None => match config_file_path() {
            Some(path) => load_toml_config(&path),
            None => Ok(TomlConfig::default()),
        },
    }
}

/// Database path resolution, in priority order:
/// 1. Command-line argument
/// 2. `ACU_DATABASE` environment variable
/// 3. TOML config `database_path`
/// 4. OS-dependent compiled default
pub fn resolve_database_path(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(DATABASE_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.database_path {
        return path.clone();
    }

    default_database_path()
}

/// Get OS-dependent default database path
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("acu").join("acu.db"))
        .unwrap_or_else(|| PathBuf::from("./acu_data/acu.db"))
}
