use crate::correlator::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LensConfig {
    pub engine: EngineConfig,
    pub filters: FilterConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// In-flight records held before the oldest is evicted.
    pub capacity: usize,
    /// Completion status at or above which a record is kept for trailing diagnostics.
    pub keep_status_threshold: u16,
    /// Token that marks a line as developer debug output.
    pub debug_marker: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            keep_status_threshold: 400,
            debug_marker: "LOG:".to_string(),
        }
    }
}

/// Regex patterns, each optional. Invalid patterns never match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Suppress records whose path matches.
    pub exclude: Option<String>,
    /// Suppress records whose path does not match.
    pub include_path: Option<String>,
    pub exclude_path: Option<String>,
    pub exclude_controller: Option<String>,
    pub exclude_action: Option<String>,
    /// Matched against `Controller#action`.
    pub exclude_controller_action: Option<String>,
    pub exclude_params: Option<String>,
    pub exclude_status: Option<String>,
    pub exclude_sql: Option<String>,
    pub exclude_log: Option<String>,
    pub exclude_error: Option<String>,
    pub hide_rb: Option<String>,
    pub hide_html: Option<String>,
    pub hide_log: Option<String>,
    pub hide_sql: Option<String>,
}

/// Sections of an emitted record that can be switched on individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Params,
    Sql,
    Html,
    Rb,
    Log,
    Error,
    Read,
    Create,
    Update,
    Delete,
    Transaction,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Empty shows every category.
    pub show: Vec<Category>,
}

pub fn load_config(path: Option<&Path>) -> Result<LensConfig, ConfigError> {
    if let Some(path) = path {
        load_config_from_path(path)
    } else {
        Ok(default_config().clone())
    }
}

pub fn load_config_from_path(path: &Path) -> Result<LensConfig, ConfigError> {
    let path_display = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path_display.clone(),
        source,
    })?;

    toml::from_str::<LensConfig>(&raw).map_err(|source| ConfigError::Parse {
        path: path_display,
        source,
    })
}

pub fn default_config() -> &'static LensConfig {
    static DEFAULT_CONFIG: LazyLock<LensConfig> = LazyLock::new(LensConfig::default);
    &DEFAULT_CONFIG
}
