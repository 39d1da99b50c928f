//! TOML-based configuration for cubeq.
//!
//! Supports a config file (cubeq.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [api]
//! url = "http://localhost:4000/cubejs-api/v1"
//! token = "${CUBEJS_TOKEN}"
//! timeout_seconds = 30
//! continue_wait_attempts = 10
//! continue_wait_interval_ms = 500
//!
//! [builder]
//! debounce_ms = 200
//! display_limit = 100
//!
//! [persistence]
//! path = "${HOME}/.local/share/cubeq/query.json"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Semantic layer API.
    pub api: ApiSettings,

    /// Query builder behavior.
    pub builder: BuilderSettings,

    /// Where the current query is saved between sessions.
    pub persistence: PersistenceSettings,
}

/// API endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Base URL of the REST API, e.g. `http://localhost:4000/cubejs-api/v1`.
    pub url: String,

    /// Authorization token (supports ${ENV_VAR} expansion).
    pub token: Option<String>,

    /// Per-request timeout.
    pub timeout_seconds: u64,

    /// How many times `load` is retried while the query is still running.
    pub continue_wait_attempts: u32,

    /// Delay between those retries.
    pub continue_wait_interval_ms: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:4000/cubejs-api/v1".to_string(),
            token: None,
            timeout_seconds: 30,
            continue_wait_attempts: 10,
            continue_wait_interval_ms: 500,
        }
    }
}

impl ApiSettings {
    /// Get the token with environment variables expanded.
    pub fn resolved_token(&self) -> Result<Option<String>, SettingsError> {
        self.token.as_deref().map(expand_env_vars).transpose()
    }
}

/// Query builder configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BuilderSettings {
    /// Quiet period after the last edit before a dry run is issued.
    pub debounce_ms: u64,

    /// Row limit of the displayed results.
    pub display_limit: u64,
}

impl Default for BuilderSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            display_limit: 100,
        }
    }
}

impl BuilderSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Persistence configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PersistenceSettings {
    /// Snapshot file (supports ${ENV_VAR} expansion). Disabled when unset.
    pub path: Option<String>,
}

impl PersistenceSettings {
    /// Get the snapshot path with environment variables expanded.
    pub fn resolved_path(&self) -> Result<Option<PathBuf>, SettingsError> {
        match &self.path {
            Some(path) => Ok(Some(PathBuf::from(expand_env_vars(path)?))),
            None => Ok(None),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `CUBEQ_CONFIG`
    /// 2. `./cubeq.toml`
    /// 3. `~/.config/cubeq/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("CUBEQ_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("cubeq.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("cubeq").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        // Return defaults if no config file found
        Ok(Settings::default())
    }

    /// Reject values the builder cannot work with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.api.url.trim().is_empty() {
            return Err(SettingsError::InvalidConfig("api.url is empty".to_string()));
        }
        if self.builder.display_limit == 0 {
            return Err(SettingsError::InvalidConfig(
                "builder.display_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(&ch) = chars.peek() {
                if !(ch.is_alphanumeric() || ch == '_') {
                    break;
                }
                var_name.push(ch);
                chars.next();
            }
            if var_name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
