//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Marketplace REST API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Total attempts for idempotent requests (1 = no retry)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,
}

fn default_base_url() -> String {
    "https://rentaddabackenddeployed.up.railway.app".to_string()
}

fn default_request_timeout() -> u64 {
    10_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff() -> u64 {
    500
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff(),
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Chat room behavior
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval() -> u64 {
    2000
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl ChatConfig {
    pub fn poll_interval(&self) -> Duration {
        // interval() panics on a zero period
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Credentials used when no interactive login is available
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionConfig {
    pub token: Option<String>,
    pub user_id: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let (config, source, skipped) = Self::discover();
        for e in &skipped {
            tracing::warn!("Skipped config file: {}", e);
        }
        tracing::info!("Using config from {}", source);
        config
    }

    /// Find and load the first usable config file without logging
    ///
    /// Returns where the settings came from and the files that failed to
    /// load, so callers can report both once logging is up.
    pub fn discover() -> (Self, ConfigSource, Vec<ConfigError>) {
        let config_paths: Vec<PathBuf> = [
            dirs::config_dir().map(|p| p.join("rentadda").join("config.toml")),
            Some(PathBuf::from("/etc/rentadda/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self::discover_in(&config_paths)
    }

    fn discover_in(paths: &[PathBuf]) -> (Self, ConfigSource, Vec<ConfigError>) {
        let mut skipped = Vec::new();

        for path in paths {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => return (config, ConfigSource::File(path.clone()), skipped),
                    Err(e) => skipped.push(e),
                }
            }
        }

        (Self::from_env(), ConfigSource::Environment, skipped)
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        // API overrides
        if let Ok(url) = std::env::var("RENTADDA_API_URL") {
            self.api.base_url = url;
        }
        if let Ok(timeout) = std::env::var("RENTADDA_REQUEST_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                self.api.request_timeout_ms = ms;
            }
        }

        // Chat overrides
        if let Ok(interval) = std::env::var("RENTADDA_POLL_INTERVAL_MS") {
            if let Ok(ms) = interval.parse() {
                self.chat.poll_interval_ms = ms;
            }
        }

        // Session overrides
        if let Ok(token) = std::env::var("RENTADDA_TOKEN") {
            self.session.token = Some(token);
        }
        if let Ok(user_id) = std::env::var("RENTADDA_USER_ID") {
            if let Ok(id) = user_id.parse() {
                self.session.user_id = Some(id);
            }
        }

        // Logging overrides
        if let Ok(level) = std::env::var("RENTADDA_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("RENTADDA_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// Built-in defaults plus `RENTADDA_*` variables
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{:?}", path),
            ConfigSource::Environment => write!(f, "defaults with environment overrides"),
        }
    }
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Rentadda Chat Configuration
#
# Environment variables override these settings:
# - RENTADDA_API_URL
# - RENTADDA_REQUEST_TIMEOUT_MS
# - RENTADDA_POLL_INTERVAL_MS
# - RENTADDA_TOKEN
# - RENTADDA_USER_ID
# - RENTADDA_LOG_LEVEL
# - RENTADDA_LOG_FORMAT

[api]
# Marketplace backend URL
base_url = "https://rentaddabackenddeployed.up.railway.app"

# Per-request timeout (ms)
request_timeout_ms = 10000

# Attempts for room lookup and message listing (1 disables retry)
max_retries = 3

# Backoff base (ms); attempt n waits base * n^2
retry_backoff_ms = 500

[chat]
# How often to refresh the message list (ms)
poll_interval_ms = 2000

[session]
# Bearer token issued at login
# token = ""

# Your user id; normally read from the token's `id` claim
# user_id = 0

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
