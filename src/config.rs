//! Configuration module for Gator.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{GatorError, Result};

/// Default config file name, relative to the home directory.
pub const CONFIG_FILE_NAME: &str = ".gatorconfig.toml";

/// Environment variable overriding the config file path.
pub const CONFIG_PATH_ENV: &str = "GATOR_CONFIG";

/// Environment variable overriding the database URL.
pub const DB_URL_ENV: &str = "GATOR_DB_URL";

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL (`sqlite://...` or `postgres://...`).
    #[serde(default = "default_db_url")]
    pub url: String,
    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_url() -> String {
    "sqlite://gator.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file. Console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Feed aggregation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// User-Agent header sent with every feed request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Maximum scheduler iterations in flight at once (1 = serialized).
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
    /// Total timeout for one feed request.
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Smallest interval accepted by `agg`.
    #[serde(default = "default_min_interval", with = "humantime_serde")]
    pub min_interval: Duration,
    /// Number of posts shown by `browse` without an explicit limit.
    #[serde(default = "default_browse_limit")]
    pub default_browse_limit: i64,
}

fn default_user_agent() -> String {
    "gator".to_string()
}

fn default_max_concurrent_fetches() -> usize {
    1
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_min_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_browse_limit() -> i64 {
    2
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            request_timeout: default_request_timeout(),
            min_interval: default_min_interval(),
            default_browse_limit: default_browse_limit(),
        }
    }
}

/// Console display configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Timezone for displaying dates (e.g., "Europe/Berlin", "UTC").
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// chrono format string for dates.
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_date_format() -> String {
    "%Y-%m-%d %H:%M".to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            date_format: default_date_format(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Name of the user commands run as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_user_name: Option<String>,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Aggregation configuration.
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    /// Display configuration.
    #[serde(default)]
    pub display: DisplayConfig,
}

impl Config {
    /// Resolve the config file location.
    ///
    /// `GATOR_CONFIG` wins; otherwise `~/.gatorconfig.toml`.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
        dirs::home_dir()
            .map(|home| home.join(CONFIG_FILE_NAME))
            .ok_or_else(|| GatorError::Config("cannot determine home directory".to_string()))
    }

    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(GatorError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration, falling back to defaults when the file does not exist.
    ///
    /// A file that exists but cannot be read or parsed is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(GatorError::Io(e)),
        }
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| GatorError::Config(format!("config parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that parse as TOML but cannot be used.
    pub fn validate(&self) -> Result<()> {
        if self.aggregator.default_browse_limit <= 0 {
            return Err(GatorError::Config(format!(
                "aggregator.default_browse_limit must be positive, got {}",
                self.aggregator.default_browse_limit
            )));
        }
        if self.aggregator.max_concurrent_fetches == 0 {
            return Err(GatorError::Config(
                "aggregator.max_concurrent_fetches must be at least 1".to_string(),
            ));
        }
        crate::datetime::validate_format(&self.display.date_format)?;
        Ok(())
    }

    /// Write the configuration back to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| GatorError::Config(format!("config encode error: {e}")))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `GATOR_DB_URL`: Override the database URL
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(DB_URL_ENV) {
            if !url.is_empty() {
                self.database.url = url;
            }
        }
    }
}
