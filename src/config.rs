//! Configuration system for tidy-tweet.
//!
//! Provides layered configuration from multiple sources:
//!
//! 1. **Compiled defaults** - Sensible defaults built into the binary
//! 2. **User config file** - `~/.config/tidy-tweet/config.toml`
//! 3. **Environment variables** - `TIDY_TWEET_*` prefix
//! 4. **CLI arguments** - Highest priority, always wins
//!
//! # Example Configuration File
//!
//! ```toml
//! [storage]
//! strict = false
//! allow_existing = false
//!
//! [logging]
//! level = "warn"
//! format = "compact"
//! colors = true
//! ```

use crate::error::{Result, TidyTweetError};
use crate::logging::{LogConfig, LogFormat, LogLevel};
use crate::storage::InitOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure for tidy-tweet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How new databases are created.
    pub storage: StorageConfig,
    /// Log output.
    pub logging: LoggingConfig,
}

/// Database creation options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Create tables with SQLite's strict column typing.
    /// Environment variable: `TIDY_TWEET_STRICT`
    pub strict: bool,

    /// Allow adding the tidy-tweet tables to a database file that already
    /// exists.
    pub allow_existing: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum level: error, warn, info, debug, trace, off.
    /// Environment variable: `TIDY_TWEET_LOG`
    pub level: LogLevel,

    /// Output format: pretty, compact, full.
    /// Environment variable: `TIDY_TWEET_LOG_FORMAT`
    pub format: LogFormat,

    /// Enable colored output. Disabled by `NO_COLOR`.
    pub colors: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let log = LogConfig::default();
        Self {
            level: log.level,
            format: log.format,
            colors: log.colors,
        }
    }
}

/// A loaded configuration plus any problems found in environment overrides.
///
/// Configuration is read before logging is set up, so the warnings are
/// returned to the caller to be logged once a subscriber exists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedConfig {
    pub config: Config,
    pub warnings: Vec<String>,
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Config file (`path`, or ~/.config/tidy-tweet/config.toml)
    /// 3. Compiled defaults
    ///
    /// # Errors
    ///
    /// Returns [`TidyTweetError::InvalidConfig`] if `path` is given and is
    /// missing or cannot be parsed. Problems with the implicit user config
    /// file are reported as warnings instead.
    pub fn load(path: Option<&Path>) -> Result<LoadedConfig> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    fn load_with_env(
        path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<LoadedConfig> {
        let mut config = Self::default();
        let mut warnings = Vec::new();

        match path {
            Some(path) => config.merge(Self::load_from_file(path)?),
            None => match Self::user_config_path().filter(|p| p.is_file()) {
                Some(user_path) => match Self::load_from_file(&user_path) {
                    Ok(file_config) => config.merge(file_config),
                    Err(e) => warnings.push(format!("Ignoring user config: {e}")),
                },
                None => debug!("No user config file"),
            },
        }

        warnings.extend(config.apply_env_overrides(env));

        debug!("Configuration loaded: {:?}", config);
        Ok(LoadedConfig { config, warnings })
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns [`TidyTweetError::InvalidConfig`] if the file cannot be read
    /// or is not valid tidy-tweet TOML.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let invalid = |reason: String| TidyTweetError::InvalidConfig {
            path: path.to_path_buf(),
            reason,
        };
        let content = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let config: Self = toml::from_str(&content).map_err(|e| invalid(e.message().to_string()))?;
        info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Get the path to the user configuration file.
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tidy-tweet").join("config.toml"))
    }

    /// Apply environment variable overrides, returning a warning for every
    /// value that was ignored.
    fn apply_env_overrides(&mut self, env: impl Fn(&str) -> Option<String>) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(strict) = env("TIDY_TWEET_STRICT") {
            match parse_flag(&strict) {
                Some(value) => self.storage.strict = value,
                None => warnings.push(format!(
                    "Ignoring TIDY_TWEET_STRICT={strict}: expected true or false"
                )),
            }
        }
        if let Some(level) = env("TIDY_TWEET_LOG") {
            match level.parse() {
                Ok(level) => self.logging.level = level,
                Err(e) => warnings.push(format!("Ignoring TIDY_TWEET_LOG: {e}")),
            }
        }
        if let Some(format) = env("TIDY_TWEET_LOG_FORMAT") {
            match format.parse() {
                Ok(format) => self.logging.format = format,
                Err(e) => warnings.push(format!("Ignoring TIDY_TWEET_LOG_FORMAT: {e}")),
            }
        }
        if env("NO_COLOR").is_some() {
            self.logging.colors = false;
        }

        warnings
    }

    /// Merge another config into this one (other takes precedence).
    fn merge(&mut self, other: Self) {
        self.storage = other.storage;
        self.logging = other.logging;
    }

    /// Options for creating a new store.
    #[must_use]
    pub const fn init_options(&self) -> InitOptions {
        InitOptions {
            allow_existing: self.storage.allow_existing,
            strict: self.storage.strict,
        }
    }

    /// Base logging configuration, before CLI verbosity flags.
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.logging.level,
            format: self.logging.format,
            colors: self.logging.colors,
            ..LogConfig::default()
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
