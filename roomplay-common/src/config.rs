//! Bootstrap configuration loading and config file resolution
//!
//! Configuration file resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`ROOMPLAY_CONFIG`)
//! 3. Per-user config file (`<config dir>/roomplay/config.toml`)
//! 4. Built-in defaults (no file)
//!
//! When no file is named and no per-user file exists, the loader logs a
//! warning and falls back to built-in defaults. A file named on the command
//! line or in the environment must exist, and any file that does not parse
//! is an error.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "ROOMPLAY_CONFIG";

/// Bootstrap configuration loaded from TOML
///
/// Every section is optional; missing keys take their built-in defaults.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct TomlConfig {
    /// Scheduler loop and enrichment settings
    #[serde(default)]
    pub scheduler: SchedulerSection,

    /// Resolver worker pool settings
    #[serde(default)]
    pub resolver: ResolverSection,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Track catalog used by the demo host (optional)
    #[serde(default)]
    pub catalog: Option<PathBuf>,
}

/// `[scheduler]` section
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SchedulerSection {
    /// Number of deferred-playlist items resolved before a request returns
    ///
    /// 0 defers the whole playlist to the background enricher.
    #[serde(default = "default_eager_first")]
    pub eager_first: usize,

    /// Capacity of the scheduler command channel
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,

    /// Per-subscriber capacity of the event bus
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            eager_first: default_eager_first(),
            command_buffer: default_command_buffer(),
            event_capacity: default_event_capacity(),
        }
    }
}

/// `[resolver]` section
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ResolverSection {
    /// Maximum number of provider calls in flight
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Per-call timeout in milliseconds (0 disables the timeout)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ResolverSection {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level or full EnvFilter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_eager_first() -> usize {
    1
}

fn default_command_buffer() -> usize {
    64
}

fn default_event_capacity() -> usize {
    256
}

fn default_workers() -> usize {
    4
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an explicit file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded TOML configuration from {}", path.display());
        Ok(config)
    }

    /// Resolve the config file location and load it, falling back to defaults
    ///
    /// An explicitly named file (CLI or environment) that does not exist is
    /// an error; an absent per-user file is not.
    pub fn resolve_and_load(cli_arg: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_arg) {
            Some(ConfigSource::Explicit(path)) => Self::load_file(&path),
            Some(ConfigSource::UserDefault(path)) => Self::load_file(&path),
            None => {
                warn!("No configuration file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.command_buffer == 0 {
            return Err(Error::Config(
                "scheduler.command_buffer must be at least 1".to_string(),
            ));
        }
        if self.scheduler.event_capacity == 0 {
            return Err(Error::Config(
                "scheduler.event_capacity must be at least 1".to_string(),
            ));
        }
        if self.resolver.workers == 0 {
            return Err(Error::Config("resolver.workers must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Where a config file path came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Named on the command line or in `ROOMPLAY_CONFIG`
    Explicit(PathBuf),
    /// Found at the per-user default location
    UserDefault(PathBuf),
}

/// Resolve the config file path by priority order
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<ConfigSource> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(ConfigSource::Explicit(path.to_path_buf()));
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(ConfigSource::Explicit(PathBuf::from(path)));
        }
    }

    // Priority 3: Per-user config file
    user_config_path()
        .filter(|path| path.exists())
        .map(ConfigSource::UserDefault)
}

/// Per-user config file location for the platform
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("roomplay").join("config.toml"))
}
