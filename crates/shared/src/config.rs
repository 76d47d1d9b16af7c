//! Configuration management for the Liferay connector.
//!
//! This module handles loading and parsing configuration from TOML files,
//! with sensible defaults for all settings.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::Level;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Logging settings
    pub logging: LoggingConfig,

    /// Liferay server settings
    pub liferay: LiferayConfig,

    /// Archive settings
    #[serde(default)]
    pub archive: ArchiveConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log directory path
    pub log_dir: String,

    /// Default log level (trace, debug, info, warn, error)
    pub default_level: String,

    /// Enable console output (written to stderr)
    pub console: bool,

    /// Enable file output
    pub file: bool,

    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

/// Liferay server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiferayConfig {
    /// Server base URL (the JSON web services live under `api/jsonws`)
    pub base_url: String,

    /// Site (group) to fetch data from
    pub group_id: String,

    /// Username for basic authentication
    #[serde(default)]
    pub user: Option<String>,

    /// Password for basic authentication
    #[serde(default)]
    pub password: Option<String>,

    /// Verify TLS certificates
    pub verify: bool,

    /// Number of items requested per page
    pub max_results: u64,

    /// PEM file with the client certificate and private key
    #[serde(default)]
    pub cert: Option<String>,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Maximum retries for failed requests
    pub max_retries: u32,

    /// Retry delay in milliseconds
    pub retry_delay_ms: u64,
}

/// Whether the archive records live exchanges or replays stored ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveMode {
    Record,
    Replay,
}

/// Archive configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Enable the archive
    pub enabled: bool,

    /// Archive directory
    pub dir: String,

    /// Record or replay
    pub mode: ArchiveMode,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: "archive".to_string(),
            mode: ArchiveMode::Record,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                log_dir: "logs".to_string(),
                default_level: "info".to_string(),
                console: true,
                file: false,
                json_format: false,
            },
            liferay: LiferayConfig {
                base_url: "http://localhost:8080".to_string(),
                group_id: String::new(),
                user: None,
                password: None,
                verify: true,
                cert: None,
                max_results: 100,
                timeout_seconds: 30,
                max_retries: 3,
                retry_delay_ms: 1000,
            },
            archive: ArchiveConfig::default(),
        }
    }
}

impl LoggingConfig {
    /// Parse the configured default level
    pub fn level(&self) -> Result<Level> {
        Level::from_str(&self.default_level)
            .with_context(|| format!("Invalid log level: {}", self.default_level))
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Check the settings a run cannot start without
    pub fn validate(&self) -> Result<()> {
        if self.liferay.base_url.trim().is_empty() {
            bail!("liferay.base_url must not be empty");
        }
        if self.liferay.group_id.trim().is_empty() {
            bail!("liferay.group_id must not be empty");
        }
        if self.liferay.max_results == 0 {
            bail!("liferay.max_results must be greater than zero");
        }
        if self.archive.mode == ArchiveMode::Replay && !self.archive.enabled {
            bail!("archive.mode = \"replay\" requires archive.enabled = true");
        }
        self.logging.level()?;
        Ok(())
    }

    /// Whether requests are answered from the archive instead of the server
    pub fn replaying(&self) -> bool {
        self.archive.enabled && self.archive.mode == ArchiveMode::Replay
    }

    /// Get the path for the log directory
    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.logging.log_dir)
    }

    /// Get the path for the archive directory
    pub fn archive_dir(&self) -> PathBuf {
        PathBuf::from(&self.archive.dir)
    }
}
