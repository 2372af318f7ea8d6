// * TOML settings loaded at startup
// * Only `watch_directory` is mandatory; every section falls back to constants.rs

use crate::config::constants::{
    DEFAULT_INITIAL_SCAN_TIMEOUT_SECS, DEFAULT_JOBS_STATE_FILE, DEFAULT_MAP_EXPORT_FILE,
    DEFAULT_REPORT_INTERVAL_SECS, DEFAULT_SHUTDOWN_GRACE_MS,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level application settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Directory holding the `.txt`/`.csv` measurement files
    pub watch_directory: PathBuf,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    pub initial_scan_timeout_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            initial_scan_timeout_secs: DEFAULT_INITIAL_SCAN_TIMEOUT_SECS,
        }
    }
}

impl MonitorConfig {
    pub fn initial_scan_timeout(&self) -> Duration {
        Duration::from_secs(self.initial_scan_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub interval_secs: u64,
    pub export_file: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_REPORT_INTERVAL_SECS,
            export_file: PathBuf::from(DEFAULT_MAP_EXPORT_FILE),
        }
    }
}

impl ReportConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobsConfig {
    pub state_file: PathBuf,
    pub shutdown_grace_ms: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from(DEFAULT_JOBS_STATE_FILE),
            shutdown_grace_ms: DEFAULT_SHUTDOWN_GRACE_MS,
        }
    }
}

impl JobsConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Output format of the console log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    pub format: LogFormat,
    /// Colored level names; only honored when stdout is a terminal
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            ansi: true,
        }
    }
}

impl AppConfig {
    /// Reads and validates the config file at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_toml_str(&content).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        tracing::debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Parses settings from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.watch_directory.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "watch_directory cannot be empty".to_string(),
            ));
        }
        if self.report.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "report.interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
