// * Application configuration
// * TOML settings file plus compile-time defaults

pub mod constants;
pub mod settings;

pub use settings::{
    AppConfig, ConfigError, JobsConfig, LogFormat, LoggingConfig, MonitorConfig, ReportConfig,
};
