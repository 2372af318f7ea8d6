// * Telemetry - console logging
// * Level-colored human output by default, JSON lines on request

use crate::config::{LogFormat, LoggingConfig};
use std::io::IsTerminal;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Builds the log filter: `RUST_LOG` wins over the configured level
pub fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// True when colored level names should be emitted
///
/// Colors are only written to an interactive terminal; redirected output
/// stays free of escape sequences.
pub fn ansi_enabled(config: &LoggingConfig) -> bool {
    config.ansi && std::io::stdout().is_terminal()
}

/// Installs the global subscriber described by `config`
///
/// # Example
/// ```ignore
/// use concurrent_mess::config::LoggingConfig;
/// use concurrent_mess::ops::telemetry;
///
/// telemetry::init_tracing(&LoggingConfig::default()).ok();
/// tracing::info!(job = "job1", "Starting scan job");
/// ```
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TryInitError> {
    let filter = build_filter(&config.level);
    let ansi = ansi_enabled(config);

    match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(false))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty().with_ansi(ansi))
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_ansi(ansi)
                    .with_thread_names(true)
                    .with_target(true),
            )
            .try_init(),
    }
}

/// Installs a plain subscriber with the given level (used before config is read)
pub fn init_tracing_with_level(level: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(build_filter(level))
        .with(fmt::layer().compact())
        .try_init()
}
