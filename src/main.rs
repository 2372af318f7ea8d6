use clap::Parser;
use concurrent_mess::app::AppError;
use concurrent_mess::config::constants::DEFAULT_CONFIG_FILE;
use concurrent_mess::ops::telemetry;
use concurrent_mess::{App, AppConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::BufReader;

/// Watches a directory of measurement files and runs scan jobs typed on stdin
#[derive(Debug, Parser)]
#[command(name = "concurrent-mess", version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

fn load(cli: &Cli) -> Result<AppConfig, AppError> {
    let config = AppConfig::load(&cli.config)?;
    telemetry::init_tracing(&config.logging)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load(&cli) {
        Ok(config) => config,
        Err(e) => {
            // * Logging may not be up yet when the config itself is broken
            let _ = telemetry::init_tracing_with_level("info");
            tracing::error!("Failed to read configuration file {}", e);
            tracing::error!("Exiting...");
            return ExitCode::FAILURE;
        }
    };

    let app = App::new(config);
    app.run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await;

    ExitCode::SUCCESS
}
