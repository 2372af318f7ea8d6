use crate::config::ConfigError;
use crate::job::JobError;
use crate::report::ReportError;
use thiserror::Error;

// * Failures of a single dispatched command; logged, never fatal
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("{0} command should never be emitted into the message queue")]
    Unexpected(&'static str),
}

// * Failures that end the application
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to initialize logging: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),
}
