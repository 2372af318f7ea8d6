use crate::command::ParseError;
use std::path::PathBuf;
use thiserror::Error;

// * Errors raised by the job manager and running jobs
#[derive(Debug, Error)]
pub enum JobError {
    #[error("JobManager is already started")]
    AlreadyStarted,

    #[error("JobManager not started")]
    NotStarted,

    #[error("Job with name {0} already exists")]
    DuplicateJob(String),

    #[error("Job {0} - No files to process")]
    NoInputFiles(String),

    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error writing to output file {path:?}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File task failed: {0}")]
    Task(String),

    #[error("Failed to access saved jobs at {path:?}: {source}")]
    StateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse saved jobs at {path:?}: {source}")]
    StateParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize saved jobs: {0}")]
    StateSerialize(#[from] toml::ser::Error),

    #[error("Saved job {job} is invalid: {source}")]
    InvalidSavedJob {
        job: String,
        #[source]
        source: ParseError,
    },
}
