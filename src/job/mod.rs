// * Scan jobs
// * Named background jobs that filter every data file into an output file

pub mod errors;
pub mod manager;
pub mod persistence;
pub mod runner;
pub mod task;

pub use errors::JobError;
pub use manager::JobManager;
pub use persistence::{SavedJob, SavedJobs, SavedScanParams};
pub use runner::Job;
pub use task::{scan_file, OutputSink};

use std::fmt;

/// Lifecycle of a scan job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl JobState {
    /// Jobs that have not finished yet; these are the ones persisted on shutdown
    pub fn is_unexecuted(self) -> bool {
        matches!(self, JobState::Pending | JobState::Running)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Pending => write!(f, "pending"),
            JobState::Running => write!(f, "running"),
            JobState::Completed => write!(f, "completed"),
            JobState::Cancelled => write!(f, "cancelled"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}
