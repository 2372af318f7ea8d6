// * A single scan job: one task per input file, all running concurrently

use crate::command::ScanParams;
use crate::job::task::{scan_file, OutputSink};
use crate::job::{JobError, JobState};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tokio::task::JoinSet;
use tracing::debug;

/// A named scan over a fixed list of files
#[derive(Debug)]
pub struct Job {
    params: Arc<ScanParams>,
    files: Vec<PathBuf>,
    state: RwLock<JobState>,
}

impl Job {
    pub fn new(params: ScanParams, files: Vec<PathBuf>) -> Self {
        Self {
            params: Arc::new(params),
            files,
            state: RwLock::new(JobState::Pending),
        }
    }

    pub fn name(&self) -> &str {
        &self.params.job_name
    }

    pub fn params(&self) -> &ScanParams {
        &self.params
    }

    pub fn state(&self) -> JobState {
        *self.state.read().unwrap_or_else(|p| p.into_inner())
    }

    fn set_state(&self, state: JobState) {
        *self.state.write().unwrap_or_else(|p| p.into_inner()) = state;
    }

    /// Marks an unfinished job as cancelled; finished jobs keep their state
    pub fn mark_cancelled(&self) -> bool {
        let mut state = self.state.write().unwrap_or_else(|p| p.into_inner());
        if state.is_unexecuted() {
            *state = JobState::Cancelled;
            true
        } else {
            false
        }
    }

    /// Scans every file concurrently and returns the total number of matches
    ///
    /// The first failing file fails the job; the remaining file tasks are
    /// aborted. Dropping the returned future aborts all file tasks as well.
    pub async fn run(&self) -> Result<usize, JobError> {
        self.set_state(JobState::Running);

        let result = self.scan_all().await;
        match &result {
            Ok(_) => self.set_state(JobState::Completed),
            Err(_) => self.set_state(JobState::Failed),
        }
        result
    }

    async fn scan_all(&self) -> Result<usize, JobError> {
        let sink = OutputSink::open(&self.params.output_file).await?;
        let mut set = JoinSet::new();

        for path in &self.files {
            let path = path.clone();
            let params = Arc::clone(&self.params);
            let sink = sink.clone();
            set.spawn(async move { scan_file(&path, &params, &sink).await });
        }

        let mut total = 0;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(count)) => total += count,
                Ok(Err(e)) => return Err(e),
                Err(e) => return Err(JobError::Task(e.to_string())),
            }
        }

        debug!(job = %self.name(), total, "All file tasks finished");
        Ok(total)
    }
}
