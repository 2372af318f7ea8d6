// * Job manager
// * Owns every scan job by name, spawns them, reports their state and
// * persists the unfinished ones on shutdown

use crate::command::ScanParams;
use crate::config::JobsConfig;
use crate::data::list_data_files;
use crate::job::persistence::SavedJobs;
use crate::job::{Job, JobError, JobState};
use futures::future::join_all;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

struct JobEntry {
    job: Arc<Job>,
    handle: Option<JoinHandle<()>>,
}

/// Registry and lifecycle owner of all scan jobs
pub struct JobManager {
    config: JobsConfig,
    started: AtomicBool,
    watch_dir: RwLock<Option<PathBuf>>,
    jobs: Mutex<HashMap<String, JobEntry>>,
}

impl std::fmt::Debug for JobManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobManager")
            .field("started", &self.is_started())
            .field("job_count", &self.lock_jobs().len())
            .finish()
    }
}

impl JobManager {
    pub fn new(config: JobsConfig) -> Self {
        Self {
            config,
            started: AtomicBool::new(false),
            watch_dir: RwLock::new(None),
            jobs: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn state_file(&self) -> &Path {
        &self.config.state_file
    }

    /// Starts accepting jobs for files in `watch_dir`
    ///
    /// With `load_jobs`, every job in the saved-jobs file is re-submitted.
    /// Returns the number of jobs loaded.
    pub async fn init(&self, load_jobs: bool, watch_dir: &Path) -> Result<usize, JobError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(JobError::AlreadyStarted);
        }
        *self.watch_dir.write().unwrap_or_else(|p| p.into_inner()) = Some(watch_dir.to_path_buf());
        info!("JobManager initialized with watch directory: {}", watch_dir.display());

        if !load_jobs {
            return Ok(0);
        }
        Ok(self.load_saved_jobs().await)
    }

    async fn load_saved_jobs(&self) -> usize {
        let path = self.config.state_file.clone();
        let saved = match SavedJobs::load(&path).await {
            Ok(Some(saved)) => saved,
            Ok(None) => {
                info!("No saved jobs file found");
                return 0;
            }
            Err(e) => {
                error!("Failed to load saved jobs: {}", e);
                return 0;
            }
        };

        if saved.jobs.is_empty() {
            info!("No jobs to load from saved file");
            return 0;
        }

        let mut loaded = 0;
        for saved_job in &saved.jobs {
            if !saved_job.is_scan() {
                warn!(
                    job = %saved_job.job_name,
                    job_type = %saved_job.job_type,
                    "Skipping saved job of unknown type"
                );
                continue;
            }
            let result = match saved_job.to_params() {
                Ok(params) => self.scan(params).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => {
                    info!("Loaded saved job: {}", saved_job.job_name);
                    loaded += 1;
                }
                Err(e) => error!("Failed to load saved job {}: {}", saved_job.job_name, e),
            }
        }
        loaded
    }

    /// Registers and spawns a scan job
    ///
    /// The output file is truncated first. When the watch directory holds no
    /// data files the job is not registered.
    pub async fn scan(&self, params: ScanParams) -> Result<(), JobError> {
        let watch_dir = self.require_started()?;
        let name = params.job_name.clone();
        if self.lock_jobs().contains_key(&name) {
            debug!("Duplicate job names are rejected without side effects");
            return Err(JobError::DuplicateJob(name));
        }

        info!("Starting scan job: {}", name);

        if let Err(e) = tokio::fs::File::create(&params.output_file).await {
            warn!("Job {} - Could not truncate output file: {}", name, e);
        }

        let files = match list_data_files(&watch_dir).await {
            Ok(files) => files,
            Err(e) => {
                error!("Error getting files to process: {}", e);
                Vec::new()
            }
        };
        if files.is_empty() {
            return Err(JobError::NoInputFiles(name));
        }

        let job = Arc::new(Job::new(params, files));
        let mut jobs = self.lock_jobs();
        if jobs.contains_key(&name) {
            return Err(JobError::DuplicateJob(name));
        }

        let runner = Arc::clone(&job);
        let handle = tokio::spawn(async move {
            match runner.run().await {
                Ok(total) => info!("Job {} - completed with {} results", runner.name(), total),
                Err(e) => error!("Job {} - Error in job: {}", runner.name(), e),
            }
        });
        jobs.insert(
            name,
            JobEntry {
                job,
                handle: Some(handle),
            },
        );
        Ok(())
    }

    /// Reports job states, for one job or all of them (sorted by name)
    pub fn status(&self, job_name: Option<&str>) -> Result<Vec<(String, JobState)>, JobError> {
        self.require_started()?;
        let jobs = self.lock_jobs();

        let report: Vec<(String, JobState)> = match job_name.filter(|name| !name.is_empty()) {
            None => {
                info!("No job name provided, showing status of all jobs");
                let mut all: Vec<_> = jobs
                    .iter()
                    .map(|(name, entry)| (name.clone(), entry.job.state()))
                    .collect();
                all.sort_by(|a, b| a.0.cmp(&b.0));
                all
            }
            Some(name) => {
                info!("Checking status of job: {}", name);
                match jobs.get(name) {
                    Some(entry) => vec![(name.to_string(), entry.job.state())],
                    None => {
                        info!("Job {} not found", name);
                        Vec::new()
                    }
                }
            }
        };

        for (name, state) in &report {
            info!("{} is {}", name, state);
        }
        Ok(report)
    }

    /// Shuts the manager down
    ///
    /// With `save_jobs`, pending and running jobs are written to the
    /// saved-jobs file first. Running jobs get the configured grace period
    /// before they are aborted and marked cancelled. Returns the number of
    /// jobs saved.
    pub async fn quit(&self, save_jobs: bool) -> usize {
        if !self.is_started() {
            warn!("JobManager not started, nothing to quit");
            return 0;
        }

        let saved = if save_jobs {
            info!("Saving unexecuted jobs to {}", self.config.state_file.display());
            self.save_unexecuted_jobs().await
        } else {
            0
        };

        let mut pending: Vec<(Arc<Job>, JoinHandle<()>)> = self
            .lock_jobs()
            .values_mut()
            .filter_map(|entry| entry.handle.take().map(|h| (Arc::clone(&entry.job), h)))
            .collect();

        if !pending.is_empty() {
            info!("Waiting for running jobs to terminate");
            let grace = self.config.shutdown_grace();
            let all_done = join_all(pending.iter_mut().map(|(_, handle)| handle));
            if tokio::time::timeout(grace, all_done).await.is_err() {
                for (job, handle) in &pending {
                    if !handle.is_finished() {
                        handle.abort();
                    }
                    if job.mark_cancelled() {
                        info!("Job {} - interrupted / cancelled", job.name());
                    }
                }
            }
        }

        self.started.store(false, Ordering::SeqCst);
        info!("JobManager shut down");
        saved
    }

    async fn save_unexecuted_jobs(&self) -> usize {
        let unexecuted: Vec<ScanParams> = {
            let jobs = self.lock_jobs();
            let mut list: Vec<_> = jobs
                .values()
                .filter(|entry| entry.job.state().is_unexecuted())
                .map(|entry| entry.job.params().clone())
                .collect();
            list.sort_by(|a, b| a.job_name.cmp(&b.job_name));
            list
        };

        if unexecuted.is_empty() {
            info!("No unexecuted jobs to save");
            return 0;
        }

        let saved = SavedJobs::from_params(&unexecuted);
        match saved.save(&self.config.state_file).await {
            Ok(()) => {
                info!(
                    "Saved {} unexecuted jobs to {}",
                    unexecuted.len(),
                    self.config.state_file.display()
                );
                unexecuted.len()
            }
            Err(e) => {
                error!("Failed to save jobs: {}", e);
                0
            }
        }
    }

    fn require_started(&self) -> Result<PathBuf, JobError> {
        if !self.is_started() {
            return Err(JobError::NotStarted);
        }
        self.watch_dir
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
            .ok_or(JobError::NotStarted)
    }

    fn lock_jobs(&self) -> std::sync::MutexGuard<'_, HashMap<String, JobEntry>> {
        self.jobs.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_in(dir: &Path) -> JobManager {
        JobManager::new(JobsConfig {
            state_file: dir.join("load_config.toml"),
            shutdown_grace_ms: 500,
        })
    }

    #[tokio::test]
    async fn test_not_started_rejects_commands() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        let params = ScanParams::new(0.0, 1.0, 'H', "o.txt", "j").unwrap();

        assert!(matches!(manager.scan(params).await, Err(JobError::NotStarted)));
        assert!(matches!(manager.status(None), Err(JobError::NotStarted)));
        assert_eq!(manager.quit(true).await, 0);
    }

    #[tokio::test]
    async fn test_init_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        manager.init(false, dir.path()).await.unwrap();
        assert!(matches!(
            manager.init(false, dir.path()).await,
            Err(JobError::AlreadyStarted)
        ));
    }

    #[tokio::test]
    async fn test_scan_without_files_is_not_registered() {
        let dir = tempfile::tempdir().unwrap();
        let watch = dir.path().join("watch");
        std::fs::create_dir(&watch).unwrap();
        let manager = manager_in(dir.path());
        manager.init(false, &watch).await.unwrap();

        let out = dir.path().join("out.txt");
        let params = ScanParams::new(0.0, 1.0, 'H', out.to_string_lossy(), "j").unwrap();
        assert!(matches!(
            manager.scan(params).await,
            Err(JobError::NoInputFiles(_))
        ));
        assert!(manager.status(None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_unknown_job_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        manager.init(false, dir.path()).await.unwrap();
        assert!(manager.status(Some("ghost")).unwrap().is_empty());
    }
}
