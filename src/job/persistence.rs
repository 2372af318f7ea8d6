// * Saved-jobs file
// * Unexecuted scan jobs are written as TOML on shutdown and re-submitted on start

use crate::command::ScanParams;
use crate::config::constants::SCAN_JOB_TYPE;
use crate::job::JobError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedJobs {
    #[serde(default)]
    pub jobs: Vec<SavedJob>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedJob {
    pub job_name: String,
    pub job_type: String,
    pub scan_params: SavedScanParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedScanParams {
    pub min: f64,
    pub max: f64,
    pub letter: char,
    pub output_filename: String,
}

impl SavedJob {
    pub fn from_params(params: &ScanParams) -> Self {
        Self {
            job_name: params.job_name.clone(),
            job_type: SCAN_JOB_TYPE.to_string(),
            scan_params: SavedScanParams {
                min: params.min,
                max: params.max,
                letter: params.letter,
                output_filename: params.output_file.clone(),
            },
        }
    }

    pub fn is_scan(&self) -> bool {
        self.job_type.eq_ignore_ascii_case(SCAN_JOB_TYPE)
    }

    /// Rebuilds validated scan parameters
    pub fn to_params(&self) -> Result<ScanParams, JobError> {
        let p = &self.scan_params;
        ScanParams::new(p.min, p.max, p.letter, &p.output_filename, &self.job_name).map_err(
            |source| JobError::InvalidSavedJob {
                job: self.job_name.clone(),
                source,
            },
        )
    }
}

impl SavedJobs {
    pub fn from_params<'a>(params: impl IntoIterator<Item = &'a ScanParams>) -> Self {
        Self {
            jobs: params.into_iter().map(SavedJob::from_params).collect(),
        }
    }

    pub fn to_toml(&self) -> Result<String, JobError> {
        Ok(toml::to_string(self)?)
    }

    pub fn from_toml(content: &str, path: &Path) -> Result<Self, JobError> {
        toml::from_str(content).map_err(|source| JobError::StateParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads the saved-jobs file; `Ok(None)` when it does not exist
    pub async fn load(path: &Path) -> Result<Option<Self>, JobError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(JobError::StateFile {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::from_toml(&content, path).map(Some)
    }

    /// Writes the file, replacing any previous contents
    pub async fn save(&self, path: &Path) -> Result<(), JobError> {
        let content = self.to_toml()?;
        tokio::fs::write(path, content)
            .await
            .map_err(|source| JobError::StateFile {
                path: path.to_path_buf(),
                source,
            })
    }
}
