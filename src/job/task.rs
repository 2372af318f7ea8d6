// * Per-file scan task
// * Filters one data file by letter and temperature range and appends the
// * matches to the job's shared output file

use crate::command::ScanParams;
use crate::data::DataFormat;
use crate::job::JobError;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Output file shared by every file task of one job
///
/// Each task writes its matches in a single locked batch, so lines from
/// different input files never interleave.
#[derive(Debug, Clone)]
pub struct OutputSink {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl OutputSink {
    /// Opens `path` for appending, creating it if needed
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, JobError> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| JobError::Output {
                path: path.clone(),
                source,
            })?;
        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    /// Appends a batch of already formatted lines
    pub async fn write_batch(&self, batch: &str) -> Result<(), JobError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut file = self.file.lock().await;
        let result = async {
            file.write_all(batch.as_bytes()).await?;
            file.flush().await
        }
        .await;
        result.map_err(|source| JobError::Output {
            path: self.path.clone(),
            source,
        })
    }
}

/// Formats the matching lines of `content` as `station;temperature`
pub fn filter_content(content: &str, format: DataFormat, params: &ScanParams) -> (String, usize) {
    let mut out = String::new();
    let mut count = 0;

    for line in format.data_lines(content) {
        // * Exact, case-sensitive match on the raw first character
        if !line.starts_with(params.letter) {
            continue;
        }
        let measurement = match format.parse_line(line) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("{} - {}", params.job_name, e);
                continue;
            }
        };
        if !params.accepts(measurement.temperature) {
            continue;
        }
        let _ = writeln!(out, "{};{:.1}", measurement.station, measurement.temperature);
        count += 1;
    }

    (out, count)
}

/// Scans one data file and returns the number of matches written
pub async fn scan_file(
    path: &Path,
    params: &ScanParams,
    sink: &OutputSink,
) -> Result<usize, JobError> {
    let format = DataFormat::from_path(path).unwrap_or(DataFormat::Txt);
    let bytes = tokio::fs::read(path).await.map_err(|source| JobError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let (batch, count) = filter_content(&String::from_utf8_lossy(&bytes), format, params);
    sink.write_batch(&batch).await?;

    tracing::info!(
        "{} - Got {} results for file {}",
        params.job_name,
        count,
        path.display()
    );
    Ok(count)
}
