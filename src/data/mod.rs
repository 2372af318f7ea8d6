// * Measurement data files
// * Line format and file discovery shared by the directory watcher and scan jobs

use crate::config::constants::{CSV_SEPARATOR, TXT_SEPARATOR};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum LineError {
    #[error("Invalid line format: {0}")]
    FieldCount(String),

    #[error("Empty station name: {0}")]
    EmptyStation(String),

    #[error("Invalid temperature in line: {0}")]
    Temperature(String),
}

/// On-disk layout of a data file, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    /// `station,temperature` with a header row
    Csv,
    /// `station;temperature` without header
    Txt,
}

impl DataFormat {
    /// Resolves the format from the file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(DataFormat::Csv),
            "txt" => Some(DataFormat::Txt),
            _ => None,
        }
    }

    pub fn separator(self) -> char {
        match self {
            DataFormat::Csv => CSV_SEPARATOR,
            DataFormat::Txt => TXT_SEPARATOR,
        }
    }

    /// Number of leading lines that carry no data
    pub fn header_lines(self) -> usize {
        match self {
            DataFormat::Csv => 1,
            DataFormat::Txt => 0,
        }
    }

    /// Iterates over the data lines of `content`, skipping the header
    pub fn data_lines<'a>(self, content: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        content.lines().skip(self.header_lines())
    }

    /// Splits a data line into a measurement
    pub fn parse_line(self, line: &str) -> Result<Measurement, LineError> {
        let parts: Vec<&str> = line.split(self.separator()).collect();
        if parts.len() != 2 {
            return Err(LineError::FieldCount(line.to_string()));
        }

        let station = parts[0].trim();
        if station.is_empty() {
            return Err(LineError::EmptyStation(line.to_string()));
        }

        let temperature = parts[1]
            .trim()
            .parse::<f64>()
            .map_err(|_| LineError::Temperature(line.to_string()))?;

        Ok(Measurement {
            station: station.to_string(),
            temperature,
        })
    }
}

/// One parsed line: a station and a temperature reading
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub station: String,
    pub temperature: f64,
}

/// True for `.txt`/`.csv` paths, regardless of case
pub fn has_data_extension(path: &Path) -> bool {
    DataFormat::from_path(path).is_some()
}

/// Lists data files directly inside `dir` (no recursion), sorted by path
pub async fn list_data_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !has_data_extension(&path) {
            continue;
        }
        // * Follows symlinks, like a regular-file check on the target
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable entry"),
        }
    }

    files.sort();
    Ok(files)
}
