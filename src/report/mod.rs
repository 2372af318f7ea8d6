// * Map reporting
// * Prints the aggregate map to the log and exports it to CSV, on demand and
// * on a fixed schedule

use crate::config::constants::{MAP_EXPORT_HEADER, REPORT_STOP_TIMEOUT_SECS};
use crate::config::ReportConfig;
use crate::monitor::{LetterMap, MapSource};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Error exporting map to {path:?}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Formats the map two entries per line, `L: count, sum` each
pub fn render_map_lines(map: &LetterMap) -> Vec<String> {
    let cells: Vec<String> = map
        .iter()
        .map(|(letter, data)| format!("{}: {}, {:.1}", letter, data.count, data.sum))
        .collect();

    cells.chunks(2).map(|pair| pair.join("\t|\t")).collect()
}

/// Renders the CSV export, header included
pub fn render_csv(map: &LetterMap) -> String {
    let mut out = String::from(MAP_EXPORT_HEADER);
    out.push('\n');
    for (letter, data) in map {
        out.push_str(&format!("{},{},{:.1}\n", letter, data.count, data.sum));
    }
    out
}

struct ReportHandle {
    shutdown_tx: mpsc::Sender<()>,
    join_handle: JoinHandle<()>,
}

/// Prints and exports the aggregate map
pub struct MapReportService {
    source: Arc<dyn MapSource>,
    config: ReportConfig,
    // * Serializes manual and scheduled exports
    export_lock: tokio::sync::Mutex<()>,
    running: AtomicBool,
    task: Mutex<Option<ReportHandle>>,
}

impl std::fmt::Debug for MapReportService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapReportService")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish()
    }
}

impl MapReportService {
    pub fn new(source: Arc<dyn MapSource>, config: ReportConfig) -> Self {
        Self {
            source,
            config,
            export_lock: tokio::sync::Mutex::new(()),
            running: AtomicBool::new(false),
            task: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn export_path(&self) -> &std::path::Path {
        &self.config.export_file
    }

    /// Logs the current map, or a notice when nothing has been aggregated yet
    pub fn print_map(&self) -> Vec<String> {
        let map = self.source.snapshot();
        if map.is_empty() {
            info!("Map is not yet available");
            return Vec::new();
        }

        let lines = render_map_lines(&map);
        for line in &lines {
            info!("{}", line);
        }
        lines
    }

    /// Writes the map to the export file, replacing previous contents
    ///
    /// Returns `Ok(None)` without touching the file when the map is empty.
    pub async fn export_csv(&self) -> Result<Option<PathBuf>, ReportError> {
        let _guard = self.export_lock.lock().await;

        let map = self.source.snapshot();
        if map.is_empty() {
            warn!("Map is not yet available");
            return Ok(None);
        }

        let path = self.config.export_file.clone();
        tokio::fs::write(&path, render_csv(&map))
            .await
            .map_err(|source| ReportError::Export {
                path: path.clone(),
                source,
            })?;

        info!("Map exported to {}", path.display());
        Ok(Some(path))
    }

    /// Spawns the periodic exporter; the first export happens one interval from now
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Map report service already running");
            return;
        }

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let service = Arc::clone(self);
        let period = self.config.interval();

        let join_handle = tokio::spawn(async move {
            let mut tick = interval_at(Instant::now() + period, period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = tick.tick() => {
                        info!("Generating periodic report");
                        if let Err(e) = service.export_csv().await {
                            tracing::error!("{}", e);
                        }
                    }
                }
            }
        });

        *self.task.lock().unwrap_or_else(|p| p.into_inner()) = Some(ReportHandle {
            shutdown_tx,
            join_handle,
        });
        info!(
            interval_secs = self.config.interval_secs,
            "Map report service started"
        );
    }

    /// Stops the periodic exporter, aborting it if it does not finish in time
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        let handle = self.task.lock().unwrap_or_else(|p| p.into_inner()).take();
        if let Some(handle) = handle {
            let _ = handle.shutdown_tx.send(()).await;
            let abort = handle.join_handle.abort_handle();
            let wait = Duration::from_secs(REPORT_STOP_TIMEOUT_SECS);
            if tokio::time::timeout(wait, handle.join_handle).await.is_err() {
                abort.abort();
                warn!("Map report service did not stop in time, aborted");
            }
        }
        info!("Map report service stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::AggregateData;

    struct FixedMap(LetterMap);

    impl MapSource for FixedMap {
        fn snapshot(&self) -> LetterMap {
            self.0.clone()
        }
    }

    fn sample_map() -> LetterMap {
        let mut map = LetterMap::new();
        map.insert('A', AggregateData { count: 3, sum: 12.3 });
        map.insert('B', AggregateData { count: 1, sum: -4.0 });
        map.insert('C', AggregateData { count: 2, sum: 0.04 });
        map
    }

    #[test]
    fn test_render_map_lines_pairs_entries() {
        let lines = render_map_lines(&sample_map());
        assert_eq!(lines, vec!["A: 3, 12.3\t|\tB: 1, -4.0", "C: 2, 0.0"]);
    }

    #[test]
    fn test_render_csv() {
        let csv = render_csv(&sample_map());
        assert_eq!(
            csv,
            "Letter,Station count,Sum\nA,3,12.3\nB,1,-4.0\nC,2,0.0\n"
        );
    }

    #[tokio::test]
    async fn test_export_empty_map_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = ReportConfig {
            export_file: dir.path().join("map.csv"),
            ..ReportConfig::default()
        };
        let service = MapReportService::new(Arc::new(FixedMap(LetterMap::new())), config);

        assert!(service.export_csv().await.unwrap().is_none());
        assert!(!dir.path().join("map.csv").exists());
        assert!(service.print_map().is_empty());
    }

    #[tokio::test]
    async fn test_export_truncates_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.csv");
        std::fs::write(&path, "stale\nstale\nstale\nstale\nstale\nstale\n").unwrap();

        let config = ReportConfig {
            export_file: path.clone(),
            ..ReportConfig::default()
        };
        let service = MapReportService::new(Arc::new(FixedMap(sample_map())), config);

        assert_eq!(service.export_csv().await.unwrap(), Some(path.clone()));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("Letter,Station count,Sum\n"));
        assert!(!written.contains("stale"));
    }

    #[tokio::test]
    async fn test_periodic_export_runs_after_one_interval() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.csv");
        let config = ReportConfig {
            interval_secs: 1,
            export_file: path.clone(),
        };
        let service = Arc::new(MapReportService::new(
            Arc::new(FixedMap(sample_map())),
            config,
        ));

        service.start();
        assert!(service.is_running());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!path.exists());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(path.exists());

        service.stop().await;
        assert!(!service.is_running());
    }
}
