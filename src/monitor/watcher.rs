// * Directory watcher
// * Builds the aggregate map with a concurrent initial scan, then follows
// * filesystem create/modify events and refreshes the contribution of every
// * changed file

use crate::config::MonitorConfig;
use crate::data::{has_data_extension, list_data_files, DataFormat};
use crate::monitor::aggregate::{aggregate_content, merge_maps, LetterMap};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};
use xxhash_rust::xxh64::xxh64;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Failed to prepare watch directory {path:?}: {source}")]
    WatchDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to register watch on {path:?}: {source}")]
    Register {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("Failed to list watch directory: {0}")]
    Listing(#[from] std::io::Error),
}

/// Read access to a published aggregate map
pub trait MapSource: Send + Sync {
    /// Returns a copy of the current map
    fn snapshot(&self) -> LetterMap;
}

type EventReceiver = mpsc::UnboundedReceiver<notify::Result<Event>>;

// * What one file currently contributes to the map
#[derive(Debug, Clone)]
struct FileEntry {
    fingerprint: u64,
    letters: LetterMap,
}

#[derive(Debug)]
struct WatcherState {
    watch_dir: PathBuf,
    files: Mutex<HashMap<PathBuf, FileEntry>>,
    published: RwLock<LetterMap>,
}

impl WatcherState {
    // * Rebuilds the total from every file contribution and swaps it in
    fn publish(&self) -> usize {
        let total = {
            let files = lock(&self.files);
            merge_maps(files.values().map(|entry| &entry.letters))
        };
        let letters = total.len();
        *self
            .published
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = total;
        letters
    }

    // * Re-reads one file and replaces its contribution; false when the bytes are unchanged
    async fn refresh_file(&self, path: &Path) -> std::io::Result<bool> {
        let entry = read_entry(path).await?;
        let mut files = lock(&self.files);
        let changed = files
            .get(path)
            .map(|prev| prev.fingerprint != entry.fingerprint)
            .unwrap_or(true);
        if changed {
            files.insert(path.to_path_buf(), entry);
        }
        Ok(changed)
    }

    // * Maps an event path onto the key used by the directory listing
    fn local_path(&self, path: &Path) -> Option<PathBuf> {
        let local = self.watch_dir.join(path.file_name()?);
        has_data_extension(&local).then_some(local)
    }

    /// Applies one create/modify event; returns how many files changed
    async fn handle_event(&self, event: Event) -> usize {
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            return 0;
        }

        let mut changed = 0;
        for path in event.paths.iter().filter_map(|p| self.local_path(p)) {
            // * Renamed-away or deleted entries keep their last contribution
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => {}
                _ => continue,
            }
            match self.refresh_file(&path).await {
                Ok(true) => {
                    info!("File changed: {}", path.display());
                    changed += 1;
                }
                Ok(false) => debug!(path = %path.display(), "Contents unchanged"),
                Err(e) => error!("Error processing file {}: {}", path.display(), e),
            }
        }

        if changed > 0 {
            self.publish();
        }
        changed
    }

    // * Full pass over the directory, used when the event stream reports an error
    async fn resync(&self) -> Result<usize, MonitorError> {
        let mut changed = 0;
        for path in list_data_files(&self.watch_dir).await? {
            match self.refresh_file(&path).await {
                Ok(true) => changed += 1,
                Ok(false) => {}
                Err(e) => error!("Error processing file {}: {}", path.display(), e),
            }
        }
        if changed > 0 {
            self.publish();
        }
        Ok(changed)
    }
}

// * Keeps the OS watch registered for as long as the event task runs
struct EventHandle {
    _watcher: RecommendedWatcher,
    shutdown_tx: mpsc::Sender<()>,
    join_handle: JoinHandle<()>,
}

/// Watches a directory of data files and keeps the aggregate map current
pub struct DirectoryWatcher {
    state: Arc<WatcherState>,
    config: MonitorConfig,
    running: AtomicBool,
    events: Mutex<Option<EventHandle>>,
}

impl std::fmt::Debug for DirectoryWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryWatcher")
            .field("watch_dir", &self.state.watch_dir)
            .field("running", &self.is_running())
            .finish()
    }
}

impl DirectoryWatcher {
    pub fn new(watch_dir: impl Into<PathBuf>, config: MonitorConfig) -> Self {
        Self {
            state: Arc::new(WatcherState {
                watch_dir: watch_dir.into(),
                files: Mutex::new(HashMap::new()),
                published: RwLock::new(LetterMap::new()),
            }),
            config,
            running: AtomicBool::new(false),
            events: Mutex::new(None),
        }
    }

    pub fn watch_dir(&self) -> &Path {
        &self.state.watch_dir
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Builds the initial map and starts following directory events
    ///
    /// Creates the watch directory when it does not exist. Calling this on
    /// a running watcher only logs a warning.
    pub async fn start(&self) -> Result<(), MonitorError> {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Directory watcher is already running");
            return Ok(());
        }

        match self.register_and_scan().await {
            Ok(handle) => {
                *lock(&self.events) = Some(handle);
                info!("Directory watcher started for: {}", self.state.watch_dir.display());
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    async fn register_and_scan(&self) -> Result<EventHandle, MonitorError> {
        let watch_dir = &self.state.watch_dir;
        tokio::fs::create_dir_all(watch_dir)
            .await
            .map_err(|source| MonitorError::WatchDirectory {
                path: watch_dir.clone(),
                source,
            })?;

        // * Registered before the initial scan; events raised during the scan
        // * queue up and are replayed afterwards
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let register = |source| MonitorError::Register {
            path: watch_dir.clone(),
            source,
        };
        let mut watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| {
                let _ = event_tx.send(result);
            },
            Config::default(),
        )
        .map_err(register)?;
        watcher
            .watch(watch_dir, RecursiveMode::NonRecursive)
            .map_err(register)?;

        self.initial_scan().await?;

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        let state = Arc::clone(&self.state);
        let join_handle = tokio::spawn(Self::event_loop(state, event_rx, shutdown_rx));

        Ok(EventHandle {
            _watcher: watcher,
            shutdown_tx,
            join_handle,
        })
    }

    async fn event_loop(
        state: Arc<WatcherState>,
        mut events: EventReceiver,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    debug!("Directory watcher received shutdown signal");
                    break;
                }
                received = events.recv() => match received {
                    Some(Ok(event)) => {
                        state.handle_event(event).await;
                    }
                    Some(Err(e)) => {
                        error!("Error in watch service: {}", e);
                        if let Err(e) = state.resync().await {
                            error!("Resync after watch error failed: {}", e);
                        }
                    }
                    None => break,
                }
            }
        }
    }

    // * Processes every data file concurrently, bounded by the configured timeout
    async fn initial_scan(&self) -> Result<(), MonitorError> {
        let files = list_data_files(&self.state.watch_dir).await?;
        if files.is_empty() {
            info!("No files found in watch directory");
            return Ok(());
        }

        info!("Processing {} files for initial aggregate map", files.len());
        let mut set = JoinSet::new();
        for path in files {
            set.spawn(async move {
                let entry = read_entry(&path).await;
                (path, entry)
            });
        }

        let mut entries = Vec::new();
        let collect = async {
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok((path, Ok(entry))) => entries.push((path, entry)),
                    Ok((path, Err(e))) => {
                        error!("Error processing file {}: {}", path.display(), e)
                    }
                    Err(e) => error!("Initial scan task failed: {}", e),
                }
            }
        };
        if tokio::time::timeout(self.config.initial_scan_timeout(), collect)
            .await
            .is_err()
        {
            error!(
                "Initial scan timed out after {:?}, publishing partial map",
                self.config.initial_scan_timeout()
            );
        }

        lock(&self.state.files).extend(entries);
        let letters = self.state.publish();
        info!("Initial aggregate map created with {} letters", letters);
        Ok(())
    }

    /// Re-reads every data file immediately
    ///
    /// Returns the number of files whose contents changed.
    pub async fn rescan(&self) -> Result<usize, MonitorError> {
        self.state.resync().await
    }

    /// Stops following events; the published map stays readable
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let handle = lock(&self.events).take();
        if let Some(handle) = handle {
            let _ = handle.shutdown_tx.send(()).await;
            if let Err(e) = handle.join_handle.await {
                warn!("Directory watcher task ended abnormally: {}", e);
            }
        }
        info!("Directory watcher stopped");
    }
}

impl MapSource for DirectoryWatcher {
    fn snapshot(&self) -> LetterMap {
        self.state
            .published
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

async fn read_entry(path: &Path) -> std::io::Result<FileEntry> {
    info!("Processing file for aggregate map: {}", path.display());
    let bytes = tokio::fs::read(path).await?;
    let letters = match DataFormat::from_path(path) {
        Some(format) => aggregate_content(&String::from_utf8_lossy(&bytes), format),
        None => LetterMap::new(),
    };
    Ok(FileEntry {
        fingerprint: xxh64(&bytes, 0),
        letters,
    })
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::AggregateData;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};
    use std::time::Duration;

    fn watcher_in(dir: &Path) -> DirectoryWatcher {
        DirectoryWatcher::new(dir, MonitorConfig::default())
    }

    fn event(kind: EventKind, path: PathBuf) -> Event {
        Event::new(kind).add_path(path)
    }

    #[tokio::test]
    async fn test_start_creates_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("watch");
        let watcher = watcher_in(&dir);

        watcher.start().await.unwrap();
        assert!(dir.is_dir());
        assert!(watcher.is_running());
        assert!(watcher.snapshot().is_empty());

        watcher.stop().await;
        assert!(!watcher.is_running());
    }

    #[tokio::test]
    async fn test_initial_scan_builds_map() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "Hamburg;10.0\nOslo;1.0\n").unwrap();
        std::fs::write(dir.path().join("b.csv"), "station,t\nHelsinki,2.0\n").unwrap();

        let watcher = watcher_in(dir.path());
        watcher.start().await.unwrap();

        let map = watcher.snapshot();
        assert_eq!(map[&'H'], AggregateData { count: 2, sum: 12.0 });
        assert_eq!(map[&'O'], AggregateData { count: 1, sum: 1.0 });
        watcher.stop().await;
    }

    #[tokio::test]
    async fn test_modify_event_replaces_file_contribution() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, "Hamburg;10.0\n").unwrap();

        let watcher = watcher_in(dir.path());
        watcher.start().await.unwrap();
        watcher.stop().await;

        std::fs::write(&file, "Hamburg;10.0\nHamburg;5.0\n").unwrap();
        let modify = event(EventKind::Modify(ModifyKind::Any), file.clone());
        assert_eq!(watcher.state.handle_event(modify.clone()).await, 1);
        assert_eq!(watcher.snapshot()[&'H'], AggregateData { count: 2, sum: 15.0 });

        // * Same bytes again: skipped by the fingerprint
        assert_eq!(watcher.state.handle_event(modify).await, 0);
        assert_eq!(watcher.snapshot()[&'H'], AggregateData { count: 2, sum: 15.0 });
    }

    #[tokio::test]
    async fn test_irrelevant_events_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("a.txt");
        let other = dir.path().join("notes.md");
        std::fs::write(&data, "Hamburg;10.0\n").unwrap();
        std::fs::write(&other, "Hamburg;10.0\n").unwrap();

        let watcher = watcher_in(dir.path());
        let remove = event(EventKind::Remove(RemoveKind::File), data.clone());
        assert_eq!(watcher.state.handle_event(remove).await, 0);

        let foreign = event(EventKind::Create(CreateKind::File), other);
        assert_eq!(watcher.state.handle_event(foreign).await, 0);

        let vanished = event(
            EventKind::Create(CreateKind::File),
            dir.path().join("gone.csv"),
        );
        assert_eq!(watcher.state.handle_event(vanished).await, 0);
        assert!(watcher.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_new_file_is_picked_up_from_events() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = watcher_in(dir.path());
        watcher.start().await.unwrap();

        std::fs::write(dir.path().join("b.txt"), "Bern;3.0\nbasel;1.0\n").unwrap();
        for _ in 0..250 {
            if watcher.snapshot().get(&'B') == Some(&AggregateData { count: 2, sum: 4.0 }) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(watcher.snapshot()[&'B'], AggregateData { count: 2, sum: 4.0 });
        watcher.stop().await;
    }

    #[tokio::test]
    async fn test_rescan_counts_changed_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "Hamburg;10.0\n").unwrap();
        std::fs::write(dir.path().join("b.txt"), "Oslo;1.0\n").unwrap();

        let watcher = watcher_in(dir.path());
        watcher.start().await.unwrap();
        watcher.stop().await;

        std::fs::write(dir.path().join("b.txt"), "Oslo;4.0\n").unwrap();
        assert_eq!(watcher.rescan().await.unwrap(), 1);
        assert_eq!(watcher.snapshot()[&'O'], AggregateData { count: 1, sum: 4.0 });
        assert_eq!(watcher.rescan().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_start_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = watcher_in(dir.path());
        watcher.start().await.unwrap();
        watcher.start().await.unwrap();
        assert!(watcher.is_running());
        watcher.stop().await;
    }
}
