// * Directory monitoring
// * Maintains the per-letter aggregate map of the watch directory

pub mod aggregate;
pub mod watcher;

pub use aggregate::{aggregate_content, aggregate_file, AggregateData, LetterMap};
pub use watcher::{DirectoryWatcher, MapSource, MonitorError};
