//! Concurrent Mess
//!
//! Console application that aggregates meteorological measurement files in a
//! watched directory, exports the per-letter aggregate map on a schedule, and
//! runs named scan jobs submitted as commands on standard input.

pub mod app;
pub mod command;
pub mod config;
pub mod data;
pub mod job;
pub mod monitor;
pub mod ops;
pub mod queue;
pub mod report;

pub use app::App;
pub use config::AppConfig;
