// * Operations: logging setup for the console application

pub mod telemetry;

pub use telemetry::{ansi_enabled, build_filter, init_tracing, init_tracing_with_level};
