// * Configuration Constants
// * Central location for every default threshold, interval and file name

// * Config file read when no --config flag is given
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

// * Saved-jobs file written by STOP --save-jobs and read by START --load-jobs
pub const DEFAULT_JOBS_STATE_FILE: &str = "load_config.toml";

// * CSV report written by EXPORTMAP and the periodic exporter
pub const DEFAULT_MAP_EXPORT_FILE: &str = "meteorological_data_map.csv";

// * Period of the automatic map export (1 minute)
pub const DEFAULT_REPORT_INTERVAL_SECS: u64 = 60;

// * How long stop() waits for the periodic exporter to wind down
pub const REPORT_STOP_TIMEOUT_SECS: u64 = 10;

// * Upper bound for the initial aggregate scan (5 minutes)
pub const DEFAULT_INITIAL_SCAN_TIMEOUT_SECS: u64 = 300;

// * Grace period for running jobs on shutdown before they are aborted
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 2_000;

// * Field separators per format
pub const CSV_SEPARATOR: char = ',';
pub const TXT_SEPARATOR: char = ';';

// * Header row of the exported map
pub const MAP_EXPORT_HEADER: &str = "Letter,Station count,Sum";

// * Job type tag used in the saved-jobs file
pub const SCAN_JOB_TYPE: &str = "SCAN";

// * Prompt printed before every line read from stdin
pub const PROMPT: &str = "Enter command: ";
