//! Global constants for stratum-watch
//!
//! Centralized location for application-wide constants

/// Application name used for the binary, config directory and log events
pub const APP_NAME: &str = "stratum-watch";

/// URL scheme prefix every stratum relay address must carry
pub const STRATUM_SCHEME: &str = "stratum+tcp";

/// Full prefix checked before a stratum URL is accepted into the registry
pub const STRATUM_PREFIX: &str = "stratum+tcp://";

/// Port assumed for host targets given without an explicit port
pub const DEFAULT_HOST_PORT: u16 = 80;

/// Nominal pause between the end of one cycle and the start of the next (seconds)
pub const DEFAULT_POLLING_INTERVAL: f64 = 1.0;

/// Polling interval bounds (seconds)
pub const POLLING_INTERVAL_MIN: f64 = 0.1;
pub const POLLING_INTERVAL_MAX: f64 = 300.0;

/// Per-probe connect timeout (seconds)
pub const DEFAULT_PROBE_TIMEOUT: f64 = 3.0;

/// Probe timeout bounds (seconds)
pub const PROBE_TIMEOUT_MIN: f64 = 0.1;
pub const PROBE_TIMEOUT_MAX: f64 = 60.0;

/// Probes allowed in flight at once within a single cycle
pub const DEFAULT_MAX_CONCURRENT_PROBES: usize = 8;
pub const MAX_CONCURRENT_PROBES_LIMIT: usize = 256;

/// Capacity of the live record broadcast channel
pub const SINK_CHANNEL_CAPACITY: usize = 1024;

/// Stratum relays seeded into a fresh registry
pub const DEFAULT_STRATUM_URLS: &[&str] = &[
    "stratum+tcp://10.0.0.211:5051",
    "stratum+tcp://ss.id.antpool.com:3333",
];

/// Host targets seeded into a fresh registry
pub const DEFAULT_HOSTS: &[&str] = &["8.8.8.8:53", "1.1.1.1:53"];

/// Export file names, one per category
pub const STRATUM_EXPORT_FILE: &str = "stratum_log.csv";
pub const HOST_EXPORT_FILE: &str = "host_log.csv";

/// Header row shared by both export files
pub const EXPORT_HEADER: [&str; 4] = ["Time", "Host", "Port", "Status"];

/// Timestamp layout used for display and export
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Config file name inside the per-user config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Structured log event identifiers
pub const EVENT_STARTUP: &str = "monitor_startup";
pub const EVENT_SHUTDOWN: &str = "monitor_shutdown";
pub const EVENT_TARGET_CHANGED: &str = "target_changed";
pub const EVENT_CYCLE_COMPLETED: &str = "cycle_completed";
pub const EVENT_ERROR: &str = "error";
