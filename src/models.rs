//! Data models module
//!
//! Defines core data structures:
//! - Endpoint: a parsed probe target (stratum relay or host)
//! - StatusRecord: one probe outcome produced by a polling cycle
//! - PollingConfiguration: validated scheduler timing settings
//! - TargetError / MonitorError: operator-facing and engine error taxonomy

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_MAX_CONCURRENT_PROBES, DEFAULT_POLLING_INTERVAL, DEFAULT_PROBE_TIMEOUT,
    MAX_CONCURRENT_PROBES_LIMIT, POLLING_INTERVAL_MAX, POLLING_INTERVAL_MIN, PROBE_TIMEOUT_MAX,
    PROBE_TIMEOUT_MIN, TIMESTAMP_FORMAT,
};


/// Which watch-list a target belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Mining relay addressed as `stratum+tcp://host:port`
    Stratum,
    /// Arbitrary `host[:port]` target, resolved at registration
    Host,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Stratum, Category::Host];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Stratum => "stratum",
            Category::Host => "host",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stratum" | "strata" => Ok(Category::Stratum),
            "host" | "hosts" => Ok(Category::Host),
            other => Err(format!("unknown category '{other}' (expected 'stratum' or 'host')")),
        }
    }
}

/// A probe target after parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Operator-supplied string, trimmed, kept for display
    pub raw_input: String,
    /// Canonical registry key: the literal URL for stratum, `ip:port` for hosts
    pub key: String,
    /// Hostname or IP literal to connect to; empty when parsing failed
    pub host: String,
    /// Port to connect to; `None` when parsing failed
    pub port: Option<u16>,
    pub category: Category,
}

impl Endpoint {
    /// An endpoint that will report INVALID on every cycle
    pub fn invalid(raw_input: &str, category: Category) -> Self {
        Self {
            raw_input: raw_input.to_string(),
            key: raw_input.to_string(),
            host: String::new(),
            port: None,
            category,
        }
    }

    /// A stratum endpoint keyed by its literal URL
    pub fn stratum(raw_input: &str, host: impl Into<String>, port: u16) -> Self {
        Self {
            raw_input: raw_input.to_string(),
            key: raw_input.to_string(),
            host: host.into(),
            port: Some(port),
            category: Category::Stratum,
        }
    }

    /// A host endpoint pinned to the address it resolved to at registration
    pub fn resolved_host(raw_input: &str, addr: SocketAddr) -> Self {
        Self {
            raw_input: raw_input.to_string(),
            key: addr.to_string(),
            host: addr.ip().to_string(),
            port: Some(addr.port()),
            category: Category::Host,
        }
    }

    /// Whether this endpoint can be probed at all
    pub fn is_valid(&self) -> bool {
        !self.host.is_empty() && self.port.is_some()
    }
}

/// Reachability outcome of a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Up,
    Down,
    Invalid,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Up => "UP",
            Status::Down => "DOWN",
            Status::Invalid => "INVALID",
        }
    }
}

impl From<bool> for Status {
    fn from(reachable: bool) -> Self {
        if reachable { Status::Up } else { Status::Down }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One probe outcome; immutable once appended to the sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Cycle start time, truncated to whole seconds
    pub timestamp: DateTime<Local>,
    /// 1-based number of the cycle that produced this record
    pub cycle: u64,
    pub category: Category,
    /// Probed host, or the raw input for invalid targets
    pub host: String,
    /// Probed port; `None` for invalid targets
    pub port: Option<u16>,
    pub status: Status,
}

impl StatusRecord {
    /// Build the record for an endpoint observed during a cycle
    pub fn observe(endpoint: &Endpoint, timestamp: DateTime<Local>, cycle: u64, reachable: Option<bool>) -> Self {
        match (endpoint.is_valid(), reachable) {
            (true, Some(up)) => Self {
                timestamp,
                cycle,
                category: endpoint.category,
                host: endpoint.host.clone(),
                port: endpoint.port,
                status: Status::from(up),
            },
            _ => Self {
                timestamp,
                cycle,
                category: endpoint.category,
                host: endpoint.raw_input.clone(),
                port: None,
                status: Status::Invalid,
            },
        }
    }

    /// Timestamp in the display/export layout
    pub fn formatted_time(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Port as text; empty for invalid records
    pub fn port_text(&self) -> String {
        self.port.map(|p| p.to_string()).unwrap_or_default()
    }
}

/// Scheduler lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerState {
    Stopped,
    Running,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerState::Stopped => f.write_str("stopped"),
            SchedulerState::Running => f.write_str("running"),
        }
    }
}

/// Per-cycle counters used for logging
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub cycle: u64,
    pub up: usize,
    pub down: usize,
    pub invalid: usize,
    pub duration_ms: u64,
}

impl CycleSummary {
    pub fn from_records(cycle: u64, records: &[StatusRecord], duration: Duration) -> Self {
        let mut summary = Self {
            cycle,
            duration_ms: duration.as_millis() as u64,
            ..Self::default()
        };
        for record in records {
            match record.status {
                Status::Up => summary.up += 1,
                Status::Down => summary.down += 1,
                Status::Invalid => summary.invalid += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.up + self.down + self.invalid
    }
}

/// Configuration for polling behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingConfiguration {
    /// Pause between the end of one cycle and the start of the next
    pub interval: Duration,
    /// Connect timeout for each probe
    pub probe_timeout: Duration,
    /// Upper bound on probes in flight within one cycle (1 = sequential)
    pub max_concurrent_probes: usize,
}

impl PollingConfiguration {
    /// Build a configuration from user-facing values, enforcing bounds
    pub fn new(interval_secs: f64, timeout_secs: f64, max_concurrent_probes: usize) -> Result<Self, MonitorError> {
        if !(POLLING_INTERVAL_MIN..=POLLING_INTERVAL_MAX).contains(&interval_secs) {
            return Err(MonitorError::InvalidInterval(interval_secs));
        }
        if !(PROBE_TIMEOUT_MIN..=PROBE_TIMEOUT_MAX).contains(&timeout_secs) {
            return Err(MonitorError::InvalidTimeout(timeout_secs));
        }
        if !(1..=MAX_CONCURRENT_PROBES_LIMIT).contains(&max_concurrent_probes) {
            return Err(MonitorError::InvalidConcurrency(max_concurrent_probes));
        }

        Ok(Self {
            interval: Duration::from_secs_f64(interval_secs),
            probe_timeout: Duration::from_secs_f64(timeout_secs),
            max_concurrent_probes,
        })
    }
}

impl Default for PollingConfiguration {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs_f64(DEFAULT_POLLING_INTERVAL),
            probe_timeout: Duration::from_secs_f64(DEFAULT_PROBE_TIMEOUT),
            max_concurrent_probes: DEFAULT_MAX_CONCURRENT_PROBES,
        }
    }
}

/// Errors reported synchronously to whoever edits the registry.
/// None of these mutate the registry or affect a running scheduler.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("Input is empty: enter an IP or domain (optionally with :port)")]
    EmptyInput,
    #[error("Invalid format '{0}': use stratum+tcp://host:port")]
    InvalidFormat(String),
    #[error("Invalid port '{0}': port must be a number between 1 and 65535")]
    InvalidPort(String),
    #[error("Failed to resolve host '{host}': {source}")]
    Resolution {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{category} target '{key}' already exists")]
    Duplicate { key: String, category: Category },
    #[error("{category} target '{key}' not found")]
    NotFound { key: String, category: Category },
}

/// Custom error types for monitoring operations
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Note: bounds must match POLLING_INTERVAL_MIN/MAX in constants.rs
    #[error("Invalid polling interval: {0}. Must be between 0.1 and 300 seconds")]
    InvalidInterval(f64),
    /// Note: bounds must match PROBE_TIMEOUT_MIN/MAX in constants.rs
    #[error("Invalid probe timeout: {0}. Must be between 0.1 and 60 seconds")]
    InvalidTimeout(f64),
    #[error("Invalid probe concurrency: {0}. Must be between 1 and 256")]
    InvalidConcurrency(usize),
    #[error("Scheduling fault: {0}")]
    SchedulingFault(String),
}
