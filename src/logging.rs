//! Logging setup and structured monitor events
//!
//! Diagnostics go through the `log` facade to stderr via `env_logger`, so they
//! never interleave with status rows on stdout. `MonitorLogger` adds one-line
//! JSON events for the monitor lifecycle.

use anyhow::Result;
use log::{error, info, LevelFilter};
use serde_json::json;
use std::path::Path;

use crate::constants::{
    APP_NAME, EVENT_CYCLE_COMPLETED, EVENT_ERROR, EVENT_SHUTDOWN, EVENT_STARTUP, EVENT_TARGET_CHANGED,
};
use crate::models::{Category, CycleSummary};

/// How chatty diagnostics should be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn level_filter(self) -> LevelFilter {
        match self {
            Verbosity::Quiet => LevelFilter::Error,
            Verbosity::Normal => LevelFilter::Warn,
            Verbosity::Verbose => LevelFilter::Debug,
        }
    }
}

/// Install the stderr logger. `RUST_LOG` takes precedence over `verbosity`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(verbosity: Verbosity) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(verbosity.level_filter())
        .target(env_logger::Target::Stderr)
        .format_timestamp_secs();
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    let _ = builder.try_init();
}

/// Structured lifecycle logger for the monitor
#[derive(Debug, Clone, Default)]
pub struct MonitorLogger {
    /// Whether per-cycle summaries are emitted (they are frequent)
    log_cycles: bool,
}

impl MonitorLogger {
    pub fn new(log_cycles: bool) -> Self {
        Self { log_cycles }
    }

    /// Log monitor startup
    pub fn log_startup(&self, config_path: Option<&Path>, stratum_targets: usize, host_targets: usize) -> Result<()> {
        let message = json!({
            "event": EVENT_STARTUP,
            "app": APP_NAME,
            "pid": std::process::id(),
            "config_path": config_path.map(|p| p.display().to_string()),
            "stratum_targets": stratum_targets,
            "host_targets": host_targets,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(false, "Monitor started", &message)
    }

    /// Log monitor shutdown
    pub fn log_shutdown(&self, reason: &str, cycles: u64) -> Result<()> {
        let message = json!({
            "event": EVENT_SHUTDOWN,
            "reason": reason,
            "cycles": cycles,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(false, "Monitor shutting down", &message)
    }

    /// Log an operator edit of a watch-list
    pub fn log_target_change(&self, action: &str, category: Category, key: &str) -> Result<()> {
        let message = json!({
            "event": EVENT_TARGET_CHANGED,
            "action": action,
            "category": category,
            "key": key,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(false, &format!("Target {action}: {key}"), &message)
    }

    /// Log the counters of a finished cycle
    pub fn log_cycle(&self, summary: &CycleSummary) -> Result<()> {
        if !self.log_cycles {
            return Ok(());
        }

        let message = json!({
            "event": EVENT_CYCLE_COMPLETED,
            "summary": summary,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(false, &format!("Cycle {} completed", summary.cycle), &message)
    }

    /// Log error events
    pub fn log_error(&self, error_message: &str, context: Option<&str>) -> Result<()> {
        let message = json!({
            "event": EVENT_ERROR,
            "message": error_message,
            "context": context,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(true, error_message, &message)
    }

    fn log_structured(&self, is_error: bool, message: &str, data: &serde_json::Value) -> Result<()> {
        let full_message = format!("{} | {}", message, serde_json::to_string(data)?);
        if is_error {
            error!("{}", full_message);
        } else {
            info!("{}", full_message);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(Verbosity::Quiet.level_filter(), LevelFilter::Error);
        assert_eq!(Verbosity::Normal.level_filter(), LevelFilter::Warn);
        assert_eq!(Verbosity::Verbose.level_filter(), LevelFilter::Debug);
    }

    #[test]
    fn test_init_logging_twice_does_not_panic() {
        init_logging(Verbosity::Normal);
        init_logging(Verbosity::Verbose);
    }

    #[test]
    fn test_structured_events_succeed() {
        let logger = MonitorLogger::new(true);
        logger.log_startup(None, 2, 2).unwrap();
        logger.log_target_change("added", Category::Host, "8.8.8.8:53").unwrap();
        logger.log_cycle(&CycleSummary::default()).unwrap();
        logger.log_error("boom", Some("test")).unwrap();
        logger.log_shutdown("test finished", 3).unwrap();
    }
}
