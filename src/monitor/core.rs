//! Core probe-cycle logic shared by the scheduler and one-shot checks
//!
//! A cycle snapshots both watch-lists, probes every valid endpoint and turns
//! each outcome into a status record stamped with the cycle start time.

use chrono::{DateTime, Local, SubsecRound};
use futures::stream::{self, StreamExt};
use std::sync::Arc;

use crate::models::{Endpoint, StatusRecord};
use crate::monitor::prober::Probe;
use crate::monitor::registry::TargetRegistry;

/// Probe engine bound to a registry
pub struct PollingCore {
    registry: Arc<TargetRegistry>,
    prober: Arc<dyn Probe>,
    max_concurrent_probes: usize,
}

impl PollingCore {
    pub fn new(registry: Arc<TargetRegistry>, prober: Arc<dyn Probe>, max_concurrent_probes: usize) -> Self {
        Self {
            registry,
            prober,
            max_concurrent_probes: max_concurrent_probes.max(1),
        }
    }

    pub fn registry(&self) -> &Arc<TargetRegistry> {
        &self.registry
    }

    /// Run one full cycle and return its records: stratum entries first, then
    /// hosts, each in registry order, all sharing one timestamp.
    pub async fn run_cycle(&self, cycle: u64) -> Vec<StatusRecord> {
        let timestamp = cycle_timestamp();
        let (stratum, hosts) = self.registry.snapshot_all();
        let targets: Vec<Endpoint> = stratum.into_iter().chain(hosts).collect();

        probe_all(targets, Arc::clone(&self.prober), self.max_concurrent_probes, timestamp, cycle).await
    }
}

/// Probe a fixed list of endpoints.
///
/// Up to `max_concurrent` probes are in flight at once; results come back in
/// input order regardless of which probe finishes first.
pub async fn probe_all(
    targets: Vec<Endpoint>,
    prober: Arc<dyn Probe>,
    max_concurrent: usize,
    timestamp: DateTime<Local>,
    cycle: u64,
) -> Vec<StatusRecord> {
    stream::iter(targets.into_iter().map(move |endpoint| {
        let prober = Arc::clone(&prober);
        async move {
            let reachable = match endpoint.port {
                Some(port) if endpoint.is_valid() => Some(prober.probe(&endpoint.host, port).await),
                _ => None,
            };
            StatusRecord::observe(&endpoint, timestamp, cycle, reachable)
        }
    }))
    .buffered(max_concurrent.max(1))
    .collect()
    .await
}

/// Current wall-clock time truncated to whole seconds
pub fn cycle_timestamp() -> DateTime<Local> {
    Local::now().trunc_subsecs(0)
}
