//! Periodic polling loop with a Stopped/Running state machine
//!
//! While running, a background task runs one cycle, sleeps for the interval and
//! repeats until stopped; a supervisor records a crashed loop as a fault.

use crate::models::{CycleSummary, MonitorError, PollingConfiguration, SchedulerState};
use crate::monitor::core::PollingCore;
use crate::monitor::prober::{Probe, TcpProber};
use crate::monitor::registry::TargetRegistry;
use crate::monitor::sink::StatusSink;
use log::{debug, error, info};
use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Start/stop bookkeeping guarded by a plain mutex; never held across an await
struct Control {
    state: SchedulerState,
    /// Bumped on every start so a stale loop cannot reset a newer run
    generation: u64,
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

struct Shared {
    core: PollingCore,
    sink: Arc<StatusSink>,
    interval: Duration,
    /// Held for the full length of a cycle: at most one cycle in flight
    cycle_lock: tokio::sync::Mutex<()>,
    cycles: watch::Sender<u64>,
    last_summary: Mutex<Option<CycleSummary>>,
    fault: Mutex<Option<String>>,
    control: Mutex<Control>,
}

impl Shared {
    fn control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn fault(&self) -> MutexGuard<'_, Option<String>> {
        self.fault.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn run_one_cycle(&self) {
        let cycle = *self.cycles.borrow() + 1;
        let started = Instant::now();

        let records = self.core.run_cycle(cycle).await;
        let summary = CycleSummary::from_records(cycle, &records, started.elapsed());
        debug!(
            "Cycle {} finished in {}ms: {} up, {} down, {} invalid",
            cycle, summary.duration_ms, summary.up, summary.down, summary.invalid
        );

        self.sink.extend(records);
        *self.last_summary.lock().unwrap_or_else(|e| e.into_inner()) = Some(summary);
        self.cycles.send_replace(cycle);
    }
}

/// Periodic probe scheduler.
///
/// Starts in [`SchedulerState::Stopped`]. While running, one cycle runs
/// immediately and then again `interval` after each cycle ends.
pub struct Scheduler {
    shared: Arc<Shared>,
}

impl Scheduler {
    pub fn new(
        registry: Arc<TargetRegistry>,
        sink: Arc<StatusSink>,
        prober: Arc<dyn Probe>,
        config: &PollingConfiguration,
    ) -> Self {
        let (cycles, _) = watch::channel(0);
        let shared = Shared {
            core: PollingCore::new(registry, prober, config.max_concurrent_probes),
            sink,
            interval: config.interval,
            cycle_lock: tokio::sync::Mutex::new(()),
            cycles,
            last_summary: Mutex::new(None),
            fault: Mutex::new(None),
            control: Mutex::new(Control {
                state: SchedulerState::Stopped,
                generation: 0,
                shutdown: None,
                task: None,
            }),
        };
        Self { shared: Arc::new(shared) }
    }

    /// Scheduler that probes over real TCP connections
    pub fn with_tcp_prober(registry: Arc<TargetRegistry>, sink: Arc<StatusSink>, config: &PollingConfiguration) -> Self {
        let prober = Arc::new(TcpProber::new(config.probe_timeout));
        Self::new(registry, sink, prober, config)
    }

    /// Begin polling on the current Tokio runtime.
    ///
    /// Returns `Ok(false)` if already running. Fails only if no runtime is
    /// available to host the polling loop.
    pub fn start(&self) -> Result<bool, MonitorError> {
        let runtime = Handle::try_current()
            .map_err(|e| MonitorError::SchedulingFault(format!("no async runtime available: {e}")))?;

        let mut control = self.shared.control();
        if control.state == SchedulerState::Running {
            debug!("start() ignored: scheduler already running");
            return Ok(false);
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        control.generation += 1;
        let generation = control.generation;

        let worker = runtime.spawn(run_loop(Arc::clone(&self.shared), shutdown_rx));
        let supervisor = runtime.spawn(supervise(Arc::clone(&self.shared), worker, generation));

        control.state = SchedulerState::Running;
        control.shutdown = Some(shutdown_tx);
        // A previous, already-stopped loop is detached here; the cycle lock
        // keeps its last cycle from overlapping with ours.
        control.task = Some(supervisor);
        drop(control);

        info!("Polling started (interval: {:.1}s)", self.shared.interval.as_secs_f64());
        Ok(true)
    }

    /// Stop polling. No further cycle starts; an in-flight cycle still completes.
    ///
    /// Returns `false` if already stopped.
    pub fn stop(&self) -> bool {
        let mut control = self.shared.control();
        if control.state == SchedulerState::Stopped {
            debug!("stop() ignored: scheduler already stopped");
            return false;
        }

        control.state = SchedulerState::Stopped;
        if let Some(shutdown) = control.shutdown.take() {
            let _ = shutdown.send(true);
        }
        drop(control);

        info!("Polling stopped");
        true
    }

    /// Stop and wait for the polling loop to exit, so every record of an
    /// in-flight cycle has reached the sink. Reports a loop fault if one occurred.
    pub async fn shutdown(&self) -> Result<(), MonitorError> {
        self.stop();

        let task = self.shared.control().task.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                return Err(MonitorError::SchedulingFault(format!("polling supervisor failed: {e}")));
            }
        }

        match self.take_fault() {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.shared.control().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    /// Number of cycles completed since this scheduler was created
    pub fn cycles_completed(&self) -> u64 {
        *self.shared.cycles.borrow()
    }

    /// Wait until at least `target` cycles have completed; returns the count seen.
    ///
    /// Never resolves while the scheduler is stopped short of `target`.
    pub async fn wait_for_cycles(&self, target: u64) -> u64 {
        let mut rx = self.shared.cycles.subscribe();
        let _ = rx.wait_for(|completed| *completed >= target).await;
        let completed = *rx.borrow();
        completed
    }

    /// Receiver notified with the cycle count each time a cycle completes
    pub fn subscribe_cycles(&self) -> watch::Receiver<u64> {
        self.shared.cycles.subscribe()
    }

    pub fn last_summary(&self) -> Option<CycleSummary> {
        self.shared.last_summary.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Last scheduling fault without clearing it; `shutdown` still reports it
    pub fn fault(&self) -> Option<MonitorError> {
        self.shared.fault().clone().map(MonitorError::SchedulingFault)
    }

    /// Take the last scheduling fault, if the polling loop died unexpectedly
    pub fn take_fault(&self) -> Option<MonitorError> {
        self.shared.fault().take().map(MonitorError::SchedulingFault)
    }

    pub fn registry(&self) -> &Arc<TargetRegistry> {
        self.shared.core.registry()
    }

    pub fn sink(&self) -> &Arc<StatusSink> {
        &self.shared.sink
    }

    pub fn interval(&self) -> Duration {
        self.shared.interval
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // The loop holds its own reference to the shared state
        self.stop();
    }
}

async fn run_loop(shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            break;
        }

        {
            let _cycle = shared.cycle_lock.lock().await;
            // stop() may have landed while a previous loop's cycle held the lock
            if *shutdown.borrow() {
                break;
            }
            shared.run_one_cycle().await;
        }

        tokio::select! {
            _ = tokio::time::sleep(shared.interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    debug!("Polling loop exited");
}

async fn supervise(shared: Arc<Shared>, worker: JoinHandle<()>, generation: u64) {
    match worker.await {
        Ok(()) => {}
        Err(e) if e.is_panic() => {
            let message = panic_message(e.into_panic());
            error!("Polling loop aborted, no further cycles will run: {}", message);
            *shared.fault() = Some(message);

            let mut control = shared.control();
            if control.generation == generation && control.state == SchedulerState::Running {
                control.state = SchedulerState::Stopped;
                control.shutdown = None;
            }
        }
        Err(e) => debug!("Polling loop cancelled: {}", e),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "polling loop panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Status};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{sleep, timeout};

    struct StaticProber {
        up: bool,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl StaticProber {
        fn new(up: bool, delay: Duration) -> Arc<Self> {
            Arc::new(Self { up, delay, calls: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl Probe for StaticProber {
        async fn probe(&self, _host: &str, _port: u16) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            sleep(self.delay).await;
            self.up
        }
    }

    struct PanickingProber;

    #[async_trait]
    impl Probe for PanickingProber {
        async fn probe(&self, _host: &str, _port: u16) -> bool {
            panic!("probe exploded");
        }
    }

    fn fast_config() -> PollingConfiguration {
        PollingConfiguration::new(0.1, 1.0, 4).unwrap()
    }

    fn seeded_registry() -> Arc<TargetRegistry> {
        let registry = TargetRegistry::new();
        registry
            .seed(&["stratum+tcp://10.0.0.211:5051"], &["10.0.0.1:53", "10.0.0.2:53"])
            .unwrap();
        Arc::new(registry)
    }

    fn scheduler_with(prober: Arc<dyn Probe>) -> Scheduler {
        Scheduler::new(seeded_registry(), Arc::new(StatusSink::new()), prober, &fast_config())
    }

    #[tokio::test]
    async fn test_initial_state_is_stopped() {
        let scheduler = scheduler_with(StaticProber::new(true, Duration::ZERO));
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert_eq!(scheduler.cycles_completed(), 0);
        assert!(scheduler.sink().is_empty());
    }

    #[tokio::test]
    async fn test_start_runs_a_cycle_immediately() {
        let scheduler = scheduler_with(StaticProber::new(true, Duration::ZERO));
        assert!(scheduler.start().unwrap());

        timeout(Duration::from_secs(2), scheduler.wait_for_cycles(1)).await.unwrap();

        let sink = scheduler.sink();
        assert!(sink.len(Category::Stratum) >= 1);
        assert!(sink.len(Category::Host) >= 2);
        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_one_cycle_shares_one_timestamp() {
        let scheduler = scheduler_with(StaticProber::new(false, Duration::from_millis(5)));
        scheduler.start().unwrap();
        timeout(Duration::from_secs(2), scheduler.wait_for_cycles(1)).await.unwrap();
        scheduler.shutdown().await.unwrap();

        let stratum = scheduler.sink().all(Category::Stratum);
        let hosts = scheduler.sink().all(Category::Host);
        let first_cycle: Vec<_> = stratum
            .iter()
            .chain(hosts.iter())
            .filter(|r| r.cycle == 1)
            .collect();

        assert_eq!(first_cycle.len(), 3);
        assert!(first_cycle.iter().all(|r| r.timestamp == first_cycle[0].timestamp));
        assert!(first_cycle.iter().all(|r| r.status == Status::Down));
    }

    #[tokio::test]
    async fn test_start_and_stop_are_idempotent() {
        let scheduler = scheduler_with(StaticProber::new(true, Duration::ZERO));

        assert!(!scheduler.stop());
        assert!(scheduler.start().unwrap());
        assert!(!scheduler.start().unwrap());
        assert!(scheduler.is_running());
        assert!(scheduler.stop());
        assert!(!scheduler.stop());
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_prevents_further_cycles_and_start_resumes() {
        let scheduler = scheduler_with(StaticProber::new(true, Duration::ZERO));
        scheduler.start().unwrap();
        timeout(Duration::from_secs(2), scheduler.wait_for_cycles(2)).await.unwrap();
        scheduler.shutdown().await.unwrap();

        let cycles_at_stop = scheduler.cycles_completed();
        let records_at_stop = scheduler.sink().len(Category::Host);
        sleep(scheduler.interval() * 4).await;
        assert_eq!(scheduler.cycles_completed(), cycles_at_stop);
        assert_eq!(scheduler.sink().len(Category::Host), records_at_stop);

        scheduler.start().unwrap();
        timeout(Duration::from_secs(2), scheduler.wait_for_cycles(cycles_at_stop + 1))
            .await
            .unwrap();
        scheduler.shutdown().await.unwrap();
        assert!(scheduler.sink().len(Category::Host) > records_at_stop);
    }

    #[tokio::test]
    async fn test_restart_never_overlaps_cycles() {
        let prober = StaticProber::new(true, Duration::from_millis(80));
        let scheduler = scheduler_with(prober);

        // Bounce the scheduler while the first cycle is still probing
        scheduler.start().unwrap();
        sleep(Duration::from_millis(20)).await;
        scheduler.stop();
        scheduler.start().unwrap();
        timeout(Duration::from_secs(3), scheduler.wait_for_cycles(3)).await.unwrap();
        scheduler.shutdown().await.unwrap();

        let hosts = scheduler.sink().all(Category::Host);
        let cycles: Vec<u64> = hosts.iter().map(|r| r.cycle).collect();
        let mut expected = Vec::new();
        for cycle in 1..=scheduler.cycles_completed() {
            expected.extend([cycle, cycle]);
        }
        assert_eq!(cycles, expected);
    }

    #[tokio::test]
    async fn test_registry_edits_apply_on_next_cycle() {
        let scheduler = scheduler_with(StaticProber::new(true, Duration::ZERO));
        scheduler.start().unwrap();
        timeout(Duration::from_secs(2), scheduler.wait_for_cycles(1)).await.unwrap();

        scheduler.registry().add("10.0.0.3:53", Category::Host).unwrap();
        let next = scheduler.cycles_completed() + 1;
        timeout(Duration::from_secs(2), scheduler.wait_for_cycles(next)).await.unwrap();
        scheduler.shutdown().await.unwrap();

        let last_cycle = scheduler.cycles_completed();
        let in_last: Vec<_> = scheduler
            .sink()
            .all(Category::Host)
            .into_iter()
            .filter(|r| r.cycle == last_cycle)
            .collect();
        assert_eq!(in_last.len(), 3);
    }

    #[tokio::test]
    async fn test_last_summary_tracks_latest_cycle() {
        let scheduler = scheduler_with(StaticProber::new(true, Duration::ZERO));
        assert!(scheduler.last_summary().is_none());

        scheduler.start().unwrap();
        timeout(Duration::from_secs(2), scheduler.wait_for_cycles(1)).await.unwrap();
        scheduler.shutdown().await.unwrap();

        let summary = scheduler.last_summary().unwrap();
        assert_eq!(summary.cycle, scheduler.cycles_completed());
        assert_eq!(summary.up, 3);
        assert_eq!(summary.total(), 3);
    }

    #[tokio::test]
    async fn test_loop_panic_is_reported_as_fault() {
        let prober = Arc::new(PanickingProber);
        let scheduler = scheduler_with(prober);
        scheduler.start().unwrap();

        timeout(Duration::from_secs(2), async {
            while scheduler.is_running() {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("scheduler should fall back to stopped after a fault");

        let fault = scheduler.take_fault().expect("fault should be recorded");
        assert!(matches!(fault, MonitorError::SchedulingFault(ref m) if m.contains("probe exploded")));
        assert!(scheduler.take_fault().is_none());
    }

    #[tokio::test]
    async fn test_reading_fault_leaves_it_for_shutdown() {
        let scheduler = scheduler_with(Arc::new(PanickingProber));
        scheduler.start().unwrap();

        timeout(Duration::from_secs(2), async {
            while scheduler.is_running() {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("scheduler should fall back to stopped after a fault");

        assert!(scheduler.fault().is_some());
        assert!(scheduler.fault().is_some());
        assert!(matches!(scheduler.shutdown().await, Err(MonitorError::SchedulingFault(_))));
        assert!(scheduler.fault().is_none());
    }

    #[test]
    fn test_start_without_runtime_is_a_scheduling_fault() {
        let scheduler = scheduler_with(StaticProber::new(true, Duration::ZERO));
        let result = scheduler.start();
        assert!(matches!(result, Err(MonitorError::SchedulingFault(_))));
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }
}
