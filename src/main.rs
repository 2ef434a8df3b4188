#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, watch};

use stratum_watch::cli::{self, RunConfig, RunMode};
use stratum_watch::console::{Console, Outcome};
use stratum_watch::logging::{self, MonitorLogger};
use stratum_watch::models::{Category, StatusRecord};
use stratum_watch::monitor::{Scheduler, StatusSink, TargetRegistry};
use stratum_watch::output;

/// How often signal flags and scheduler health are checked
const WATCH_TICK: Duration = Duration::from_millis(100);

fn main() -> Result<()> {
    let run = cli::parse_args()?;
    logging::init_logging(run.verbosity());

    // Set up interrupt handling
    let interrupted = Arc::new(AtomicBool::new(false));
    let _ = signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&interrupted));
    let _ = signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&interrupted));

    let targets = &run.config.targets;
    let registry = TargetRegistry::new();
    registry
        .seed(targets.stratum.as_slice(), targets.hosts.as_slice())
        .context("Failed to register initial targets")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let result = runtime.block_on(run_monitor(run, Arc::new(registry), interrupted));
    // A pending stdin read would otherwise hold the runtime open
    runtime.shutdown_background();
    result
}

async fn run_monitor(run: RunConfig, registry: Arc<TargetRegistry>, interrupted: Arc<AtomicBool>) -> Result<()> {
    let polling = run.config.polling_configuration()?;
    let sink = Arc::new(StatusSink::new());
    let scheduler = Arc::new(Scheduler::with_tcp_prober(Arc::clone(&registry), Arc::clone(&sink), &polling));
    let logger = MonitorLogger::new(run.verbose_mode);

    logger.log_startup(
        run.config_path.as_deref(),
        registry.len(Category::Stratum),
        registry.len(Category::Host),
    )?;

    let (done_tx, done_rx) = watch::channel(false);
    let renderer = (!run.quiet_mode).then(|| tokio::spawn(render_records(sink.subscribe(), done_rx, run.json_output)));
    let cycle_logger = tokio::spawn(log_cycles(Arc::clone(&scheduler), logger.clone()));

    let reason = match run.mode {
        RunMode::Cycles(count) => {
            scheduler.start()?;
            tokio::select! {
                _ = scheduler.wait_for_cycles(count) => format!("completed {count} cycles"),
                reason = wait_for_exit(&scheduler, &interrupted) => reason,
            }
        }
        RunMode::Headless => {
            scheduler.start()?;
            wait_for_exit(&scheduler, &interrupted).await
        }
        RunMode::Interactive => {
            let console = Console::new(Arc::clone(&scheduler), run.config.clone(), logger.clone());
            run_console(&console, &interrupted).await?
        }
    };

    let outcome = scheduler.shutdown().await;
    cycle_logger.abort();
    let _ = done_tx.send(true);
    if let Some(renderer) = renderer {
        let _ = renderer.await;
    }

    logger.log_shutdown(&reason, scheduler.cycles_completed())?;

    if let Some(dir) = &run.config.export.directory {
        let summary = output::export_csv(&sink, dir)?;
        if !run.quiet_mode {
            eprintln!(
                "Exported {} stratum and {} host records to {}",
                summary.stratum_rows,
                summary.host_rows,
                dir.display()
            );
        }
    }

    if let Err(fault) = outcome {
        logger.log_error(&fault.to_string(), Some("polling loop"))?;
        return Err(fault.into());
    }
    Ok(())
}

/// Resolve once a termination signal arrives or polling halts on its own
async fn wait_for_exit(scheduler: &Scheduler, interrupted: &AtomicBool) -> String {
    let mut tick = tokio::time::interval(WATCH_TICK);
    loop {
        tick.tick().await;
        if interrupted.load(Ordering::Relaxed) {
            return "interrupted".to_string();
        }
        if !scheduler.is_running() {
            return "polling halted".to_string();
        }
    }
}

/// Read console commands from stdin until `quit`, end of input or a signal
async fn run_console(console: &Console, interrupted: &AtomicBool) -> Result<String> {
    eprintln!("stratum-watch console, polling is stopped. Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tick = tokio::time::interval(WATCH_TICK);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read console input")? else {
                    return Ok("end of input".to_string());
                };
                match console.handle_line(&line).await {
                    Ok(Some(Outcome::Reply(text))) => println!("{text}"),
                    Ok(Some(Outcome::Quit)) => return Ok("quit".to_string()),
                    Ok(None) => {}
                    Err(e) => eprintln!("Error: {e:#}"),
                }
            }
            _ = tick.tick() => {
                if interrupted.load(Ordering::Relaxed) {
                    return Ok("interrupted".to_string());
                }
            }
        }
    }
}

/// Print every record appended to the sink; drains what is left once `done` flips
async fn render_records(mut records: broadcast::Receiver<StatusRecord>, mut done: watch::Receiver<bool>, json: bool) {
    loop {
        tokio::select! {
            biased;
            received = records.recv() => match received {
                Ok(record) => print_record(&record, json),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("Display fell behind, {} records not shown", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return,
            },
            _ = done.changed() => break,
        }
    }

    while let Ok(record) = records.try_recv() {
        print_record(&record, json);
    }
}

fn print_record(record: &StatusRecord, json: bool) {
    match output::format_record(record, json) {
        Ok(line) => println!("{line}"),
        Err(e) => log::error!("Failed to format record: {}", e),
    }
}

async fn log_cycles(scheduler: Arc<Scheduler>, logger: MonitorLogger) {
    let mut cycles = scheduler.subscribe_cycles();
    while cycles.changed().await.is_ok() {
        if let Some(summary) = scheduler.last_summary() {
            if let Err(e) = logger.log_cycle(&summary) {
                log::debug!("Failed to log cycle summary: {}", e);
            }
        }
    }
}
