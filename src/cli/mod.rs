//! CLI argument parsing and validation module
//!
//! Handles command-line interface using clap, including:
//! - Config file selection and per-flag overrides
//! - Watch-list seeding (stratum relays and hosts)
//! - Run mode selection (interactive console, headless, fixed cycle count)
//! - Output format selection (human/JSON) and verbosity

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

use crate::config::MonitorConfiguration;
use crate::constants::APP_NAME;
use crate::logging::Verbosity;

/// How the monitor is driven once started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Read console commands from stdin; polling starts stopped
    Interactive,
    /// Poll until SIGINT/SIGTERM
    Headless,
    /// Poll for exactly this many cycles, then exit
    Cycles(u64),
}

/// Everything the binary needs after flags and config file are merged
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// File configuration with command-line overrides applied
    pub config: MonitorConfiguration,
    /// Config file that was loaded, if any
    pub config_path: Option<PathBuf>,
    pub mode: RunMode,
    pub json_output: bool,
    pub quiet_mode: bool,
    pub verbose_mode: bool,
}

impl RunConfig {
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet_mode {
            Verbosity::Quiet
        } else if self.verbose_mode {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }
}

/// Build the clap command definition
pub fn build_cli() -> Command {
    Command::new(APP_NAME)
        .version(env!("STRATUM_WATCH_VERSION"))
        .long_version(concat!(env!("STRATUM_WATCH_VERSION"), " (", env!("GIT_HASH"), ")"))
        .about("Poll TCP reachability of stratum relays and hosts")
        .long_about(
            "Periodically opens TCP connections to a watch-list of stratum relays \
             (stratum+tcp://host:port) and hosts (host[:port]) and records UP/DOWN/INVALID \
             for each target. Runs an interactive console by default.",
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Load settings and targets from a TOML config file")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("stratum")
                .short('s')
                .long("stratum")
                .value_name("URL")
                .help("Stratum relay to watch, e.g. stratum+tcp://pool.example:3333 (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("host")
                .short('H')
                .long("host")
                .value_name("HOST[:PORT]")
                .help("Host to watch; port defaults to 80 (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("no-defaults")
                .long("no-defaults")
                .help("Start with empty watch-lists instead of the configured ones")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("interval")
                .short('i')
                .long("interval")
                .value_name("SECONDS")
                .help("Pause between polling cycles (0.1-300.0)")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_name("SECONDS")
                .help("Connect timeout per probe (0.1-60.0)")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("concurrency")
                .long("concurrency")
                .value_name("N")
                .help("Maximum probes in flight per cycle (1-256)")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("cycles")
                .short('n')
                .long("cycles")
                .value_name("N")
                .help("Run N polling cycles without the console, then exit")
                .value_parser(value_parser!(u64).range(1..))
                .conflicts_with("headless"),
        )
        .arg(
            Arg::new("headless")
                .long("headless")
                .help("Poll without the console until interrupted")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("export-dir")
                .short('e')
                .long("export-dir")
                .value_name("DIR")
                .help("Write stratum_log.csv and host_log.csv to DIR on exit")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("json")
                .short('j')
                .long("json")
                .help("Print status records as JSON lines")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Do not print status records")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log lifecycle and per-cycle details to stderr")
                .action(ArgAction::SetTrue),
        )
}

/// Parse command line arguments and return configuration
pub fn parse_args() -> Result<RunConfig> {
    let matches = build_cli().get_matches();
    resolve(&matches)
}

/// Parse an explicit argument list (first item is the program name)
pub fn parse_from<I, T>(args: I) -> Result<RunConfig>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = build_cli().try_get_matches_from(args)?;
    resolve(&matches)
}

/// Merge the config file with command-line overrides and validate the result
fn resolve(matches: &ArgMatches) -> Result<RunConfig> {
    let config_path = matches.get_one::<PathBuf>("config").cloned();
    let mut config = match &config_path {
        Some(path) => MonitorConfiguration::load_from_file(path)?,
        None => MonitorConfiguration::load_or_default().context("Failed to load default configuration")?,
    };

    if let Some(interval) = matches.get_one::<f64>("interval") {
        config.polling.interval = *interval;
    }
    if let Some(timeout) = matches.get_one::<f64>("timeout") {
        config.polling.probe_timeout = *timeout;
    }
    if let Some(concurrency) = matches.get_one::<usize>("concurrency") {
        config.polling.max_concurrent_probes = *concurrency;
    }
    config.validate()?;

    if matches.get_flag("no-defaults") {
        config.targets.stratum.clear();
        config.targets.hosts.clear();
    }
    if let Some(values) = matches.get_many::<String>("stratum") {
        config.targets.stratum.extend(values.cloned());
    }
    if let Some(values) = matches.get_many::<String>("host") {
        config.targets.hosts.extend(values.cloned());
    }

    if let Some(dir) = matches.get_one::<PathBuf>("export-dir") {
        config.export.directory = Some(dir.clone());
    }

    let mode = if let Some(cycles) = matches.get_one::<u64>("cycles") {
        RunMode::Cycles(*cycles)
    } else if matches.get_flag("headless") {
        RunMode::Headless
    } else {
        RunMode::Interactive
    };

    Ok(RunConfig {
        config,
        config_path,
        mode,
        json_output: matches.get_flag("json"),
        quiet_mode: matches.get_flag("quiet"),
        verbose_mode: matches.get_flag("verbose"),
    })
}
