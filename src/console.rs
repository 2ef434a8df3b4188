//! Interactive operator console
//!
//! Reads one command per line and applies it to a running monitor.
//! [`parse_command`] is pure; [`Console`] owns the side effects.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::MonitorConfiguration;
use crate::logging::MonitorLogger;
use crate::models::{Category, TargetError};
use crate::monitor::{Scheduler, TargetRegistry};
use crate::output::export_csv;

pub const HELP_TEXT: &str = "\
Commands:
  add <stratum|host> VALUE             add a target
  edit <stratum|host> KEY NEW_VALUE    replace a target in place
  remove <stratum|host> KEY            remove a target
  list                                 show both watch-lists
  start | stop                         resume or pause polling
  status                               show scheduler state and counters
  save DIR                             export history as CSV into DIR
  save-config FILE                     write settings and targets as TOML
  help                                 show this text
  quit | exit                          leave the console";

/// A parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Add { category: Category, value: String },
    Edit { category: Category, key: String, value: String },
    Remove { category: Category, key: String },
    List,
    Start,
    Stop,
    Status,
    Save(PathBuf),
    SaveConfig(PathBuf),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command '{0}' (type 'help' for a list)")]
    Unknown(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("{0}")]
    Category(String),
}

/// Parse one console line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, CommandError> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&verb, args)) = words.split_first() else {
        return Ok(None);
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "add" => match args {
            [category, value] => ConsoleCommand::Add {
                category: parse_category(category)?,
                value: value.to_string(),
            },
            _ => return Err(CommandError::Usage("add <stratum|host> VALUE")),
        },
        "edit" => match args {
            [category, key, value] => ConsoleCommand::Edit {
                category: parse_category(category)?,
                key: key.to_string(),
                value: value.to_string(),
            },
            _ => return Err(CommandError::Usage("edit <stratum|host> KEY NEW_VALUE")),
        },
        "remove" | "rm" => match args {
            [category, key] => ConsoleCommand::Remove {
                category: parse_category(category)?,
                key: key.to_string(),
            },
            _ => return Err(CommandError::Usage("remove <stratum|host> KEY")),
        },
        "save" => match args {
            [dir] => ConsoleCommand::Save(PathBuf::from(dir)),
            _ => return Err(CommandError::Usage("save DIR")),
        },
        "save-config" => match args {
            [file] => ConsoleCommand::SaveConfig(PathBuf::from(file)),
            _ => return Err(CommandError::Usage("save-config FILE")),
        },
        "list" | "ls" => no_args(args, ConsoleCommand::List, "list")?,
        "start" => no_args(args, ConsoleCommand::Start, "start")?,
        "stop" => no_args(args, ConsoleCommand::Stop, "stop")?,
        "status" => no_args(args, ConsoleCommand::Status, "status")?,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        _ => return Err(CommandError::Unknown(verb.to_string())),
    };
    Ok(Some(command))
}

fn parse_category(word: &str) -> Result<Category, CommandError> {
    word.parse().map_err(CommandError::Category)
}

fn no_args(args: &[&str], command: ConsoleCommand, usage: &'static str) -> Result<ConsoleCommand, CommandError> {
    if args.is_empty() {
        Ok(command)
    } else {
        Err(CommandError::Usage(usage))
    }
}

/// What the caller should do after a command ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Print this text to stdout and keep reading
    Reply(String),
    Quit,
}

/// Executes console commands against a scheduler and its registry
pub struct Console {
    scheduler: Arc<Scheduler>,
    settings: MonitorConfiguration,
    logger: MonitorLogger,
}

impl Console {
    /// `settings` supplies the polling and export sections written by `save-config`
    pub fn new(scheduler: Arc<Scheduler>, settings: MonitorConfiguration, logger: MonitorLogger) -> Self {
        Self {
            scheduler,
            settings,
            logger,
        }
    }

    /// Parse and execute one line. Operator mistakes come back as errors and
    /// leave the scheduler untouched.
    pub async fn handle_line(&self, line: &str) -> Result<Option<Outcome>> {
        match parse_command(line)? {
            Some(command) => self.execute(command).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn execute(&self, command: ConsoleCommand) -> Result<Outcome> {
        let reply = match command {
            ConsoleCommand::Add { category, value } => {
                let endpoint = self
                    .mutate(move |registry| registry.add(&value, category))
                    .await?;
                self.logger.log_target_change("added", category, &endpoint.key)?;
                format!("Added {} target {}", category, endpoint.key)
            }
            ConsoleCommand::Edit { category, key, value } => {
                let endpoint = self
                    .mutate(move |registry| registry.edit(&key, &value, category))
                    .await?;
                self.logger.log_target_change("edited", category, &endpoint.key)?;
                format!("Updated {} target {}", category, endpoint.key)
            }
            ConsoleCommand::Remove { category, key } => {
                let endpoint = self
                    .mutate(move |registry| registry.remove(&key, category))
                    .await?;
                self.logger.log_target_change("removed", category, &endpoint.key)?;
                format!("Removed {} target {}", category, endpoint.key)
            }
            ConsoleCommand::List => self.render_list(),
            ConsoleCommand::Start => {
                if self.scheduler.start()? {
                    "Polling started".to_string()
                } else {
                    "Polling is already running".to_string()
                }
            }
            ConsoleCommand::Stop => {
                if self.scheduler.stop() {
                    "Polling stopped".to_string()
                } else {
                    "Polling is already stopped".to_string()
                }
            }
            ConsoleCommand::Status => self.render_status(),
            ConsoleCommand::Save(dir) => {
                let summary = export_csv(self.scheduler.sink(), &dir)?;
                format!(
                    "Wrote {} ({} rows) and {} ({} rows)",
                    summary.stratum_path.display(),
                    summary.stratum_rows,
                    summary.host_path.display(),
                    summary.host_rows
                )
            }
            ConsoleCommand::SaveConfig(path) => {
                self.current_configuration().save_to_file(&path)?;
                format!("Saved configuration to {}", path.display())
            }
            ConsoleCommand::Help => HELP_TEXT.to_string(),
            ConsoleCommand::Quit => return Ok(Outcome::Quit),
        };
        Ok(Outcome::Reply(reply))
    }

    /// Settings plus the watch-lists as the operator typed them
    pub fn current_configuration(&self) -> MonitorConfiguration {
        let registry = self.scheduler.registry();
        let mut config = self.settings.clone();
        config.targets.stratum = raw_inputs(registry, Category::Stratum);
        config.targets.hosts = raw_inputs(registry, Category::Host);
        config
    }

    /// Registry edits may resolve hostnames, so they run off the async workers
    async fn mutate<T, F>(&self, edit: F) -> Result<T>
    where
        F: FnOnce(&TargetRegistry) -> Result<T, TargetError> + Send + 'static,
        T: Send + 'static,
    {
        let registry = Arc::clone(self.scheduler.registry());
        let result = tokio::task::spawn_blocking(move || edit(&*registry))
            .await
            .context("Registry update task failed")?;
        result.map_err(|e| {
            log::warn!("Rejected target change: {}", e);
            anyhow::Error::from(e)
        })
    }

    fn render_list(&self) -> String {
        let registry = self.scheduler.registry();
        let mut out = String::new();
        for category in Category::ALL {
            let entries = registry.snapshot(category);
            out.push_str(&format!("{} ({}):", category, entries.len()));
            if entries.is_empty() {
                out.push_str("\n  (none)");
            }
            for endpoint in entries {
                if endpoint.is_valid() {
                    out.push_str(&format!("\n  {}", endpoint.key));
                } else {
                    out.push_str(&format!("\n  {} (invalid)", endpoint.key));
                }
            }
            out.push('\n');
        }
        out.trim_end().to_string()
    }

    fn render_status(&self) -> String {
        let scheduler = &self.scheduler;
        let sink = scheduler.sink();
        let mut out = format!(
            "Polling: {} (interval {:.1}s)\nCycles completed: {}\nRecords: {} stratum, {} host",
            scheduler.state(),
            scheduler.interval().as_secs_f64(),
            scheduler.cycles_completed(),
            sink.len(Category::Stratum),
            sink.len(Category::Host),
        );
        if let Some(summary) = scheduler.last_summary() {
            out.push_str(&format!(
                "\nLast cycle: {} up, {} down, {} invalid in {}ms",
                summary.up, summary.down, summary.invalid, summary.duration_ms
            ));
        }
        if let Some(fault) = scheduler.fault() {
            out.push_str(&format!("\nPolling halted: {}", fault));
        }
        out
    }
}

fn raw_inputs(registry: &TargetRegistry, category: Category) -> Vec<String> {
    registry
        .snapshot(category)
        .into_iter()
        .map(|endpoint| endpoint.raw_input)
        .collect()
}
