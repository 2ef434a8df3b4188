//! stratum-watch - TCP reachability polling library
//!
//! This library exposes the endpoint parser, the target registry, the probe
//! scheduler and the status history, plus the configuration, console and
//! output layers used by the `stratum-watch` binary.

pub mod cli;
pub mod config;
pub mod console;
pub mod constants;
pub mod endpoint;
pub mod logging;
pub mod models;
pub mod monitor;
pub mod output;
