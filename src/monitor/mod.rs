pub mod core;
pub mod polling;
pub mod prober;
pub mod registry;
pub mod sink;

pub use self::core::PollingCore;
pub use polling::Scheduler;
pub use prober::{probe, Probe, TcpProber};
pub use registry::TargetRegistry;
pub use sink::StatusSink;
