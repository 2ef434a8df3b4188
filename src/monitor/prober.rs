//! TCP reachability probing

use async_trait::async_trait;
use log::debug;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::constants::DEFAULT_PROBE_TIMEOUT;

/// Something that can tell whether `host:port` accepts connections.
///
/// Implementations never fail: every problem is reported as unreachable.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, host: &str, port: u16) -> bool;
}

/// Probes by opening, then immediately dropping, a TCP connection
#[derive(Debug, Clone)]
pub struct TcpProber {
    timeout: Duration,
}

impl TcpProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for TcpProber {
    fn default() -> Self {
        Self::new(Duration::from_secs_f64(DEFAULT_PROBE_TIMEOUT))
    }
}

#[async_trait]
impl Probe for TcpProber {
    async fn probe(&self, host: &str, port: u16) -> bool {
        probe(host, port, self.timeout).await
    }
}

/// Attempt one TCP connection; name resolution counts against the timeout.
pub async fn probe(host: &str, port: u16, connect_timeout: Duration) -> bool {
    match timeout(connect_timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => {
            drop(stream);
            true
        }
        Ok(Err(e)) => {
            debug!("probe {}:{} failed: {}", host, port, e);
            false
        }
        Err(_elapsed) => {
            debug!("probe {}:{} timed out after {:?}", host, port, connect_timeout);
            false
        }
    }
}
