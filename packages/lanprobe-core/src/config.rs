//! Tunables for a scan run.
//!
//! The engine never reads files or environment variables itself; callers
//! build a [`ScanConfig`] (usually deserialized from their own config file)
//! and hand it to [`crate::Scanner::new`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ports probed when the caller does not supply a list.
pub const DEFAULT_PORTS: &[u16] = &[22, 80, 443, 3389, 445, 9100, 631, 8080];

/// Scan tuning parameters. Every field has a default, so partial config files
/// deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Pings in flight at once during a sweep.
    pub batch_size: usize,
    pub ping_timeout_ms: u64,
    pub port_timeout_ms: u64,
    /// Upper bound for the neighbor-table subprocess.
    pub command_timeout_secs: u64,
    pub dns_timeout_ms: u64,
    /// Concurrent reverse-DNS lookups.
    pub dns_concurrency: usize,
    /// Hosts port-scanned at once. Ports of a single host are always probed
    /// all together.
    pub host_concurrency: usize,
    pub ports: Vec<u16>,
    pub first_host: u8,
    pub last_host: u8,
    /// Consult the IEEE registry when the built-in OUI table has no match.
    pub ieee_vendor_fallback: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            batch_size: 20,
            ping_timeout_ms: 1000,
            port_timeout_ms: 800,
            command_timeout_secs: 10,
            dns_timeout_ms: 2000,
            dns_concurrency: 32,
            host_concurrency: 8,
            ports: DEFAULT_PORTS.to_vec(),
            first_host: 1,
            last_host: 254,
            ieee_vendor_fallback: true,
        }
    }
}

impl ScanConfig {
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    pub fn port_timeout(&self) -> Duration {
        Duration::from_millis(self.port_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_timeout_ms)
    }

    /// Batch size clamped to at least one probe.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }
}
