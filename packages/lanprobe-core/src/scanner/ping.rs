//! Ping sweep using system ping command

use super::dns::HostnameResolver;
use super::host::DiscoveredHost;
use super::platform::hidden_command;
use super::range::IpRange;
use std::future::Future;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// A single-address liveness probe.
pub trait Prober: Send + Sync {
    /// `Some(rtt)` when the host answered, `None` otherwise.
    fn probe(&self, ip: Ipv4Addr) -> impl Future<Output = Option<Duration>> + Send;

    /// Whether probing works at all in this environment.
    fn is_available(&self) -> impl Future<Output = bool> + Send;
}

/// One ICMP echo through the OS `ping` utility.
#[derive(Debug, Clone, Copy)]
pub struct SystemPinger {
    timeout: Duration,
}

impl SystemPinger {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn args(&self, ip: Ipv4Addr) -> Vec<String> {
        let secs = self.timeout.as_secs().max(1).to_string();
        let millis = self.timeout.as_millis().max(1).to_string();

        if cfg!(target_os = "windows") {
            vec!["-n".into(), "1".into(), "-w".into(), millis, ip.to_string()]
        } else if cfg!(target_os = "macos") {
            // macOS -W takes milliseconds
            vec!["-c".into(), "1".into(), "-W".into(), millis, ip.to_string()]
        } else {
            vec!["-c".into(), "1".into(), "-W".into(), secs, ip.to_string()]
        }
    }
}

impl Default for SystemPinger {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl Prober for SystemPinger {
    async fn probe(&self, ip: Ipv4Addr) -> Option<Duration> {
        let start = Instant::now();
        let mut cmd = hidden_command("ping");
        cmd.args(self.args(ip));

        // The utility enforces its own wait; the outer bound only guards
        // against a wedged process.
        let limit = self.timeout + Duration::from_secs(1);
        let output = match tokio::time::timeout(limit, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::debug!("Failed to execute ping for {}: {}", ip, e);
                return None;
            }
            Err(_) => return None,
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        if ping_succeeded(output.status.success(), &stdout) {
            Some(start.elapsed())
        } else {
            None
        }
    }

    async fn is_available(&self) -> bool {
        let mut cmd = hidden_command("ping");
        cmd.args(self.args(Ipv4Addr::LOCALHOST));
        matches!(
            tokio::time::timeout(self.timeout + Duration::from_secs(1), cmd.output()).await,
            Ok(Ok(output)) if output.status.success()
        )
    }
}

/// Windows `ping` exits 0 for "Destination host unreachable" replies, so
/// its output has to be inspected too.
fn ping_succeeded(exit_ok: bool, stdout: &str) -> bool {
    if !exit_ok {
        return false;
    }
    if cfg!(target_os = "windows") {
        let lower = stdout.to_lowercase();
        return lower.contains("reply from")
            && !lower.contains("destination host unreachable")
            && !lower.contains("request timed out");
    }
    true
}

/// Ping every address in `range`, at most `batch_size` at a time.
///
/// Each batch runs fully concurrently and must settle before the next one
/// starts. Responders get a best-effort hostname; non-responders are simply
/// absent. Stops early, returning what was found, once `cancel` fires.
pub async fn ping_sweep<P, R>(
    prober: &P,
    resolver: &R,
    range: &IpRange,
    batch_size: usize,
    cancel: &CancellationToken,
) -> Vec<DiscoveredHost>
where
    P: Prober,
    R: HostnameResolver,
{
    let targets: Vec<Ipv4Addr> = range.iter().collect();
    let total_hosts = targets.len();
    let batch_size = batch_size.max(1);
    let mut devices = Vec::new();
    let mut completed = 0;

    tracing::info!("Pinging {} hosts in {} (batch size {})", total_hosts, range, batch_size);

    for (batch_idx, batch) in targets.chunks(batch_size).enumerate() {
        if cancel.is_cancelled() {
            tracing::info!("Ping sweep cancelled after {} hosts", completed);
            break;
        }

        let probes = batch.iter().map(|&ip| async move {
            let rtt = prober.probe(ip).await?;
            let mut host = DiscoveredHost::from_ping(ip, rtt.as_millis() as u64);
            host.hostname = resolver.resolve(ip).await;
            Some(host)
        });

        let results = tokio::select! {
            results = futures::future::join_all(probes) => results,
            _ = cancel.cancelled() => {
                tracing::info!("Ping sweep cancelled during batch {}", batch_idx + 1);
                break;
            }
        };

        let before = devices.len();
        devices.extend(results.into_iter().flatten());
        completed += batch.len();

        if devices.len() > before || (batch_idx + 1) % 3 == 0 {
            tracing::debug!(
                "Ping progress: {}/{} hosts checked, {} responding",
                completed,
                total_hosts,
                devices.len()
            );
        }
    }

    devices
}
