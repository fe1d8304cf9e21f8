//! Reverse DNS (PTR) hostname resolution.

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Best-effort IP → hostname lookup. Implementations return `None` on any
/// failure; they never error.
pub trait HostnameResolver: Send + Sync {
    fn resolve(&self, ip: Ipv4Addr) -> impl Future<Output = Option<String>> + Send;
}

/// PTR lookup through the system resolver, bounded by a timeout.
#[derive(Debug, Clone, Copy)]
pub struct ReverseDns {
    timeout: Duration,
}

impl ReverseDns {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ReverseDns {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

impl HostnameResolver for ReverseDns {
    async fn resolve(&self, ip: Ipv4Addr) -> Option<String> {
        // getnameinfo blocks, so it runs on the blocking pool. A lookup that
        // outlives the timeout finishes there and is discarded.
        let lookup = tokio::task::spawn_blocking(move || reverse_lookup(ip));

        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(hostname)) => hostname,
            Ok(Err(e)) => {
                tracing::warn!("DNS worker failed for {}: {}", ip, e);
                None
            }
            Err(_) => {
                tracing::debug!("DNS lookup for {} timed out", ip);
                None
            }
        }
    }
}

/// Blocking PTR lookup for a single address.
pub fn reverse_lookup(ip: Ipv4Addr) -> Option<String> {
    let hostname = dns_lookup::lookup_addr(&IpAddr::V4(ip)).ok()?;
    clean_hostname(&hostname, ip)
}

/// Drop trailing dots, and treat an echo of the address as "no name".
fn clean_hostname(raw: &str, ip: Ipv4Addr) -> Option<String> {
    let name = raw.trim().trim_end_matches('.');
    if name.is_empty() || name == ip.to_string() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_hostname() {
        let ip = Ipv4Addr::new(192, 168, 1, 10);
        assert_eq!(clean_hostname("nas.lan.", ip).as_deref(), Some("nas.lan"));
        assert_eq!(clean_hostname("192.168.1.10", ip), None);
        assert_eq!(clean_hostname("  ", ip), None);
    }

    #[tokio::test]
    async fn test_unresolvable_address_yields_none_within_timeout() {
        // TEST-NET-1 has no PTR records; whichever way the resolver fails,
        // the answer is None and the call returns within the bound.
        let resolver = ReverseDns::new(Duration::from_millis(300));
        let started = std::time::Instant::now();
        let result = resolver.resolve(Ipv4Addr::new(192, 0, 2, 1)).await;
        assert_eq!(result, None);
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
