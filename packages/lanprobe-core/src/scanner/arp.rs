//! ARP table scanning using system commands

use super::classify::Classifier;
use super::dns::HostnameResolver;
use super::host::DiscoveredHost;
use super::oui::{OuiTable, normalize_mac};
use super::platform::{NeighborTable, RawNeighbor, read_neighbor_table};
use super::score::score_host;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::time::Duration;

const BROADCAST_MAC: &str = "FF:FF:FF:FF:FF:FF";
const ZERO_MAC: &str = "00:00:00:00:00:00";

/// Outcome of reading the neighbor table.
#[derive(Debug, Default)]
pub struct ArpCollection {
    pub hosts: Vec<DiscoveredHost>,
    /// False when no table command could be run at all.
    pub available: bool,
}

/// Turn raw table text into validated `(ip, normalized mac)` pairs.
///
/// Drops unparseable lines, incomplete/failed entries, broadcast and zero
/// MACs, multicast and limited-broadcast IPs. A subnet's own broadcast
/// address only shows up with the broadcast MAC, so it goes with those. The
/// first entry wins when an address shows up on several interfaces.
pub fn parse_neighbors(table: &dyn NeighborTable, output: &str) -> Vec<(Ipv4Addr, String)> {
    let mut seen = HashSet::new();
    let mut pairs = Vec::new();

    for line in output.lines() {
        let Some(RawNeighbor { ip, mac }) = table.parse_line(line) else {
            continue;
        };

        if ip.is_multicast() || ip.is_broadcast() || ip.is_unspecified() {
            continue;
        }

        let Some(mac) = normalize_mac(&mac) else {
            tracing::trace!("Skipping {} with unusable MAC {:?}", ip, mac);
            continue;
        };
        if mac == BROADCAST_MAC || mac == ZERO_MAC {
            continue;
        }

        if seen.insert(ip) {
            pairs.push((ip, mac));
        }
    }

    pairs
}

/// Build fully enriched ARP records from table text: vendor, hostname,
/// device type and confidence.
pub async fn collect_from_output<R: HostnameResolver>(
    table: &dyn NeighborTable,
    output: &str,
    oui: &OuiTable,
    classifier: &Classifier,
    resolver: &R,
    dns_concurrency: usize,
) -> Vec<DiscoveredHost> {
    let pairs = parse_neighbors(table, output);

    let hosts: Vec<DiscoveredHost> = stream::iter(pairs)
        .map(|(ip, mac)| async move {
            let mut host = DiscoveredHost::from_arp(ip, mac);
            host.manufacturer = host.mac.as_deref().and_then(|m| oui.lookup(m));
            host.hostname = resolver.resolve(ip).await;
            host.device_type =
                classifier.device_type(host.manufacturer.as_deref(), host.hostname.as_deref());
            host.confidence = score_host(&host);
            host
        })
        .buffered(dns_concurrency.max(1))
        .collect()
        .await;

    let with_vendor = hosts.iter().filter(|h| h.manufacturer.is_some()).count();
    tracing::info!(
        "ARP table: {} entries, {} with known vendor",
        hosts.len(),
        with_vendor
    );

    hosts
}

/// Read the platform table and collect enriched records from it.
pub async fn get_arp_table<R: HostnameResolver>(
    table: &dyn NeighborTable,
    command_timeout: Duration,
    oui: &OuiTable,
    classifier: &Classifier,
    resolver: &R,
    dns_concurrency: usize,
) -> ArpCollection {
    match read_neighbor_table(table, command_timeout).await {
        Some(output) => ArpCollection {
            hosts: collect_from_output(table, &output, oui, classifier, resolver, dns_concurrency)
                .await,
            available: true,
        },
        None => ArpCollection::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::host::{DeviceType, HostSource, HostStatus};
    use crate::scanner::platform::{LinuxNeighborTable, MacOsNeighborTable, WindowsNeighborTable};

    struct NoNames;

    impl HostnameResolver for NoNames {
        async fn resolve(&self, _ip: Ipv4Addr) -> Option<String> {
            None
        }
    }

    struct GatewayName;

    impl HostnameResolver for GatewayName {
        async fn resolve(&self, ip: Ipv4Addr) -> Option<String> {
            (ip.octets()[3] == 1).then(|| "gateway.lan".to_string())
        }
    }

    #[test]
    fn test_macos_dump() {
        let output = "\
? (192.168.1.1) at aa:bb:cc:dd:ee:ff on en0 ifscope [ethernet]
? (192.168.1.9) at (incomplete) on en0 ifscope [ethernet]
? (192.168.1.255) at ff:ff:ff:ff:ff:ff on en0 ifscope [ethernet]
? (224.0.0.251) at 1:0:5e:0:0:fb on en0 ifscope permanent [ethernet]
";
        let pairs = parse_neighbors(&MacOsNeighborTable, output);
        assert_eq!(
            pairs,
            vec![("192.168.1.1".parse().unwrap(), "AA:BB:CC:DD:EE:FF".to_string())]
        );
    }

    #[test]
    fn test_linux_dump() {
        let output = "\
192.168.1.1 dev eth0 lladdr aa:bb:cc:dd:ee:ff REACHABLE
192.168.1.50 dev eth0 INCOMPLETE
192.168.1.51 dev eth0 lladdr 00:00:00:00:00:00 STALE
fe80::1 dev eth0 lladdr aa:bb:cc:dd:ee:01 router STALE
";
        let pairs = parse_neighbors(&LinuxNeighborTable, output);
        assert_eq!(
            pairs,
            vec![("192.168.1.1".parse().unwrap(), "AA:BB:CC:DD:EE:FF".to_string())]
        );
    }

    #[test]
    fn test_windows_dump_dedupes_across_interfaces() {
        let output = "\
Interface: 192.168.1.5 --- 0xb
  Internet Address      Physical Address      Type
  192.168.1.1           00-0c-29-aa-bb-cc     dynamic
  192.168.1.255         ff-ff-ff-ff-ff-ff     static
  239.255.255.250       01-00-5e-7f-ff-fa     static

Interface: 192.168.56.1 --- 0x12
  Internet Address      Physical Address      Type
  192.168.1.1           00-0c-29-aa-bb-cd     dynamic
";
        let pairs = parse_neighbors(&WindowsNeighborTable, output);
        assert_eq!(
            pairs,
            vec![("192.168.1.1".parse().unwrap(), "00:0C:29:AA:BB:CC".to_string())]
        );
    }

    #[test]
    fn test_dot_255_host_on_wider_network_is_kept() {
        let output = "\
10.0.0.255 dev eth0 lladdr aa:bb:cc:dd:ee:01 REACHABLE
10.0.1.255 dev eth0 lladdr ff:ff:ff:ff:ff:ff PERMANENT
255.255.255.255 dev eth0 lladdr aa:bb:cc:dd:ee:02 STALE
";
        let pairs = parse_neighbors(&LinuxNeighborTable, output);
        assert_eq!(
            pairs,
            vec![("10.0.0.255".parse().unwrap(), "AA:BB:CC:DD:EE:01".to_string())]
        );
    }

    #[tokio::test]
    async fn test_collect_enriches_records() {
        let output = "\
192.168.1.1 dev eth0 lladdr 00:00:0c:12:34:56 REACHABLE
192.168.1.20 dev eth0 lladdr 02:11:22:33:44:55 STALE
";
        let hosts = collect_from_output(
            &LinuxNeighborTable,
            output,
            &OuiTable::builtin(),
            &Classifier::default(),
            &GatewayName,
            4,
        )
        .await;

        assert_eq!(hosts.len(), 2);

        let gateway = &hosts[0];
        assert_eq!(gateway.mac.as_deref(), Some("00:00:0C:12:34:56"));
        assert_eq!(gateway.manufacturer.as_deref(), Some("Cisco Systems, Inc"));
        assert_eq!(gateway.hostname.as_deref(), Some("gateway.lan"));
        assert_eq!(gateway.device_type, DeviceType::Network);
        assert_eq!(gateway.source, HostSource::Arp);
        assert_eq!(gateway.status, HostStatus::Online);
        assert_eq!(gateway.confidence, 90);

        let unknown = &hosts[1];
        assert_eq!(unknown.manufacturer, None);
        assert_eq!(unknown.device_type, DeviceType::Computer);
        assert_eq!(unknown.confidence, 60);
    }

    #[tokio::test]
    async fn test_empty_output_yields_nothing() {
        let hosts = collect_from_output(
            &LinuxNeighborTable,
            "",
            &OuiTable::builtin(),
            &Classifier::default(),
            &NoNames,
            4,
        )
        .await;
        assert!(hosts.is_empty());
    }
}
