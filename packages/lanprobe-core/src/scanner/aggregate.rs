//! Merging of ARP and ping records into one inventory.

use super::host::{DiscoveredHost, HostSource, HostStatus};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

/// Fold `other` into `base`, keeping every populated field.
///
/// A value already present in `base` is never replaced by an absent one. The
/// `source` follows whichever record carries more evidence, with ties going
/// to the ARP record since it carries a MAC.
pub fn merge_host(base: &mut DiscoveredHost, other: DiscoveredHost) {
    let other_wins_source = match other.evidence().cmp(&base.evidence()) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => {
            other.source == HostSource::Arp && base.source != HostSource::Arp
        }
    };
    if other_wins_source {
        base.source = other.source;
    }

    if base.mac.is_none() {
        base.mac = other.mac;
    }
    if base.hostname.is_none() {
        base.hostname = other.hostname;
    }
    if base.manufacturer.is_none() {
        base.manufacturer = other.manufacturer;
    }
    if base.os.is_none() {
        base.os = other.os;
    }
    if base.response_time_ms.is_none() {
        base.response_time_ms = other.response_time_ms;
    }
    if other.status == HostStatus::Online {
        base.status = HostStatus::Online;
    }
    if other.discovered_at < base.discovered_at {
        base.discovered_at = other.discovered_at;
    }
    base.confidence = base.confidence.max(other.confidence);

    for service in other.services {
        base.add_service(service);
    }
    base.open_ports.extend(other.open_ports);
}

/// One record per IP, sorted by address.
pub fn aggregate(
    arp_hosts: Vec<DiscoveredHost>,
    ping_hosts: Vec<DiscoveredHost>,
) -> Vec<DiscoveredHost> {
    let mut by_ip: BTreeMap<Ipv4Addr, DiscoveredHost> = BTreeMap::new();

    for host in arp_hosts.into_iter().chain(ping_hosts) {
        match by_ip.get_mut(&host.ip) {
            Some(existing) => merge_host(existing, host),
            None => {
                by_ip.insert(host.ip, host);
            }
        }
    }

    by_ip.into_values().collect()
}
