//! IPv4 address ranges to probe.

use crate::error::{Result, ScanError};
use ipnetwork::Ipv4Network;
use std::collections::HashSet;
use std::fmt;
use std::net::Ipv4Addr;

/// Upper bound on addresses taken from a CIDR network.
pub const MAX_NETWORK_HOSTS: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpRange {
    addrs: Vec<Ipv4Addr>,
    members: HashSet<Ipv4Addr>,
    label: String,
}

impl IpRange {
    /// Host numbers `first..=last` inside the /24 that contains `base`.
    pub fn new(base: Ipv4Addr, first: u8, last: u8) -> Result<Self> {
        if first == 0 || first > last {
            return Err(ScanError::InvalidRange { first, last });
        }

        let [a, b, c, _] = base.octets();
        let addrs = (first..=last).map(|n| Ipv4Addr::new(a, b, c, n)).collect();

        Ok(Self::from_addrs(addrs, format!("{a}.{b}.{c}.{first}-{last}")))
    }

    /// The host addresses of a network, without its network and broadcast
    /// addresses, capped at [`MAX_NETWORK_HOSTS`].
    pub fn from_network(network: Ipv4Network) -> Self {
        let addrs: Vec<Ipv4Addr> = if network.prefix() >= 31 {
            network.iter().collect()
        } else {
            let network_addr = network.network();
            let broadcast = network.broadcast();
            network
                .iter()
                .filter(|ip| *ip != network_addr && *ip != broadcast)
                .take(MAX_NETWORK_HOSTS)
                .collect()
        };

        if addrs.len() == MAX_NETWORK_HOSTS {
            tracing::warn!("{} truncated to its first {} hosts", network, MAX_NETWORK_HOSTS);
        }

        Self::from_addrs(addrs, network.to_string())
    }

    /// One explicit target.
    pub fn single(ip: Ipv4Addr) -> Self {
        Self::from_addrs(vec![ip], ip.to_string())
    }

    fn from_addrs(addrs: Vec<Ipv4Addr>, label: String) -> Self {
        let members = addrs.iter().copied().collect();
        Self {
            addrs,
            members,
            label,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        self.addrs.iter().copied()
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        self.members.contains(&ip)
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sweep_range() {
        let range = IpRange::new(Ipv4Addr::new(192, 168, 1, 42), 1, 254).unwrap();
        assert_eq!(range.len(), 254);
        assert_eq!(range.iter().next(), Some(Ipv4Addr::new(192, 168, 1, 1)));
        assert_eq!(range.iter().last(), Some(Ipv4Addr::new(192, 168, 1, 254)));
        assert_eq!(range.to_string(), "192.168.1.1-254");
    }

    #[test]
    fn test_invalid_bounds() {
        let base = Ipv4Addr::new(10, 0, 0, 0);
        assert!(matches!(
            IpRange::new(base, 10, 5),
            Err(ScanError::InvalidRange { first: 10, last: 5 })
        ));
        assert!(IpRange::new(base, 0, 5).is_err());
        assert_eq!(IpRange::new(base, 7, 7).unwrap().len(), 1);
    }

    #[test]
    fn test_from_network_skips_network_and_broadcast() {
        let net: Ipv4Network = "10.1.2.0/29".parse().unwrap();
        let range = IpRange::from_network(net);
        assert_eq!(range.len(), 6);
        assert!(!range.contains(Ipv4Addr::new(10, 1, 2, 0)));
        assert!(!range.contains(Ipv4Addr::new(10, 1, 2, 7)));
        assert!(range.contains(Ipv4Addr::new(10, 1, 2, 6)));
    }

    #[test]
    fn test_from_network_is_capped() {
        let net: Ipv4Network = "10.0.0.0/16".parse().unwrap();
        assert_eq!(IpRange::from_network(net).len(), MAX_NETWORK_HOSTS);
    }

    #[test]
    fn test_contains_on_large_network() {
        let net: Ipv4Network = "10.0.0.0/20".parse().unwrap();
        let range = IpRange::from_network(net);
        assert_eq!(range.len(), 4094);
        assert!(range.contains(Ipv4Addr::new(10, 0, 0, 255)));
        assert!(range.contains(Ipv4Addr::new(10, 0, 15, 254)));
        assert!(!range.contains(Ipv4Addr::new(10, 0, 15, 255)));
        assert!(!range.contains(Ipv4Addr::new(10, 0, 16, 1)));
    }

    #[test]
    fn test_single() {
        let ip = Ipv4Addr::new(172, 16, 0, 9);
        let range = IpRange::single(ip);
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![ip]);
    }
}
