//! Parsing of target, range and port-list arguments.

use anyhow::{Context, Result, bail};
use ipnetwork::Ipv4Network;
use lanprobe_core::scanner::NetworkInfo;
use lanprobe_core::{ScanConfig, ScanRequest};
use std::net::Ipv4Addr;

/// Largest port list accepted on the command line.
const MAX_PORTS: usize = 1024;

/// `22,80,8000-8010` → sorted, deduplicated port numbers.
pub fn parse_port_list(input: &str) -> Result<Vec<u16>> {
    let mut ports = Vec::new();

    for item in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match item.split_once('-') {
            Some((start, end)) => {
                let start = parse_port(start)?;
                let end = parse_port(end)?;
                if start > end {
                    bail!("port range {item} is reversed");
                }
                ports.extend(start..=end);
            }
            None => ports.push(parse_port(item)?),
        }
        if ports.len() > MAX_PORTS {
            bail!("more than {MAX_PORTS} ports requested");
        }
    }

    ports.sort_unstable();
    ports.dedup();
    if ports.is_empty() {
        bail!("empty port list");
    }
    Ok(ports)
}

fn parse_port(s: &str) -> Result<u16> {
    let port: u16 = s
        .trim()
        .parse()
        .with_context(|| format!("invalid port {s:?}"))?;
    if port == 0 {
        bail!("port 0 is not probeable");
    }
    Ok(port)
}

/// `10-50` → `(10, 50)`, host numbers within a /24.
pub fn parse_host_range(input: &str) -> Result<(u8, u8)> {
    let (first, last) = input
        .split_once('-')
        .with_context(|| format!("host range {input:?} must look like FIRST-LAST"))?;
    let first: u8 = first
        .trim()
        .parse()
        .with_context(|| format!("invalid host number {first:?}"))?;
    let last: u8 = last
        .trim()
        .parse()
        .with_context(|| format!("invalid host number {last:?}"))?;
    Ok((first, last))
}

/// What the user asked to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Address(Ipv4Addr),
    Network(Ipv4Network),
}

pub fn parse_target(input: &str) -> Result<Target> {
    if input.contains('/') {
        let network: Ipv4Network = input
            .parse()
            .with_context(|| format!("invalid CIDR network {input:?}"))?;
        return Ok(Target::Network(network));
    }
    let ip: Ipv4Addr = input
        .parse()
        .with_context(|| format!("invalid IPv4 address {input:?}"))?;
    Ok(Target::Address(ip))
}

/// Turn the target and optional host range into a request.
///
/// A bare address means the /24 around it, swept over the configured host
/// numbers. A `--range` always applies to the /24 of the target's first
/// address.
pub fn build_request(
    target: Target,
    range: Option<(u8, u8)>,
    config: &ScanConfig,
) -> Result<ScanRequest> {
    let request = match (target, range) {
        (Target::Address(ip), Some((first, last))) => ScanRequest::subnet(ip, first, last)?,
        (Target::Network(net), Some((first, last))) => {
            ScanRequest::subnet(net.network(), first, last)?
        }
        (Target::Address(ip), None) => {
            ScanRequest::subnet(ip, config.first_host, config.last_host)?
        }
        (Target::Network(net), None) => ScanRequest::network(net),
    };
    Ok(request)
}

/// The target used when none is given. A /24 local network becomes a bare
/// address so the configured host numbers apply; anything else is swept
/// whole.
pub fn local_target(info: &NetworkInfo) -> Target {
    if info.network.prefix() == 24 {
        Target::Address(info.local_ip)
    } else {
        Target::Network(info.network)
    }
}
