//! Local network detection, used when the caller names no target.

use super::platform::hidden_command;
use crate::error::{Result, ScanError};
use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// The interface carrying the default route and its IPv4 network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub interface: String,
    pub network: Ipv4Network,
    pub local_ip: Ipv4Addr,
    pub gateway_ip: Option<Ipv4Addr>,
}

/// Detect the local network of the default-route interface.
pub async fn detect_local_network() -> Result<NetworkInfo> {
    if cfg!(target_os = "windows") {
        let ipconfig = run("ipconfig", &[]).await?;
        parse_ipconfig(&ipconfig).ok_or_else(|| {
            ScanError::NetworkDetection("no usable adapter in ipconfig output".into())
        })
    } else if cfg!(target_os = "macos") {
        let route = run("route", &["-n", "get", "default"]).await?;
        let (gateway_ip, interface) = parse_macos_route(&route);
        let interface = interface.unwrap_or_else(|| "en0".to_string());
        let ifconfig = run("ifconfig", &[interface.as_str()]).await?;
        let (local_ip, network) = parse_ifconfig_inet(&ifconfig).ok_or_else(|| {
            ScanError::NetworkDetection(format!("no IPv4 address on {interface}"))
        })?;
        Ok(NetworkInfo {
            interface,
            network,
            local_ip,
            gateway_ip,
        })
    } else {
        let route = run("ip", &["route", "show", "default"]).await?;
        let (gateway_ip, interface) = parse_ip_route_default(&route);
        let interface = interface
            .ok_or_else(|| ScanError::NetworkDetection("no default route".into()))?;
        let addr = run("ip", &["-4", "addr", "show", interface.as_str()]).await?;
        let (local_ip, network) = parse_ip_addr_inet(&addr).ok_or_else(|| {
            ScanError::NetworkDetection(format!("no IPv4 address on {interface}"))
        })?;
        Ok(NetworkInfo {
            interface,
            network,
            local_ip,
            gateway_ip,
        })
    }
}

async fn run(program: &str, args: &[&str]) -> Result<String> {
    let mut cmd = hidden_command(program);
    cmd.args(args);
    let output = cmd.output().await?;
    if !output.status.success() {
        return Err(ScanError::NetworkDetection(format!(
            "`{program}` exited with {}",
            output.status
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// `default via 192.168.1.1 dev wlan0 proto dhcp metric 600`
pub fn parse_ip_route_default(output: &str) -> (Option<Ipv4Addr>, Option<String>) {
    let line = output.lines().find(|l| l.trim_start().starts_with("default"));
    let Some(line) = line else {
        return (None, None);
    };

    let gateway = line
        .split_whitespace()
        .skip_while(|&s| s != "via")
        .nth(1)
        .and_then(|s| s.parse().ok());

    let interface = line
        .split_whitespace()
        .skip_while(|&s| s != "dev")
        .nth(1)
        .map(|s| s.to_string());

    (gateway, interface)
}

/// First non-loopback `inet a.b.c.d/nn` line of `ip -4 addr show`.
pub fn parse_ip_addr_inet(output: &str) -> Option<(Ipv4Addr, Ipv4Network)> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("inet "))
        .filter_map(|l| l.split_whitespace().nth(1))
        .filter_map(|cidr| cidr.parse::<Ipv4Network>().ok())
        .find(|net| !net.ip().is_loopback())
        .and_then(|net| {
            let network = Ipv4Network::new(net.network(), net.prefix()).ok()?;
            Some((net.ip(), network))
        })
}

/// `route -n get default` on macOS.
pub fn parse_macos_route(output: &str) -> (Option<Ipv4Addr>, Option<String>) {
    let field = |name: &str| {
        output
            .lines()
            .map(str::trim)
            .find(|l| l.starts_with(name))
            .and_then(|l| l.split(':').nth(1))
            .map(|s| s.trim().to_string())
    };

    let gateway = field("gateway:").and_then(|s| s.parse().ok());
    (gateway, field("interface:"))
}

/// `inet 192.168.1.23 netmask 0xffffff00 broadcast 192.168.1.255` from
/// macOS `ifconfig`.
pub fn parse_ifconfig_inet(output: &str) -> Option<(Ipv4Addr, Ipv4Network)> {
    for line in output.lines().map(str::trim) {
        if !line.starts_with("inet ") {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        let ip: Ipv4Addr = parts.get(1)?.parse().ok()?;
        if ip.is_loopback() {
            continue;
        }
        let mask_pos = parts.iter().position(|p| *p == "netmask")?;
        let mask_hex = parts.get(mask_pos + 1)?.trim_start_matches("0x");
        let mask = u32::from_str_radix(mask_hex, 16).ok()?;
        return network_from_mask(ip, Ipv4Addr::from(mask)).map(|net| (ip, net));
    }
    None
}

/// Windows `ipconfig`: first non-virtual adapter with an IPv4 address and a
/// mask, preferring one with a default gateway.
pub fn parse_ipconfig(output: &str) -> Option<NetworkInfo> {
    const VIRTUAL_PATTERNS: &[&str] = &[
        "vEthernet",
        "WSL",
        "Hyper-V",
        "VirtualBox",
        "VMware",
        "Docker",
        "Loopback",
        "Tailscale",
    ];

    #[derive(Default)]
    struct Adapter {
        name: String,
        ip: Option<Ipv4Addr>,
        mask: Option<Ipv4Addr>,
        gateway: Option<Ipv4Addr>,
    }

    fn value(line: &str) -> Option<Ipv4Addr> {
        line.split_once(':')?
            .1
            .trim()
            .trim_end_matches("(Preferred)")
            .trim()
            .parse()
            .ok()
    }

    let mut adapters: Vec<Adapter> = Vec::new();
    for line in output.lines() {
        let trimmed = line.trim();
        if !line.starts_with(' ') && trimmed.ends_with(':') && trimmed.contains("adapter") {
            adapters.push(Adapter {
                name: trimmed.trim_end_matches(':').to_string(),
                ..Adapter::default()
            });
            continue;
        }
        let Some(current) = adapters.last_mut() else {
            continue;
        };
        if trimmed.starts_with("IPv4 Address") || trimmed.starts_with("IP Address") {
            current.ip = value(trimmed).filter(|ip| !ip.is_loopback() && !ip.is_link_local());
        } else if trimmed.starts_with("Subnet Mask") {
            current.mask = value(trimmed);
        } else if trimmed.starts_with("Default Gateway") {
            current.gateway = value(trimmed);
        }
    }

    let usable = |a: &&Adapter| {
        !VIRTUAL_PATTERNS.iter().any(|p| a.name.contains(p)) && a.ip.is_some() && a.mask.is_some()
    };
    let best = adapters
        .iter()
        .filter(usable)
        .find(|a| a.gateway.is_some())
        .or_else(|| adapters.iter().find(usable))?;

    let ip = best.ip?;
    Some(NetworkInfo {
        interface: best.name.clone(),
        network: network_from_mask(ip, best.mask?)?,
        local_ip: ip,
        gateway_ip: best.gateway,
    })
}

fn network_from_mask(ip: Ipv4Addr, mask: Ipv4Addr) -> Option<Ipv4Network> {
    let mask_u32 = u32::from(mask);
    let network = Ipv4Addr::from(u32::from(ip) & mask_u32);
    Ipv4Network::new(network, mask_u32.count_ones() as u8).ok()
}
