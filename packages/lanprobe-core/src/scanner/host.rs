//! The discovered-host record and its small value types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::net::Ipv4Addr;

/// Device classification. Serialized with the labels the inventory layer
/// stores, which are French.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeviceType {
    #[serde(rename = "réseau")]
    Network,
    #[serde(rename = "serveur")]
    Server,
    #[serde(rename = "imprimante")]
    Printer,
    #[serde(rename = "ordinateur")]
    Computer,
    #[serde(rename = "nas")]
    Nas,
    #[serde(rename = "iot")]
    Iot,
    #[serde(rename = "machine_virtuelle")]
    VirtualMachine,
    #[serde(rename = "smartphone")]
    Smartphone,
    #[serde(rename = "ordinateur_portable")]
    Laptop,
    #[default]
    #[serde(rename = "inconnu")]
    Unknown,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Network => "réseau",
            DeviceType::Server => "serveur",
            DeviceType::Printer => "imprimante",
            DeviceType::Computer => "ordinateur",
            DeviceType::Nas => "nas",
            DeviceType::Iot => "iot",
            DeviceType::VirtualMachine => "machine_virtuelle",
            DeviceType::Smartphone => "smartphone",
            DeviceType::Laptop => "ordinateur_portable",
            DeviceType::Unknown => "inconnu",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostStatus {
    Online,
    Offline,
}

/// Which collector first produced the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostSource {
    Arp,
    Ping,
    Manual,
}

impl fmt::Display for HostSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostSource::Arp => write!(f, "arp"),
            HostSource::Ping => write!(f, "ping"),
            HostSource::Manual => write!(f, "manual"),
        }
    }
}

/// An open TCP port and its well-known service label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub port: u16,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredHost {
    pub ip: Ipv4Addr,
    /// Uppercase, colon separated. Only ever set through
    /// [`crate::scanner::oui::normalize_mac`].
    pub mac: Option<String>,
    pub hostname: Option<String>,
    pub manufacturer: Option<String>,
    pub open_ports: BTreeSet<u16>,
    pub services: Vec<Service>,
    pub os: Option<String>,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub status: HostStatus,
    #[serde(rename = "responseTime")]
    pub response_time_ms: Option<u64>,
    pub discovered_at: DateTime<Utc>,
    pub source: HostSource,
    pub confidence: u8,
}

impl DiscoveredHost {
    fn new(ip: Ipv4Addr, source: HostSource, status: HostStatus) -> Self {
        Self {
            ip,
            mac: None,
            hostname: None,
            manufacturer: None,
            open_ports: BTreeSet::new(),
            services: Vec::new(),
            os: None,
            device_type: DeviceType::Unknown,
            status,
            response_time_ms: None,
            discovered_at: Utc::now(),
            source,
            confidence: 0,
        }
    }

    /// Seed for an entry read from the neighbor table. `mac` must already be
    /// normalized.
    pub fn from_arp(ip: Ipv4Addr, mac: String) -> Self {
        let mut host = Self::new(ip, HostSource::Arp, HostStatus::Online);
        host.mac = Some(mac);
        host
    }

    /// Seed for an address that answered an echo request.
    pub fn from_ping(ip: Ipv4Addr, response_time_ms: u64) -> Self {
        let mut host = Self::new(ip, HostSource::Ping, HostStatus::Online);
        host.response_time_ms = Some(response_time_ms);
        host
    }

    /// A caller-named target. It stays offline until a probe answers.
    pub fn manual(ip: Ipv4Addr) -> Self {
        Self::new(ip, HostSource::Manual, HostStatus::Offline)
    }

    /// Number of corroborating identity fields present.
    pub fn evidence(&self) -> usize {
        [
            self.mac.is_some(),
            self.hostname.is_some(),
            self.manufacturer.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }

    pub fn is_online(&self) -> bool {
        self.status == HostStatus::Online
    }

    /// Record an open port, keeping `open_ports` and `services` in step.
    pub fn add_service(&mut self, service: Service) {
        if self.open_ports.insert(service.port) {
            self.services.push(service);
            self.services.sort_by_key(|s| s.port);
        }
    }
}
