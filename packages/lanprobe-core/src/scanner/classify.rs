//! Rule-based device type and operating system inference.
//!
//! Rules are plain data so callers can extend them without touching the
//! evaluation order: manufacturer rules first, then hostname rules, then the
//! default type. Within a table the first matching rule wins.

use super::host::{DeviceType, DiscoveredHost};
use std::collections::BTreeSet;

/// Any keyword found as a substring of the lower-cased input selects the type.
#[derive(Debug, Clone)]
pub struct Rule {
    pub keywords: Vec<String>,
    pub device_type: DeviceType,
}

impl Rule {
    pub fn new(keywords: &[&str], device_type: DeviceType) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            device_type,
        }
    }

    fn matches(&self, haystack: &str) -> bool {
        self.keywords.iter().any(|k| haystack.contains(k.as_str()))
    }
}

const MANUFACTURER_RULES: &[(&[&str], DeviceType)] = &[
    (&["cisco", "ubiquiti", "linksys", "tp-link"], DeviceType::Network),
    (&["vmware", "qemu", "virtualbox", "hyper-v"], DeviceType::VirtualMachine),
    (&["raspberry"], DeviceType::Iot),
    (&["synology", "qnap"], DeviceType::Nas),
    (&["google"], DeviceType::Iot),
];

const HOSTNAME_RULES: &[(&[&str], DeviceType)] = &[
    (&["print", "imprimante", "prn"], DeviceType::Printer),
    (&["server", "srv", "serveur"], DeviceType::Server),
    (&["switch", "sw-", "ap-"], DeviceType::Network),
    (&["iphone", "android", "pixel"], DeviceType::Smartphone),
    (&["macbook", "laptop", "portable"], DeviceType::Laptop),
];

fn rules_from(table: &[(&[&str], DeviceType)]) -> Vec<Rule> {
    table.iter().map(|(keywords, t)| Rule::new(keywords, *t)).collect()
}

#[derive(Debug, Clone)]
pub struct Classifier {
    manufacturer_rules: Vec<Rule>,
    hostname_rules: Vec<Rule>,
    default_type: DeviceType,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            manufacturer_rules: rules_from(MANUFACTURER_RULES),
            hostname_rules: rules_from(HOSTNAME_RULES),
            default_type: DeviceType::Computer,
        }
    }
}

impl Classifier {
    pub fn new(
        manufacturer_rules: Vec<Rule>,
        hostname_rules: Vec<Rule>,
        default_type: DeviceType,
    ) -> Self {
        Self {
            manufacturer_rules,
            hostname_rules,
            default_type,
        }
    }

    /// Append a manufacturer rule, evaluated after the existing ones.
    pub fn with_manufacturer_rule(mut self, rule: Rule) -> Self {
        self.manufacturer_rules.push(rule);
        self
    }

    /// Append a hostname rule, evaluated after the existing ones.
    pub fn with_hostname_rule(mut self, rule: Rule) -> Self {
        self.hostname_rules.push(rule);
        self
    }

    pub fn device_type(&self, manufacturer: Option<&str>, hostname: Option<&str>) -> DeviceType {
        if let Some(vendor) = manufacturer.map(str::to_lowercase) {
            if let Some(rule) = self.manufacturer_rules.iter().find(|r| r.matches(&vendor)) {
                return rule.device_type;
            }
        }

        if let Some(name) = hostname.map(str::to_lowercase) {
            if let Some(rule) = self.hostname_rules.iter().find(|r| r.matches(&name)) {
                return rule.device_type;
            }
        }

        self.default_type
    }

    /// Set `device_type` and `os` on a host from its current evidence.
    pub fn classify(&self, host: &mut DiscoveredHost) {
        host.device_type = self.device_type(host.manufacturer.as_deref(), host.hostname.as_deref());
        host.os = guess_os(host.manufacturer.as_deref(), &host.open_ports).map(String::from);
    }
}

/// Operating system guess from vendor and open-port signature.
///
/// Meaningful only once the port scan has filled `open_ports`.
pub fn guess_os(manufacturer: Option<&str>, open_ports: &BTreeSet<u16>) -> Option<&'static str> {
    if let Some(vendor) = manufacturer.map(str::to_lowercase) {
        if vendor.contains("apple") {
            return Some("macOS");
        }
        if vendor.contains("raspberry") {
            return Some("Linux (Raspbian)");
        }
    }

    let has = |port: u16| open_ports.contains(&port);

    if has(3389) && has(445) {
        return Some("Windows");
    }
    if has(22) && !has(3389) {
        return Some("Linux");
    }
    if has(9100) || has(631) {
        return Some("Embedded (Imprimante)");
    }
    if has(161) {
        return Some("Firmware SNMP");
    }
    None
}
