//! MAC OUI (Organizationally Unique Identifier) vendor lookup
//!
//! Maps the first three octets of a MAC address to a manufacturer name using a
//! static prefix table. Only exact 3-octet prefixes match.

use std::collections::HashMap;

/// Built-in prefix table. Kept small and focused on the vendors the device
/// classifier has rules for, plus common desktop/phone makers.
const BUILTIN_OUI: &[(&str, &str)] = &[
    // Network equipment
    ("00:00:0C", "Cisco Systems, Inc"),
    ("00:01:42", "Cisco Systems, Inc"),
    ("00:01:96", "Cisco Systems, Inc"),
    ("00:1B:54", "Cisco Systems, Inc"),
    ("24:A4:3C", "Ubiquiti Networks Inc."),
    ("04:18:D6", "Ubiquiti Networks Inc."),
    ("FC:EC:DA", "Ubiquiti Networks Inc."),
    ("00:14:BF", "Linksys"),
    ("C0:C1:C0", "Linksys"),
    ("50:C7:BF", "TP-Link Technologies Co.,Ltd."),
    ("EC:08:6B", "TP-Link Technologies Co.,Ltd."),
    ("F4:F2:6D", "TP-Link Technologies Co.,Ltd."),
    // Virtualization
    ("00:0C:29", "VMware, Inc."),
    ("00:50:56", "VMware, Inc."),
    ("00:05:69", "VMware, Inc."),
    ("52:54:00", "QEMU virtual NIC"),
    ("08:00:27", "Oracle VirtualBox virtual NIC"),
    ("00:15:5D", "Microsoft Hyper-V virtual NIC"),
    // Single-board computers
    ("B8:27:EB", "Raspberry Pi Foundation"),
    ("DC:A6:32", "Raspberry Pi Trading Ltd"),
    ("E4:5F:01", "Raspberry Pi Trading Ltd"),
    // Storage
    ("00:11:32", "Synology Incorporated"),
    ("24:5E:BE", "QNAP Systems, Inc."),
    // Smart home
    ("F4:F5:D8", "Google, Inc."),
    ("54:60:09", "Google, Inc."),
    ("3C:5A:B4", "Google, Inc."),
    // Apple
    ("00:17:F2", "Apple, Inc."),
    ("00:1C:B3", "Apple, Inc."),
    ("00:26:BB", "Apple, Inc."),
    ("3C:22:FB", "Apple, Inc."),
    ("F0:18:98", "Apple, Inc."),
    // Computers, phones, printers
    ("00:14:22", "Dell Inc."),
    ("00:1B:21", "Intel Corporate"),
    ("3C:D9:2B", "Hewlett Packard"),
    ("00:1A:11", "Samsung Electronics Co.,Ltd"),
    ("D8:27:27", "Samsung Electronics Co.,Ltd"),
    ("00:80:77", "Brother Industries, Ltd."),
    ("00:26:AB", "Seiko Epson Corporation"),
    ("00:00:48", "Seiko Epson Corporation"),
];

/// Normalize a MAC address to the format XX:XX:XX:XX:XX:XX.
///
/// Accepts colon or hyphen separated octets (single-digit octets are padded,
/// as macOS prints them), Cisco dotted form (`0011.2233.4455`) and bare hex.
/// Returns `None` for anything that is not six octets of hex.
pub fn normalize_mac(mac: &str) -> Option<String> {
    let mac = mac.trim();

    let octets: Vec<String> = if mac.contains([':', '-']) {
        let parts: Vec<&str> = mac.split([':', '-']).collect();
        if parts.len() != 6 {
            return None;
        }
        parts
            .iter()
            .map(|p| {
                if p.is_empty() || p.len() > 2 || !p.chars().all(|c| c.is_ascii_hexdigit()) {
                    None
                } else {
                    Some(format!("{:0>2}", p.to_uppercase()))
                }
            })
            .collect::<Option<Vec<_>>>()?
    } else {
        let cleaned = mac.replace('.', "");
        if cleaned.len() != 12 || !cleaned.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let upper = cleaned.to_uppercase();
        (0..6).map(|i| upper[i * 2..i * 2 + 2].to_string()).collect()
    };

    Some(octets.join(":"))
}

/// `AA:BB:CC` prefix of a MAC in any accepted form.
pub fn oui_prefix(mac: &str) -> Option<String> {
    normalize_mac(mac).map(|m| m[..8].to_string())
}

/// Immutable OUI prefix → manufacturer table.
#[derive(Debug, Clone)]
pub struct OuiTable {
    entries: HashMap<String, String>,
    ieee_fallback: bool,
}

impl Default for OuiTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl OuiTable {
    /// An empty table, for callers that supply their own entries.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
            ieee_fallback: false,
        }
    }

    /// The built-in prefix set.
    pub fn builtin() -> Self {
        BUILTIN_OUI
            .iter()
            .fold(Self::empty(), |table, (prefix, vendor)| table.with_entry(prefix, vendor))
    }

    /// Add or replace one prefix. Malformed prefixes are ignored.
    pub fn with_entry(mut self, prefix: &str, vendor: &str) -> Self {
        match normalize_prefix(prefix) {
            Some(key) => {
                self.entries.insert(key, vendor.to_string());
            }
            None => tracing::warn!("Ignoring malformed OUI prefix {:?}", prefix),
        }
        self
    }

    /// Also consult the IEEE registry on a miss. Has no effect when the
    /// `ieee-oui` feature is disabled.
    pub fn with_ieee_fallback(mut self, enabled: bool) -> Self {
        self.ieee_fallback = enabled;
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookup the manufacturer for a MAC address.
    ///
    /// # Returns
    /// * `Some(vendor_name)` if the 3-octet prefix is known
    /// * `None` if the MAC is malformed or the prefix is unknown
    pub fn lookup(&self, mac: &str) -> Option<String> {
        let prefix = oui_prefix(mac)?;

        if let Some(vendor) = self.entries.get(&prefix) {
            tracing::debug!("OUI lookup for {}: {}", mac, vendor);
            return Some(vendor.clone());
        }

        if self.ieee_fallback {
            if let Some(vendor) = lookup_ieee(&prefix) {
                tracing::debug!("OUI lookup for {}: {} (IEEE registry)", mac, vendor);
                return Some(vendor);
            }
        }

        tracing::debug!("OUI lookup for {}: not found", mac);
        None
    }
}

fn normalize_prefix(prefix: &str) -> Option<String> {
    // Pad to a full address so the normal parser can validate it.
    let sep = if prefix.contains('-') { "-" } else { ":" };
    let full = format!("{prefix}{sep}00{sep}00{sep}00");
    oui_prefix(&full)
}

#[cfg(feature = "ieee-oui")]
fn lookup_ieee(prefix: &str) -> Option<String> {
    // Query with the prefix alone (zeroed NIC part) so only the 3-octet
    // assignment can answer.
    oui_data::lookup(&format!("{prefix}:00:00:00")).map(|record| record.organization().to_string())
}

#[cfg(not(feature = "ieee-oui"))]
fn lookup_ieee(_prefix: &str) -> Option<String> {
    None
}
