//! Scan capability reporting
//!
//! Different platforms restrict different probes:
//! - Linux: the system ping is usually setuid or has CAP_NET_RAW, but hardened
//!   images strip it
//! - macOS: ping and arp work unprivileged
//! - Windows: ping and arp work without elevation

use serde::{Deserialize, Serialize};

/// Scan mode indicating the level of access available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Every requested probing method worked
    Full,
    /// Some probing methods were unavailable
    Limited,
}

impl std::fmt::Display for ScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanMode::Full => write!(f, "full"),
            ScanMode::Limited => write!(f, "limited"),
        }
    }
}

/// What a scan was able to use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanCapabilities {
    pub mode: ScanMode,
    pub can_ping: bool,
    pub can_read_arp: bool,
    pub is_elevated: bool,
    pub warning: Option<String>,
}

impl ScanCapabilities {
    /// Capabilities from the methods that were tried. A method that was not
    /// requested, or a table read cut short by cancellation, does not degrade
    /// the mode.
    pub fn from_observed(
        ping_requested: bool,
        can_ping: bool,
        arp_read: bool,
        can_read_arp: bool,
    ) -> Self {
        let mut missing = Vec::new();
        if ping_requested && !can_ping {
            missing.push("ping sweep unavailable");
        }
        if arp_read && !can_read_arp {
            missing.push("neighbor table unreadable");
        }

        let (mode, warning) = if missing.is_empty() {
            (ScanMode::Full, None)
        } else {
            (
                ScanMode::Limited,
                Some(format!(
                    "Running with limited scan capabilities ({}). \
                     Some devices may not be discovered.",
                    missing.join(", ")
                )),
            )
        };

        Self {
            mode,
            can_ping,
            can_read_arp,
            is_elevated: is_elevated(),
            warning,
        }
    }
}

/// Check if the current process is running with elevated privileges
pub fn is_elevated() -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::geteuid() == 0 }
    }

    #[cfg(not(unix))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_when_everything_works() {
        let caps = ScanCapabilities::from_observed(true, true, true, true);
        assert_eq!(caps.mode, ScanMode::Full);
        assert!(caps.warning.is_none());
    }

    #[test]
    fn test_limited_names_missing_method() {
        let caps = ScanCapabilities::from_observed(true, false, true, true);
        assert_eq!(caps.mode, ScanMode::Limited);
        assert!(caps.warning.unwrap().contains("ping sweep unavailable"));
    }

    #[test]
    fn test_unrequested_method_does_not_degrade() {
        let caps = ScanCapabilities::from_observed(false, false, true, true);
        assert_eq!(caps.mode, ScanMode::Full);
    }

    #[test]
    fn test_both_missing() {
        let caps = ScanCapabilities::from_observed(true, false, true, false);
        let warning = caps.warning.unwrap();
        assert!(warning.contains("ping sweep unavailable"));
        assert!(warning.contains("neighbor table unreadable"));
    }
}
