//! lanprobe Core Library
//!
//! This crate provides the discovery engine behind the `lanprobe` CLI:
//! - Host discovery (neighbor table, ping sweep)
//! - TCP connect port probing
//! - Enrichment (reverse DNS, MAC OUI vendor) and device/OS classification
//! - Confidence scoring and merging into one record per address
//!
//! # Features
//!
//! - `ieee-oui` (default): fall back to the IEEE OUI registry for vendors the
//!   built-in prefix table does not know
//!
//! # Example
//!
//! ```no_run
//! use lanprobe_core::{ScanConfig, ScanRequest, Scanner};
//! use std::net::Ipv4Addr;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), lanprobe_core::ScanError> {
//!     let scanner = Scanner::new(ScanConfig::default());
//!     let request = ScanRequest::subnet(Ipv4Addr::new(192, 168, 1, 0), 1, 254)?;
//!
//!     let report = scanner.scan(&request, CancellationToken::new()).await?;
//!     for host in &report.hosts {
//!         println!("{} {} ({}%)", host.ip, host.device_type, host.confidence);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod scanner;

// Re-export commonly used types
pub use config::{DEFAULT_PORTS, ScanConfig};
pub use error::{Result, ScanError};
pub use scanner::{
    DeviceType, DiscoveredHost, HostSource, HostStatus, IpRange, NetworkInfo, ProgressCallback,
    ScanCapabilities, ScanMode, ScanProgress, ScanReport, ScanRequest, ScanStage, Scanner, Service,
};
