//! Network scanning module.
//!
//! Discovers hosts on an IPv4 range using:
//! - the OS neighbor (ARP) table
//! - an ICMP ping sweep through the system `ping`
//! - TCP connect probes of a port list
//! - reverse DNS and MAC OUI vendor lookup
//!
//! [`Scanner`] runs the stages in order and yields one classified, scored
//! record per responsive address.

pub mod aggregate;
pub mod arp;
pub mod classify;
pub mod dns;
pub mod host;
pub mod network;
pub mod oui;
pub mod ping;
pub mod platform;
pub mod ports;
pub mod privileges;
pub mod range;
pub mod score;

pub use arp::ArpCollection;
pub use classify::{Classifier, Rule};
pub use dns::{HostnameResolver, ReverseDns};
pub use host::{DeviceType, DiscoveredHost, HostSource, HostStatus, Service};
pub use network::{NetworkInfo, detect_local_network};
pub use oui::OuiTable;
pub use ping::{Prober, SystemPinger};
pub use platform::NeighborTable;
pub use ports::{Connector, ServiceTable, TcpConnector};
pub use privileges::{ScanCapabilities, ScanMode};
pub use range::IpRange;

use crate::config::ScanConfig;
use crate::error::{Result, ScanError};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// What to scan and which methods to use.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub range: IpRange,
    /// Overrides [`ScanConfig::ports`] when set.
    pub ports: Option<Vec<u16>>,
    pub use_arp: bool,
    pub use_ping: bool,
    pub scan_ports: bool,
    /// Wall-clock budget. When it runs out the scan stops like a cancellation.
    pub deadline: Option<Duration>,
}

impl ScanRequest {
    fn for_range(range: IpRange) -> Self {
        Self {
            range,
            ports: None,
            use_arp: true,
            use_ping: true,
            scan_ports: true,
            deadline: None,
        }
    }

    /// Host numbers `first..=last` of the /24 containing `base`.
    pub fn subnet(base: Ipv4Addr, first: u8, last: u8) -> Result<Self> {
        Ok(Self::for_range(IpRange::new(base, first, last)?))
    }

    pub fn network(network: Ipv4Network) -> Self {
        Self::for_range(IpRange::from_network(network))
    }

    pub fn host(ip: Ipv4Addr) -> Self {
        Self::for_range(IpRange::single(ip))
    }

    pub fn with_ports(mut self, ports: Vec<u16>) -> Self {
        self.ports = Some(ports);
        self
    }

    pub fn without_arp(mut self) -> Self {
        self.use_arp = false;
        self
    }

    pub fn without_ping(mut self) -> Self {
        self.use_ping = false;
        self
    }

    pub fn without_port_scan(mut self) -> Self {
        self.scan_ports = false;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Result of one scan run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub scan_id: Uuid,
    pub target: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    /// True when the scan stopped early; `hosts` holds what was found so far.
    pub cancelled: bool,
    pub capabilities: ScanCapabilities,
    pub hosts: Vec<DiscoveredHost>,
}

/// Progress updates during network scanning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanProgress {
    pub stage: ScanStage,
    pub message: String,
    pub percent: Option<u8>,
    pub devices_found: Option<usize>,
    pub elapsed_secs: f64,
}

/// Stages of the network scan process
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScanStage {
    Starting,
    Discovering,
    PortScan,
    Classifying,
    Complete,
}

/// Callback type for scan progress updates
pub type ProgressCallback = Box<dyn Fn(ScanProgress) + Send + Sync>;

/// The scan engine.
///
/// Probing is done through the [`Prober`], [`HostnameResolver`] and
/// [`Connector`] seams so that tests (and embedders) can swap the network out.
/// [`Scanner::new`] wires the system implementations.
pub struct Scanner<P = SystemPinger, R = ReverseDns, C = TcpConnector> {
    config: ScanConfig,
    table: Box<dyn NeighborTable>,
    prober: P,
    resolver: R,
    connector: C,
    oui: OuiTable,
    classifier: Classifier,
    services: ServiceTable,
    on_progress: Option<ProgressCallback>,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Self {
        let prober = SystemPinger::new(config.ping_timeout());
        let resolver = ReverseDns::new(config.dns_timeout());
        let oui = OuiTable::builtin().with_ieee_fallback(config.ieee_vendor_fallback);

        Self::with_components(
            config,
            platform::neighbor_table_for_current_os(),
            prober,
            resolver,
            TcpConnector,
        )
        .with_oui_table(oui)
    }
}

impl<P, R, C> Scanner<P, R, C>
where
    P: Prober,
    R: HostnameResolver,
    C: Connector,
{
    pub fn with_components(
        config: ScanConfig,
        table: Box<dyn NeighborTable>,
        prober: P,
        resolver: R,
        connector: C,
    ) -> Self {
        Self {
            config,
            table,
            prober,
            resolver,
            connector,
            oui: OuiTable::builtin(),
            classifier: Classifier::default(),
            services: ServiceTable::default(),
            on_progress: None,
        }
    }

    pub fn with_oui_table(mut self, oui: OuiTable) -> Self {
        self.oui = oui;
        self
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_service_table(mut self, services: ServiceTable) -> Self {
        self.services = services;
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    fn emit(
        &self,
        started: Instant,
        stage: ScanStage,
        message: &str,
        percent: Option<u8>,
        devices: Option<usize>,
    ) {
        tracing::info!("[Scan] {}", message);
        if let Some(ref callback) = self.on_progress {
            callback(ScanProgress {
                stage,
                message: message.to_string(),
                percent,
                devices_found: devices,
                elapsed_secs: started.elapsed().as_secs_f64(),
            });
        }
    }

    /// Enriched records from the neighbor table, unfiltered by range.
    pub async fn read_arp_table(&self) -> ArpCollection {
        arp::get_arp_table(
            self.table.as_ref(),
            self.config.command_timeout(),
            &self.oui,
            &self.classifier,
            &self.resolver,
            self.config.dns_concurrency,
        )
        .await
    }

    /// Run a full scan of `request.range`.
    ///
    /// Cancelling `cancel` (or running past `request.deadline`) stops the
    /// remaining probes; the report then carries `cancelled: true` and the
    /// hosts found so far, still classified and scored.
    pub async fn scan(
        &self,
        request: &ScanRequest,
        cancel: CancellationToken,
    ) -> Result<ScanReport> {
        if !request.use_arp && !request.use_ping {
            return Err(ScanError::NoProbingAvailable);
        }

        let started = Instant::now();
        let started_at = Utc::now();
        let scan_id = Uuid::new_v4();

        let cancel = cancel.child_token();
        let deadline_timer = request.deadline.map(|limit| {
            let token = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                tracing::info!("Scan deadline of {:?} reached", limit);
                token.cancel();
            })
        });

        self.emit(
            started,
            ScanStage::Starting,
            &format!("Scanning {} ({} addresses)", request.range, request.range.len()),
            Some(0),
            None,
        );

        let can_ping = request.use_ping && self.prober.is_available().await;
        if request.use_ping && !can_ping {
            tracing::warn!("Ping sweep skipped: system ping is not usable");
        }

        self.emit(
            started,
            ScanStage::Discovering,
            "Reading neighbor table and sweeping range...",
            Some(5),
            None,
        );

        // `None` when the table was not read to completion, either because
        // it was not requested or because the scan was cancelled first.
        let arp_stage = async {
            if !request.use_arp {
                return None;
            }
            tokio::select! {
                collection = self.read_arp_table() => Some(collection),
                _ = cancel.cancelled() => None,
            }
        };
        let ping_stage = async {
            if !can_ping {
                return Vec::new();
            }
            ping::ping_sweep(
                &self.prober,
                &self.resolver,
                &request.range,
                self.config.effective_batch_size(),
                &cancel,
            )
            .await
        };
        let (arp, pinged) = tokio::join!(arp_stage, ping_stage);
        let arp_read = arp.is_some();
        let arp = arp.unwrap_or_default();

        let capabilities =
            ScanCapabilities::from_observed(request.use_ping, can_ping, arp_read, arp.available);
        if let Some(ref warning) = capabilities.warning {
            tracing::warn!("{}", warning);
        }
        if !can_ping && !arp.available && !cancel.is_cancelled() {
            abort_timer(deadline_timer);
            return Err(ScanError::NoProbingAvailable);
        }

        let arp_total = arp.hosts.len();
        let arp_hosts: Vec<DiscoveredHost> = arp
            .hosts
            .into_iter()
            .filter(|h| request.range.contains(h.ip))
            .collect();
        tracing::debug!(
            "{} of {} neighbor entries fall inside {}",
            arp_hosts.len(),
            arp_total,
            request.range
        );

        let ping_count = pinged.len();
        let mut hosts = aggregate::aggregate(arp_hosts, pinged);

        self.emit(
            started,
            ScanStage::Discovering,
            &format!("Discovered {} hosts ({} answered ping)", hosts.len(), ping_count),
            Some(50),
            Some(hosts.len()),
        );

        if request.scan_ports && !hosts.is_empty() && !cancel.is_cancelled() {
            let ports = request.ports.as_deref().unwrap_or(&self.config.ports);
            self.emit(
                started,
                ScanStage::PortScan,
                &format!("Probing {} ports on {} hosts...", ports.len(), hosts.len()),
                Some(55),
                Some(hosts.len()),
            );
            self.scan_host_ports(&mut hosts, ports, &cancel).await;
        }

        self.emit(
            started,
            ScanStage::Classifying,
            "Classifying devices...",
            Some(95),
            Some(hosts.len()),
        );
        for host in hosts.iter_mut() {
            self.classifier.classify(host);
            host.confidence = score::score_host(host);
        }

        let cancelled = cancel.is_cancelled();
        abort_timer(deadline_timer);

        let elapsed = started.elapsed();
        let message = if cancelled {
            format!(
                "Scan cancelled: {} hosts found in {:.1}s",
                hosts.len(),
                elapsed.as_secs_f64()
            )
        } else {
            format!(
                "Scan complete: {} hosts found in {:.1}s",
                hosts.len(),
                elapsed.as_secs_f64()
            )
        };
        self.emit(started, ScanStage::Complete, &message, Some(100), Some(hosts.len()));

        Ok(ScanReport {
            scan_id,
            target: request.range.to_string(),
            started_at,
            elapsed_ms: elapsed.as_millis() as u64,
            cancelled,
            capabilities,
            hosts,
        })
    }

    /// Port-scan `hosts` in place, `host_concurrency` hosts at a time. Hosts
    /// not reached before cancellation keep an empty port set.
    async fn scan_host_ports(
        &self,
        hosts: &mut [DiscoveredHost],
        ports: &[u16],
        cancel: &CancellationToken,
    ) {
        let timeout = self.config.port_timeout();
        let targets: Vec<Ipv4Addr> = hosts.iter().map(|h| h.ip).collect();

        let results: Vec<Vec<Service>> = stream::iter(targets)
            .map(|ip| async move {
                ports::scan_ports(&self.connector, &self.services, ip, ports, timeout).await
            })
            .buffered(self.config.host_concurrency.max(1))
            .take_until(cancel.cancelled())
            .collect()
            .await;

        if results.len() < hosts.len() {
            tracing::info!(
                "Port scan cancelled after {}/{} hosts",
                results.len(),
                hosts.len()
            );
        }

        for (host, open) in hosts.iter_mut().zip(results) {
            for service in open {
                host.add_service(service);
            }
        }
    }

    /// Probe one explicit target, whether or not it answers.
    ///
    /// The record keeps `source: manual` and stays offline unless the host
    /// answers a ping or sits in the neighbor table.
    pub async fn scan_host(
        &self,
        ip: Ipv4Addr,
        ports: Option<&[u16]>,
        cancel: &CancellationToken,
    ) -> DiscoveredHost {
        let mut host = DiscoveredHost::manual(ip);

        let (rtt, hostname, neighbors) = tokio::join!(
            self.prober.probe(ip),
            self.resolver.resolve(ip),
            platform::read_neighbor_table(self.table.as_ref(), self.config.command_timeout()),
        );

        if let Some(rtt) = rtt {
            host.status = HostStatus::Online;
            host.response_time_ms = Some(rtt.as_millis() as u64);
        }
        host.hostname = hostname;

        let neighbor = neighbors.and_then(|output| {
            arp::parse_neighbors(self.table.as_ref(), &output)
                .into_iter()
                .find(|(addr, _)| *addr == ip)
        });
        if let Some((_, mac)) = neighbor {
            host.manufacturer = self.oui.lookup(&mac);
            host.mac = Some(mac);
            host.status = HostStatus::Online;
        }

        if !cancel.is_cancelled() {
            let ports = ports.unwrap_or(&self.config.ports);
            let timeout = self.config.port_timeout();
            let scan = ports::scan_ports(&self.connector, &self.services, ip, ports, timeout);
            let open = tokio::select! {
                open = scan => open,
                _ = cancel.cancelled() => Vec::new(),
            };
            for service in open {
                host.add_service(service);
            }
        }

        self.classifier.classify(&mut host);
        host.confidence = score::score_host(&host);
        host
    }
}

fn abort_timer(timer: Option<tokio::task::JoinHandle<()>>) {
    if let Some(handle) = timer {
        handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::{LinuxNeighborTable, RawNeighbor, TableCommand};
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    struct FakeProber {
        alive: HashMap<Ipv4Addr, u64>,
        available: bool,
        delay: Duration,
    }

    impl FakeProber {
        fn answering(alive: &[(Ipv4Addr, u64)]) -> Self {
            Self {
                alive: alive.iter().copied().collect(),
                available: true,
                delay: Duration::ZERO,
            }
        }

        fn unavailable() -> Self {
            Self {
                alive: HashMap::new(),
                available: false,
                delay: Duration::ZERO,
            }
        }

        /// Every ping takes `delay` before answering.
        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    impl Prober for FakeProber {
        async fn probe(&self, ip: Ipv4Addr) -> Option<Duration> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.alive.get(&ip).map(|ms| Duration::from_millis(*ms))
        }

        async fn is_available(&self) -> bool {
            self.available
        }
    }

    struct FakeResolver(HashMap<Ipv4Addr, &'static str>);

    impl HostnameResolver for FakeResolver {
        async fn resolve(&self, ip: Ipv4Addr) -> Option<String> {
            self.0.get(&ip).map(|s| s.to_string())
        }
    }

    struct FakeConnector(Vec<SocketAddr>);

    impl Connector for FakeConnector {
        async fn connect(&self, addr: SocketAddr) -> bool {
            self.0.contains(&addr)
        }
    }

    /// Every port is open, each connect taking the given time.
    struct SlowConnector(Duration);

    impl Connector for SlowConnector {
        async fn connect(&self, _addr: SocketAddr) -> bool {
            tokio::time::sleep(self.0).await;
            true
        }
    }

    /// A table whose command never runs.
    struct NoTable;

    impl NeighborTable for NoTable {
        fn name(&self) -> &'static str {
            "none"
        }
        fn commands(&self) -> &'static [TableCommand] {
            &[TableCommand {
                program: "lanprobe-definitely-not-a-command",
                args: &[],
            }]
        }
        fn parse_line(&self, _line: &str) -> Option<RawNeighbor> {
            None
        }
    }

    /// `echo`es a fixed `ip neigh` dump.
    #[cfg(unix)]
    struct EchoTable;

    #[cfg(unix)]
    impl NeighborTable for EchoTable {
        fn name(&self) -> &'static str {
            "echo"
        }
        fn commands(&self) -> &'static [TableCommand] {
            &[TableCommand {
                program: "echo",
                args: &["192.168.1.1 dev eth0 lladdr 00:00:0c:12:34:56 REACHABLE"],
            }]
        }
        fn parse_line(&self, line: &str) -> Option<RawNeighbor> {
            LinuxNeighborTable.parse_line(line)
        }
    }

    /// Prints a valid dump, but only after two seconds.
    #[cfg(unix)]
    struct SlowTable;

    #[cfg(unix)]
    impl NeighborTable for SlowTable {
        fn name(&self) -> &'static str {
            "slow"
        }
        fn commands(&self) -> &'static [TableCommand] {
            &[TableCommand {
                program: "sh",
                args: &[
                    "-c",
                    "sleep 2; echo 192.168.1.1 dev eth0 lladdr 00:00:0c:12:34:56 REACHABLE",
                ],
            }]
        }
        fn parse_line(&self, line: &str) -> Option<RawNeighbor> {
            LinuxNeighborTable.parse_line(line)
        }
    }

    fn cancel_after(delay: Duration) -> CancellationToken {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            trigger.cancel();
        });
        cancel
    }

    fn ip(last: u8) -> Ipv4Addr {
        Ipv4Addr::new(192, 168, 1, last)
    }

    fn request(first: u8, last: u8) -> ScanRequest {
        ScanRequest::subnet(ip(0), first, last).unwrap()
    }

    fn scanner(
        table: Box<dyn NeighborTable>,
        prober: FakeProber,
        names: &[(Ipv4Addr, &'static str)],
        open: &[(Ipv4Addr, u16)],
    ) -> Scanner<FakeProber, FakeResolver, FakeConnector> {
        let config = ScanConfig {
            port_timeout_ms: 200,
            command_timeout_secs: 2,
            ..ScanConfig::default()
        };
        Scanner::with_components(
            config,
            table,
            prober,
            FakeResolver(names.iter().copied().collect()),
            FakeConnector(
                open.iter()
                    .map(|&(ip, port)| SocketAddr::from((ip, port)))
                    .collect(),
            ),
        )
        .with_oui_table(OuiTable::builtin().with_ieee_fallback(false))
    }

    #[tokio::test]
    async fn test_no_responders_is_an_empty_report() {
        let scanner = scanner(Box::new(NoTable), FakeProber::answering(&[]), &[], &[]);
        let report = scanner
            .scan(&request(1, 20).without_arp(), CancellationToken::new())
            .await
            .unwrap();

        assert!(report.hosts.is_empty());
        assert!(!report.cancelled);
        assert_eq!(report.capabilities.mode, ScanMode::Full);
    }

    #[tokio::test]
    async fn test_ping_only_scan_classifies_and_scores() {
        let scanner = scanner(
            Box::new(NoTable),
            FakeProber::answering(&[(ip(12), 3), (ip(4), 1)]),
            &[(ip(12), "print-server-01.lan")],
            &[(ip(12), 9100), (ip(4), 22)],
        );
        let report = scanner
            .scan(&request(1, 20).without_arp(), CancellationToken::new())
            .await
            .unwrap();

        let ips: Vec<Ipv4Addr> = report.hosts.iter().map(|h| h.ip).collect();
        assert_eq!(ips, vec![ip(4), ip(12)]);

        let linux = &report.hosts[0];
        assert_eq!(linux.source, HostSource::Ping);
        assert_eq!(linux.os.as_deref(), Some("Linux"));
        assert_eq!(linux.services[0].name, "SSH");
        assert_eq!(linux.confidence, 40);

        let printer = &report.hosts[1];
        assert_eq!(printer.device_type, DeviceType::Printer);
        assert_eq!(printer.response_time_ms, Some(3));
        assert_eq!(printer.open_ports.iter().copied().collect::<Vec<_>>(), vec![9100]);
        assert_eq!(printer.confidence, 55);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_arp_and_ping_merge_into_one_record() {
        let scanner = scanner(
            Box::new(EchoTable),
            FakeProber::answering(&[(ip(1), 2)]),
            &[(ip(1), "gateway.lan")],
            &[(ip(1), 443)],
        );
        let report = scanner
            .scan(&request(1, 10), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.hosts.len(), 1);
        let gateway = &report.hosts[0];
        assert_eq!(gateway.mac.as_deref(), Some("00:00:0C:12:34:56"));
        assert_eq!(gateway.manufacturer.as_deref(), Some("Cisco Systems, Inc"));
        assert_eq!(gateway.response_time_ms, Some(2));
        assert_eq!(gateway.source, HostSource::Arp);
        assert_eq!(gateway.device_type, DeviceType::Network);
        assert_eq!(gateway.confidence, 90);
        assert!(report.capabilities.can_read_arp);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_arp_entries_outside_range_are_dropped() {
        let scanner = scanner(Box::new(EchoTable), FakeProber::answering(&[]), &[], &[]);
        let report = scanner
            .scan(&request(50, 60).without_port_scan(), CancellationToken::new())
            .await
            .unwrap();
        assert!(report.hosts.is_empty());
    }

    #[tokio::test]
    async fn test_nothing_usable_is_an_error() {
        let scanner = scanner(Box::new(NoTable), FakeProber::unavailable(), &[], &[]);
        let result = scanner.scan(&request(1, 5), CancellationToken::new()).await;
        assert!(matches!(result, Err(ScanError::NoProbingAvailable)));

        let both_off = request(1, 5).without_arp().without_ping();
        let result = scanner.scan(&both_off, CancellationToken::new()).await;
        assert!(matches!(result, Err(ScanError::NoProbingAvailable)));
    }

    #[tokio::test]
    async fn test_limited_mode_when_table_unreadable() {
        let scanner = scanner(Box::new(NoTable), FakeProber::answering(&[(ip(2), 1)]), &[], &[]);
        let report = scanner
            .scan(&request(1, 5), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.capabilities.mode, ScanMode::Limited);
        assert!(!report.capabilities.can_read_arp);
        assert_eq!(report.hosts.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_scan_reports_partial_results() {
        let scanner = scanner(Box::new(NoTable), FakeProber::answering(&[(ip(2), 1)]), &[], &[]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = scanner.scan(&request(1, 254), cancel).await.unwrap();
        assert!(report.cancelled);
        assert!(report.hosts.is_empty());
    }

    #[tokio::test]
    async fn test_deadline_stops_sweep_and_keeps_early_responders() {
        let prober = FakeProber::answering(&[(ip(1), 1), (ip(3), 1), (ip(250), 1)])
            .with_delay(Duration::from_millis(200));
        let scanner = scanner(Box::new(NoTable), prober, &[], &[]);
        let request = request(1, 254)
            .without_arp()
            .with_deadline(Duration::from_millis(500));

        let started = Instant::now();
        let report = scanner.scan(&request, CancellationToken::new()).await.unwrap();

        assert!(report.cancelled);
        assert!(started.elapsed() < Duration::from_secs(2));
        // Batches of 20 take 200ms each: the first two finish, .250 is never
        // reached.
        let ips: Vec<Ipv4Addr> = report.hosts.iter().map(|h| h.ip).collect();
        assert_eq!(ips, vec![ip(1), ip(3)]);
        assert!(report.hosts.iter().all(|h| h.confidence == 40));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_arp_read_cut_short_is_not_reported_unreadable() {
        let scanner = scanner(Box::new(SlowTable), FakeProber::answering(&[]), &[], &[]);
        let cancel = cancel_after(Duration::from_millis(100));

        let report = scanner
            .scan(&request(1, 10).without_ping(), cancel)
            .await
            .unwrap();

        assert!(report.cancelled);
        assert!(report.hosts.is_empty());
        assert_eq!(report.capabilities.mode, ScanMode::Full);
        assert!(report.capabilities.warning.is_none());
    }

    #[tokio::test]
    async fn test_port_stage_cancel_leaves_later_hosts_unscanned() {
        let config = ScanConfig {
            host_concurrency: 1,
            port_timeout_ms: 1000,
            ..ScanConfig::default()
        };
        let scanner = Scanner::with_components(
            config,
            Box::new(NoTable),
            FakeProber::answering(&[]),
            FakeResolver(HashMap::new()),
            SlowConnector(Duration::from_millis(200)),
        );
        let mut hosts: Vec<DiscoveredHost> =
            (1..=4).map(|n| DiscoveredHost::from_ping(ip(n), 1)).collect();

        // One host at a time, 200ms each: only the first finishes by 300ms.
        let cancel = cancel_after(Duration::from_millis(300));
        scanner.scan_host_ports(&mut hosts, &[22, 80], &cancel).await;

        assert_eq!(hosts[0].open_ports.iter().copied().collect::<Vec<_>>(), vec![22, 80]);
        assert!(hosts[2].open_ports.is_empty());
        assert!(hosts[3].open_ports.is_empty());
        assert!(hosts[3].services.is_empty());
    }

    #[tokio::test]
    async fn test_progress_reaches_complete() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&stages);
        let scanner = scanner(Box::new(NoTable), FakeProber::answering(&[(ip(3), 1)]), &[], &[])
            .with_progress(Box::new(move |p| sink.lock().unwrap().push(p.stage)));

        scanner
            .scan(&request(1, 5).without_arp(), CancellationToken::new())
            .await
            .unwrap();

        let stages = stages.lock().unwrap();
        assert_eq!(stages.first(), Some(&ScanStage::Starting));
        assert_eq!(stages.last(), Some(&ScanStage::Complete));
        assert!(stages.contains(&ScanStage::PortScan));
    }

    #[tokio::test]
    async fn test_scan_host_without_answer_stays_offline() {
        let scanner = scanner(Box::new(NoTable), FakeProber::answering(&[]), &[], &[(ip(9), 80)]);
        let host = scanner.scan_host(ip(9), None, &CancellationToken::new()).await;

        assert_eq!(host.source, HostSource::Manual);
        assert_eq!(host.status, HostStatus::Offline);
        // An open port alone does not make the host online.
        assert_eq!(host.open_ports.iter().copied().collect::<Vec<_>>(), vec![80]);
        assert_eq!(host.confidence, 40);
    }

    #[tokio::test]
    async fn test_scan_host_with_explicit_ports() {
        let scanner = scanner(
            Box::new(NoTable),
            FakeProber::answering(&[(ip(8), 5)]),
            &[(ip(8), "srv-files")],
            &[(ip(8), 3389), (ip(8), 445), (ip(8), 22)],
        );
        let host = scanner
            .scan_host(ip(8), Some(&[445, 3389]), &CancellationToken::new())
            .await;

        assert_eq!(host.status, HostStatus::Online);
        assert_eq!(host.open_ports.iter().copied().collect::<Vec<_>>(), vec![445, 3389]);
        assert_eq!(host.os.as_deref(), Some("Windows"));
        assert_eq!(host.device_type, DeviceType::Server);
    }
}
