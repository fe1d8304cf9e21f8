//! TCP connect port scanning.

use super::host::Service;
use std::collections::HashMap;
use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;

/// Well-known port labels.
const BUILTIN_SERVICES: &[(u16, &str)] = &[
    (21, "FTP"),
    (22, "SSH"),
    (23, "Telnet"),
    (25, "SMTP"),
    (53, "DNS"),
    (80, "HTTP"),
    (110, "POP3"),
    (135, "MSRPC"),
    (139, "NetBIOS"),
    (143, "IMAP"),
    (161, "SNMP"),
    (389, "LDAP"),
    (443, "HTTPS"),
    (445, "SMB"),
    (548, "AFP"),
    (631, "IPP"),
    (993, "IMAPS"),
    (1433, "MSSQL"),
    (3306, "MySQL"),
    (3389, "RDP"),
    (5000, "Synology DSM"),
    (5432, "PostgreSQL"),
    (5900, "VNC"),
    (8080, "HTTP-Proxy"),
    (8443, "HTTPS-Alt"),
    (9100, "JetDirect"),
];

/// Port → service name table.
#[derive(Debug, Clone)]
pub struct ServiceTable {
    names: HashMap<u16, String>,
}

impl Default for ServiceTable {
    fn default() -> Self {
        Self {
            names: BUILTIN_SERVICES
                .iter()
                .map(|(port, name)| (*port, name.to_string()))
                .collect(),
        }
    }
}

impl ServiceTable {
    pub fn with_service(mut self, port: u16, name: &str) -> Self {
        self.names.insert(port, name.to_string());
        self
    }

    /// The service label, `"Port <n>"` when unknown.
    pub fn name(&self, port: u16) -> String {
        self.names
            .get(&port)
            .cloned()
            .unwrap_or_else(|| format!("Port {port}"))
    }
}

/// Single TCP connect attempt.
pub trait Connector: Send + Sync {
    /// `true` when the handshake completed.
    fn connect(&self, addr: SocketAddr) -> impl Future<Output = bool> + Send;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    async fn connect(&self, addr: SocketAddr) -> bool {
        match TcpStream::connect(addr).await {
            Ok(_stream) => true,
            Err(e) => {
                tracing::trace!("{} closed: {}", addr, e);
                false
            }
        }
    }
}

/// Probe every port of one host at once, each under its own timeout.
///
/// Ports that refuse, error or exceed `per_port_timeout` are left out. The
/// result is ordered by port.
pub async fn scan_ports<C: Connector>(
    connector: &C,
    services: &ServiceTable,
    ip: Ipv4Addr,
    ports: &[u16],
    per_port_timeout: Duration,
) -> Vec<Service> {
    let attempts = ports.iter().map(|&port| async move {
        let addr = SocketAddr::from((ip, port));
        match tokio::time::timeout(per_port_timeout, connector.connect(addr)).await {
            Ok(true) => Some(Service {
                port,
                name: services.name(port),
            }),
            _ => None,
        }
    });

    let mut open: Vec<Service> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .flatten()
        .collect();
    open.sort_by_key(|s| s.port);
    open.dedup_by_key(|s| s.port);

    if !open.is_empty() {
        tracing::debug!(
            "{}: open ports {:?}",
            ip,
            open.iter().map(|s| s.port).collect::<Vec<_>>()
        );
    }
    open
}
