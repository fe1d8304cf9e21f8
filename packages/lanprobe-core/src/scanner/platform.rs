//! Platform neighbor-table commands and their output dialects.
//!
//! Each platform is one [`NeighborTable`] strategy: which commands dump the
//! table and how one line of their output reads. The strategy is chosen once
//! with [`neighbor_table_for_current_os`]; parsing code never branches on the
//! OS itself.

use std::net::Ipv4Addr;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// A neighbor-table dump command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableCommand {
    pub program: &'static str,
    pub args: &'static [&'static str],
}

/// One raw `(ip, mac)` pair as printed by the OS, before normalization and
/// filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNeighbor {
    pub ip: Ipv4Addr,
    pub mac: String,
}

pub trait NeighborTable: Send + Sync {
    fn name(&self) -> &'static str;

    /// Commands to try in order; the first that runs successfully wins.
    fn commands(&self) -> &'static [TableCommand];

    /// Parse one line of output, `None` for headers and anything unrecognized.
    fn parse_line(&self, line: &str) -> Option<RawNeighbor>;
}

/// macOS `arp -a -n`: `? (192.168.1.1) at aa:bb:cc:dd:ee:ff on en0 ifscope [ethernet]`
#[derive(Debug, Default, Clone, Copy)]
pub struct MacOsNeighborTable;

impl NeighborTable for MacOsNeighborTable {
    fn name(&self) -> &'static str {
        "macos"
    }

    fn commands(&self) -> &'static [TableCommand] {
        &[TableCommand {
            program: "arp",
            args: &["-a", "-n"],
        }]
    }

    fn parse_line(&self, line: &str) -> Option<RawNeighbor> {
        let line = line.trim();
        let ip_start = line.find('(')?;
        let ip_end = line[ip_start..].find(')')? + ip_start;
        let ip = line[ip_start + 1..ip_end].parse().ok()?;

        let at_pos = line.find(" at ")?;
        let mac = line[at_pos + 4..].split_whitespace().next()?;

        Some(RawNeighbor {
            ip,
            mac: mac.to_string(),
        })
    }
}

/// Linux `ip neigh show`: `192.168.1.1 dev eth0 lladdr aa:bb:cc:dd:ee:ff REACHABLE`,
/// falling back to the `arp -n` columns: `192.168.1.1  ether  aa:bb:cc:dd:ee:ff  C  eth0`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxNeighborTable;

impl NeighborTable for LinuxNeighborTable {
    fn name(&self) -> &'static str {
        "linux"
    }

    fn commands(&self) -> &'static [TableCommand] {
        &[
            TableCommand {
                program: "ip",
                args: &["neigh", "show"],
            },
            TableCommand {
                program: "arp",
                args: &["-n"],
            },
        ]
    }

    fn parse_line(&self, line: &str) -> Option<RawNeighbor> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let ip: Ipv4Addr = parts.first()?.parse().ok()?;

        // ip neigh: the MAC follows "lladdr"; entries without one are
        // INCOMPLETE/FAILED and reported as such.
        if parts.get(1) == Some(&"dev") {
            let mac = match parts.iter().position(|p| *p == "lladdr") {
                Some(idx) => parts.get(idx + 1)?.to_string(),
                None => parts.last()?.to_string(),
            };
            return Some(RawNeighbor { ip, mac });
        }

        // arp -n: Address HWtype HWaddress Flags Iface
        let mac = match parts.get(1) {
            Some(&"(incomplete)") => "(incomplete)",
            _ => *parts.get(2)?,
        };
        Some(RawNeighbor {
            ip,
            mac: mac.to_string(),
        })
    }
}

/// Windows `arp -a`: `  192.168.1.1           aa-bb-cc-dd-ee-ff     dynamic`
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsNeighborTable;

impl NeighborTable for WindowsNeighborTable {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn commands(&self) -> &'static [TableCommand] {
        &[TableCommand {
            program: "arp",
            args: &["-a"],
        }]
    }

    fn parse_line(&self, line: &str) -> Option<RawNeighbor> {
        let line = line.trim();
        if line.is_empty() || line.starts_with("Interface") || line.contains("Internet Address") {
            return None;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let ip = parts.first()?.parse().ok()?;
        let mac = parts.get(1)?;

        Some(RawNeighbor {
            ip,
            mac: mac.replace('-', ":"),
        })
    }
}

/// The strategy matching the OS this binary was built for.
pub fn neighbor_table_for_current_os() -> Box<dyn NeighborTable> {
    if cfg!(target_os = "windows") {
        Box::new(WindowsNeighborTable)
    } else if cfg!(target_os = "macos") {
        Box::new(MacOsNeighborTable)
    } else {
        Box::new(LinuxNeighborTable)
    }
}

#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Create a Command that hides the console window on Windows.
pub(crate) fn hidden_command(program: &str) -> Command {
    #[allow(unused_mut)]
    let mut cmd = Command::new(program);
    #[cfg(target_os = "windows")]
    {
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    cmd.stdin(Stdio::null()).kill_on_drop(true);
    cmd
}

/// Run the table commands in order and return the first successful stdout.
///
/// Returns `None` when no command could be run (missing binary, non-zero
/// exit, timeout). Never an error: an unreadable table just means no passive
/// evidence for this scan.
pub async fn read_neighbor_table(table: &dyn NeighborTable, limit: Duration) -> Option<String> {
    for command in table.commands() {
        let mut cmd = hidden_command(command.program);
        cmd.args(command.args);

        match tokio::time::timeout(limit, cmd.output()).await {
            Ok(Ok(output)) if output.status.success() => {
                tracing::debug!(
                    "Neighbor table read with `{} {}` ({} bytes)",
                    command.program,
                    command.args.join(" "),
                    output.stdout.len()
                );
                return Some(String::from_utf8_lossy(&output.stdout).into_owned());
            }
            Ok(Ok(output)) => {
                tracing::warn!(
                    "`{} {}` exited with {}",
                    command.program,
                    command.args.join(" "),
                    output.status
                );
            }
            Ok(Err(e)) => {
                tracing::warn!("Failed to run `{}`: {}", command.program, e);
            }
            Err(_) => {
                tracing::warn!(
                    "`{} {}` timed out after {:?}",
                    command.program,
                    command.args.join(" "),
                    limit
                );
            }
        }
    }

    tracing::warn!("Neighbor table unavailable on {}", table.name());
    None
}
