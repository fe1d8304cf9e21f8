//! lanprobe CLI - inventory the devices on a local IPv4 network
//!
//! This binary can:
//! - Sweep a subnet and list every responsive host
//! - Probe the ports of a single host
//! - Dump the OS neighbor table with vendors attached
//! - Show the resolved scan configuration

mod args;
mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lanprobe_core::scanner::{self, ArpCollection};
use lanprobe_core::{DiscoveredHost, ScanProgress, ScanReport, Scanner};
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "lanprobe")]
#[command(author = "lanprobe contributors")]
#[command(version)]
#[command(about = "Discover and classify the devices on a local IPv4 network")]
#[command(long_about = "
lanprobe reads the neighbor (ARP) table, sweeps a range with ping, probes
common TCP ports and classifies every responsive host.

Quick start:
  1. Scan your network:   lanprobe scan
  2. Scan part of it:     lanprobe scan 192.168.1.0 --range 1-50
  3. Probe one host:      lanprobe ports 192.168.1.10 --ports 22,80,8000-8010

Press Ctrl-C during a scan to stop it and print what was found so far.
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover hosts on a network
    Scan {
        /// Address or CIDR network to scan (default: the local network)
        target: Option<String>,

        /// Host numbers within the /24, e.g. 1-50
        #[arg(short, long)]
        range: Option<String>,

        /// Ports to probe, e.g. 22,80,8000-8010
        #[arg(short, long)]
        ports: Option<String>,

        /// Do not read the neighbor table
        #[arg(long)]
        no_arp: bool,

        /// Do not ping sweep
        #[arg(long)]
        no_ping: bool,

        /// Skip the port scan
        #[arg(long)]
        no_ports: bool,

        /// Stop the scan after this many seconds
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Probe the ports of a single host
    Ports {
        ip: Ipv4Addr,

        /// Ports to probe, e.g. 22,80,8000-8010
        #[arg(short, long)]
        ports: Option<String>,
    },

    /// Show the neighbor table with vendors and hostnames
    Arp,

    /// Show configuration paths and settings
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("lanprobe={},lanprobe_core={}", log_level, log_level).into()
            }),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Scan {
            target,
            range,
            ports,
            no_arp,
            no_ping,
            no_ports,
            timeout,
        } => {
            let options = ScanOptions {
                target: target.as_deref(),
                range: range.as_deref(),
                ports: ports.as_deref(),
                no_arp: *no_arp,
                no_ping: *no_ping,
                no_ports: *no_ports,
                timeout: *timeout,
            };
            cmd_scan(&cli, options).await
        }
        Commands::Ports { ip, ports } => cmd_ports(&cli, *ip, ports.as_deref()).await,
        Commands::Arp => cmd_arp(&cli).await,
        Commands::Config => cmd_config(&cli),
    }
}

struct ScanOptions<'a> {
    target: Option<&'a str>,
    range: Option<&'a str>,
    ports: Option<&'a str>,
    no_arp: bool,
    no_ping: bool,
    no_ports: bool,
    timeout: Option<u64>,
}

/// Token cancelled on the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let handle = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nStopping scan...");
            handle.cancel();
        }
    });
    token
}

async fn cmd_scan(cli: &Cli, options: ScanOptions<'_>) -> Result<()> {
    let loaded = config::load_scan_config()?;
    let mut scan_config = loaded.scan;

    if let Some(ports) = options.ports {
        scan_config.ports = args::parse_port_list(ports)?;
    }

    let target = match options.target {
        Some(input) => args::parse_target(input)?,
        None => {
            let info = scanner::detect_local_network()
                .await
                .context("no target given and the local network could not be detected")?;
            tracing::info!(
                "Network: {} on {} (gateway: {:?})",
                info.network,
                info.interface,
                info.gateway_ip
            );
            args::local_target(&info)
        }
    };
    let range = options.range.map(args::parse_host_range).transpose()?;

    let mut request = args::build_request(target, range, &scan_config)?;
    if options.no_arp {
        request = request.without_arp();
    }
    if options.no_ping {
        request = request.without_ping();
    }
    if options.no_ports {
        request = request.without_port_scan();
    }
    if let Some(secs) = options.timeout {
        request = request.with_deadline(Duration::from_secs(secs));
    }

    let mut scanner = Scanner::new(scan_config);
    if let OutputFormat::Text = cli.format {
        println!("Scanning {}...", request.range);
        scanner = scanner.with_progress(Box::new(|progress: ScanProgress| {
            if let Some(pct) = progress.percent {
                println!("  [{:>3}%] {}", pct, progress.message);
            } else {
                println!("  {}", progress.message);
            }
        }));
    }

    let report = scanner.scan(&request, cancel_on_ctrl_c()).await?;
    print_report(cli, &report)
}

fn print_report(cli: &Cli, report: &ScanReport) -> Result<()> {
    match cli.format {
        OutputFormat::Text => {
            if let Some(ref warning) = report.capabilities.warning {
                println!();
                println!("Warning: {}", warning);
            }
            println!();
            println!(
                "Scan {} started {} ({:.1}s)",
                report.scan_id,
                report
                    .started_at
                    .with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M:%S"),
                report.elapsed_ms as f64 / 1000.0
            );
            if report.cancelled {
                println!("Scan stopped early. Found {} hosts:", report.hosts.len());
            } else {
                println!("Found {} hosts:", report.hosts.len());
            }
            println!();
            for host in &report.hosts {
                print_host_line(host);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
    }
    Ok(())
}

fn print_host_line(host: &DiscoveredHost) {
    let hostname = host.hostname.as_deref().unwrap_or("-");
    let mac = host.mac.as_deref().unwrap_or("-");
    let time_str = host
        .response_time_ms
        .map(|t| format!("{}ms", t))
        .unwrap_or_else(|| "-".to_string());

    println!(
        "  {:15} {:17} {:>6}  {:19} {:>3}%  {}",
        host.ip.to_string(),
        mac,
        time_str,
        host.device_type.to_string(),
        host.confidence,
        hostname
    );

    let mut details = Vec::new();
    if let Some(ref vendor) = host.manufacturer {
        details.push(vendor.clone());
    }
    if let Some(ref os) = host.os {
        details.push(format!("OS: {}", os));
    }
    if !host.services.is_empty() {
        let services: Vec<String> = host
            .services
            .iter()
            .map(|s| format!("{}/{}", s.port, s.name))
            .collect();
        details.push(services.join(", "));
    }
    if !details.is_empty() {
        println!("  {:15} {}", "", details.join(" | "));
    }
}

async fn cmd_ports(cli: &Cli, ip: Ipv4Addr, ports: Option<&str>) -> Result<()> {
    let loaded = config::load_scan_config()?;
    let ports = ports.map(args::parse_port_list).transpose()?;
    let scanner = Scanner::new(loaded.scan);

    if let OutputFormat::Text = cli.format {
        println!("Probing {}...", ip);
    }

    let host = scanner
        .scan_host(ip, ports.as_deref(), &cancel_on_ctrl_c())
        .await;

    match cli.format {
        OutputFormat::Text => {
            println!();
            println!("Host:         {}", host.ip);
            println!("Status:       {}", if host.is_online() { "online" } else { "no reply" });
            println!("Hostname:     {}", host.hostname.as_deref().unwrap_or("-"));
            println!("MAC:          {}", host.mac.as_deref().unwrap_or("-"));
            println!("Manufacturer: {}", host.manufacturer.as_deref().unwrap_or("-"));
            println!("Type:         {}", host.device_type);
            println!("OS:           {}", host.os.as_deref().unwrap_or("-"));
            println!("Confidence:   {}%", host.confidence);
            println!();
            if host.services.is_empty() {
                println!("No open ports.");
            } else {
                println!("Open ports:");
                for service in &host.services {
                    println!("  {:>5}  {}", service.port, service.name);
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&host)?);
        }
    }

    Ok(())
}

async fn cmd_arp(cli: &Cli) -> Result<()> {
    let loaded = config::load_scan_config()?;
    let scanner = Scanner::new(loaded.scan);
    let ArpCollection { hosts, available } = scanner.read_arp_table().await;

    match cli.format {
        OutputFormat::Text => {
            if !available {
                println!("Neighbor table could not be read on this system.");
                return Ok(());
            }
            println!("{} neighbor entries:", hosts.len());
            println!();
            for host in &hosts {
                print_host_line(host);
            }
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "available": available,
                    "hosts": hosts,
                }))?
            );
        }
    }

    Ok(())
}

fn cmd_config(cli: &Cli) -> Result<()> {
    let loaded = config::load_scan_config()?;
    let config_path = loaded
        .path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(config::get_config_file_path_string);

    match cli.format {
        OutputFormat::Text => {
            let scan = &loaded.scan;
            println!("Configuration");
            println!("=============");
            println!();
            println!("Config file:      {} (from {})", config_path, loaded.source);
            println!("Batch size:       {}", scan.batch_size);
            println!("Ping timeout:     {}ms", scan.ping_timeout_ms);
            println!("Port timeout:     {}ms", scan.port_timeout_ms);
            println!("DNS timeout:      {}ms", scan.dns_timeout_ms);
            println!("Host range:       {}-{}", scan.first_host, scan.last_host);
            println!(
                "Ports:            {}",
                scan.ports
                    .iter()
                    .map(u16::to_string)
                    .collect::<Vec<_>>()
                    .join(",")
            );
            println!("IEEE vendor data: {}", scan.ieee_vendor_fallback);
            println!();
            println!("Environment variables:");
            println!("  LANPROBE_CONFIG - Path to an alternative config file");
            println!("  RUST_LOG        - Log filter (e.g. lanprobe_core=debug)");
            println!();
            println!("Example config.toml:");
            println!();
            println!("{}", config::generate_example_config());
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "config_file": config_path,
                    "source": loaded.source.to_string(),
                    "scan": loaded.scan,
                })
            );
        }
    }

    Ok(())
}
