use anyhow::{Context, Result};
use lanprobe_core::ScanConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
const ENV_CONFIG_PATH: &str = "LANPROBE_CONFIG";

/// Configuration file structure
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    scan: Option<ScanConfig>,
}

/// Scan configuration plus where it was loaded from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub scan: ScanConfig,
    pub source: ConfigSource,
    pub path: Option<PathBuf>,
}

/// Where the configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Using default hardcoded values
    Default,
    /// File named by the environment variable
    Environment,
    /// Loaded from the per-user config file
    ConfigFile,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::ConfigFile => write!(f, "config file"),
        }
    }
}

/// Get the path to the per-user configuration file
fn get_config_file_path() -> Option<PathBuf> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .map(|p| p.join("lanprobe").join("config.toml"))
}

/// Parse config file text. A file without a `[scan]` table yields defaults.
fn parse_config(content: &str) -> Result<ScanConfig> {
    let file: ConfigFile = toml::from_str(content).context("invalid config file")?;
    Ok(file.scan.unwrap_or_default())
}

fn read_config(path: &Path) -> Result<ScanConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse_config(&content).with_context(|| format!("in {}", path.display()))
}

/// Load scan configuration with priority:
/// 1. File named by `LANPROBE_CONFIG`
/// 2. Config file (~/.config/lanprobe/config.toml)
/// 3. Default values
///
/// An explicitly named file that cannot be read is an error; a broken
/// per-user file is logged and skipped.
pub fn load_scan_config() -> Result<LoadedConfig> {
    // Priority 1: Environment variable
    if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
        let path = path.trim();
        if !path.is_empty() {
            let path = PathBuf::from(path);
            let scan = read_config(&path)?;
            tracing::info!("Using config from environment variable: {}", path.display());
            return Ok(LoadedConfig {
                scan,
                source: ConfigSource::Environment,
                path: Some(path),
            });
        }
    }

    // Priority 2: Config file
    if let Some(path) = get_config_file_path().filter(|p| p.exists()) {
        match read_config(&path) {
            Ok(scan) => {
                tracing::debug!("Loaded config from {:?}", path);
                return Ok(LoadedConfig {
                    scan,
                    source: ConfigSource::ConfigFile,
                    path: Some(path),
                });
            }
            Err(e) => tracing::warn!("Ignoring config file: {:#}", e),
        }
    }

    // Priority 3: Default values
    Ok(LoadedConfig {
        scan: ScanConfig::default(),
        source: ConfigSource::Default,
        path: None,
    })
}

/// Get the path to the config file for documentation purposes
pub fn get_config_file_path_string() -> String {
    get_config_file_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "~/.config/lanprobe/config.toml".to_string())
}

/// Generate example config file content
pub fn generate_example_config() -> String {
    r#"# lanprobe configuration
# Place this file at: ~/.config/lanprobe/config.toml
# (or point LANPROBE_CONFIG at any other path)

[scan]
# Pings in flight at once during a sweep
# batch_size = 20

# Timeouts
# ping_timeout_ms = 1000
# port_timeout_ms = 800
# dns_timeout_ms = 2000
# command_timeout_secs = 10

# Concurrent reverse-DNS lookups and port-scanned hosts
# dns_concurrency = 32
# host_concurrency = 8

# Ports probed on every discovered host
# ports = [22, 80, 443, 3389, 445, 9100, 631, 8080]

# Host numbers swept when a bare address is given as target
# first_host = 1
# last_host = 254

# Look up unknown MAC prefixes in the IEEE registry
# ieee_vendor_fallback = true
"#
    .to_string()
}
