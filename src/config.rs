/*!
 * Configuration types for nodectl
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{NodectlError, Result};

/// Environment variable overriding the config search path
pub const CONFIG_ENV: &str = "NODECTL_CONFIG";

/// Fleet configuration: nodes, clusters and transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Node definitions keyed by node name
    #[serde(default)]
    pub nodes: BTreeMap<String, NodeConfig>,

    /// Cluster definitions keyed by cluster name
    #[serde(default)]
    pub clusters: BTreeMap<String, ClusterConfig>,

    /// TLS verification: `true`, `false` or a CA bundle path
    #[serde(default)]
    pub verify_ssl: TlsVerify,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Number of concurrent workers for fan-out calls
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stderr)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

/// Connection details for one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Host name or address, optionally with port
    pub host: String,

    /// URL scheme (`https` or `http`)
    #[serde(default = "default_scheme")]
    pub scheme: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

/// A cluster is either a bare member list or a table with a `nodes` key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClusterConfig {
    Members(Vec<String>),
    Table { nodes: Vec<String> },
}

impl ClusterConfig {
    /// Member node names in declaration order
    pub fn members(&self) -> &[String] {
        match self {
            ClusterConfig::Members(nodes) => nodes,
            ClusterConfig::Table { nodes } => nodes,
        }
    }
}

/// TLS certificate verification setting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TlsVerify {
    /// Verify against system roots (`true`) or not at all (`false`)
    Enabled(bool),
    /// Verify against a custom PEM CA bundle
    CaBundle(PathBuf),
}

impl Default for TlsVerify {
    fn default() -> Self {
        TlsVerify::Enabled(true)
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    #[default]
    Warn,

    /// Info, warnings, and errors
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

// Default value functions for serde
fn default_timeout_secs() -> u64 {
    10
}

fn default_workers() -> usize {
    nodectl_core_dispatch::DEFAULT_CAPACITY
}

fn default_scheme() -> String {
    "https".to_string()
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            nodes: BTreeMap::new(),
            clusters: BTreeMap::new(),
            verify_ssl: TlsVerify::default(),
            timeout_secs: default_timeout_secs(),
            workers: default_workers(),
            log_level: LogLevel::default(),
            log_file: None,
        }
    }
}

impl FleetConfig {
    /// Load configuration from a file. `.toml` files are parsed as TOML,
    /// anything else as JSON.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            NodectlError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        if is_toml {
            Self::from_toml_str(&contents)
        } else {
            Self::from_json_str(&contents)
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        serde_json::from_str(contents)
            .map_err(|e| NodectlError::Config(format!("Syntax error: {}", e)))
    }

    /// Load from an explicit path, or the first file found in the default
    /// search locations
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let candidates = search_paths();
        match candidates.iter().find(|p| p.is_file()) {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                Self::from_file(path)
            }
            None => Err(NodectlError::ConfigNotFound(candidates)),
        }
    }

    /// Per-call timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Default configuration locations, in priority order
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        paths.push(PathBuf::from(path));
    }
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("nodectl").join("nodectl.toml"));
        paths.push(dir.join("nodectl.json"));
    }
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".nodectl.toml"));
        paths.push(home.join(".nodectl.json"));
    }
    paths.push(PathBuf::from("/etc/nodectl.toml"));

    paths
}
