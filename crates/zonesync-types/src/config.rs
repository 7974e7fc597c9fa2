//! Daemon configuration, loaded from a JSON file.
//!
//! A node may run the master API, the sync agent, or both; each role is
//! enabled by the presence of its section.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Master role: authoritative record store behind the HTTP API.
    #[serde(default)]
    pub master: Option<MasterConfig>,

    /// Agent role: pulls records from a master and maintains unbound
    /// local-data files.
    #[serde(default)]
    pub agent: Option<AgentConfig>,

    #[serde(default)]
    pub log: LogConfig,
}

/// Master role configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterConfig {
    /// Bind address for the API listener.
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Path of the SQLite database file, created if absent.
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// TTL applied to writes that do not specify one.
    #[serde(default = "default_ttl")]
    pub default_ttl: i64,
}

/// Agent role configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Base URL of the master API, e.g. "http://10.0.0.1:8000".
    pub master_location: String,

    /// Directory holding the generated `<zone>.conf` files. Must be included
    /// from the unbound configuration.
    pub local_data_dir: PathBuf,

    /// Pid file of the local unbound process to SIGHUP after changes.
    pub unbound_pidfile: PathBuf,

    /// Seconds between sync cycles.
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,
}

impl AgentConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval.max(1))
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level filter (e.g. "info", "zonesync_core=debug,warn").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Optional log file; daily rotation. Logs go to stderr when unset.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: default_log_level(), file: None }
    }
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_database() -> PathBuf {
    PathBuf::from("zonesync.sqlite")
}

fn default_ttl() -> i64 {
    3600
}

fn default_update_interval() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}
