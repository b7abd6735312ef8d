//! Settings schema.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable overriding the home directory.
pub const HOME_ENV: &str = "CADENCE_HOME";

/// Root settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub notify: NotifyConfig,

    #[serde(default)]
    pub log: LogConfig,
}

/// Scheduling and execution behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Do not mirror job output to the scheduler's stdout.
    #[serde(default)]
    pub suppress_logs: bool,

    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,

    /// Size of each job's recent-run window.
    #[serde(default = "default_recent_runs")]
    pub recent_runs: usize,

    /// Start a cron run even while the previous one is still going.
    #[serde(default = "default_true")]
    pub allow_overlap: bool,

    /// How long to wait for in-flight jobs on stop; 0 does not wait.
    #[serde(default)]
    pub shutdown_grace_secs: u64,
}

impl EngineConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            suppress_logs: false,
            retry_backoff_secs: default_retry_backoff_secs(),
            recent_runs: default_recent_runs(),
            allow_overlap: true,
            shutdown_grace_secs: 0,
        }
    }
}

fn default_retry_backoff_secs() -> u64 {
    5
}

fn default_recent_runs() -> usize {
    cadence_core::DEFAULT_RECENT_RUNS
}

fn default_true() -> bool {
    true
}

/// Where run logs live.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Home directory; `~` is expanded. Defaults to `~/.cadence`.
    #[serde(default)]
    pub home_dir: Option<String>,
}

impl StorageConfig {
    /// `CADENCE_HOME` if set, else the configured directory, else `~/.cadence`.
    pub fn resolve_home(&self) -> PathBuf {
        if let Ok(home) = std::env::var(HOME_ENV) {
            if !home.is_empty() {
                return PathBuf::from(shellexpand::tilde(&home).as_ref());
            }
        }
        match &self.home_dir {
            Some(dir) if !dir.is_empty() => PathBuf::from(shellexpand::tilde(dir).as_ref()),
            _ => default_home(),
        }
    }
}

/// `~/.cadence`, or `.cadence` when no home directory is known.
pub fn default_home() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".cadence"))
        .unwrap_or_else(|| PathBuf::from(".cadence"))
}

/// Inspection API server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8081
}

/// Webhook delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl NotifyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// Logging output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "default_level")]
    pub level: String,

    /// JSON lines on the console instead of text.
    #[serde(default)]
    pub json: bool,

    /// Also write daily-rotated files under `<home>/logs`.
    #[serde(default = "default_true")]
    pub file: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            file: true,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
