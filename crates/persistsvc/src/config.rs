use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Top-level config (`persistsvc.toml` + `PERSISTSVC_*` env overrides),
/// mirrors `skynet_core::config::SkynetConfig`'s figment layering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistConfig {
    /// Size of the worker pool (`persister-threads`).
    #[serde(default = "default_persister_threads")]
    pub persister_threads: usize,
    /// Monitor poll period in seconds (`persister-poll-seconds`).
    #[serde(default = "default_poll_seconds")]
    pub persister_poll_seconds: u64,
    /// Deployment environment label, logged but not otherwise interpreted.
    #[serde(default = "default_service_env")]
    pub service_env: String,
    /// SQLite DSN for the relational store.
    #[serde(default = "default_database_connection")]
    pub database_connection: String,
    /// Service registry hosts. Scaffolding: recognized but unused.
    #[serde(default)]
    pub zookeeper_hosts: Vec<String>,
    /// Pidfile path held for the process lifetime.
    #[serde(default = "default_pid_file")]
    pub service_pid_file: String,
    /// Bind address for the health/version HTTP surface.
    #[serde(default = "default_http_bind")]
    pub http_bind: String,
    /// Speaking-marker duration threshold, in seconds. Shipped as 0 (all
    /// matched pairs emit) — a policy knob, not a fixed value.
    #[serde(default)]
    pub marker_threshold_seconds: i64,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            persister_threads: default_persister_threads(),
            persister_poll_seconds: default_poll_seconds(),
            service_env: default_service_env(),
            database_connection: default_database_connection(),
            zookeeper_hosts: Vec::new(),
            service_pid_file: default_pid_file(),
            http_bind: default_http_bind(),
            marker_threshold_seconds: 0,
        }
    }
}

fn default_persister_threads() -> usize {
    2
}
fn default_poll_seconds() -> u64 {
    5
}
fn default_service_env() -> String {
    "development".to_string()
}
fn default_database_connection() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{home}/.persistsvc/persistsvc.db")
}
fn default_pid_file() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{home}/.persistsvc/persistsvc.pid")
}
fn default_http_bind() -> String {
    "127.0.0.1:7890".to_string()
}

impl PersistConfig {
    /// Load from a TOML file with `PERSISTSVC_*` env var overrides.
    ///
    /// Checks, in order: explicit path argument, `PERSISTSVC_CONFIG` env
    /// var, `~/.persistsvc/persistsvc.toml`.
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        let path = config_path
            .map(String::from)
            .or_else(|| std::env::var("PERSISTSVC_CONFIG").ok())
            .unwrap_or_else(default_config_path);

        let config: PersistConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("PERSISTSVC_").split("_"))
            .extract()?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{home}/.persistsvc/persistsvc.toml")
}
