//! teamops-config: service settings and the persisted job configuration.
//!
//! Service settings (ports, credentials, storage location) come from
//! `~/.teamops/config.json5`, a `.env` file and the process environment, in
//! increasing order of precedence. The job configuration itself ([`AppConfig`])
//! lives in the object store and is handled by `teamops-storage`.

pub mod app;
pub mod schedule;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use app::{AppConfig, ConfluenceConfig, OnCallConfig};
pub use schedule::{next_fire_after, parse_cron};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON5 parse error: {0}")]
    Json5(#[from] json5::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Invalid(String),
    #[error("Config directory not found")]
    NoDirFound,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    /// Bearer token required on the API routes (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

fn default_port() -> u16 {
    8000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            auth_token: None,
        }
    }
}

/// Confluence Cloud credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfluenceSettings {
    /// Site domain, e.g. "your-team.atlassian.net".
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub api_token: String,
    #[serde(default)]
    pub space_key: String,
    /// Set to false only for local development behind intercepting proxies.
    #[serde(default = "default_true")]
    pub verify_tls: bool,
}

impl Default for ConfluenceSettings {
    fn default() -> Self {
        Self {
            domain: String::new(),
            username: String::new(),
            api_token: String::new(),
            space_key: String::new(),
            verify_tls: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlackSettings {
    #[serde(default, skip_serializing)]
    pub api_token: String,
}

/// Where the job configuration document is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// GCS when a bucket is configured, otherwise a local file.
    #[default]
    Auto,
    Gcs,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    /// Object name inside the bucket.
    #[serde(default = "default_object_path")]
    pub object_path: String,
    /// Static OAuth access token; the metadata server is used when unset.
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,
    /// Path for the file backend; defaults to `~/.teamops/app-config.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
}

fn default_object_path() -> String {
    "config.json".to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Auto,
            bucket: None,
            object_path: default_object_path(),
            access_token: None,
            local_path: None,
        }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// IANA zone the cron schedules and "today" are evaluated in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub confluence: ConfluenceSettings,
    #[serde(default)]
    pub slack: SlackSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            timezone: default_timezone(),
            confluence: ConfluenceSettings::default(),
            slack: SlackSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

impl ServiceConfig {
    pub fn tz(&self) -> Result<chrono_tz::Tz, ConfigError> {
        self.timezone
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("Invalid timezone: {}", self.timezone)))
    }

    /// Overlay environment variables onto the file settings.
    ///
    /// `lookup` is `std::env::var` in production.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = get("CONFLUENCE_DOMAIN") {
            self.confluence.domain = v;
        }
        if let Some(v) = get("CONFLUENCE_USERNAME") {
            self.confluence.username = v;
        }
        if let Some(v) = get("CONFLUENCE_API_TOKEN") {
            self.confluence.api_token = v;
        }
        if let Some(v) = get("CONFLUENCE_SPACE_KEY") {
            self.confluence.space_key = v;
        }
        if let Some(v) = get("REQUESTS_VERIFY") {
            self.confluence.verify_tls = !v.eq_ignore_ascii_case("false");
        }
        if let Some(v) = get("SLACK_API_TOKEN") {
            self.slack.api_token = v;
        }
        if let Some(v) = get("GCS_BUCKET_NAME") {
            self.storage.bucket = Some(v);
        }
        if let Some(v) = get("GCS_CONFIG_FILE_PATH") {
            self.storage.object_path = v;
        }
        if let Some(v) = get("GCS_ACCESS_TOKEN") {
            self.storage.access_token = Some(v);
        }
        if let Some(v) = get("TEAMOPS_TIMEZONE") {
            self.timezone = v;
        }
        if let Some(v) = get("TEAMOPS_AUTH_TOKEN") {
            self.gateway.auth_token = Some(v);
        }
        if let Some(v) = get("TEAMOPS_PORT") {
            match v.parse() {
                Ok(port) => self.gateway.port = port,
                Err(_) => tracing::warn!("Ignoring invalid TEAMOPS_PORT: {v}"),
            }
        }
    }
}

/// Resolve the teamops config directory (~/.teamops/).
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|h| h.join(".teamops"))
        .ok_or(ConfigError::NoDirFound)
}

/// Resolve the config file path (`TEAMOPS_CONFIG_FILE` or ~/.teamops/config.json5).
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    match std::env::var("TEAMOPS_CONFIG_FILE") {
        Ok(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(config_dir()?.join("config.json5")),
    }
}

/// Load the service configuration: file, then `.env`, then environment.
pub fn load_config() -> Result<ServiceConfig, ConfigError> {
    let _ = dotenvy::dotenv();

    let path = config_file_path()?;
    let mut config = load_config_from(&path)?;
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

/// Load configuration from a specific path, falling back to defaults if not found.
pub fn load_config_from(path: &Path) -> Result<ServiceConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("Config file not found at {}, using defaults", path.display());
        return Ok(ServiceConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: ServiceConfig = json5::from_str(&content)?;
    Ok(config)
}

/// Ensure the config directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, ConfigError> {
    let dir = config_dir()?;
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}
