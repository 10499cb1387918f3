//! Configuration loader and validator for the WorkNest client.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub retry: Retry,
    pub services: Services,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub refresh_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub page_size: usize,
    pub export_path: String,
}

/// Retry policy for the schedule fetch path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Retry {
    pub attempts: u32,
    pub backoff_ms: u64,
}

/// Base URLs of the backing services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Services {
    pub profile: String,
    pub schedule: String,
    pub request: String,
    pub audit: String,
    pub event: String,
}

impl App {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Retry {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.refresh_interval_ms == 0 {
        return Err(ConfigError::Invalid("app.refresh_interval_ms must be > 0"));
    }
    if cfg.app.request_timeout_ms == 0 {
        return Err(ConfigError::Invalid("app.request_timeout_ms must be > 0"));
    }
    if cfg.app.page_size == 0 {
        return Err(ConfigError::Invalid("app.page_size must be > 0"));
    }
    if cfg.app.export_path.trim().is_empty() {
        return Err(ConfigError::Invalid("app.export_path must be non-empty"));
    }

    if cfg.retry.attempts == 0 {
        return Err(ConfigError::Invalid("retry.attempts must be >= 1"));
    }

    let s = &cfg.services;
    if !is_base_url(&s.profile) {
        return Err(ConfigError::Invalid("services.profile must be an http(s) URL"));
    }
    if !is_base_url(&s.schedule) {
        return Err(ConfigError::Invalid("services.schedule must be an http(s) URL"));
    }
    if !is_base_url(&s.request) {
        return Err(ConfigError::Invalid("services.request must be an http(s) URL"));
    }
    if !is_base_url(&s.audit) {
        return Err(ConfigError::Invalid("services.audit must be an http(s) URL"));
    }
    if !is_base_url(&s.event) {
        return Err(ConfigError::Invalid("services.event must be an http(s) URL"));
    }

    Ok(())
}

fn is_base_url(raw: &str) -> bool {
    match Url::parse(raw.trim()) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.has_host(),
        Err(_) => false,
    }
}

/// Returns the reference YAML configuration.
pub fn example() -> &'static str {
    r#"app:
  refresh_interval_ms: 5000
  request_timeout_ms: 10000
  page_size: 5
  export_path: "exported_data.csv"

retry:
  attempts: 3
  backoff_ms: 1000

services:
  profile: "http://127.0.0.1:5002/"
  schedule: "http://127.0.0.1:5004/"
  request: "http://127.0.0.1:5003/"
  audit: "http://127.0.0.1:5006/"
  event: "http://127.0.0.1:5001/"
"#
}
