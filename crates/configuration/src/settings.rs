use crate::error::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// The root configuration structure for the console.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub polling: PollingSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Rejects settings that would make the console misbehave at runtime
    /// rather than fail loudly at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.polling.interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "polling.interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "api.timeout_secs must be greater than 0".to_string(),
            ));
        }
        let url = Url::parse(&self.api.base_url).map_err(|e| {
            ConfigError::ValidationError(format!("api.base_url '{}' is invalid: {}", self.api.base_url, e))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::ValidationError(format!(
                "api.base_url must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if !self.api.prefix.is_empty() && !self.api.prefix.starts_with('/') {
            return Err(ConfigError::ValidationError(
                "api.prefix must be empty or start with '/'".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where the backend lives and how to talk to it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Scheme, host and port of the backend, e.g. `http://127.0.0.1:8000`.
    pub base_url: String,
    /// Path prefix shared by every endpoint.
    pub prefix: String,
    /// Optional bearer token sent with every request.
    pub token: Option<String>,
    /// Per-request timeout.
    pub timeout_secs: u64,
    pub endpoints: Endpoints,
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            prefix: "/api".to_string(),
            token: None,
            timeout_secs: 10,
            endpoints: Endpoints::default(),
        }
    }
}

/// Endpoint paths, relative to `base_url + prefix`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub snapshot: String,
    pub portfolio: String,
    pub status: String,
    pub config: String,
    pub orders: String,
    pub bot_start: String,
    pub bot_stop: String,
    pub bot_liquidate: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            snapshot: "/dashboard".to_string(),
            portfolio: "/dashboard".to_string(),
            status: "/status".to_string(),
            config: "/config".to_string(),
            orders: "/orders/".to_string(),
            bot_start: "/bot/start".to_string(),
            bot_stop: "/bot/stop".to_string(),
            bot_liquidate: "/bot/liquidate".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    /// Delay between two snapshot polls, in milliseconds.
    pub interval_ms: u64,
}

impl PollingSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self { interval_ms: 15_000 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive used when `RUST_LOG` is not set.
    pub level: String,
    /// When set, logs go to a daily rolling file in this directory instead of stderr.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "gridpilot.log".to_string(),
        }
    }
}
