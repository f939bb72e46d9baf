//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the balancer.
//! All types derive Serde traits for deserialization from JSON or TOML files.
//! Keys are camelCase so existing `config.json` files load unchanged.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Root configuration for the balancer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    /// Bind address (e.g., "0.0.0.0:7080").
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Time between two probes of the same server.
    #[serde(with = "duration_str")]
    pub health_check_interval: Duration,

    /// Deadline for a single probe.
    #[serde(default = "default_health_check_timeout", with = "duration_str")]
    pub health_check_timeout: Duration,

    /// Deadline for a proxied request, response headers included.
    #[serde(default = "default_request_timeout", with = "duration_str")]
    pub request_timeout: Duration,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Backend server definitions.
    pub servers: Vec<ServerConfig>,
}

impl ProxyConfig {
    /// Minimal configuration: the given servers and a probe interval.
    pub fn new(servers: Vec<ServerConfig>, health_check_interval: Duration) -> Self {
        Self {
            listen: default_listen(),
            health_check_interval,
            health_check_timeout: default_health_check_timeout(),
            request_timeout: default_request_timeout(),
            logging: LoggingConfig::default(),
            servers,
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:7080".to_string()
}

fn default_health_check_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Backend server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Backend URL (e.g., "http://127.0.0.1:3000").
    pub url: Url,

    /// Weight for weighted load balancing (default: 1).
    #[serde(default = "default_weight")]
    pub weight: u32,

    /// URL probed by the health monitor. Defaults to `url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_url: Option<Url>,
}

impl ServerConfig {
    pub fn new(url: Url, weight: u32) -> Self {
        Self {
            url,
            weight,
            health_check_url: None,
        }
    }
}

fn default_weight() -> u32 {
    1
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, for development.
    #[default]
    Pretty,
    /// One JSON object per line, for log aggregation.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub level: String,

    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Human-readable durations ("5s", "1m 30s", "250ms").
mod duration_str {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim())
            .map_err(|e| D::Error::custom(format!("invalid duration {:?}: {}", raw, e)))
    }
}
