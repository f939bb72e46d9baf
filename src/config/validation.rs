//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (weights > 0, durations > 0)
//! - Check URLs are usable by the plain-HTTP forwarder
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Duplicate endpoints are left to the pool, which skips them with a warning

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no servers configured")]
    NoServers,
    #[error("server {index}: weight must be greater than zero")]
    ZeroWeight { index: usize },
    #[error("server {index}: {field} {url} must be an http URL with a host")]
    UnsupportedUrl {
        index: usize,
        field: &'static str,
        url: String,
    },
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },
    #[error("listen address {0:?} is not a socket address")]
    InvalidListen(String),
}

/// Check a parsed configuration, collecting every problem.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listen.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidListen(config.listen.clone()));
    }

    for (field, value) in [
        ("healthCheckInterval", config.health_check_interval),
        ("healthCheckTimeout", config.health_check_timeout),
        ("requestTimeout", config.request_timeout),
    ] {
        if value == Duration::ZERO {
            errors.push(ValidationError::ZeroDuration { field });
        }
    }

    if config.servers.is_empty() {
        errors.push(ValidationError::NoServers);
    }

    for (index, server) in config.servers.iter().enumerate() {
        if server.weight == 0 {
            errors.push(ValidationError::ZeroWeight { index });
        }
        if !is_plain_http(&server.url) {
            errors.push(ValidationError::UnsupportedUrl {
                index,
                field: "url",
                url: server.url.to_string(),
            });
        }
        if let Some(health) = &server.health_check_url {
            if !is_plain_http(health) {
                errors.push(ValidationError::UnsupportedUrl {
                    index,
                    field: "healthCheckUrl",
                    url: health.to_string(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_plain_http(url: &Url) -> bool {
    url.scheme() == "http" && url.host().is_some()
}
