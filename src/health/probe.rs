//! Liveness probe transport.
//!
//! A probe issues one HEAD request and reports the status code, or the
//! reason no status was obtained. Judging the status is the monitor's job.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::time::Duration;
use thiserror::Error;
use tokio::time;
use url::Url;

/// Why a probe counted as failed.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid probe request: {0}")]
    Request(#[from] axum::http::Error),
    #[error("connection error: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("non-success status {0}")]
    Status(StatusCode),
}

/// Something that can check whether a URL answers.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Probe `url`, returning the response status.
    async fn probe(&self, url: &Url) -> Result<StatusCode, ProbeError>;
}

/// HEAD-request probe over plain HTTP.
#[derive(Clone)]
pub struct HttpProbe {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client, timeout }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, url: &Url) -> Result<StatusCode, ProbeError> {
        let request = Request::builder()
            .method(Method::HEAD)
            .uri(url.as_str())
            .header(header::USER_AGENT, "wrr-balancer-health-check")
            .body(Body::empty())?;

        match time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => Ok(response.status()),
            Ok(Err(e)) => Err(ProbeError::Transport(e)),
            Err(_) => Err(ProbeError::Timeout(self.timeout)),
        }
    }
}
