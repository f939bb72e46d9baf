//! Request forwarding to a chosen target.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the target (path joined, query merged)
//! - Add `x-forwarded-for`, drop hop-by-hop headers
//! - Stream the backend response back untouched

use axum::{
    body::Body,
    http::{header::HeaderValue, uri::PathAndQuery, Request, Uri, Version},
    response::Response,
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::net::SocketAddr;
use thiserror::Error;
use url::{Position, Url};

use crate::http::response::strip_hop_by_hop;
use crate::load_balancer::Target;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Why a request could not be forwarded.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("cannot build upstream URI: {0}")]
    Uri(#[from] axum::http::Error),
    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}

/// Plain-HTTP reverse proxy over a pooled client.
#[derive(Clone)]
pub struct ReverseProxy {
    client: Client<HttpConnector, Body>,
}

impl ReverseProxy {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client }
    }

    /// Forward `request` to `target`.
    pub async fn forward(
        &self,
        target: &Target,
        client_addr: Option<SocketAddr>,
        request: Request<Body>,
    ) -> Result<Response, ForwardError> {
        let (mut parts, body) = request.into_parts();

        parts.uri = upstream_uri(target.endpoint(), &parts.uri)?;
        // backends are spoken to over HTTP/1.1 regardless of the client's version
        parts.version = Version::HTTP_11;
        strip_hop_by_hop(&mut parts.headers);
        if let Some(addr) = client_addr {
            append_forwarded_for(&mut parts.headers, addr);
        }

        let response: hyper::Response<Incoming> =
            self.client.request(Request::from_parts(parts, body)).await?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

impl Default for ReverseProxy {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the URI sent to `target` for an incoming request URI.
pub fn upstream_uri(target: &Url, incoming: &Uri) -> Result<Uri, axum::http::Error> {
    let path = join_paths(target.path(), incoming.path());
    let path_and_query = match (target.query().filter(|q| !q.is_empty()), incoming.query()) {
        (Some(t), Some(i)) if !i.is_empty() => format!("{}?{}&{}", path, t, i),
        (Some(q), _) | (None, Some(q)) => format!("{}?{}", path, q),
        (None, None) => path,
    };

    Uri::builder()
        .scheme(target.scheme())
        .authority(&target[Position::BeforeHost..Position::AfterPort])
        .path_and_query(PathAndQuery::try_from(path_and_query)?)
        .build()
}

/// Join two paths with exactly one slash between them.
fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

fn append_forwarded_for(headers: &mut axum::http::HeaderMap, addr: SocketAddr) {
    let ip = addr.ip().to_string();
    let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{}, {}", prior, ip),
        None => ip,
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}
