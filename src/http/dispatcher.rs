//! Per-request target selection and hand-off.

use axum::{body::Body, http::Request, response::Response};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::http::{proxy::ReverseProxy, request::request_id, response};
use crate::load_balancer::ServerPool;

/// Picks a target for each request and forwards it there.
///
/// Holds no per-request state: a request that finds no healthy target fails
/// with 503 at once, and a forwarding error is answered with 502. Neither is
/// retried.
#[derive(Clone)]
pub struct Dispatcher {
    pool: Arc<ServerPool>,
    proxy: ReverseProxy,
}

impl Dispatcher {
    pub fn new(pool: Arc<ServerPool>, proxy: ReverseProxy) -> Self {
        Self { pool, proxy }
    }

    pub fn pool(&self) -> &Arc<ServerPool> {
        &self.pool
    }

    pub async fn handle(&self, client_addr: Option<SocketAddr>, request: Request<Body>) -> Response {
        let request_id = request_id(&request).to_string();

        let target = match self.pool.next() {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Rejecting request");
                return response::no_available_server();
            }
        };

        tracing::debug!(
            request_id = %request_id,
            method = %request.method(),
            path = %request.uri().path(),
            endpoint = %target.endpoint(),
            "Dispatching request"
        );

        match self.proxy.forward(&target, client_addr, request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    request_id = %request_id,
                    endpoint = %target.endpoint(),
                    error = %e,
                    "Upstream error"
                );
                response::bad_gateway()
            }
        }
    }
}
