//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the dispatch handler
//! - Wire up middleware (tracing, request ID, timeout)
//! - Populate the server pool and start health monitoring
//! - Bind server to listener and drain on shutdown

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::health::{self, HttpProbe, Probe};
use crate::http::dispatcher::Dispatcher;
use crate::http::proxy::ReverseProxy;
use crate::http::request::{request_id, UuidRequestId};
use crate::lifecycle::Shutdown;
use crate::load_balancer::{ServerPool, Target};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
}

/// HTTP server for the balancer.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    pool: Arc<ServerPool>,
    probe: Arc<dyn Probe>,
}

impl HttpServer {
    /// Create a new HTTP server probing targets over HTTP.
    pub fn new(config: ProxyConfig) -> Self {
        let probe = Arc::new(HttpProbe::new(config.health_check_timeout));
        Self::with_probe(config, probe)
    }

    /// Create a new HTTP server with a custom probe transport.
    pub fn with_probe(config: ProxyConfig, probe: Arc<dyn Probe>) -> Self {
        let pool = Arc::new(ServerPool::new());
        let rejected = pool.load_all(config.servers.iter().map(Target::from));
        if !rejected.is_empty() {
            tracing::warn!(rejected = rejected.len(), "Some servers were not added to the pool");
        }

        let state = AppState {
            dispatcher: Dispatcher::new(pool.clone(), ReverseProxy::new()),
        };

        let router = Self::build_router(config.request_timeout, state);
        Self {
            router,
            config,
            pool,
            probe,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(request_timeout: Duration, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(dispatch_handler))
            .route("/", any(dispatch_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id = %request_id(request),
                        )
                    }))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(request_timeout)),
            )
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            targets = self.pool.len(),
            "HTTP server starting"
        );

        let monitors = health::spawn_monitors(
            &self.pool,
            self.probe.clone(),
            self.config.health_check_interval,
            &shutdown,
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.signalled())
            .await?;

        for monitor in monitors {
            let _ = monitor.await;
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The shared target pool.
    pub fn pool(&self) -> &Arc<ServerPool> {
        &self.pool
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Catch-all handler: every request goes through the dispatcher.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    state.dispatcher.handle(client_addr, request).await
}
