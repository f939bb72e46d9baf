//! Startup orchestration.
//!
//! # Responsibilities
//! - Bind the listener
//! - Build the pool and start health monitors (via `HttpServer`)
//! - Serve until a termination signal
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds before monitors start, so a bad address costs no probes

use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{ConfigError, ProxyConfig};
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};

/// Fatal errors while bringing the balancer up or running it.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid listen address {0:?}")]
    ListenAddress(String),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Bind the configured address.
pub async fn bind(config: &ProxyConfig) -> Result<TcpListener, StartupError> {
    let addr: SocketAddr = config
        .listen
        .parse()
        .map_err(|_| StartupError::ListenAddress(config.listen.clone()))?;

    TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })
}

/// Run the balancer until SIGINT/SIGTERM.
pub async fn run(config: ProxyConfig) -> Result<(), StartupError> {
    tracing::info!(
        listen = %config.listen,
        servers = config.servers.len(),
        health_check_interval = ?config.health_check_interval,
        health_check_timeout = ?config.health_check_timeout,
        "Configuration loaded"
    );

    let listener = bind(&config).await?;

    let shutdown = Shutdown::new();
    signals::trigger_on_signal(shutdown.clone());

    HttpServer::new(config)
        .run(listener, shutdown)
        .await
        .map_err(StartupError::Serve)?;

    tracing::info!("Shutdown complete");
    Ok(())
}
