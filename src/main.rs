//! Weighted round-robin HTTP load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ axum server ──▶ Dispatcher ──▶ ReverseProxy ──▶ Backend
//!                                  │
//!                                  │ next()
//!                                  ▼
//!                     ServerPool + WeightedSelector   (one lock)
//!                                  ▲
//!                                  │ mark_healthy / mark_unhealthy
//!                                  │
//!                     HealthMonitor per target ──▶ HEAD health_check_url
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use wrr_balancer::config::load_config;
use wrr_balancer::lifecycle::startup;
use wrr_balancer::observability::logging;

#[derive(Parser)]
#[command(name = "wrr-balancer", version)]
#[command(about = "Weighted round-robin HTTP load balancer with active health checks", long_about = None)]
struct Cli {
    /// Location of the configuration file (.json or .toml)
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Override the listen address from the configuration
    #[arg(short, long)]
    listen: Option<String>,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration {}: {}", cli.config.display(), e);
            return ExitCode::FAILURE;
        }
    };

    if cli.check {
        println!(
            "Configuration OK: {} server(s), listening on {}",
            config.servers.len(),
            cli.listen.as_deref().unwrap_or(&config.listen)
        );
        return ExitCode::SUCCESS;
    }

    if let Some(listen) = cli.listen {
        config.listen = listen;
    }

    if let Err(e) = logging::try_init(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    tracing::info!("wrr-balancer v{} starting", env!("CARGO_PKG_VERSION"));

    match startup::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}
