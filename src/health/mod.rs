//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Per target (active.rs):
//!     Periodic timer
//!     → probe.rs (HEAD health_check_url, with timeout)
//!     → 2xx: pool.mark_healthy   (re-enters rotation)
//!     → otherwise: pool.mark_unhealthy (leaves rotation)
//! ```
//!
//! # Design Decisions
//! - One task per target; a hung backend only stalls its own monitor
//! - Probe I/O happens outside the pool lock
//! - No thresholds: a single result flips the state

pub mod active;
pub mod probe;

pub use active::HealthMonitor;
pub use probe::{HttpProbe, Probe, ProbeError};

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::lifecycle::Shutdown;
use crate::load_balancer::ServerPool;

/// Start one monitor per registered target.
pub fn spawn_monitors(
    pool: &Arc<ServerPool>,
    probe: Arc<dyn Probe>,
    interval: Duration,
    shutdown: &Shutdown,
) -> Vec<JoinHandle<()>> {
    let targets = pool.targets();
    tracing::info!(
        targets = targets.len(),
        interval = ?interval,
        "Starting health monitors"
    );

    targets
        .into_iter()
        .map(|target| {
            let monitor = HealthMonitor::new(pool.clone(), target, probe.clone(), interval);
            tokio::spawn(monitor.run(shutdown.subscribe()))
        })
        .collect()
}
