//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe one target
//! - Move the target in or out of rotation based on the result

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::health::probe::{Probe, ProbeError};
use crate::load_balancer::{ServerPool, Target};

/// Prober for a single target.
///
/// One failed probe takes the target out of rotation, one successful probe
/// puts it back. There is no threshold, so a flapping backend flaps in the
/// pool too.
pub struct HealthMonitor {
    pool: Arc<ServerPool>,
    target: Arc<Target>,
    probe: Arc<dyn Probe>,
    interval: Duration,
}

impl HealthMonitor {
    pub fn new(
        pool: Arc<ServerPool>,
        target: Arc<Target>,
        probe: Arc<dyn Probe>,
        interval: Duration,
    ) -> Self {
        Self {
            pool,
            target,
            probe,
            interval,
        }
    }

    /// Probe every `interval` until shutdown. The first probe fires one
    /// interval after start since targets begin healthy.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::debug!(
            endpoint = %self.target.endpoint(),
            health_check_url = %self.target.health_check_url(),
            interval = ?self.interval,
            "Health monitor starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        // a slow probe pushes the schedule back instead of bursting afterwards
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check().await;
                }
                _ = shutdown.recv() => {
                    tracing::debug!(endpoint = %self.target.endpoint(), "Health monitor stopping");
                    break;
                }
            }
        }
    }

    /// Run one probe and apply the result to the pool. Returns whether the
    /// target passed.
    pub async fn check(&self) -> bool {
        let endpoint = self.target.endpoint();

        let outcome = match self.probe.probe(self.target.health_check_url()).await {
            Ok(status) if status.is_success() => Ok(status),
            Ok(status) => Err(ProbeError::Status(status)),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(status) => {
                tracing::debug!(endpoint = %endpoint, status = %status, "Health check passed");
                if self.pool.mark_healthy(endpoint) {
                    tracing::info!(endpoint = %endpoint, "Target recovered, back in rotation");
                }
                true
            }
            Err(e) => {
                tracing::debug!(endpoint = %endpoint, error = %e, "Health check failed");
                if self.pool.mark_unhealthy(endpoint) {
                    tracing::warn!(endpoint = %endpoint, error = %e, "Target is down, removed from rotation");
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;
    use crate::load_balancer::PoolError;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use url::Url;

    /// Answers 200 or 503 depending on a switch, counting calls.
    #[derive(Default)]
    struct SwitchProbe {
        down: AtomicBool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Probe for SwitchProbe {
        async fn probe(&self, _url: &Url) -> Result<StatusCode, ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.down.load(Ordering::SeqCst) {
                Ok(StatusCode::SERVICE_UNAVAILABLE)
            } else {
                Ok(StatusCode::OK)
            }
        }
    }

    struct TimeoutProbe;

    #[async_trait]
    impl Probe for TimeoutProbe {
        async fn probe(&self, _url: &Url) -> Result<StatusCode, ProbeError> {
            Err(ProbeError::Timeout(Duration::from_millis(5)))
        }
    }

    /// Hangs forever on port 1, fails fast everywhere else.
    #[derive(Default)]
    struct PartlyHungProbe {
        fast_calls: AtomicUsize,
    }

    #[async_trait]
    impl Probe for PartlyHungProbe {
        async fn probe(&self, url: &Url) -> Result<StatusCode, ProbeError> {
            if url.port() == Some(1) {
                std::future::pending::<()>().await;
            }
            self.fast_calls.fetch_add(1, Ordering::SeqCst);
            Ok(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }

    fn pool_of(ports: &[u16]) -> Arc<ServerPool> {
        let pool = Arc::new(ServerPool::new());
        pool.load_all(ports.iter().map(|p| {
            Target::new(format!("http://127.0.0.1:{}", p).parse().unwrap(), 1, None)
        }));
        pool
    }

    fn monitor(pool: &Arc<ServerPool>, index: usize, probe: Arc<dyn Probe>) -> HealthMonitor {
        let target = pool.targets()[index].clone();
        HealthMonitor::new(pool.clone(), target, probe, Duration::from_millis(20))
    }

    #[tokio::test]
    async fn failed_probe_removes_target_immediately() {
        let pool = pool_of(&[1, 2]);
        let probe = Arc::new(SwitchProbe::default());
        probe.down.store(true, Ordering::SeqCst);

        let m = monitor(&pool, 0, probe.clone());
        assert!(!m.check().await);
        assert_eq!(pool.active_len(), 1);
        for _ in 0..4 {
            assert_eq!(pool.next().unwrap().endpoint().port(), Some(2));
        }

        // recovery puts it back
        probe.down.store(false, Ordering::SeqCst);
        assert!(m.check().await);
        assert_eq!(pool.active_len(), 2);
    }

    #[tokio::test]
    async fn probe_error_counts_as_failure() {
        let pool = pool_of(&[1]);
        let m = monitor(&pool, 0, Arc::new(TimeoutProbe));

        assert!(!m.check().await);
        assert!(!m.check().await);
        assert!(matches!(pool.next(), Err(PoolError::NoHealthyTarget)));
    }

    #[tokio::test]
    async fn run_probes_until_shutdown() {
        let pool = pool_of(&[1]);
        let probe = Arc::new(SwitchProbe::default());
        probe.down.store(true, Ordering::SeqCst);
        let shutdown = Shutdown::new();

        let handle = tokio::spawn(monitor(&pool, 0, probe.clone()).run(shutdown.subscribe()));

        time::sleep(Duration::from_millis(120)).await;
        assert_eq!(pool.active_len(), 0);
        assert!(probe.calls.load(Ordering::SeqCst) >= 2);

        shutdown.trigger();
        time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn hung_probe_does_not_block_other_targets() {
        let pool = pool_of(&[1, 2]);
        let probe = Arc::new(PartlyHungProbe::default());
        let shutdown = Shutdown::new();

        let hung = tokio::spawn(monitor(&pool, 0, probe.clone()).run(shutdown.subscribe()));
        let fast = tokio::spawn(monitor(&pool, 1, probe.clone()).run(shutdown.subscribe()));

        time::sleep(Duration::from_millis(150)).await;
        assert!(probe.fast_calls.load(Ordering::SeqCst) >= 3);
        // port 1 never got an answer, so it is still in rotation
        assert_eq!(pool.active_len(), 1);
        assert_eq!(pool.next().unwrap().endpoint().port(), Some(1));

        shutdown.trigger();
        time::timeout(Duration::from_secs(1), fast).await.unwrap().unwrap();
        hung.abort();
    }
}
