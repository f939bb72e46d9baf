//! Server pool management.
//!
//! # Responsibilities
//! - Own every configured target, healthy or not
//! - Keep the selector's active set equal to the healthy subset
//! - Serialize selection and health transitions through one lock

use parking_lot::Mutex;
use std::sync::Arc;
use url::Url;

use crate::load_balancer::{
    selector::WeightedSelector,
    target::{HealthState, Target},
    PoolError,
};

#[derive(Debug, Default)]
struct PoolState {
    /// Canonical targets in configuration order.
    targets: Vec<Arc<Target>>,
    selector: WeightedSelector,
}

impl PoolState {
    fn find(&self, endpoint: &Url) -> Option<&Arc<Target>> {
        self.targets.iter().find(|t| t.endpoint() == endpoint)
    }
}

/// Registry of all targets plus the weighted selector over the healthy ones.
///
/// Shared via `Arc` between the dispatcher and every health monitor.
#[derive(Debug, Default)]
pub struct ServerPool {
    state: Mutex<PoolState>,
}

impl ServerPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register targets. Each one starts healthy and selectable.
    ///
    /// Endpoints that are already registered are logged and skipped; the
    /// rejected entries are returned so callers can report them.
    pub fn load_all<I>(&self, targets: I) -> Vec<PoolError>
    where
        I: IntoIterator<Item = Target>,
    {
        let mut rejected = Vec::new();
        let mut state = self.state.lock();

        for target in targets {
            if state.find(target.endpoint()).is_some() {
                tracing::warn!(endpoint = %target.endpoint(), "Duplicate target, skipping");
                rejected.push(PoolError::DuplicateTarget(target.endpoint().clone()));
                continue;
            }

            target.set_health(HealthState::Healthy);
            let target = Arc::new(target);
            if let Err(e) = state.selector.add(target.clone()) {
                tracing::warn!(endpoint = %target.endpoint(), error = %e, "Target not added to selector");
                rejected.push(e);
                continue;
            }

            tracing::info!(
                endpoint = %target.endpoint(),
                weight = target.weight(),
                "Target added to pool"
            );
            state.targets.push(target);
        }

        rejected
    }

    /// Select the next healthy target.
    pub fn next(&self) -> Result<Arc<Target>, PoolError> {
        self.state.lock().selector.next()
    }

    /// Mark a target down and take it out of rotation.
    ///
    /// Returns true only on a healthy → unhealthy transition.
    pub fn mark_unhealthy(&self, endpoint: &Url) -> bool {
        let mut state = self.state.lock();
        let Some(target) = state.find(endpoint).cloned() else {
            tracing::debug!(endpoint = %endpoint, "mark_unhealthy on unknown target");
            return false;
        };

        let previous = target.set_health(HealthState::Unhealthy);
        // remove even when already unhealthy; absent entries are a no-op
        state.selector.remove(endpoint);
        previous == HealthState::Healthy
    }

    /// Mark a target up and put it back in rotation with a zeroed counter.
    ///
    /// Returns true only on an unhealthy → healthy transition.
    pub fn mark_healthy(&self, endpoint: &Url) -> bool {
        let mut state = self.state.lock();
        let Some(target) = state.find(endpoint).cloned() else {
            tracing::debug!(endpoint = %endpoint, "mark_healthy on unknown target");
            return false;
        };

        let previous = target.set_health(HealthState::Healthy);
        if previous == HealthState::Healthy {
            return false;
        }

        if let Err(e) = state.selector.add(target) {
            tracing::warn!(endpoint = %endpoint, error = %e, "Recovered target already active");
        }
        true
    }

    /// Snapshot of all registered targets in configuration order.
    pub fn targets(&self) -> Vec<Arc<Target>> {
        self.state.lock().targets.clone()
    }

    /// Number of registered targets.
    pub fn len(&self) -> usize {
        self.state.lock().targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of targets currently eligible for selection.
    pub fn active_len(&self) -> usize {
        self.state.lock().selector.len()
    }
}
