//! Target abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server
//! - Carry the immutable selection weight
//! - Track health state (Healthy/Unhealthy)

use std::sync::atomic::{AtomicU8, Ordering};
use url::Url;

use crate::config::ServerConfig;

/// Health State enum.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Healthy = 1,
    Unhealthy = 2,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            2 => HealthState::Unhealthy,
            _ => HealthState::Healthy,
        }
    }
}

/// A single backend server.
///
/// The health flag is atomic so readers outside the pool lock (logging, the
/// server's status views) never block, but it is only ever written by
/// [`ServerPool`](crate::load_balancer::pool::ServerPool) while the pool lock
/// is held.
#[derive(Debug)]
pub struct Target {
    /// Address requests are forwarded to.
    endpoint: Url,
    /// Address the health monitor probes.
    health_check_url: Url,
    /// Relative selection frequency, always > 0.
    weight: u32,
    /// Current health state.
    state: AtomicU8,
}

impl Target {
    /// Create a new target. Targets start healthy.
    ///
    /// When no dedicated health-check URL is given the endpoint itself is probed.
    pub fn new(endpoint: Url, weight: u32, health_check_url: Option<Url>) -> Self {
        let health_check_url = health_check_url.unwrap_or_else(|| endpoint.clone());
        Self {
            endpoint,
            health_check_url,
            weight,
            state: AtomicU8::new(HealthState::Healthy as u8),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn health_check_url(&self) -> &Url {
        &self.health_check_url
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn health(&self) -> HealthState {
        HealthState::from(self.state.load(Ordering::Acquire))
    }

    pub fn is_healthy(&self) -> bool {
        self.health() == HealthState::Healthy
    }

    /// Store a new state, returning the previous one.
    pub(crate) fn set_health(&self, state: HealthState) -> HealthState {
        HealthState::from(self.state.swap(state as u8, Ordering::AcqRel))
    }
}

impl From<&ServerConfig> for Target {
    fn from(config: &ServerConfig) -> Self {
        Target::new(
            config.url.clone(),
            config.weight,
            config.health_check_url.clone(),
        )
    }
}
