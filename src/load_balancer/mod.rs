//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Config servers
//!     → target.rs (one Target per endpoint)
//!     → pool.rs (ServerPool: every target, healthy or not)
//!     → selector.rs (WeightedSelector: healthy targets only)
//!
//! Request arrives → pool.next() → smooth weighted round robin → Target
//! Health monitor  → pool.mark_healthy / mark_unhealthy → selector add/remove
//! ```
//!
//! # Design Decisions
//! - Pool and selector share one lock; selection and health mutation interleave
//! - Selector holds `Arc`s into the pool's targets, never copies
//! - Unhealthy targets excluded from selection, recovered ones re-enter at zero

use thiserror::Error;
use url::Url;

pub mod pool;
pub mod selector;
pub mod target;

pub use pool::ServerPool;
pub use selector::WeightedSelector;
pub use target::{HealthState, Target};

/// Errors raised by the pool and selector.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The endpoint is already registered.
    #[error("target {0} is already registered")]
    DuplicateTarget(Url),
    /// The active set is empty.
    #[error("no healthy target available")]
    NoHealthyTarget,
}
