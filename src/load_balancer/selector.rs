//! Smooth weighted round-robin selection.
//!
//! Every active target carries a `current_weight` counter. On each pick all
//! counters grow by their target's weight, the largest counter wins and is
//! then lowered by the sum of all weights. Over `total_weight` picks each
//! target is chosen exactly `weight` times, spread out rather than in bursts.
//!
//! ```text
//! weights A=5 B=1
//! pick:   1   2   3   4   5   6
//! A:      5   4   3   2   7   6   (before subtracting 6 from the winner)
//! B:      1   2   3   4  -1   0
//! chosen  A   A   A   B   A   A
//! ```
//!
//! Ties go to the entry that was inserted first, so a given weight
//! configuration always yields the same sequence.

use std::sync::Arc;
use url::Url;

use crate::load_balancer::{target::Target, PoolError};

#[derive(Debug)]
struct Entry {
    target: Arc<Target>,
    current_weight: i64,
}

/// The active (healthy) subset of targets and their scheduling counters.
///
/// Not synchronized on its own; [`ServerPool`](super::pool::ServerPool) keeps
/// it behind the pool lock.
#[derive(Debug, Default)]
pub struct WeightedSelector {
    entries: Vec<Entry>,
}

impl WeightedSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a target with a zeroed counter.
    pub fn add(&mut self, target: Arc<Target>) -> Result<(), PoolError> {
        if self.contains(target.endpoint()) {
            return Err(PoolError::DuplicateTarget(target.endpoint().clone()));
        }
        self.entries.push(Entry {
            target,
            current_weight: 0,
        });
        Ok(())
    }

    /// Drop a target from the active set. Returns whether it was present.
    pub fn remove(&mut self, endpoint: &Url) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.target.endpoint() != endpoint);
        self.entries.len() != before
    }

    /// Pick the next target.
    pub fn next(&mut self) -> Result<Arc<Target>, PoolError> {
        if self.entries.is_empty() {
            return Err(PoolError::NoHealthyTarget);
        }

        let mut total: i64 = 0;
        let mut best = 0;
        for i in 0..self.entries.len() {
            let weight = i64::from(self.entries[i].target.weight());
            total += weight;
            self.entries[i].current_weight += weight;
            // strict comparison keeps the earliest entry on ties
            if self.entries[i].current_weight > self.entries[best].current_weight {
                best = i;
            }
        }

        let chosen = &mut self.entries[best];
        chosen.current_weight -= total;
        Ok(chosen.target.clone())
    }

    pub fn contains(&self, endpoint: &Url) -> bool {
        self.entries.iter().any(|e| e.target.endpoint() == endpoint)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of the weights of all active targets.
    pub fn total_weight(&self) -> u64 {
        self.entries
            .iter()
            .map(|e| u64::from(e.target.weight()))
            .sum()
    }
}
