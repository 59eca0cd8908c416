//! Per-iteration accumulators.
//!
//! An [`IterationTally`] collects a running value and an event count while
//! an iteration is in progress. At the iteration boundary the totals are
//! committed as one sample each into cross-iteration [`ScalarStats`].

use serde::{Deserialize, Serialize};

use crate::stats::ScalarStats;

/// Running value and event count for the current iteration, plus the
/// statistics of all committed iterations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IterationTally {
    value: f64,
    events: u64,
    value_stats: ScalarStats,
    event_stats: ScalarStats,
}

impl IterationTally {
    /// Create an empty tally.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one event contributing `value`.
    pub fn record(&mut self, value: f64) {
        self.value += value;
        self.events += 1;
    }

    /// Add to the running value without counting an event.
    pub fn add(&mut self, value: f64) {
        self.value += value;
    }

    /// Count an event without changing the running value.
    pub fn count(&mut self) {
        self.events += 1;
    }

    /// Value accumulated during the current iteration.
    #[must_use]
    pub fn current_value(&self) -> f64 {
        self.value
    }

    /// Events counted during the current iteration.
    #[must_use]
    pub fn current_events(&self) -> u64 {
        self.events
    }

    /// Commit the current iteration as one sample and start a fresh one.
    #[allow(clippy::cast_precision_loss)]
    pub fn done_iteration(&mut self) {
        self.value_stats.push(self.value);
        self.event_stats.push(self.events as f64);
        self.reset_iteration();
    }

    /// Discard the current iteration's running totals.
    pub fn reset_iteration(&mut self) {
        self.value = 0.0;
        self.events = 0;
    }

    /// Statistics of the per-iteration value.
    #[must_use]
    pub fn value_stats(&self) -> &ScalarStats {
        &self.value_stats
    }

    /// Statistics of the per-iteration event count.
    #[must_use]
    pub fn event_stats(&self) -> &ScalarStats {
        &self.event_stats
    }

    /// Merge the committed statistics of two tallies.
    ///
    /// Running (uncommitted) totals are not carried over.
    #[must_use]
    pub fn merge(a: &Self, b: &Self) -> Self {
        Self {
            value: 0.0,
            events: 0,
            value_stats: ScalarStats::merge(&a.value_stats, &b.value_stats),
            event_stats: ScalarStats::merge(&a.event_stats, &b.event_stats),
        }
    }
}
