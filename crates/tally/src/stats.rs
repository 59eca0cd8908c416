//! Mergeable scalar statistics.
//!
//! Each worker of a parallel run summarizes its own iterations; the
//! summaries are then combined with [`ScalarStats::merge`], which is exact
//! for count, min and max and numerically stable for mean and variance.

use serde::{Deserialize, Serialize};

/// Statistics for a single scalar quantity sampled once per iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalarStats {
    /// Arithmetic mean
    pub mean: f64,
    /// Population variance (σ²)
    pub variance: f64,
    /// Minimum sample
    pub min: f64,
    /// Maximum sample
    pub max: f64,
    /// Number of samples contributing to these stats
    pub sample_count: u64,
}

impl ScalarStats {
    /// Create stats from a single value.
    #[must_use]
    pub fn from_value(value: f64) -> Self {
        Self {
            mean: value,
            variance: 0.0,
            min: value,
            max: value,
            sample_count: 1,
        }
    }

    /// Create empty stats.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            mean: 0.0,
            variance: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sample_count: 0,
        }
    }

    /// Add one sample.
    pub fn push(&mut self, value: f64) {
        *self = Self::merge(self, &Self::from_value(value));
    }

    /// Merge two stats using weighted combination.
    ///
    /// Uses Chan's parallel form of Welford's algorithm for the variance.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn merge(a: &Self, b: &Self) -> Self {
        if a.sample_count == 0 {
            return *b;
        }
        if b.sample_count == 0 {
            return *a;
        }

        let n_a = a.sample_count as f64;
        let n_b = b.sample_count as f64;
        let n_total = n_a + n_b;

        let delta = b.mean - a.mean;
        let mean = a.mean + delta * (n_b / n_total);

        let variance =
            (a.variance * n_a + b.variance * n_b + delta * delta * n_a * n_b / n_total) / n_total;

        Self {
            mean,
            variance,
            min: a.min.min(b.min),
            max: a.max.max(b.max),
            sample_count: a.sample_count + b.sample_count,
        }
    }

    /// Merge multiple stats, in order.
    #[must_use]
    pub fn merge_many(stats: &[Self]) -> Self {
        stats
            .iter()
            .fold(Self::empty(), |acc, s| Self::merge(&acc, s))
    }

    /// Standard deviation.
    #[must_use]
    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }

    /// Sum of all samples.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn sum(&self) -> f64 {
        self.mean * self.sample_count as f64
    }

    /// True if no samples were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }
}

impl Default for ScalarStats {
    fn default() -> Self {
        Self::empty()
    }
}
