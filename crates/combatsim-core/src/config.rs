//! Run configuration.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::time::SimTime;

/// Configuration shared read-only by every worker of a run.
///
/// # Example
///
/// ```
/// use combatsim_core::config::SimulationConfig;
/// use combatsim_core::time::SimTime;
///
/// let config = SimulationConfig::with_iterations(200)
///     .with_seed(7)
///     .with_duration(SimTime::from_secs(60));
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.batch_count(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of independent iterations to run.
    pub iterations: u64,
    /// Base seed; iteration `i` is seeded with `seed.wrapping_add(i)`.
    pub seed: u64,
    /// Encounter length of every iteration.
    pub duration: SimTime,
    /// When true, resource gains do not trigger rotation re-evaluation.
    pub interactive: bool,
    /// Iterations per parallel work unit.
    pub batch_size: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            seed: 0,
            duration: SimTime::from_secs(180),
            interactive: false,
            batch_size: 64,
        }
    }
}

impl SimulationConfig {
    /// Default configuration with the given iteration count.
    #[must_use]
    pub fn with_iterations(iterations: u64) -> Self {
        Self {
            iterations,
            ..Self::default()
        }
    }

    /// Set the base seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the encounter duration.
    #[must_use]
    pub fn with_duration(mut self, duration: SimTime) -> Self {
        self.duration = duration;
        self
    }

    /// Set the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set interactive mode.
    #[must_use]
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Seed for iteration `index`.
    #[must_use]
    pub fn iteration_seed(&self, index: u64) -> u64 {
        self.seed.wrapping_add(index)
    }

    /// Number of batches the iterations split into.
    #[must_use]
    pub fn batch_count(&self) -> u64 {
        if self.batch_size == 0 {
            return 0;
        }
        self.iterations.div_ceil(self.batch_size)
    }

    /// Check the configuration is runnable.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] for zero iterations, a
    /// non-positive duration or a zero batch size.
    pub fn validate(&self) -> SimResult<()> {
        if self.iterations == 0 {
            return Err(SimError::InvalidConfig("iterations must be > 0".into()));
        }
        if self.duration <= SimTime::ZERO || self.duration.is_never() {
            return Err(SimError::InvalidConfig(format!(
                "duration must be positive and finite, got {}",
                self.duration
            )));
        }
        if self.batch_size == 0 {
            return Err(SimError::InvalidConfig("batch_size must be > 0".into()));
        }
        Ok(())
    }
}
