//! # Tally
//!
//! Statistical accumulators for repeated, independently seeded simulation
//! iterations.
//!
//! A simulation run produces one sample per iteration for every quantity it
//! tracks (damage done by a spell, rage gained from a source, aura uptime).
//! Tally keeps those samples as compact summaries instead of raw vectors:
//!
//! - **[`ScalarStats`]**: mean, variance, min, max and sample count, with an
//!   exact parallel merge so per-worker summaries can be combined afterwards
//! - **[`IterationTally`]**: a running value plus event count for the current
//!   iteration, committed into a pair of [`ScalarStats`] when the iteration ends
//!
//! ## Quick Start
//!
//! ```
//! use tally::IterationTally;
//!
//! let mut damage = IterationTally::new();
//!
//! // Iteration 1
//! damage.record(120.0);
//! damage.record(80.0);
//! damage.done_iteration();
//!
//! // Iteration 2
//! damage.record(300.0);
//! damage.done_iteration();
//!
//! assert_eq!(damage.value_stats().sample_count, 2);
//! assert!((damage.value_stats().mean - 250.0).abs() < 1e-9);
//! assert!((damage.event_stats().mean - 1.5).abs() < 1e-9);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod counter;
pub mod stats;

// Re-exports for convenience
pub use counter::IterationTally;
pub use stats::ScalarStats;
