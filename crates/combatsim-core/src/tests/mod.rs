//! Crate-level tests.
//!
//! - `determinism.rs`: same seed, same report, whatever the thread count
//! - `integration.rs`: resource flow, casting, spell mods and auras working
//!   together inside a running simulation
//! - `helpers.rs`: scenario builders and test-only cost policies

pub mod helpers;
mod integration;

pub use helpers::*;
