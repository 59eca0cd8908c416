//! # Combatsim Core
//!
//! Deterministic simulation core of a combat-outcome calculator.
//!
//! A simulation holds a roster of units with spells, a virtual clock of
//! one-shot pending actions, resource bars, spell costs, reversible spell
//! modifiers and auras. It runs many independent, reseeded iterations of
//! one encounter and summarizes damage, resource flow and aura uptime.
//!
//! ## Architecture
//!
//! - **Clock**: `(due_at, seq)`-ordered min-heap; ties run FIFO
//! - **Resources**: clamped bars (rage, mana) mutated only through
//!   attributed gains and spends
//! - **Costs**: a [`cost::CostPolicy`] per spell decides affordability,
//!   spends and refunds
//! - **Spell mods**: tag-matched, exactly reversible field transforms
//! - **Auras**: timed states with a fixed hook set, dispatched over
//!   snapshots with execution-time guards
//! - **Runner**: batches of iterations in parallel, merged in batch order
//!
//! ## Usage
//!
//! ```
//! use combatsim_core::prelude::*;
//!
//! fn scenario(sim: &mut Simulation) -> SimResult<()> {
//!     let warrior = sim.add_unit(UnitConfig::new("Warrior", 60))?;
//!     sim.enable_rage_bar(warrior, &RageBarOptions::default())?;
//!     Ok(())
//! }
//!
//! let config = SimulationConfig::with_iterations(8)
//!     .with_batch_size(4)
//!     .with_duration(SimTime::from_secs(30));
//! let report = Runner::run(&config, &scenario).unwrap();
//!
//! assert_eq!(report.iterations, 8);
//! assert_eq!(report.aura(UnitId::new(0), "RageBar").unwrap().uptime.mean, 30.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod aura;
pub mod clock;
pub mod config;
pub mod cost;
pub mod error;
pub mod hash;
pub mod metrics;
pub mod resource;
pub mod runner;
pub mod simulation;
pub mod spell;
pub mod spell_mod;
pub mod time;
pub mod unit;

#[cfg(test)]
mod tests;

/// The types most scenarios need.
pub mod prelude {
    pub use crate::aura::{AuraConfig, AuraRef};
    pub use crate::config::SimulationConfig;
    pub use crate::cost::CostOptions;
    pub use crate::error::{SimError, SimResult};
    pub use crate::metrics::{ActionId, OtherAction};
    pub use crate::resource::{
        ManaBarOptions, ManaCostOptions, PowerType, RageBarOptions, RageCostOptions,
    };
    pub use crate::runner::{Runner, Scenario, SimReport};
    pub use crate::simulation::Simulation;
    pub use crate::spell::{HitOutcome, ProcMask, SpellConfig, SpellRef, SpellSchool};
    pub use crate::spell_mod::{SpellModConfig, SpellModKind, SpellModRef};
    pub use crate::time::SimTime;
    pub use crate::unit::{UnitConfig, UnitId};
}
