//! Parallel Monte Carlo runner and its report.
//!
//! Iterations are split into fixed-size batches. Each batch builds its own
//! [`Simulation`] through the [`Scenario`], runs its iterations on it, and
//! produces a [`SimReport`]. Batches run in parallel with rayon; their
//! reports are merged in batch order, so the final report does not depend
//! on the number of threads.

use rayon::prelude::*;
use serde::Serialize;
use tally::ScalarStats;
use tracing::info;

use crate::config::SimulationConfig;
use crate::error::{SimError, SimResult};
use crate::metrics::ActionId;
use crate::resource::PowerType;
use crate::simulation::Simulation;
use crate::unit::UnitId;

// =============================================================================
// Scenario
// =============================================================================

/// Builds the roster of a fresh simulation.
pub trait Scenario: Send + Sync {
    /// Register units, bars, spells, mods, auras and rotations on `sim`.
    ///
    /// # Errors
    ///
    /// Any registration error aborts the run.
    fn build(&self, sim: &mut Simulation) -> SimResult<()>;
}

impl<F> Scenario for F
where
    F: Fn(&mut Simulation) -> SimResult<()> + Send + Sync,
{
    fn build(&self, sim: &mut Simulation) -> SimResult<()> {
        self(sim)
    }
}

// =============================================================================
// Report
// =============================================================================

/// Damage summary of one unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitReport {
    /// Unit.
    pub unit: UnitId,
    /// Display label.
    pub label: String,
    /// Damage per second.
    pub dps: ScalarStats,
}

/// Flow of one resource metrics record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceReport {
    /// Owning unit.
    pub unit: UnitId,
    /// Attributed action.
    pub action: ActionId,
    /// Resource type.
    pub power: PowerType,
    /// Actual gain (negative for spends) per iteration.
    pub gain: ScalarStats,
    /// Requested amount per iteration.
    pub requested: ScalarStats,
    /// Events per iteration.
    pub events: ScalarStats,
}

/// Casts and damage of one spell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpellReport {
    /// Owning unit.
    pub unit: UnitId,
    /// Spell action.
    pub action: ActionId,
    /// Casts per iteration.
    pub casts: ScalarStats,
    /// Hits per iteration.
    pub hits: ScalarStats,
    /// Damage per iteration.
    pub damage: ScalarStats,
}

/// Uptime of one aura.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuraReport {
    /// Owning unit.
    pub unit: UnitId,
    /// Display label.
    pub label: String,
    /// Seconds active per iteration.
    pub uptime: ScalarStats,
    /// Activations per iteration.
    pub activations: ScalarStats,
}

impl AuraReport {
    /// Mean fraction of the encounter the aura was active.
    #[must_use]
    pub fn uptime_fraction(&self, duration_secs: f64) -> f64 {
        if duration_secs > 0.0 {
            self.uptime.mean / duration_secs
        } else {
            0.0
        }
    }
}

/// Aggregated result of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimReport {
    /// Iterations summarized.
    pub iterations: u64,
    /// Encounter length in seconds.
    pub duration_secs: f64,
    /// Per unit.
    pub units: Vec<UnitReport>,
    /// Per resource metrics record, in creation order.
    pub resources: Vec<ResourceReport>,
    /// Per spell, by unit then registration order.
    pub spells: Vec<SpellReport>,
    /// Per aura, by unit then registration order.
    pub auras: Vec<AuraReport>,
}

impl SimReport {
    /// Combine two reports of the same scenario.
    ///
    /// # Errors
    ///
    /// [`SimError::ReportMismatch`] when the reports describe different
    /// rosters.
    pub fn merge(a: &Self, b: &Self) -> SimResult<Self> {
        if a.iterations == 0 {
            return Ok(b.clone());
        }
        if b.iterations == 0 {
            return Ok(a.clone());
        }
        if a.units.len() != b.units.len()
            || a.resources.len() != b.resources.len()
            || a.spells.len() != b.spells.len()
            || a.auras.len() != b.auras.len()
        {
            return Err(SimError::ReportMismatch(
                "reports have different rosters".into(),
            ));
        }
        if a.duration_secs.to_bits() != b.duration_secs.to_bits() {
            return Err(SimError::ReportMismatch(
                "reports have different durations".into(),
            ));
        }

        let units = a
            .units
            .iter()
            .zip(&b.units)
            .map(|(x, y)| {
                check(x.unit == y.unit, "unit")?;
                Ok(UnitReport {
                    unit: x.unit,
                    label: x.label.clone(),
                    dps: ScalarStats::merge(&x.dps, &y.dps),
                })
            })
            .collect::<SimResult<Vec<_>>>()?;

        let resources = a
            .resources
            .iter()
            .zip(&b.resources)
            .map(|(x, y)| {
                check(x.unit == y.unit && x.action == y.action, "resource")?;
                Ok(ResourceReport {
                    unit: x.unit,
                    action: x.action,
                    power: x.power,
                    gain: ScalarStats::merge(&x.gain, &y.gain),
                    requested: ScalarStats::merge(&x.requested, &y.requested),
                    events: ScalarStats::merge(&x.events, &y.events),
                })
            })
            .collect::<SimResult<Vec<_>>>()?;

        let spells = a
            .spells
            .iter()
            .zip(&b.spells)
            .map(|(x, y)| {
                check(x.unit == y.unit && x.action == y.action, "spell")?;
                Ok(SpellReport {
                    unit: x.unit,
                    action: x.action,
                    casts: ScalarStats::merge(&x.casts, &y.casts),
                    hits: ScalarStats::merge(&x.hits, &y.hits),
                    damage: ScalarStats::merge(&x.damage, &y.damage),
                })
            })
            .collect::<SimResult<Vec<_>>>()?;

        let auras = a
            .auras
            .iter()
            .zip(&b.auras)
            .map(|(x, y)| {
                check(x.unit == y.unit && x.label == y.label, "aura")?;
                Ok(AuraReport {
                    unit: x.unit,
                    label: x.label.clone(),
                    uptime: ScalarStats::merge(&x.uptime, &y.uptime),
                    activations: ScalarStats::merge(&x.activations, &y.activations),
                })
            })
            .collect::<SimResult<Vec<_>>>()?;

        Ok(Self {
            iterations: a.iterations + b.iterations,
            duration_secs: a.duration_secs,
            units,
            resources,
            spells,
            auras,
        })
    }

    /// Resource report for `action` on `unit`.
    #[must_use]
    pub fn resource(&self, unit: UnitId, action: ActionId) -> Option<&ResourceReport> {
        self.resources
            .iter()
            .find(|r| r.unit == unit && r.action == action)
    }

    /// Aura report by label.
    #[must_use]
    pub fn aura(&self, unit: UnitId, label: &str) -> Option<&AuraReport> {
        self.auras.iter().find(|a| a.unit == unit && a.label == label)
    }
}

fn check(same: bool, what: &str) -> SimResult<()> {
    if same {
        Ok(())
    } else {
        Err(SimError::ReportMismatch(format!("{what} entries differ")))
    }
}

impl Simulation {
    /// Summary of every iteration committed on this simulation.
    #[must_use]
    pub fn report(&self) -> SimReport {
        let units = self
            .units()
            .iter()
            .map(|unit| UnitReport {
                unit: unit.id(),
                label: unit.label().to_string(),
                dps: *unit.dps(),
            })
            .collect();

        let resources = self
            .metrics()
            .resources()
            .map(|(_, m)| ResourceReport {
                unit: m.unit(),
                action: m.action(),
                power: m.power(),
                gain: *m.gain().value_stats(),
                requested: *m.requested_stats(),
                events: *m.gain().event_stats(),
            })
            .collect();

        let spells = self
            .units()
            .iter()
            .flat_map(|unit| unit.spells().iter())
            .map(|spell| SpellReport {
                unit: spell.unit(),
                action: spell.action_id,
                casts: *spell.metrics.casts.event_stats(),
                hits: *spell.metrics.damage.event_stats(),
                damage: *spell.metrics.damage.value_stats(),
            })
            .collect();

        let auras = self
            .units()
            .iter()
            .flat_map(|unit| unit.auras().iter())
            .map(|aura| AuraReport {
                unit: aura.handle().unit,
                label: aura.label().to_string(),
                uptime: *aura.activity().value_stats(),
                activations: *aura.activity().event_stats(),
            })
            .collect();

        SimReport {
            iterations: self.completed_iterations(),
            duration_secs: self.config().duration.as_secs_f64(),
            units,
            resources,
            spells,
            auras,
        }
    }
}

// =============================================================================
// Runner
// =============================================================================

/// Runs a scenario for the configured number of iterations.
#[derive(Debug, Clone, Copy, Default)]
pub struct Runner;

impl Runner {
    /// Run `config.iterations` iterations of `scenario` and merge the
    /// per-batch reports in batch order.
    ///
    /// # Errors
    ///
    /// [`SimError::InvalidConfig`] for an invalid configuration; otherwise
    /// the error of the lowest failing batch. No partial report is
    /// returned.
    pub fn run(config: &SimulationConfig, scenario: &dyn Scenario) -> SimResult<SimReport> {
        config.validate()?;
        let batches = config.batch_count();
        info!(
            iterations = config.iterations,
            batches,
            seed = config.seed,
            "Starting run"
        );

        let reports: Vec<SimResult<SimReport>> = (0..batches)
            .into_par_iter()
            .map(|batch| run_batch(config, scenario, batch))
            .collect();

        let mut merged: Option<SimReport> = None;
        for report in reports {
            let report = report?;
            merged = Some(match merged {
                Some(acc) => SimReport::merge(&acc, &report)?,
                None => report,
            });
        }
        let report = merged.ok_or_else(|| SimError::InvalidConfig("no batches to run".into()))?;

        info!(iterations = report.iterations, "Run finished");
        Ok(report)
    }
}

fn run_batch(config: &SimulationConfig, scenario: &dyn Scenario, batch: u64) -> SimResult<SimReport> {
    let start = batch * config.batch_size;
    let end = (start + config.batch_size).min(config.iterations);

    let mut sim = Simulation::new(config.clone());
    scenario.build(&mut sim)?;
    sim.finalize()?;
    for index in start..end {
        sim.run_iteration(index)?;
    }
    Ok(sim.report())
}
