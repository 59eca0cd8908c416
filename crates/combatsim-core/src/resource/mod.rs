//! Resource bars.
//!
//! A [`ResourceBar`] is a capped pool owned by exactly one unit. It only
//! changes through [`Simulation::add_resource`] and
//! [`Simulation::spend_resource`], each of which attributes the change to a
//! [`ResourceMetricsId`].
//!
//! - Gains clamp at capacity and are visible immediately. The unit's
//!   resource-change hooks and rotation re-evaluation are scheduled one
//!   [`SimTime::GRANULARITY`] later, never run inside the mutation.
//! - Spends subtract without clamping (affordability is checked beforehand
//!   by the cost policy) and fire the resource-change hooks synchronously.
//!
//! Concrete bars: [`rage`] and [`mana`].

pub mod mana;
pub mod rage;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{SimError, SimResult};
use crate::metrics::ResourceMetricsId;
use crate::simulation::Simulation;
use crate::time::SimTime;
use crate::unit::UnitId;

pub use mana::{ManaBarOptions, ManaCost, ManaCostOptions};
pub use rage::{RageBarOptions, RageCost, RageCostOptions};

/// Kind of resource a bar holds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PowerType {
    /// Generated by dealing and taking damage, capped at 100.
    Rage,
    /// Starts full, capped at the unit's maximum mana.
    Mana,
}

impl fmt::Display for PowerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rage => write!(f, "rage"),
            Self::Mana => write!(f, "mana"),
        }
    }
}

/// Outcome of a single bar mutation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ResourceChange {
    /// Amount asked for (negative for spends).
    pub requested: f64,
    /// Net change applied.
    pub actual: f64,
    /// Value before the change.
    pub before: f64,
    /// Value after the change.
    pub after: f64,
}

// =============================================================================
// ResourceBar
// =============================================================================

/// Capped resource pool with generation modifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceBar {
    power: PowerType,
    current: f64,
    capacity: f64,
    starting: f64,
    base_value: f64,
    damage_dealt_multiplier: f64,
    damage_taken_multiplier: f64,
    flat_damage_dealt_bonus: f64,
    flat_damage_taken_bonus: f64,
    refund_metrics: Option<ResourceMetricsId>,
}

impl ResourceBar {
    /// New bar. `starting` is clamped to `[0, capacity]`.
    #[must_use]
    pub fn new(power: PowerType, capacity: f64, starting: f64) -> Self {
        let starting = starting.clamp(0.0, capacity);
        Self {
            power,
            current: starting,
            capacity,
            starting,
            base_value: capacity,
            damage_dealt_multiplier: 1.0,
            damage_taken_multiplier: 1.0,
            flat_damage_dealt_bonus: 0.0,
            flat_damage_taken_bonus: 0.0,
            refund_metrics: None,
        }
    }

    /// Power type.
    #[must_use]
    pub fn power(&self) -> PowerType {
        self.power
    }

    /// Current value.
    #[must_use]
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Maximum value.
    #[must_use]
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Value restored at every iteration start.
    #[must_use]
    pub fn starting(&self) -> f64 {
        self.starting
    }

    /// Reference value percentage costs are computed from (base mana).
    #[must_use]
    pub fn base_value(&self) -> f64 {
        self.base_value
    }

    /// Set the reference value for percentage costs.
    pub fn set_base_value(&mut self, base_value: f64) {
        self.base_value = base_value;
    }

    /// Bar-wide refund metrics, if the bar has one.
    #[must_use]
    pub fn refund_metrics(&self) -> Option<ResourceMetricsId> {
        self.refund_metrics
    }

    pub(crate) fn set_refund_metrics(&mut self, metrics: ResourceMetricsId) {
        self.refund_metrics = Some(metrics);
    }

    /// Multiplier applied to resource generated from damage dealt.
    #[must_use]
    pub fn damage_dealt_multiplier(&self) -> f64 {
        self.damage_dealt_multiplier
    }

    /// Multiplier applied to resource generated from damage taken.
    #[must_use]
    pub fn damage_taken_multiplier(&self) -> f64 {
        self.damage_taken_multiplier
    }

    /// Flat bonus added to resource generated from damage dealt.
    #[must_use]
    pub fn flat_damage_dealt_bonus(&self) -> f64 {
        self.flat_damage_dealt_bonus
    }

    /// Flat bonus added to resource generated from damage taken.
    #[must_use]
    pub fn flat_damage_taken_bonus(&self) -> f64 {
        self.flat_damage_taken_bonus
    }

    /// Scale generation from damage dealt.
    pub fn add_damage_dealt_multiplier(&mut self, multiplier: f64) {
        self.damage_dealt_multiplier *= multiplier;
    }

    /// Scale generation from damage taken.
    pub fn add_damage_taken_multiplier(&mut self, multiplier: f64) {
        self.damage_taken_multiplier *= multiplier;
    }

    /// Add a flat bonus to generation from damage dealt.
    pub fn add_damage_dealt_bonus(&mut self, bonus: f64) {
        self.flat_damage_dealt_bonus += bonus;
    }

    /// Add a flat bonus to generation from damage taken.
    pub fn add_damage_taken_bonus(&mut self, bonus: f64) {
        self.flat_damage_taken_bonus += bonus;
    }

    pub(crate) fn set_damage_multipliers(&mut self, dealt: f64, taken: f64) {
        self.damage_dealt_multiplier = dealt;
        self.damage_taken_multiplier = taken;
    }

    /// Add `amount`, clamped at capacity.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NegativeGain`] if `amount` is negative or NaN.
    pub fn gain(&mut self, amount: f64) -> SimResult<ResourceChange> {
        if amount.is_nan() || amount < 0.0 {
            return Err(SimError::NegativeGain {
                power: self.power,
                amount,
            });
        }
        let before = self.current;
        let after = (before + amount).min(self.capacity);
        self.current = after;
        Ok(ResourceChange {
            requested: amount,
            actual: after - before,
            before,
            after,
        })
    }

    /// Subtract `amount` without clamping.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NegativeSpend`] if `amount` is negative or NaN.
    pub fn spend(&mut self, amount: f64) -> SimResult<ResourceChange> {
        if amount.is_nan() || amount < 0.0 {
            return Err(SimError::NegativeSpend {
                power: self.power,
                amount,
            });
        }
        let before = self.current;
        let after = before - amount;
        self.current = after;
        Ok(ResourceChange {
            requested: -amount,
            actual: -amount,
            before,
            after,
        })
    }

    /// Restore the starting value.
    pub fn reset(&mut self) {
        self.current = self.starting;
    }
}

// =============================================================================
// Simulation surface
// =============================================================================

impl Simulation {
    /// The unit's resource bar.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownUnit`] or [`SimError::NoResourceBar`].
    pub fn resource_bar(&self, unit: UnitId) -> SimResult<&ResourceBar> {
        self.unit(unit)?
            .resource_bar()
            .ok_or(SimError::NoResourceBar { unit })
    }

    /// The unit's resource bar, mutably. Meant for setup (generation
    /// modifiers); use [`Simulation::add_resource`] and
    /// [`Simulation::spend_resource`] to change the value.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownUnit`] or [`SimError::NoResourceBar`].
    pub fn resource_bar_mut(&mut self, unit: UnitId) -> SimResult<&mut ResourceBar> {
        self.unit_mut(unit)?
            .resource_bar_mut()
            .ok_or(SimError::NoResourceBar { unit })
    }

    /// Current value of the unit's bar.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownUnit`] or [`SimError::NoResourceBar`].
    pub fn current_resource(&self, unit: UnitId) -> SimResult<f64> {
        Ok(self.resource_bar(unit)?.current())
    }

    /// Add `amount` to the unit's bar, attributed to `metrics`.
    ///
    /// The new value is visible immediately. At `now + GRANULARITY` the
    /// unit's resource-change hooks run and, unless the simulation is
    /// interactive, its rotation is re-evaluated.
    ///
    /// # Errors
    ///
    /// [`SimError::NegativeGain`] for a negative amount, or an unknown
    /// unit, bar or metrics handle.
    pub fn add_resource(
        &mut self,
        unit: UnitId,
        amount: f64,
        metrics: ResourceMetricsId,
    ) -> SimResult<()> {
        let action = self.metrics().resource(metrics)?.action();
        let change = self.resource_bar_mut(unit)?.gain(amount)?;
        self.metrics_mut()
            .resource_mut(metrics)?
            .add_event(change.requested, change.actual);

        trace!(
            unit = %unit,
            now = %self.now(),
            "Gained {:.3} from {} ({:.3} --> {:.3})",
            amount,
            action,
            change.before,
            change.after
        );

        let interactive = self.config().interactive;
        self.schedule_in(SimTime::GRANULARITY, move |sim: &mut Simulation| {
            sim.dispatch_resource_change(unit, metrics)?;
            if !interactive {
                sim.react(unit)?;
            }
            Ok(())
        })
    }

    /// Spend `amount` from the unit's bar, attributed to `metrics`.
    ///
    /// # Errors
    ///
    /// [`SimError::NegativeSpend`] for a negative amount, or an unknown
    /// unit, bar or metrics handle.
    pub fn spend_resource(
        &mut self,
        unit: UnitId,
        amount: f64,
        metrics: ResourceMetricsId,
    ) -> SimResult<()> {
        let action = self.metrics().resource(metrics)?.action();
        let change = self.resource_bar_mut(unit)?.spend(amount)?;
        self.metrics_mut()
            .resource_mut(metrics)?
            .add_event(change.requested, change.actual);

        trace!(
            unit = %unit,
            now = %self.now(),
            "Spent {:.3} from {} ({:.3} --> {:.3})",
            amount,
            action,
            change.before,
            change.after
        );

        self.dispatch_resource_change(unit, metrics)
    }
}
