//! Spell costs.
//!
//! How much of which resource a spell costs is a [`CostPolicy`], bound 1:1
//! to the spell through its [`SpellCost`] at registration. The policy decides
//! affordability, spends, and refunds; the spell only carries the numbers
//! spell mods rewrite (`multiplier`, `flat_modifier`).
//!
//! Built-in policies are [`RageCost`](crate::resource::RageCost) and
//! [`ManaCost`](crate::resource::ManaCost). Anything else plugs in through
//! [`CostOptions::Custom`].

use std::fmt;
use std::sync::Arc;

use crate::error::{SimError, SimResult};
use crate::metrics::{ActionId, ResourceMetricsId};
use crate::resource::{ManaCost, ManaCostOptions, PowerType, RageCost, RageCostOptions};
use crate::simulation::Simulation;
use crate::spell::SpellRef;
use crate::unit::UnitId;

/// Strategy deciding how a spell pays for itself.
///
/// Methods take the spell by handle and the whole simulation, since paying
/// a cost mutates the caster's bar and metrics.
pub trait CostPolicy: Send + Sync + fmt::Debug {
    /// Resource this policy spends.
    fn power_type(&self) -> PowerType;

    /// Metrics the spend is attributed to.
    fn resource_metrics(&self) -> ResourceMetricsId;

    /// Compute the current effective cost into the spell's current cast and
    /// report whether the caster can afford it.
    ///
    /// # Errors
    ///
    /// Unknown spell or unit, or a caster without a bar.
    fn meets_requirement(&self, sim: &mut Simulation, spell: SpellRef) -> SimResult<bool>;

    /// Human-readable reason the last requirement check failed.
    ///
    /// # Errors
    ///
    /// Unknown spell or unit, or a caster without a bar.
    fn cost_failure_reason(&self, sim: &Simulation, spell: SpellRef) -> SimResult<String>;

    /// Pay the current-cast cost.
    ///
    /// # Errors
    ///
    /// Propagates resource bar errors.
    fn spend_cost(&self, sim: &mut Simulation, spell: SpellRef) -> SimResult<()>;

    /// Give back the configured refund, if any.
    ///
    /// # Errors
    ///
    /// Propagates resource bar errors.
    fn issue_refund(&self, sim: &mut Simulation, spell: SpellRef) -> SimResult<()>;
}

// =============================================================================
// SpellCost
// =============================================================================

/// The numbers behind a spell's cost plus its policy.
#[derive(Debug, Clone)]
pub struct SpellCost {
    /// Unmodified cost.
    pub base_cost: f64,
    /// Percentage multiplier; 100 is unmodified.
    pub multiplier: i32,
    /// Flat adjustment added after the multiplier.
    pub flat_modifier: i32,
    policy: Arc<dyn CostPolicy>,
}

impl SpellCost {
    /// Unmodified cost bound to `policy`.
    #[must_use]
    pub fn new(base_cost: f64, policy: Arc<dyn CostPolicy>) -> Self {
        Self {
            base_cost,
            multiplier: 100,
            flat_modifier: 0,
            policy,
        }
    }

    /// `max(0, base × multiplier / 100 + flat)`.
    #[must_use]
    pub fn current_cost(&self) -> f64 {
        (self.base_cost * f64::from(self.multiplier) / 100.0 + f64::from(self.flat_modifier))
            .max(0.0)
    }

    /// The policy.
    #[must_use]
    pub fn policy(&self) -> &Arc<dyn CostPolicy> {
        &self.policy
    }
}

/// Cost configuration supplied at spell registration.
#[derive(Debug, Clone)]
pub enum CostOptions {
    /// Rage cost with optional refund.
    Rage(RageCostOptions),
    /// Mana cost relative to base mana.
    Mana(ManaCostOptions),
    /// Caller-supplied policy.
    Custom {
        /// Unmodified cost.
        base_cost: f64,
        /// The policy.
        policy: Arc<dyn CostPolicy>,
    },
}

// =============================================================================
// Simulation surface
// =============================================================================

impl Simulation {
    pub(crate) fn build_spell_cost(
        &mut self,
        unit: UnitId,
        action: ActionId,
        options: &CostOptions,
    ) -> SimResult<SpellCost> {
        match options {
            CostOptions::Rage(options) => RageCost::build(self, unit, action, options),
            CostOptions::Mana(options) => ManaCost::build(self, unit, action, options),
            CostOptions::Custom { base_cost, policy } => {
                Ok(SpellCost::new(*base_cost, Arc::clone(policy)))
            }
        }
    }

    fn cost_policy(&self, spell: SpellRef) -> SimResult<Option<Arc<dyn CostPolicy>>> {
        Ok(self
            .spell(spell)?
            .cost
            .as_ref()
            .map(|cost| Arc::clone(cost.policy())))
    }

    /// Store the spell's current effective cost in its current cast and
    /// return it. Zero for spells without a cost.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownSpell`].
    pub fn refresh_current_cost(&mut self, spell: SpellRef) -> SimResult<f64> {
        let spell = self.spell_mut(spell)?;
        let cost = spell.cost.as_ref().map_or(0.0, SpellCost::current_cost);
        spell.current_cast.cost = cost;
        Ok(cost)
    }

    /// Whether the caster can pay the spell's current cost. Spells without
    /// a cost always can.
    ///
    /// # Errors
    ///
    /// Unknown handles, or a caster without the bar the policy needs.
    pub fn meets_cost_requirement(&mut self, spell: SpellRef) -> SimResult<bool> {
        match self.cost_policy(spell)? {
            Some(policy) => policy.meets_requirement(self, spell),
            None => Ok(true),
        }
    }

    /// Diagnostic for a failed [`Simulation::meets_cost_requirement`].
    ///
    /// # Errors
    ///
    /// Unknown handles, or a caster without the bar the policy needs.
    pub fn cost_failure_reason(&self, spell: SpellRef) -> SimResult<Option<String>> {
        match self.cost_policy(spell)? {
            Some(policy) => policy.cost_failure_reason(self, spell).map(Some),
            None => Ok(None),
        }
    }

    /// Pay the spell's current-cast cost.
    ///
    /// # Errors
    ///
    /// Propagates resource bar errors.
    pub fn spend_cost(&mut self, spell: SpellRef) -> SimResult<()> {
        match self.cost_policy(spell)? {
            Some(policy) => policy.spend_cost(self, spell),
            None => Ok(()),
        }
    }

    /// Refund part of the spell's cost (for example on a miss).
    ///
    /// # Errors
    ///
    /// Propagates resource bar errors.
    pub fn issue_refund(&mut self, spell: SpellRef) -> SimResult<()> {
        match self.cost_policy(spell)? {
            Some(policy) => policy.issue_refund(self, spell),
            None => Ok(()),
        }
    }
}

/// Check the unit has a bar of the given power type.
pub(crate) fn require_power(sim: &Simulation, unit: UnitId, expected: PowerType) -> SimResult<()> {
    let actual = sim.resource_bar(unit)?.power();
    if actual == expected {
        Ok(())
    } else {
        Err(SimError::PowerTypeMismatch {
            unit,
            expected,
            actual,
        })
    }
}
