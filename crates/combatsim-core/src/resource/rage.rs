//! Rage: a resource generated by dealing and taking damage.
//!
//! Generation converts damage into rage through a level-dependent
//! conversion factor:
//!
//! ```text
//! generated = damage × coefficient / conversion(level) × multiplier + flat
//! ```
//!
//! Damage dealt uses coefficient 7.5, the unit's own level, and only counts
//! main-hand and off-hand auto attacks. Misses generate nothing; dodges and
//! parries generate from the damage the swing would have dealt. Damage taken
//! uses coefficient 2.5 and the attacker's level.
//!
//! # Example
//!
//! ```
//! use combatsim_core::resource::rage::{rage_conversion, rage_from_damage, DAMAGE_DEALT_COEFFICIENT};
//!
//! assert_eq!(rage_conversion(25), 82.25);
//! assert_eq!(rage_conversion(40), 140.5);
//!
//! let rage = rage_from_damage(140.5, DAMAGE_DEALT_COEFFICIENT, 40, 1.0, 0.0);
//! assert!((rage - 7.5).abs() < 1e-12);
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::aura::{AuraConfig, AuraRef};
use crate::cost::{require_power, CostPolicy, SpellCost};
use crate::error::{SimError, SimResult};
use crate::metrics::{ActionId, OtherAction, ResourceMetricsId};
use crate::resource::{PowerType, ResourceBar};
use crate::simulation::Simulation;
use crate::spell::{HitOutcome, ProcMask, SpellHit, SpellRef};
use crate::time::SimTime;
use crate::unit::UnitId;

/// Rage cap.
pub const MAX_RAGE: f64 = 100.0;

/// Coefficient for rage generated by damage dealt.
pub const DAMAGE_DEALT_COEFFICIENT: f64 = 7.5;

/// Coefficient for rage generated by damage taken.
pub const DAMAGE_TAKEN_COEFFICIENT: f64 = 2.5;

/// Label of the aura that drives rage generation.
pub const RAGE_BAR_AURA: &str = "RageBar";

/// Damage-to-rage conversion factor for an attacker of `level`.
///
/// Levels 25 and 40 are measured values; the rest are empirical quadratic
/// fits, one below level 45 and one from 45 up.
///
/// `L²` is a true square. Tables that evaluate the fit with a bitwise
/// `L ^ 2` give about 198.37 at level 60 instead of 230.6.
#[must_use]
pub fn rage_conversion(level: i32) -> f64 {
    let l = f64::from(level);
    match level {
        25 => 82.25,
        40 => 140.5,
        _ if level < 45 => 0.0215 * (l * l) + 2.66 * l + 0.89,
        _ => 0.009_110_783_6 * (l * l) + 3.225_598_133 * l + 4.265_291_1,
    }
}

/// Rage generated from `damage`.
#[must_use]
pub fn rage_from_damage(
    damage: f64,
    coefficient: f64,
    level: i32,
    multiplier: f64,
    flat_bonus: f64,
) -> f64 {
    damage * coefficient / rage_conversion(level) * multiplier + flat_bonus
}

// =============================================================================
// Rage bar
// =============================================================================

/// Options for [`Simulation::enable_rage_bar`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RageBarOptions {
    /// Rage at every iteration start; clamped to `[0, 100]`.
    pub starting_rage: f64,
    /// Multiplier on rage from damage dealt.
    pub damage_dealt_multiplier: f64,
    /// Multiplier on rage from damage taken.
    pub damage_taken_multiplier: f64,
}

impl Default for RageBarOptions {
    fn default() -> Self {
        Self {
            starting_rage: 0.0,
            damage_dealt_multiplier: 1.0,
            damage_taken_multiplier: 1.0,
        }
    }
}

impl Simulation {
    /// Give `unit` a rage bar.
    ///
    /// Registers the never-expiring "RageBar" aura, which activates on every
    /// iteration reset and converts hits dealt and taken into rage. Also
    /// creates the unit's "damage taken" and bar-wide "refund" metrics.
    ///
    /// # Errors
    ///
    /// Unknown unit, or [`SimError::RegistrationClosed`] after finalize.
    pub fn enable_rage_bar(&mut self, unit: UnitId, options: &RageBarOptions) -> SimResult<AuraRef> {
        self.ensure_registration_open(unit)?;

        let damage_taken = self.metrics_mut().new_resource_metrics(
            unit,
            ActionId::other(OtherAction::DamageTaken),
            PowerType::Rage,
        );
        let refund = self.metrics_mut().new_resource_metrics(
            unit,
            ActionId::other(OtherAction::Refund),
            PowerType::Rage,
        );

        let mut bar = ResourceBar::new(PowerType::Rage, MAX_RAGE, options.starting_rage);
        bar.set_damage_multipliers(
            options.damage_dealt_multiplier,
            options.damage_taken_multiplier,
        );
        bar.set_refund_metrics(refund);
        self.unit_mut(unit)?.set_resource_bar(bar);

        let config = AuraConfig::new(RAGE_BAR_AURA)
            .with_duration(SimTime::NEVER)
            .on_init(move |sim, _aura| sim.init_auto_attack_rage_metrics(unit))
            .on_reset(|sim, aura| sim.activate_aura(aura))
            .on_spell_hit_dealt(move |sim, _aura, hit| sim.rage_from_hit_dealt(unit, hit))
            .on_spell_hit_taken(move |sim, _aura, hit| {
                sim.rage_from_hit_taken(unit, damage_taken, hit)
            });
        self.register_aura(unit, config)
    }

    /// Auto attacks carry no cost, so they get their own rage metrics.
    fn init_auto_attack_rage_metrics(&mut self, unit: UnitId) -> SimResult<()> {
        let autos: Vec<(SpellRef, ActionId)> = self
            .unit(unit)?
            .spells()
            .iter()
            .filter(|s| is_auto_attack(s.proc_mask))
            .filter(|s| s.cost.is_none() && s.resource_metrics.is_none())
            .map(|s| (s.spell_ref(), s.action_id))
            .collect();

        for (spell, action) in autos {
            let metrics = self
                .metrics_mut()
                .new_resource_metrics(unit, action, PowerType::Rage);
            self.spell_mut(spell)?.resource_metrics = Some(metrics);
        }
        Ok(())
    }

    fn rage_from_hit_dealt(&mut self, unit: UnitId, hit: &SpellHit) -> SimResult<()> {
        let bar = self.resource_bar(unit)?;
        if bar.power() != PowerType::Rage || hit.outcome.contains(HitOutcome::MISS) {
            return Ok(());
        }
        let (multiplier, flat) = (bar.damage_dealt_multiplier(), bar.flat_damage_dealt_bonus());

        let spell = self.spell(hit.spell)?;
        if !is_auto_attack(spell.proc_mask) {
            return Ok(());
        }
        let damage = if hit.outcome.intersects(HitOutcome::DODGE | HitOutcome::PARRY) {
            hit.pre_outcome_damage
        } else {
            hit.damage
        };
        let metrics = match (&spell.cost, spell.resource_metrics) {
            (Some(cost), _) => cost.policy().resource_metrics(),
            (None, Some(metrics)) => metrics,
            (None, None) => {
                return Err(SimError::MissingResourceMetrics {
                    action: spell.action_id,
                })
            }
        };

        let level = self.unit(unit)?.level();
        let generated =
            rage_from_damage(damage, DAMAGE_DEALT_COEFFICIENT, level, multiplier, flat);
        self.add_resource(unit, generated, metrics)
    }

    fn rage_from_hit_taken(
        &mut self,
        unit: UnitId,
        metrics: ResourceMetricsId,
        hit: &SpellHit,
    ) -> SimResult<()> {
        let bar = self.resource_bar(unit)?;
        if bar.power() != PowerType::Rage {
            return Ok(());
        }
        let (multiplier, flat) = (bar.damage_taken_multiplier(), bar.flat_damage_taken_bonus());

        let attacker_level = self.unit(hit.spell.unit)?.level();
        let generated = rage_from_damage(
            hit.damage,
            DAMAGE_TAKEN_COEFFICIENT,
            attacker_level,
            multiplier,
            flat,
        );
        self.add_resource(unit, generated, metrics)
    }
}

fn is_auto_attack(mask: ProcMask) -> bool {
    mask == ProcMask::MELEE_MH_AUTO || mask == ProcMask::MELEE_OH_AUTO
}

// =============================================================================
// Rage cost
// =============================================================================

/// Options for a rage-costing spell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RageCostOptions {
    /// Base rage cost.
    pub cost: f64,
    /// Fraction of the base cost given back by a refund.
    pub refund: f64,
    /// Where refunds are attributed; defaults to the bar-wide refund metrics.
    pub refund_metrics: Option<ResourceMetricsId>,
}

/// [`CostPolicy`] spending rage.
#[derive(Debug, Clone)]
pub struct RageCost {
    refund: f64,
    refund_metrics: Option<ResourceMetricsId>,
    resource_metrics: ResourceMetricsId,
}

impl RageCost {
    pub(crate) fn build(
        sim: &mut Simulation,
        unit: UnitId,
        action: ActionId,
        options: &RageCostOptions,
    ) -> SimResult<SpellCost> {
        require_power(sim, unit, PowerType::Rage)?;

        let refund_metrics = match options.refund_metrics {
            None if options.refund > 0.0 => sim.resource_bar(unit)?.refund_metrics(),
            other => other,
        };
        let resource_metrics = sim
            .metrics_mut()
            .new_resource_metrics(unit, action, PowerType::Rage);

        let policy = Self {
            refund: options.refund * options.cost,
            refund_metrics,
            resource_metrics,
        };
        Ok(SpellCost::new(options.cost, Arc::new(policy)))
    }

    /// Rage given back by a refund.
    #[must_use]
    pub fn refund(&self) -> f64 {
        self.refund
    }

    /// Metrics refunds are attributed to.
    #[must_use]
    pub fn refund_metrics(&self) -> Option<ResourceMetricsId> {
        self.refund_metrics
    }
}

impl CostPolicy for RageCost {
    fn power_type(&self) -> PowerType {
        PowerType::Rage
    }

    fn resource_metrics(&self) -> ResourceMetricsId {
        self.resource_metrics
    }

    fn meets_requirement(&self, sim: &mut Simulation, spell: SpellRef) -> SimResult<bool> {
        let cost = sim.refresh_current_cost(spell)?;
        Ok(sim.current_resource(spell.unit)? >= cost)
    }

    fn cost_failure_reason(&self, sim: &Simulation, spell: SpellRef) -> SimResult<String> {
        Ok(format!(
            "not enough rage (Current Rage = {:.3}, Rage Cost = {:.3})",
            sim.current_resource(spell.unit)?,
            sim.spell(spell)?.current_cast.cost
        ))
    }

    fn spend_cost(&self, sim: &mut Simulation, spell: SpellRef) -> SimResult<()> {
        let cost = sim.spell(spell)?.current_cast.cost;
        if cost > 0.0 {
            sim.spend_resource(spell.unit, cost, self.resource_metrics)?;
        }
        Ok(())
    }

    fn issue_refund(&self, sim: &mut Simulation, spell: SpellRef) -> SimResult<()> {
        if self.refund <= 0.0 {
            return Ok(());
        }
        let Some(metrics) = self.refund_metrics else {
            return Err(SimError::MissingResourceMetrics {
                action: sim.spell(spell)?.action_id,
            });
        };
        sim.add_resource(spell.unit, self.refund, metrics)
    }
}
