//! Test helper functions for building scenarios.
//!
//! The warrior scenario is the smallest roster that exercises every part of
//! the core at once: a rage bar fed by white swings, a rage-costing special
//! with a refund, a proc aura toggling a dynamic spell mod, and a rotation.

use std::sync::Arc;

use crate::aura::{AuraConfig, AuraRef};
use crate::cost::{CostOptions, CostPolicy, SpellCost};
use crate::error::SimResult;
use crate::metrics::{ActionId, OtherAction, ResourceMetricsId};
use crate::resource::{PowerType, RageBarOptions, RageCostOptions};
use crate::simulation::Simulation;
use crate::spell::{HitOutcome, ProcMask, SpellConfig, SpellRef, SpellSchool};
use crate::spell_mod::{SpellModConfig, SpellModKind, SpellModRef};
use crate::time::SimTime;
use crate::unit::{UnitConfig, UnitId};

// =============================================================================
// Logging
// =============================================================================

/// Install a fmt subscriber writing through the test harness.
///
/// Safe to call from every test; only the first call installs it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

// =============================================================================
// Cost policies
// =============================================================================

/// A cost policy that always affords and never spends.
#[derive(Debug)]
pub struct FreePolicy;

impl CostPolicy for FreePolicy {
    fn power_type(&self) -> PowerType {
        PowerType::Mana
    }

    fn resource_metrics(&self) -> ResourceMetricsId {
        ResourceMetricsId::new(0)
    }

    fn meets_requirement(&self, sim: &mut Simulation, spell: SpellRef) -> SimResult<bool> {
        sim.refresh_current_cost(spell)?;
        Ok(true)
    }

    fn cost_failure_reason(&self, _sim: &Simulation, _spell: SpellRef) -> SimResult<String> {
        Ok(String::new())
    }

    fn spend_cost(&self, _sim: &mut Simulation, _spell: SpellRef) -> SimResult<()> {
        Ok(())
    }

    fn issue_refund(&self, _sim: &mut Simulation, _spell: SpellRef) -> SimResult<()> {
        Ok(())
    }
}

/// A [`SpellCost`] of `base` bound to [`FreePolicy`].
pub fn free_cost(base: f64) -> SpellCost {
    SpellCost::new(base, Arc::new(FreePolicy))
}

// =============================================================================
// Warrior scenario
// =============================================================================

/// Main-hand white swing.
pub const AUTO_ATTACK: ActionId = ActionId::other(OtherAction::Attack).with_tag(1);
/// Rage-costing special attack.
pub const HEROIC_STRIKE: ActionId = ActionId::spell(11567);

/// Swing timer of the auto attack.
pub const SWING_SPEED: SimTime = SimTime::from_millis(2000);
/// Base damage of a white swing.
pub const AUTO_DAMAGE: f64 = 150.0;
/// Base damage of Heroic Strike.
pub const HEROIC_STRIKE_DAMAGE: f64 = 250.0;
/// Rage cost of Heroic Strike.
pub const HEROIC_STRIKE_COST: f64 = 15.0;
/// Fraction of the cost refunded on an avoided Heroic Strike.
pub const HEROIC_STRIKE_REFUND: f64 = 0.8;
/// Label of the crit-triggered damage buff.
pub const ENRAGE: &str = "Enrage";

/// Handles into the warrior scenario.
#[derive(Debug, Clone, Copy)]
pub struct Warrior {
    /// The warrior.
    pub unit: UnitId,
    /// The target dummy.
    pub target: UnitId,
    /// White swing.
    pub auto_attack: SpellRef,
    /// Special attack.
    pub heroic_strike: SpellRef,
    /// Damage buff triggered by crits.
    pub enrage: AuraRef,
    /// Mod applied while enraged.
    pub enrage_mod: SpellModRef,
}

/// Roll a melee outcome: 5% miss, 5% dodge, 25% crit, otherwise a hit.
pub fn roll_melee_outcome(sim: &mut Simulation) -> HitOutcome {
    let roll = sim.roll();
    if roll < 0.05 {
        HitOutcome::MISS
    } else if roll < 0.10 {
        HitOutcome::DODGE
    } else if roll < 0.35 {
        HitOutcome::CRIT
    } else {
        HitOutcome::HIT
    }
}

/// Register the warrior roster without a rotation.
pub fn build_warrior(sim: &mut Simulation) -> SimResult<Warrior> {
    let unit = sim.add_unit(UnitConfig::new("Warrior", 60))?;
    let target = sim.add_unit(UnitConfig::new("Target Dummy", 63))?;
    sim.enable_rage_bar(unit, &RageBarOptions::default())?;

    // Registered before the spells so that they match it.
    let enrage_mod = sim.add_dynamic_mod(
        unit,
        SpellModConfig::new(SpellModKind::DamageDonePct)
            .with_school(SpellSchool::PHYSICAL)
            .with_float_value(0.25),
    )?;

    let auto_attack = sim.register_spell(
        unit,
        SpellConfig::new(AUTO_ATTACK)
            .with_school(SpellSchool::PHYSICAL)
            .with_proc_mask(ProcMask::MELEE_MH_AUTO)
            .with_cooldown(SWING_SPEED)
            .with_effects(|sim, spell, target| {
                let outcome = roll_melee_outcome(sim);
                sim.calc_and_deal_damage(spell, target, AUTO_DAMAGE, outcome)?;
                sim.schedule_in(SWING_SPEED, move |sim: &mut Simulation| {
                    sim.cast(spell, target).map(|_| ())
                })
            }),
    )?;

    let heroic_strike = sim.register_spell(
        unit,
        SpellConfig::new(HEROIC_STRIKE)
            .with_school(SpellSchool::PHYSICAL)
            .with_proc_mask(ProcMask::MELEE_MH_SPECIAL)
            .with_cost(CostOptions::Rage(RageCostOptions {
                cost: HEROIC_STRIKE_COST,
                refund: HEROIC_STRIKE_REFUND,
                refund_metrics: None,
            }))
            .with_cast(SimTime::ZERO, SimTime::from_millis(1500))
            .with_effects(|sim, spell, target| {
                let outcome = roll_melee_outcome(sim);
                let hit = sim.calc_and_deal_damage(spell, target, HEROIC_STRIKE_DAMAGE, outcome)?;
                if !hit.landed() {
                    sim.issue_refund(spell)?;
                }
                Ok(())
            }),
    )?;

    let enrage = sim.register_aura(
        unit,
        AuraConfig::new(ENRAGE)
            .with_duration(SimTime::from_secs(12))
            .on_gain(move |sim, _aura| sim.activate_mod(enrage_mod))
            .on_expire(move |sim, _aura| sim.deactivate_mod(enrage_mod)),
    )?;

    sim.register_aura(
        unit,
        AuraConfig::new("Enrage Trigger")
            .on_reset(|sim, aura| sim.activate_aura(aura))
            .on_spell_hit_dealt(move |sim, _aura, hit| {
                if hit.outcome.contains(HitOutcome::CRIT) {
                    sim.activate_aura(enrage)?;
                }
                Ok(())
            }),
    )?;

    Ok(Warrior {
        unit,
        target,
        auto_attack,
        heroic_strike,
        enrage,
        enrage_mod,
    })
}

/// Full warrior scenario: roster plus a rotation swinging and spending
/// rage on Heroic Strike.
pub fn warrior_scenario(sim: &mut Simulation) -> SimResult<()> {
    let warrior = build_warrior(sim)?;
    sim.set_rotation(warrior.unit, move |sim: &mut Simulation, _unit: UnitId| {
        sim.cast(warrior.auto_attack, warrior.target)?;
        sim.cast(warrior.heroic_strike, warrior.target)?;
        Ok(())
    })
}
