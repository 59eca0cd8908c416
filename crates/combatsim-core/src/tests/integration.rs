//! Integration tests for the full simulation pipeline.
//!
//! These tests drive a running simulation end to end:
//! - Resource gains, spends, clamping and the delayed hook/rotation pass
//! - Rage generation from hits dealt and taken
//! - Casting with costs, refunds and spell mods
//! - Full runs of the warrior scenario through the runner

use std::sync::{Arc, Mutex};

use crate::aura::AuraConfig;
use crate::config::SimulationConfig;
use crate::cost::CostOptions;
use crate::error::SimError;
use crate::metrics::{ActionId, OtherAction};
use crate::resource::rage::{rage_conversion, RAGE_BAR_AURA};
use crate::resource::{
    ManaBarOptions, ManaCostOptions, PowerType, RageBarOptions, RageCostOptions,
};
use crate::runner::Runner;
use crate::simulation::Simulation;
use crate::spell::{HitOutcome, ProcMask, SpellConfig, SpellRef};
use crate::spell_mod::{SpellModConfig, SpellModKind};
use crate::time::SimTime;
use crate::unit::{UnitConfig, UnitId};

use super::helpers::{
    build_warrior, init_tracing, warrior_scenario, AUTO_ATTACK, ENRAGE, HEROIC_STRIKE,
    HEROIC_STRIKE_COST, HEROIC_STRIKE_REFUND,
};

fn config() -> SimulationConfig {
    SimulationConfig::with_iterations(1).with_duration(SimTime::from_secs(30))
}

fn rage_unit(sim: &mut Simulation, starting_rage: f64) -> UnitId {
    let unit = sim.add_unit(UnitConfig::new("Warrior", 60)).unwrap();
    sim.enable_rage_bar(
        unit,
        &RageBarOptions {
            starting_rage,
            ..RageBarOptions::default()
        },
    )
    .unwrap();
    unit
}

// =============================================================================
// Resource Bar Tests
// =============================================================================

#[test]
fn test_gain_clamps_and_records_actual_gain() {
    init_tracing();
    let mut sim = Simulation::new(config());
    let unit = rage_unit(&mut sim, 90.0);
    let metrics = sim.metrics_mut().new_resource_metrics(
        unit,
        ActionId::spell(2687),
        PowerType::Rage,
    );

    sim.add_resource(unit, 25.0, metrics).unwrap();

    assert_eq!(sim.current_resource(unit).unwrap(), 100.0);
    let record = sim.metrics().resource(metrics).unwrap();
    assert_eq!(record.last_gain(), 10.0);
    assert_eq!(record.last_requested(), 25.0);
    assert_eq!(record.events_for_current_iteration(), 1);
}

#[test]
fn test_gain_visible_now_hooks_after_granularity() {
    let mut sim = Simulation::new(config());
    let unit = rage_unit(&mut sim, 0.0);
    let metrics = sim.metrics_mut().new_resource_metrics(
        unit,
        ActionId::spell(2687),
        PowerType::Rage,
    );

    let seen = Arc::new(Mutex::new(Vec::new()));
    let hook_log = Arc::clone(&seen);
    let watcher = sim
        .register_aura(
            unit,
            AuraConfig::new("Watcher").on_resource_change(move |sim, _, _| {
                hook_log.lock().unwrap().push(("hook", sim.now()));
                Ok(())
            }),
        )
        .unwrap();
    let rotation_log = Arc::clone(&seen);
    sim.set_rotation(unit, move |sim: &mut Simulation, _unit: UnitId| {
        rotation_log.lock().unwrap().push(("react", sim.now()));
        Ok(())
    })
    .unwrap();
    sim.finalize().unwrap();
    sim.activate_aura(watcher).unwrap();

    sim.add_resource(unit, 20.0, metrics).unwrap();
    assert_eq!(sim.current_resource(unit).unwrap(), 20.0);

    sim.advance_until(SimTime::ZERO).unwrap();
    assert!(seen.lock().unwrap().is_empty());

    sim.advance_until(SimTime::from_secs(1)).unwrap();
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            ("hook", SimTime::GRANULARITY),
            ("react", SimTime::GRANULARITY),
        ]
    );
}

#[test]
fn test_interactive_gain_skips_rotation() {
    let mut sim = Simulation::new(config().with_interactive(true));
    let unit = rage_unit(&mut sim, 0.0);
    let metrics = sim.metrics_mut().new_resource_metrics(
        unit,
        ActionId::spell(2687),
        PowerType::Rage,
    );
    let reacts = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&reacts);
    sim.set_rotation(unit, move |_sim: &mut Simulation, _unit: UnitId| {
        *counter.lock().unwrap() += 1;
        Ok(())
    })
    .unwrap();

    sim.add_resource(unit, 5.0, metrics).unwrap();
    sim.advance_until(SimTime::from_secs(1)).unwrap();
    assert_eq!(*reacts.lock().unwrap(), 0);
}

#[test]
fn test_spend_fires_hooks_synchronously() {
    let mut sim = Simulation::new(config());
    let unit = rage_unit(&mut sim, 50.0);
    let metrics = sim.metrics_mut().new_resource_metrics(
        unit,
        ActionId::spell(78),
        PowerType::Rage,
    );
    let fired = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&fired);
    let watcher = sim
        .register_aura(
            unit,
            AuraConfig::new("Watcher").on_resource_change(move |_, _, _| {
                *counter.lock().unwrap() += 1;
                Ok(())
            }),
        )
        .unwrap();
    sim.activate_aura(watcher).unwrap();

    sim.spend_resource(unit, 15.0, metrics).unwrap();

    assert_eq!(*fired.lock().unwrap(), 1);
    assert_eq!(sim.current_resource(unit).unwrap(), 35.0);
    let record = sim.metrics().resource(metrics).unwrap();
    assert_eq!(record.last_gain(), -15.0);
    assert_eq!(record.last_requested(), -15.0);
}

#[test]
fn test_negative_amounts_are_fatal() {
    let mut sim = Simulation::new(config());
    let unit = rage_unit(&mut sim, 50.0);
    let metrics = sim.metrics_mut().new_resource_metrics(
        unit,
        ActionId::spell(78),
        PowerType::Rage,
    );

    assert!(matches!(
        sim.add_resource(unit, -1.0, metrics),
        Err(SimError::NegativeGain { .. })
    ));
    assert!(matches!(
        sim.spend_resource(unit, -1.0, metrics),
        Err(SimError::NegativeSpend { .. })
    ));
    assert_eq!(sim.current_resource(unit).unwrap(), 50.0);
}

#[test]
fn test_reset_restores_starting_value() {
    let mut sim = Simulation::new(config());
    let unit = rage_unit(&mut sim, 30.0);
    let metrics = sim.metrics_mut().new_resource_metrics(
        unit,
        ActionId::spell(78),
        PowerType::Rage,
    );
    sim.spend_resource(unit, 30.0, metrics).unwrap();

    sim.run_iteration(0).unwrap();
    sim.run_iteration(1).unwrap();
    assert_eq!(sim.current_resource(unit).unwrap(), 30.0);
}

// =============================================================================
// Rage Generation Tests
// =============================================================================

/// A level 60 warrior with an active rage bar and a white swing.
fn white_swinger() -> (Simulation, SpellRef, UnitId) {
    let mut sim = Simulation::new(config());
    let unit = sim.add_unit(UnitConfig::new("Warrior", 60)).unwrap();
    let rage_bar = sim
        .enable_rage_bar(unit, &RageBarOptions::default())
        .unwrap();
    let target = sim.add_unit(UnitConfig::new("Target", 60)).unwrap();
    let auto = sim
        .register_spell(
            unit,
            SpellConfig::new(AUTO_ATTACK).with_proc_mask(ProcMask::MELEE_MH_AUTO),
        )
        .unwrap();
    sim.finalize().unwrap();
    sim.activate_aura(rage_bar).unwrap();
    (sim, auto, target)
}

#[test]
fn test_hit_generates_rage_from_damage() {
    let (mut sim, auto, target) = white_swinger();
    let start = sim.current_resource(auto.unit).unwrap();

    sim.calc_and_deal_damage(auto, target, rage_conversion(60), HitOutcome::HIT)
        .unwrap();
    let gained = sim.current_resource(auto.unit).unwrap() - start;
    assert!((gained - 7.5).abs() < 1e-9, "gained {gained}");
}

#[test]
fn test_dodge_generates_rage_from_notional_damage() {
    let (mut sim, auto, target) = white_swinger();
    let start = sim.current_resource(auto.unit).unwrap();

    let hit = sim
        .calc_and_deal_damage(auto, target, rage_conversion(60), HitOutcome::DODGE)
        .unwrap();
    assert_eq!(hit.damage, 0.0);
    let gained = sim.current_resource(auto.unit).unwrap() - start;
    assert!((gained - 7.5).abs() < 1e-9);
}

#[test]
fn test_miss_generates_nothing() {
    let (mut sim, auto, target) = white_swinger();
    let start = sim.current_resource(auto.unit).unwrap();

    sim.calc_and_deal_damage(auto, target, 500.0, HitOutcome::MISS)
        .unwrap();
    assert_eq!(sim.current_resource(auto.unit).unwrap(), start);
}

#[test]
fn test_white_swing_rage_is_attributed_to_its_own_metrics() {
    let (mut sim, auto, target) = white_swinger();
    sim.calc_and_deal_damage(auto, target, 100.0, HitOutcome::HIT)
        .unwrap();

    let metrics = sim.spell(auto).unwrap().resource_metrics.unwrap();
    let record = sim.metrics().resource(metrics).unwrap();
    assert_eq!(record.action(), AUTO_ATTACK);
    assert_eq!(record.events_for_current_iteration(), 1);
}

#[test]
fn test_special_attacks_generate_no_rage() {
    let mut sim = Simulation::new(config());
    let unit = sim.add_unit(UnitConfig::new("Warrior", 60)).unwrap();
    let rage_bar = sim
        .enable_rage_bar(unit, &RageBarOptions::default())
        .unwrap();
    let target = sim.add_unit(UnitConfig::new("Target", 60)).unwrap();
    let special = sim
        .register_spell(
            unit,
            SpellConfig::new(ActionId::spell(12294)).with_proc_mask(ProcMask::MELEE_MH_SPECIAL),
        )
        .unwrap();
    sim.finalize().unwrap();
    sim.activate_aura(rage_bar).unwrap();

    sim.calc_and_deal_damage(special, target, 1000.0, HitOutcome::HIT)
        .unwrap();
    assert_eq!(sim.current_resource(unit).unwrap(), 0.0);
}

#[test]
fn test_hit_taken_uses_attacker_level() {
    let mut sim = Simulation::new(config());
    let attacker = sim.add_unit(UnitConfig::new("Boss", 40)).unwrap();
    let victim = sim.add_unit(UnitConfig::new("Warrior", 60)).unwrap();
    let rage_bar = sim
        .enable_rage_bar(victim, &RageBarOptions::default())
        .unwrap();
    let smash = sim
        .register_spell(attacker, SpellConfig::new(ActionId::spell(1)))
        .unwrap();
    sim.finalize().unwrap();
    sim.activate_aura(rage_bar).unwrap();
    assert_eq!(sim.aura(rage_bar).unwrap().label(), RAGE_BAR_AURA);

    sim.calc_and_deal_damage(smash, victim, rage_conversion(40), HitOutcome::HIT)
        .unwrap();
    let gained = sim.current_resource(victim).unwrap();
    assert!((gained - 2.5).abs() < 1e-9, "gained {gained}");

    let taken = sim
        .metrics()
        .resources()
        .find(|(_, m)| m.action() == ActionId::other(OtherAction::DamageTaken))
        .map(|(_, m)| m.actual_gain_for_current_iteration())
        .unwrap();
    assert!((taken - 2.5).abs() < 1e-9);
}

// =============================================================================
// Cost and Casting Tests
// =============================================================================

#[test]
fn test_rage_cost_refund_goes_to_bar_refund_metrics() {
    let mut sim = Simulation::new(config());
    let warrior = build_warrior(&mut sim).unwrap();
    sim.finalize().unwrap();
    sim.run_iteration(0).unwrap();

    let refund_metrics = sim
        .resource_bar(warrior.unit)
        .unwrap()
        .refund_metrics()
        .unwrap();
    let before = sim.current_resource(warrior.unit).unwrap();
    sim.issue_refund(warrior.heroic_strike).unwrap();

    let expected = HEROIC_STRIKE_COST * HEROIC_STRIKE_REFUND;
    let after = sim.current_resource(warrior.unit).unwrap();
    assert!((after - (before + expected).min(100.0)).abs() < 1e-9);
    let record = sim.metrics().resource(refund_metrics).unwrap();
    assert_eq!(record.action(), ActionId::other(OtherAction::Refund));
    assert!((record.last_requested() - expected).abs() < 1e-9);
}

#[test]
fn test_rage_cost_requires_enough_rage() {
    let mut sim = Simulation::new(config());
    let unit = rage_unit(&mut sim, 10.0);
    let target = sim.add_unit(UnitConfig::new("Target", 60)).unwrap();
    let spell = sim
        .register_spell(
            unit,
            SpellConfig::new(HEROIC_STRIKE).with_cost(CostOptions::Rage(RageCostOptions {
                cost: 15.0,
                ..RageCostOptions::default()
            })),
        )
        .unwrap();
    sim.finalize().unwrap();

    assert!(!sim.meets_cost_requirement(spell).unwrap());
    assert_eq!(
        sim.cost_failure_reason(spell).unwrap().unwrap(),
        "not enough rage (Current Rage = 10.000, Rage Cost = 15.000)"
    );
    assert!(!sim.cast(spell, target).unwrap());
    assert_eq!(sim.current_resource(unit).unwrap(), 10.0);
}

#[test]
fn test_power_cost_mod_changes_effective_cost() {
    let mut sim = Simulation::new(config());
    let unit = rage_unit(&mut sim, 100.0);
    sim.add_static_mod(
        unit,
        SpellModConfig::new(SpellModKind::PowerCostFlat).with_int_value(-3),
    )
    .unwrap();
    let spell = sim
        .register_spell(
            unit,
            SpellConfig::new(HEROIC_STRIKE).with_cost(CostOptions::Rage(RageCostOptions {
                cost: 15.0,
                ..RageCostOptions::default()
            })),
        )
        .unwrap();
    sim.finalize().unwrap();

    assert!(sim.cast(spell, unit).unwrap());
    assert_eq!(sim.current_resource(unit).unwrap(), 88.0);
}

#[test]
fn test_mana_cost_is_fraction_of_base_mana() {
    let mut sim = Simulation::new(config());
    let unit = sim.add_unit(UnitConfig::new("Mage", 60)).unwrap();
    sim.enable_mana_bar(
        unit,
        &ManaBarOptions {
            max_mana: 2000.0,
            starting_mana: None,
            base_mana: Some(1000.0),
        },
    )
    .unwrap();
    let spell = sim
        .register_spell(
            unit,
            SpellConfig::new(ActionId::spell(10151)).with_cost(CostOptions::Mana(
                ManaCostOptions {
                    base_cost: 0.1,
                    flat_cost: 5.0,
                },
            )),
        )
        .unwrap();
    sim.finalize().unwrap();

    assert_eq!(sim.current_resource(unit).unwrap(), 2000.0);
    assert!(sim.cast(spell, unit).unwrap());
    assert_eq!(sim.current_resource(unit).unwrap(), 1895.0);
}

#[test]
fn test_cast_abandoned_when_resource_spent_while_casting() {
    let mut sim = Simulation::new(config());
    let unit = rage_unit(&mut sim, 20.0);
    let target = sim.add_unit(UnitConfig::new("Target", 60)).unwrap();
    let rage_cost = || {
        CostOptions::Rage(RageCostOptions {
            cost: 15.0,
            ..RageCostOptions::default()
        })
    };
    let landed = Arc::new(Mutex::new(0));
    let sink = Arc::clone(&landed);
    let slam = sim
        .register_spell(
            unit,
            SpellConfig::new(ActionId::spell(11605))
                .with_cost(rage_cost())
                .with_cast(SimTime::from_millis(1500), SimTime::from_millis(1500))
                .with_cooldown(SimTime::from_secs(6))
                .with_effects(move |_, _, _| {
                    *sink.lock().unwrap() += 1;
                    Ok(())
                }),
        )
        .unwrap();
    let instant = sim
        .register_spell(
            unit,
            SpellConfig::new(ActionId::spell(1719)).with_cost(rage_cost()),
        )
        .unwrap();
    sim.finalize().unwrap();

    assert!(sim.cast(slam, target).unwrap());
    assert!(sim.cast(instant, target).unwrap());
    assert_eq!(sim.current_resource(unit).unwrap(), 5.0);

    sim.advance_until(SimTime::from_secs(2)).unwrap();

    assert_eq!(sim.current_resource(unit).unwrap(), 5.0);
    assert_eq!(*landed.lock().unwrap(), 0);
    let slam_state = sim.spell(slam).unwrap();
    assert_eq!(slam_state.metrics.casts.current_events(), 0);
    assert!(slam_state.cooldown.is_ready(sim.now()));
}

#[test]
fn test_cast_time_delays_completion() {
    let mut sim = Simulation::new(config());
    let unit = sim.add_unit(UnitConfig::new("Mage", 60)).unwrap();
    let done = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&done);
    let spell = sim
        .register_spell(
            unit,
            SpellConfig::new(ActionId::spell(133))
                .with_cast(SimTime::from_millis(3000), SimTime::from_millis(1500))
                .with_effects(move |sim, _, _| {
                    sink.lock().unwrap().push(sim.now());
                    Ok(())
                }),
        )
        .unwrap();
    sim.add_static_mod(
        unit,
        SpellModConfig::new(SpellModKind::CastTimeFlat).with_time_value(-SimTime::from_millis(500)),
    )
    .unwrap();
    sim.finalize().unwrap();

    assert!(sim.cast(spell, unit).unwrap());
    assert!(!sim.cast(spell, unit).unwrap());
    sim.advance_until(SimTime::from_secs(5)).unwrap();

    // The mod was added after the spell, so the cast time is unchanged.
    assert_eq!(*done.lock().unwrap(), vec![SimTime::from_secs(3)]);
}

// =============================================================================
// Spell Mod Tests
// =============================================================================

#[test]
fn test_dynamic_mod_round_trip_through_simulation() {
    let mut sim = Simulation::new(config());
    let unit = sim.add_unit(UnitConfig::new("Warrior", 60)).unwrap();
    let handle = sim
        .add_dynamic_mod(
            unit,
            SpellModConfig::new(SpellModKind::DamageDonePct).with_float_value(0.2),
        )
        .unwrap();
    let spell = sim
        .register_spell(unit, SpellConfig::new(ActionId::spell(1)))
        .unwrap();

    assert!((sim.spell(spell).unwrap().damage_multiplier - 1.0).abs() < 1e-12);
    sim.activate_mod(handle).unwrap();
    assert!((sim.spell(spell).unwrap().damage_multiplier - 1.2).abs() < 1e-12);
    sim.deactivate_mod(handle).unwrap();
    assert!((sim.spell(spell).unwrap().damage_multiplier - 1.0).abs() < 1e-9);
}

#[test]
fn test_zero_factor_mod_rejected_through_simulation() {
    let mut sim = Simulation::new(config());
    let unit = sim.add_unit(UnitConfig::new("Warrior", 60)).unwrap();

    let rejected = sim.add_dynamic_mod(
        unit,
        SpellModConfig::new(SpellModKind::DamageDonePct).with_float_value(-1.0),
    );
    assert!(matches!(rejected, Err(SimError::ZeroModFactor { .. })));
    assert!(sim.unit(unit).unwrap().spell_mods().is_empty());

    let handle = sim
        .add_dynamic_mod(
            unit,
            SpellModConfig::new(SpellModKind::DamageDonePct).with_float_value(0.5),
        )
        .unwrap();
    let spell = sim
        .register_spell(unit, SpellConfig::new(ActionId::spell(1)))
        .unwrap();
    sim.activate_mod(handle).unwrap();

    assert!(matches!(
        sim.update_mod_float_value(handle, -1.0),
        Err(SimError::ZeroModFactor { .. })
    ));
    sim.deactivate_mod(handle).unwrap();
    let multiplier = sim.spell(spell).unwrap().damage_multiplier;
    assert!((multiplier - 1.0).abs() < 1e-12, "multiplier {multiplier}");
}

#[test]
fn test_iteration_reset_deactivates_dynamic_mods_only() {
    let mut sim = Simulation::new(config());
    let unit = sim.add_unit(UnitConfig::new("Warrior", 60)).unwrap();
    let dynamic = sim
        .add_dynamic_mod(
            unit,
            SpellModConfig::new(SpellModKind::DamageDonePct).with_float_value(0.5),
        )
        .unwrap();
    let fixed = sim
        .add_static_mod(
            unit,
            SpellModConfig::new(SpellModKind::BonusDamageFlat).with_float_value(10.0),
        )
        .unwrap();
    let spell = sim
        .register_spell(unit, SpellConfig::new(ActionId::spell(1)))
        .unwrap();
    assert!(sim.spell_mod(fixed).unwrap().is_static());
    assert!(!sim.spell_mod(dynamic).unwrap().is_static());

    sim.activate_mod(dynamic).unwrap();
    assert!((sim.spell(spell).unwrap().damage_multiplier - 1.5).abs() < 1e-12);

    sim.run_iteration(0).unwrap();

    assert!(!sim.spell_mod(dynamic).unwrap().is_active());
    assert!(sim.spell_mod(fixed).unwrap().is_active());
    let state = sim.spell(spell).unwrap();
    assert!((state.damage_multiplier - 1.0).abs() < 1e-12);
    assert_eq!(state.bonus_damage, 10.0);
}

#[test]
fn test_mod_never_matches_spells_registered_before_it() {
    let mut sim = Simulation::new(config());
    let unit = sim.add_unit(UnitConfig::new("Warrior", 60)).unwrap();
    let early = sim
        .register_spell(unit, SpellConfig::new(ActionId::spell(1)))
        .unwrap();
    let handle = sim
        .add_static_mod(
            unit,
            SpellModConfig::new(SpellModKind::BonusDamageFlat).with_float_value(10.0),
        )
        .unwrap();
    let late = sim
        .register_spell(unit, SpellConfig::new(ActionId::spell(2)))
        .unwrap();

    assert_eq!(sim.spell(early).unwrap().bonus_damage, 0.0);
    assert_eq!(sim.spell(late).unwrap().bonus_damage, 10.0);
    assert_eq!(
        sim.spell_mod(handle).unwrap().matched_spells(),
        &[late.spell]
    );
}

#[test]
fn test_mod_update_through_simulation() {
    let mut sim = Simulation::new(config());
    let unit = sim.add_unit(UnitConfig::new("Warrior", 60)).unwrap();
    let handle = sim
        .add_static_mod(
            unit,
            SpellModConfig::new(SpellModKind::CooldownFlat)
                .with_time_value(-SimTime::from_secs(1)),
        )
        .unwrap();
    let spell = sim
        .register_spell(
            unit,
            SpellConfig::new(ActionId::spell(1)).with_cooldown(SimTime::from_secs(6)),
        )
        .unwrap();

    sim.update_mod_time_value(handle, -SimTime::from_secs(2)).unwrap();
    assert_eq!(
        sim.spell(spell).unwrap().cooldown.effective_duration(),
        SimTime::from_secs(4)
    );
    sim.update_mod_int_value(handle, 3).unwrap();
    sim.update_mod_float_value(handle, 0.5).unwrap();
    assert!(sim.spell_mod(handle).unwrap().is_active());
}

// =============================================================================
// Full Scenario Tests
// =============================================================================

#[test]
fn test_warrior_scenario_runs_and_reports() {
    init_tracing();
    let config = SimulationConfig::with_iterations(24)
        .with_batch_size(8)
        .with_seed(42)
        .with_duration(SimTime::from_secs(60));
    let report = Runner::run(&config, &warrior_scenario).unwrap();

    assert_eq!(report.iterations, 24);
    let warrior = &report.units[0];
    assert_eq!(warrior.label, "Warrior");
    assert_eq!(warrior.dps.sample_count, 24);
    assert!(warrior.dps.mean > 0.0);

    let heroic = report
        .spells
        .iter()
        .find(|s| s.action == HEROIC_STRIKE)
        .unwrap();
    assert!(heroic.casts.mean > 0.0);

    let swings = report.resource(UnitId::new(0), AUTO_ATTACK).unwrap();
    assert!(swings.gain.mean > 0.0);
    let spent = report.resource(UnitId::new(0), HEROIC_STRIKE).unwrap();
    assert!(spent.gain.mean < 0.0);

    let rage_bar = report.aura(UnitId::new(0), RAGE_BAR_AURA).unwrap();
    assert!((rage_bar.uptime_fraction(report.duration_secs) - 1.0).abs() < 1e-9);
    let enrage = report.aura(UnitId::new(0), ENRAGE).unwrap();
    let uptime = enrage.uptime_fraction(report.duration_secs);
    assert!(uptime > 0.0 && uptime <= 1.0);
}

#[test]
fn test_enrage_mod_is_balanced_after_every_iteration() {
    let mut sim = Simulation::new(config().with_seed(3));
    let warrior = build_warrior(&mut sim).unwrap();
    sim.set_rotation(warrior.unit, move |sim: &mut Simulation, _unit: UnitId| {
        sim.cast(warrior.auto_attack, warrior.target)?;
        sim.cast(warrior.heroic_strike, warrior.target)?;
        Ok(())
    })
    .unwrap();

    let mut enraged = 0.0;
    for index in 0..5 {
        sim.run_iteration(index).unwrap();
        assert!(!sim.is_aura_active(warrior.enrage).unwrap());
        assert!(!sim.spell_mod(warrior.enrage_mod).unwrap().is_active());
        let multiplier = sim.spell(warrior.heroic_strike).unwrap().damage_multiplier;
        assert!((multiplier - 1.0).abs() < 1e-9, "iteration {index}: {multiplier}");
        enraged += sim.aura(warrior.enrage).unwrap().activity().value_stats().sum();
    }
    assert!(enraged > 0.0);
}
