use combatsim_core::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const SWING: SimTime = SimTime::from_millis(2000);

fn outcome(sim: &mut Simulation) -> HitOutcome {
    let roll = sim.roll();
    if roll < 0.1 {
        HitOutcome::DODGE
    } else if roll < 0.35 {
        HitOutcome::CRIT
    } else {
        HitOutcome::HIT
    }
}

// Swings, spends rage on a special and keeps a damage buff up on crits.
fn scenario(sim: &mut Simulation) -> SimResult<()> {
    let warrior = sim.add_unit(UnitConfig::new("Warrior", 60))?;
    let target = sim.add_unit(UnitConfig::new("Target Dummy", 63))?;
    sim.enable_rage_bar(warrior, &RageBarOptions::default())?;

    let buff_mod = sim.add_dynamic_mod(
        warrior,
        SpellModConfig::new(SpellModKind::DamageDonePct).with_float_value(0.25),
    )?;

    let auto = sim.register_spell(
        warrior,
        SpellConfig::new(ActionId::other(OtherAction::Attack).with_tag(1))
            .with_proc_mask(ProcMask::MELEE_MH_AUTO)
            .with_cooldown(SWING)
            .with_effects(|sim, spell, target| {
                let outcome = outcome(sim);
                sim.calc_and_deal_damage(spell, target, 150.0, outcome)?;
                sim.schedule_in(SWING, move |sim: &mut Simulation| {
                    sim.cast(spell, target).map(|_| ())
                })
            }),
    )?;

    let special = sim.register_spell(
        warrior,
        SpellConfig::new(ActionId::spell(11567))
            .with_proc_mask(ProcMask::MELEE_MH_SPECIAL)
            .with_cost(CostOptions::Rage(RageCostOptions {
                cost: 15.0,
                refund: 0.8,
                refund_metrics: None,
            }))
            .with_cast(SimTime::ZERO, SimTime::from_millis(1500))
            .with_effects(|sim, spell, target| {
                let outcome = outcome(sim);
                let hit = sim.calc_and_deal_damage(spell, target, 250.0, outcome)?;
                if !hit.landed() {
                    sim.issue_refund(spell)?;
                }
                Ok(())
            }),
    )?;

    let buff = sim.register_aura(
        warrior,
        AuraConfig::new("Enrage")
            .with_duration(SimTime::from_secs(12))
            .on_gain(move |sim, _| sim.activate_mod(buff_mod))
            .on_expire(move |sim, _| sim.deactivate_mod(buff_mod)),
    )?;
    sim.register_aura(
        warrior,
        AuraConfig::new("Enrage Trigger")
            .on_reset(|sim, aura| sim.activate_aura(aura))
            .on_spell_hit_dealt(move |sim, _, hit| {
                if hit.outcome.contains(HitOutcome::CRIT) {
                    sim.activate_aura(buff)?;
                }
                Ok(())
            }),
    )?;

    sim.set_rotation(warrior, move |sim: &mut Simulation, _unit: UnitId| {
        sim.cast(auto, target)?;
        sim.cast(special, target)?;
        Ok(())
    })
}

fn bench_run_iteration(c: &mut Criterion) {
    let config = SimulationConfig::with_iterations(1).with_duration(SimTime::from_secs(180));
    let mut sim = Simulation::new(config);
    scenario(&mut sim).unwrap();
    sim.finalize().unwrap();

    let mut index = 0;
    c.bench_function("run_iteration", |b| {
        b.iter(|| {
            sim.run_iteration(black_box(index)).unwrap();
            index += 1;
        })
    });
}

fn bench_runner(c: &mut Criterion) {
    let config = SimulationConfig::with_iterations(256)
        .with_batch_size(32)
        .with_duration(SimTime::from_secs(180));

    c.bench_function("runner_256_iterations", |b| {
        b.iter(|| black_box(Runner::run(&config, &scenario).unwrap()))
    });
}

criterion_group!(benches, bench_run_iteration, bench_runner);
criterion_main!(benches);
