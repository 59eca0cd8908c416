//! The simulation: units, clock, metrics and the iteration loop.
//!
//! A [`Simulation`] is built in two phases:
//!
//! 1. **Registration**: add units, enable resource bars, register spells,
//!    spell mods and auras, set rotations.
//! 2. **Execution**: [`Simulation::finalize`] seals every unit and fires the
//!    auras' `on_init` hooks; [`Simulation::run_iteration`] then runs
//!    independent, reseeded iterations on the same simulation.
//!
//! Within an iteration everything is single-threaded: the clock pops
//! pending actions in `(due_at, seq)` order and runs each one with
//! exclusive access to the simulation.
//!
//! # Example
//!
//! ```
//! use combatsim_core::config::SimulationConfig;
//! use combatsim_core::simulation::Simulation;
//! use combatsim_core::time::SimTime;
//! use combatsim_core::unit::UnitConfig;
//!
//! let config = SimulationConfig::with_iterations(1).with_duration(SimTime::from_secs(10));
//! let mut sim = Simulation::new(config);
//! let unit = sim.add_unit(UnitConfig::new("Dummy", 63)).unwrap();
//!
//! sim.finalize().unwrap();
//! sim.run_iteration(0).unwrap();
//!
//! assert_eq!(sim.now(), SimTime::from_secs(10));
//! assert_eq!(sim.unit(unit).unwrap().dps().sample_count, 1);
//! ```

use std::fmt;
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

use crate::clock::Clock;
use crate::config::SimulationConfig;
use crate::error::{SimError, SimResult};
use crate::metrics::MetricsRegistry;
use crate::spell::{HitOutcome, Spell, SpellConfig, SpellFlags, SpellHit, SpellRef};
use crate::time::SimTime;
use crate::unit::{Rotation, Unit, UnitConfig, UnitId};

// =============================================================================
// Simulation
// =============================================================================

/// Owner of every unit, the clock and the metrics of one worker.
pub struct Simulation {
    config: SimulationConfig,
    clock: Clock<Simulation>,
    units: Vec<Unit>,
    metrics: MetricsRegistry,
    rng: ChaCha8Rng,
    finalized: bool,
    completed_iterations: u64,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("config", &self.config)
            .field("now", &self.clock.now())
            .field("pending", &self.clock.pending_count())
            .field("units", &self.units)
            .field("metrics", &format!("[{} resource metrics]", self.metrics.len()))
            .field("finalized", &self.finalized)
            .field("completed_iterations", &self.completed_iterations)
            .finish()
    }
}

impl Simulation {
    /// Empty simulation in the registration phase.
    #[must_use]
    pub fn new(config: SimulationConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            config,
            clock: Clock::new(),
            units: Vec::new(),
            metrics: MetricsRegistry::new(),
            rng,
            finalized: false,
            completed_iterations: 0,
        }
    }

    /// Run configuration.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Current simulation time.
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    /// Resource metrics of every unit.
    #[must_use]
    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// Resource metrics, mutably.
    pub fn metrics_mut(&mut self) -> &mut MetricsRegistry {
        &mut self.metrics
    }

    /// Iterations committed so far.
    #[must_use]
    pub fn completed_iterations(&self) -> u64 {
        self.completed_iterations
    }

    /// Whether [`Simulation::finalize`] has run.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// The iteration's random stream.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Uniform roll in `[0, 1)`.
    pub fn roll(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    // -------------------------------------------------------------------------
    // Units and spells
    // -------------------------------------------------------------------------

    /// Add a unit.
    ///
    /// # Errors
    ///
    /// [`SimError::RegistrationClosed`] after finalize.
    #[allow(clippy::cast_possible_truncation)]
    pub fn add_unit(&mut self, config: UnitConfig) -> SimResult<UnitId> {
        let id = UnitId::new(self.units.len() as u32);
        if self.finalized {
            return Err(SimError::RegistrationClosed { unit: id });
        }
        self.units.push(Unit::new(id, config));
        Ok(id)
    }

    /// All units in creation order.
    #[must_use]
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Look up a unit.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownUnit`].
    pub fn unit(&self, unit: UnitId) -> SimResult<&Unit> {
        self.units.get(unit.index()).ok_or(SimError::UnknownUnit(unit))
    }

    /// Look up a unit mutably.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownUnit`].
    pub fn unit_mut(&mut self, unit: UnitId) -> SimResult<&mut Unit> {
        self.units
            .get_mut(unit.index())
            .ok_or(SimError::UnknownUnit(unit))
    }

    /// Look up a spell.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownUnit`] or [`SimError::UnknownSpell`].
    pub fn spell(&self, spell: SpellRef) -> SimResult<&Spell> {
        self.unit(spell.unit)?
            .spell(spell.spell)
            .ok_or(SimError::UnknownSpell(spell))
    }

    /// Look up a spell mutably.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownUnit`] or [`SimError::UnknownSpell`].
    pub fn spell_mut(&mut self, spell: SpellRef) -> SimResult<&mut Spell> {
        self.unit_mut(spell.unit)?
            .spell_mut(spell.spell)
            .ok_or(SimError::UnknownSpell(spell))
    }

    /// Register a spell on `unit`. Its cost policy is built against the
    /// unit's bar, and every existing spell mod of the unit gets to match
    /// it before it joins the spell book.
    ///
    /// # Errors
    ///
    /// Unknown unit, [`SimError::RegistrationClosed`] after finalize, or a
    /// cost whose power type the unit's bar does not provide.
    pub fn register_spell(&mut self, unit: UnitId, config: SpellConfig) -> SimResult<SpellRef> {
        self.ensure_registration_open(unit)?;
        let cost = match &config.cost {
            Some(options) => Some(self.build_spell_cost(unit, config.action_id, options)?),
            None => None,
        };
        let spell = self.unit_mut(unit)?.register_spell(config, cost);
        Ok(SpellRef { unit, spell })
    }

    /// Set the unit's decision logic.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownUnit`] or [`SimError::RegistrationClosed`].
    pub fn set_rotation(&mut self, unit: UnitId, rotation: impl Rotation + 'static) -> SimResult<()> {
        self.ensure_registration_open(unit)?;
        self.unit_mut(unit)?.set_rotation(Arc::new(rotation));
        Ok(())
    }

    /// Fail once the unit has been sealed by [`Simulation::finalize`].
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownUnit`] or [`SimError::RegistrationClosed`].
    pub fn ensure_registration_open(&self, unit: UnitId) -> SimResult<()> {
        if self.unit(unit)?.is_sealed() {
            Err(SimError::RegistrationClosed { unit })
        } else {
            Ok(())
        }
    }

    /// Close registration and fire every aura's `on_init`. Idempotent.
    ///
    /// # Errors
    ///
    /// Errors raised by `on_init` hooks.
    pub fn finalize(&mut self) -> SimResult<()> {
        if self.finalized {
            return Ok(());
        }
        self.finalized = true;
        for unit in &mut self.units {
            unit.seal();
        }
        self.init_auras()
    }

    // -------------------------------------------------------------------------
    // Clock
    // -------------------------------------------------------------------------

    /// Run `action` once at `due_at`.
    ///
    /// # Errors
    ///
    /// [`SimError::ScheduleInPast`] when `due_at` is before now.
    pub fn schedule_at<F>(&mut self, due_at: SimTime, action: F) -> SimResult<()>
    where
        F: FnOnce(&mut Simulation) -> SimResult<()> + Send + 'static,
    {
        self.clock.schedule(due_at, action)
    }

    /// Run `action` once, `delay` from now.
    ///
    /// # Errors
    ///
    /// [`SimError::ScheduleInPast`] for a negative delay.
    pub fn schedule_in<F>(&mut self, delay: SimTime, action: F) -> SimResult<()>
    where
        F: FnOnce(&mut Simulation) -> SimResult<()> + Send + 'static,
    {
        let due_at = self.now().saturating_add(delay);
        self.schedule_at(due_at, action)
    }

    /// Run every action due at or before `end`, then set the clock to `end`.
    ///
    /// # Errors
    ///
    /// The first error raised by an action; the remaining queue is left
    /// as is.
    pub fn advance_until(&mut self, end: SimTime) -> SimResult<()> {
        while let Some(action) = self.clock.pop_due(end) {
            action.run(self)?;
        }
        self.clock.advance_to(end);
        Ok(())
    }

    /// Run the unit's rotation, if it has one.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownUnit`] or errors raised by the rotation.
    pub fn react(&mut self, unit: UnitId) -> SimResult<()> {
        match self.unit(unit)?.rotation() {
            Some(rotation) => rotation.on_react(self, unit),
            None => Ok(()),
        }
    }

    // -------------------------------------------------------------------------
    // Casting
    // -------------------------------------------------------------------------

    /// Try to cast `spell` at `target`.
    ///
    /// Returns `false` without side effects when the spell is on cooldown,
    /// the caster is busy, or the cost cannot be paid. Otherwise the caster
    /// becomes busy for `max(gcd, cast time)`, its rotation is re-evaluated
    /// when that ends, and the cast completes after the cast time.
    ///
    /// # Errors
    ///
    /// Unknown handles or errors raised while completing the cast.
    pub fn cast(&mut self, spell: SpellRef, target: UnitId) -> SimResult<bool> {
        let now = self.now();
        self.unit(target)?;

        let (cooldown, gcd, cast_time) = {
            let s = self.spell(spell)?;
            (s.cooldown, s.default_cast.gcd, s.effective_cast_time())
        };
        if !cooldown.is_ready(now) {
            debug!(spell = %spell, now = %now, "Cast failed: on cooldown until {}", cooldown.ready_at);
            return Ok(false);
        }
        let lock = gcd.max_zero().max(cast_time);
        let busy_until = self.unit(spell.unit)?.busy_until();
        if lock > SimTime::ZERO && busy_until > now {
            debug!(spell = %spell, now = %now, "Cast failed: busy until {}", busy_until);
            return Ok(false);
        }

        {
            let s = self.spell_mut(spell)?;
            s.current_cast = s.default_cast;
        }
        if !self.meets_cost_requirement(spell)? {
            let reason = self.cost_failure_reason(spell)?.unwrap_or_default();
            debug!(spell = %spell, now = %now, "Cast failed: {}", reason);
            return Ok(false);
        }

        if lock > SimTime::ZERO {
            let unit = spell.unit;
            self.unit_mut(unit)?.set_busy_until(now + lock);
            self.schedule_at(now + lock, move |sim: &mut Simulation| sim.react(unit))?;
        }
        if cast_time > SimTime::ZERO {
            self.schedule_at(now + cast_time, move |sim: &mut Simulation| {
                sim.complete_cast(spell, target)
            })?;
            Ok(true)
        } else {
            self.complete_cast(spell, target)?;
            Ok(true)
        }
    }

    fn complete_cast(&mut self, spell: SpellRef, target: UnitId) -> SimResult<()> {
        let now = self.now();
        // The resource may have been spent elsewhere while casting.
        if !self.meets_cost_requirement(spell)? {
            let reason = self.cost_failure_reason(spell)?.unwrap_or_default();
            debug!(spell = %spell, now = %now, "Cast abandoned: {}", reason);
            return Ok(());
        }
        self.spend_cost(spell)?;

        let s = self.spell_mut(spell)?;
        s.cooldown.ready_at = now + s.cooldown.effective_duration();
        s.metrics.casts.count();
        let action = s.action_id;
        let effects = s.apply_effects.clone();

        trace!(spell = %spell, now = %now, "Cast {} on {}", action, target);

        match effects {
            Some(effects) => effects(self, spell, target),
            None => Ok(()),
        }
    }

    // -------------------------------------------------------------------------
    // Damage
    // -------------------------------------------------------------------------

    /// Resolve a direct hit of `spell` on `target` with the given outcome.
    ///
    /// `(base + bonus_damage) × impact multipliers`, scaled by the crit
    /// multiplier on a crit and zeroed on a miss, dodge or parry. Records
    /// the damage, then fires hit-dealt hooks on the caster and hit-taken
    /// hooks on the target.
    ///
    /// # Errors
    ///
    /// Unknown handles or errors raised by hooks.
    pub fn calc_and_deal_damage(
        &mut self,
        spell: SpellRef,
        target: UnitId,
        base_damage: f64,
        outcome: HitOutcome,
    ) -> SimResult<SpellHit> {
        let multiplier = self.spell(spell)?.impact_multiplier();
        self.deal_damage(spell, target, base_damage, outcome, multiplier)
    }

    /// Like [`Simulation::calc_and_deal_damage`] with the periodic
    /// multipliers.
    ///
    /// # Errors
    ///
    /// Unknown handles or errors raised by hooks.
    pub fn calc_and_deal_periodic_damage(
        &mut self,
        spell: SpellRef,
        target: UnitId,
        base_damage: f64,
        outcome: HitOutcome,
    ) -> SimResult<SpellHit> {
        let multiplier = self.spell(spell)?.periodic_multiplier();
        self.deal_damage(spell, target, base_damage, outcome, multiplier)
    }

    fn deal_damage(
        &mut self,
        spell: SpellRef,
        target: UnitId,
        base_damage: f64,
        outcome: HitOutcome,
        multiplier: f64,
    ) -> SimResult<SpellHit> {
        self.unit(target)?;
        let s = self.spell_mut(spell)?;
        let pre_outcome_damage = (base_damage + s.bonus_damage) * multiplier;
        let damage = if outcome.intersects(HitOutcome::MISS | HitOutcome::DODGE | HitOutcome::PARRY)
        {
            0.0
        } else if outcome.contains(HitOutcome::CRIT) {
            pre_outcome_damage * s.crit_multiplier()
        } else {
            pre_outcome_damage
        };
        let record = !s.flags.contains(SpellFlags::NO_METRICS);
        if record {
            s.metrics.damage.record(damage);
            self.unit_mut(spell.unit)?.add_damage_done(damage);
        }

        let hit = SpellHit {
            spell,
            target,
            outcome,
            damage,
            pre_outcome_damage,
        };
        trace!(spell = %spell, now = %self.now(), "Hit {} for {:.3} ({:?})", target, damage, outcome);

        self.dispatch_hit_dealt(&hit)?;
        self.dispatch_hit_taken(&hit)?;
        Ok(hit)
    }

    // -------------------------------------------------------------------------
    // Iterations
    // -------------------------------------------------------------------------

    /// Run iteration `index` from reset to commit.
    ///
    /// Resets the clock, reseeds the random stream with
    /// `config.iteration_seed(index)`, resets units and metrics, fires every
    /// aura's `on_reset`, starts each rotation at time zero, advances to the
    /// configured duration, expires what is still active, and commits the
    /// iteration's metrics.
    ///
    /// # Errors
    ///
    /// Any fatal error raised while running; the iteration is not
    /// committed.
    pub fn run_iteration(&mut self, index: u64) -> SimResult<()> {
        self.finalize()?;
        self.reset_iteration(index);
        self.reset_auras()?;

        let ids: Vec<UnitId> = self.units.iter().map(Unit::id).collect();
        for unit in ids {
            self.schedule_at(SimTime::ZERO, move |sim: &mut Simulation| sim.react(unit))?;
        }

        let end = self.config.duration;
        self.advance_until(end)?;
        self.expire_all_auras()?;
        self.done_iteration();
        Ok(())
    }

    fn reset_iteration(&mut self, index: u64) {
        self.clock.reset();
        self.rng = ChaCha8Rng::seed_from_u64(self.config.iteration_seed(index));
        for unit in &mut self.units {
            unit.reset_iteration();
        }
        self.metrics.reset_iteration();
    }

    fn done_iteration(&mut self) {
        let duration = self.config.duration;
        for unit in &mut self.units {
            unit.done_iteration(duration);
        }
        self.metrics.done_iteration();
        self.completed_iterations += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::CostOptions;
    use crate::metrics::ActionId;
    use crate::resource::{ManaBarOptions, ManaCostOptions};
    use std::sync::Mutex;

    fn config() -> SimulationConfig {
        SimulationConfig::with_iterations(1).with_duration(SimTime::from_secs(10))
    }

    mod clock_tests {
        use super::*;

        #[test]
        fn equal_due_times_run_fifo() {
            let mut sim = Simulation::new(config());
            let order = Arc::new(Mutex::new(Vec::new()));
            for i in 0..5 {
                let order = Arc::clone(&order);
                sim.schedule_at(SimTime::from_secs(1), move |_| {
                    order.lock().unwrap().push(i);
                    Ok(())
                })
                .unwrap();
            }
            sim.advance_until(SimTime::from_secs(2)).unwrap();
            assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
            assert_eq!(sim.now(), SimTime::from_secs(2));
        }

        #[test]
        fn action_may_schedule_at_now() {
            let mut sim = Simulation::new(config());
            let order = Arc::new(Mutex::new(Vec::new()));
            let (outer, inner, sibling) = (Arc::clone(&order), Arc::clone(&order), Arc::clone(&order));
            sim.schedule_at(SimTime::from_secs(1), move |sim| {
                outer.lock().unwrap().push("outer");
                sim.schedule_in(SimTime::ZERO, move |_| {
                    inner.lock().unwrap().push("inner");
                    Ok(())
                })
            })
            .unwrap();
            sim.schedule_at(SimTime::from_secs(1), move |_| {
                sibling.lock().unwrap().push("sibling");
                Ok(())
            })
            .unwrap();

            sim.advance_until(SimTime::from_secs(1)).unwrap();
            assert_eq!(*order.lock().unwrap(), vec!["outer", "sibling", "inner"]);
        }

        #[test]
        fn scheduling_in_the_past_is_fatal() {
            let mut sim = Simulation::new(config());
            sim.advance_until(SimTime::from_secs(5)).unwrap();
            let err = sim
                .schedule_at(SimTime::from_secs(4), |_| Ok(()))
                .unwrap_err();
            assert!(matches!(err, SimError::ScheduleInPast { .. }));
        }
    }

    mod registration_tests {
        use super::*;

        #[test]
        fn finalize_seals_units() {
            let mut sim = Simulation::new(config());
            let unit = sim.add_unit(UnitConfig::new("Mage", 60)).unwrap();
            sim.finalize().unwrap();

            let err = sim
                .register_spell(unit, SpellConfig::new(ActionId::spell(1)))
                .unwrap_err();
            assert_eq!(err, SimError::RegistrationClosed { unit });
            assert!(matches!(
                sim.add_unit(UnitConfig::new("Late", 60)),
                Err(SimError::RegistrationClosed { .. })
            ));
        }

        #[test]
        fn cost_without_matching_bar_is_rejected() {
            let mut sim = Simulation::new(config());
            let unit = sim.add_unit(UnitConfig::new("Mage", 60)).unwrap();
            let err = sim
                .register_spell(
                    unit,
                    SpellConfig::new(ActionId::spell(1))
                        .with_cost(CostOptions::Mana(ManaCostOptions::default())),
                )
                .unwrap_err();
            assert_eq!(err, SimError::NoResourceBar { unit });
        }

        #[test]
        fn unknown_handles_are_reported() {
            let sim = Simulation::new(config());
            assert_eq!(
                sim.unit(UnitId::new(7)).unwrap_err(),
                SimError::UnknownUnit(UnitId::new(7))
            );
        }
    }

    mod cast_tests {
        use super::*;

        fn mage() -> (Simulation, SpellRef) {
            let mut sim = Simulation::new(config());
            let unit = sim.add_unit(UnitConfig::new("Mage", 60)).unwrap();
            sim.enable_mana_bar(unit, &ManaBarOptions::new(100.0)).unwrap();
            let spell = sim
                .register_spell(
                    unit,
                    SpellConfig::new(ActionId::spell(116))
                        .with_cost(CostOptions::Mana(ManaCostOptions {
                            base_cost: 0.0,
                            flat_cost: 40.0,
                        }))
                        .with_cast(SimTime::ZERO, SimTime::from_millis(1500))
                        .with_cooldown(SimTime::from_secs(5))
                        .with_effects(|sim, spell, target| {
                            sim.calc_and_deal_damage(spell, target, 100.0, HitOutcome::HIT)
                                .map(|_| ())
                        }),
                )
                .unwrap();
            sim.finalize().unwrap();
            (sim, spell)
        }

        #[test]
        fn cast_spends_cost_and_starts_cooldown() {
            let (mut sim, spell) = mage();
            assert!(sim.cast(spell, spell.unit).unwrap());

            assert_eq!(sim.current_resource(spell.unit).unwrap(), 60.0);
            let s = sim.spell(spell).unwrap();
            assert_eq!(s.cooldown.ready_at, SimTime::from_secs(5));
            assert_eq!(s.metrics.casts.current_events(), 1);
            assert_eq!(s.metrics.damage.current_value(), 100.0);
        }

        #[test]
        fn cooldown_and_gcd_refuse_casts() {
            let (mut sim, spell) = mage();
            assert!(sim.cast(spell, spell.unit).unwrap());
            assert!(!sim.cast(spell, spell.unit).unwrap());

            sim.advance_until(SimTime::from_secs(6)).unwrap();
            assert!(sim.cast(spell, spell.unit).unwrap());
        }

        #[test]
        fn insufficient_resource_refuses_cast() {
            let (mut sim, spell) = mage();
            let metrics = sim.resource_bar(spell.unit).unwrap().refund_metrics().unwrap();
            sim.spend_resource(spell.unit, 80.0, metrics).unwrap();

            assert!(!sim.cast(spell, spell.unit).unwrap());
            let reason = sim.cost_failure_reason(spell).unwrap().unwrap();
            assert!(reason.starts_with("not enough mana"));
            assert_eq!(sim.current_resource(spell.unit).unwrap(), 20.0);
        }
    }

    mod damage_tests {
        use super::*;

        fn striker() -> (Simulation, SpellRef) {
            let mut sim = Simulation::new(config());
            let unit = sim.add_unit(UnitConfig::new("Rogue", 60)).unwrap();
            let spell = sim
                .register_spell(
                    unit,
                    SpellConfig::new(ActionId::spell(1752)).with_crit_damage_bonus(0.5),
                )
                .unwrap();
            (sim, spell)
        }

        #[test]
        fn crit_applies_bonus_multiplier() {
            let (mut sim, spell) = striker();
            let hit = sim
                .calc_and_deal_damage(spell, spell.unit, 100.0, HitOutcome::CRIT)
                .unwrap();
            assert_eq!(hit.pre_outcome_damage, 100.0);
            assert!((hit.damage - 250.0).abs() < 1e-9);
        }

        #[test]
        fn avoided_hits_keep_pre_outcome_damage() {
            let (mut sim, spell) = striker();
            sim.spell_mut(spell).unwrap().bonus_damage = 20.0;
            for outcome in [HitOutcome::MISS, HitOutcome::DODGE, HitOutcome::PARRY] {
                let hit = sim.calc_and_deal_damage(spell, spell.unit, 100.0, outcome).unwrap();
                assert_eq!(hit.damage, 0.0);
                assert_eq!(hit.pre_outcome_damage, 120.0);
            }
        }

        #[test]
        fn no_metrics_flag_skips_recording() {
            let (mut sim, spell) = striker();
            sim.spell_mut(spell).unwrap().flags = SpellFlags::NO_METRICS;
            sim.calc_and_deal_damage(spell, spell.unit, 100.0, HitOutcome::HIT)
                .unwrap();
            assert_eq!(sim.spell(spell).unwrap().metrics.damage.current_value(), 0.0);
            assert_eq!(sim.unit(spell.unit).unwrap().damage_done(), 0.0);
        }
    }

    mod iteration_tests {
        use super::*;

        #[test]
        fn iterations_reseed_deterministically() {
            let mut a = Simulation::new(config().with_seed(11));
            let mut b = Simulation::new(config().with_seed(11));
            a.run_iteration(3).unwrap();
            b.run_iteration(3).unwrap();
            assert_eq!(a.roll().to_bits(), b.roll().to_bits());
        }

        #[test]
        fn rotation_is_kicked_at_zero() {
            let mut sim = Simulation::new(config());
            let unit = sim.add_unit(UnitConfig::new("Idle", 60)).unwrap();
            let calls = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&calls);
            sim.set_rotation(unit, move |sim: &mut Simulation, _unit: UnitId| {
                sink.lock().unwrap().push(sim.now());
                Ok(())
            })
            .unwrap();

            sim.run_iteration(0).unwrap();
            sim.run_iteration(1).unwrap();
            assert_eq!(*calls.lock().unwrap(), vec![SimTime::ZERO, SimTime::ZERO]);
            assert_eq!(sim.completed_iterations(), 2);
        }
    }
}
