//! Auras: timed, stackable states with a fixed set of event hooks.
//!
//! Every aura belongs to one unit and is registered before the simulation
//! is finalized. Its hooks are plain closures taking the whole simulation,
//! so an aura can cast spells, move resources, toggle spell mods or
//! (de)activate other auras from inside any hook.
//!
//! # Hook dispatch
//!
//! Event dispatch takes a snapshot of the unit's active auras that carry
//! the hook, in registration order, before the first hook runs. Each entry
//! is checked again right before its hook runs: an aura deactivated in the
//! meantime is skipped, and an aura activated during the dispatch is not in
//! the snapshot at all.
//!
//! # Scheduled expirations and ticks
//!
//! Expirations and periodic ticks are one-shot clock actions. They cannot
//! be cancelled; instead every activation, refresh and deactivation bumps
//! the aura's generation, and a scheduled action whose generation no longer
//! matches does nothing.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tally::IterationTally;
use tracing::trace;

use crate::error::{SimError, SimResult};
use crate::metrics::{ActionId, ResourceMetricsId};
use crate::simulation::Simulation;
use crate::spell::SpellHit;
use crate::time::SimTime;
use crate::unit::UnitId;

// =============================================================================
// Handles
// =============================================================================

/// Index of an aura within its unit.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AuraId(u32);

impl AuraId {
    /// Creates an id from a raw index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Globally unique handle to an aura.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AuraRef {
    /// Owning unit.
    pub unit: UnitId,
    /// Aura within the unit.
    pub aura: AuraId,
}

impl fmt::Display for AuraRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/aura#{}", self.unit, self.aura.0)
    }
}

// =============================================================================
// Hooks
// =============================================================================

/// Lifecycle hook.
pub type AuraHook = Arc<dyn Fn(&mut Simulation, AuraRef) -> SimResult<()> + Send + Sync>;

/// Hit hook, fired for hits dealt or taken by the aura's unit.
pub type AuraSpellHook =
    Arc<dyn Fn(&mut Simulation, AuraRef, &SpellHit) -> SimResult<()> + Send + Sync>;

/// Resource-change hook; receives the metrics the change was attributed to.
pub type AuraResourceHook =
    Arc<dyn Fn(&mut Simulation, AuraRef, ResourceMetricsId) -> SimResult<()> + Send + Sync>;

/// The fixed hook set of an aura. Every hook is optional.
#[derive(Clone, Default)]
pub struct AuraHooks {
    /// Once, at finalize.
    pub on_init: Option<AuraHook>,
    /// At every iteration start, active or not.
    pub on_reset: Option<AuraHook>,
    /// On the inactive → active transition.
    pub on_gain: Option<AuraHook>,
    /// On the active → inactive transition.
    pub on_expire: Option<AuraHook>,
    /// Every `tick_length` while active.
    pub on_periodic_tick: Option<AuraHook>,
    /// Hits dealt by the unit.
    pub on_spell_hit_dealt: Option<AuraSpellHook>,
    /// Hits taken by the unit.
    pub on_spell_hit_taken: Option<AuraSpellHook>,
    /// Changes of the unit's resource bar.
    pub on_resource_change: Option<AuraResourceHook>,
}

impl fmt::Debug for AuraHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        for (name, set) in [
            ("on_init", self.on_init.is_some()),
            ("on_reset", self.on_reset.is_some()),
            ("on_gain", self.on_gain.is_some()),
            ("on_expire", self.on_expire.is_some()),
            ("on_periodic_tick", self.on_periodic_tick.is_some()),
            ("on_spell_hit_dealt", self.on_spell_hit_dealt.is_some()),
            ("on_spell_hit_taken", self.on_spell_hit_taken.is_some()),
            ("on_resource_change", self.on_resource_change.is_some()),
        ] {
            if set {
                names.push(name);
            }
        }
        f.debug_tuple("AuraHooks").field(&names).finish()
    }
}

// =============================================================================
// AuraConfig
// =============================================================================

/// Construction data for an aura.
///
/// # Example
///
/// ```
/// use combatsim_core::aura::AuraConfig;
/// use combatsim_core::time::SimTime;
///
/// let config = AuraConfig::new("Enrage")
///     .with_duration(SimTime::from_secs(12))
///     .with_max_stacks(1)
///     .on_gain(|_sim, _aura| Ok(()));
/// assert_eq!(config.label, "Enrage");
/// ```
#[derive(Debug, Clone)]
pub struct AuraConfig {
    /// Display label.
    pub label: String,
    /// Optional action identity.
    pub action_id: Option<ActionId>,
    /// Duration of one activation; [`SimTime::NEVER`] for permanent.
    pub duration: SimTime,
    /// Stack cap.
    pub max_stacks: u32,
    /// Periodic tick interval.
    pub tick_length: Option<SimTime>,
    /// Hooks.
    pub hooks: AuraHooks,
}

impl AuraConfig {
    /// Permanent, unstacked aura without hooks.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action_id: None,
            duration: SimTime::NEVER,
            max_stacks: 0,
            tick_length: None,
            hooks: AuraHooks::default(),
        }
    }

    /// Set the duration.
    #[must_use]
    pub fn with_duration(mut self, duration: SimTime) -> Self {
        self.duration = duration;
        self
    }

    /// Set the stack cap.
    #[must_use]
    pub fn with_max_stacks(mut self, max_stacks: u32) -> Self {
        self.max_stacks = max_stacks;
        self
    }

    /// Tick every `tick_length` while active.
    #[must_use]
    pub fn with_tick_length(mut self, tick_length: SimTime) -> Self {
        self.tick_length = Some(tick_length);
        self
    }

    /// Set the action identity.
    #[must_use]
    pub fn with_action_id(mut self, action_id: ActionId) -> Self {
        self.action_id = Some(action_id);
        self
    }

    /// Set the `on_init` hook.
    #[must_use]
    pub fn on_init<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Simulation, AuraRef) -> SimResult<()> + Send + Sync + 'static,
    {
        self.hooks.on_init = Some(Arc::new(hook));
        self
    }

    /// Set the `on_reset` hook.
    #[must_use]
    pub fn on_reset<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Simulation, AuraRef) -> SimResult<()> + Send + Sync + 'static,
    {
        self.hooks.on_reset = Some(Arc::new(hook));
        self
    }

    /// Set the `on_gain` hook.
    #[must_use]
    pub fn on_gain<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Simulation, AuraRef) -> SimResult<()> + Send + Sync + 'static,
    {
        self.hooks.on_gain = Some(Arc::new(hook));
        self
    }

    /// Set the `on_expire` hook.
    #[must_use]
    pub fn on_expire<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Simulation, AuraRef) -> SimResult<()> + Send + Sync + 'static,
    {
        self.hooks.on_expire = Some(Arc::new(hook));
        self
    }

    /// Set the `on_periodic_tick` hook.
    #[must_use]
    pub fn on_periodic_tick<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Simulation, AuraRef) -> SimResult<()> + Send + Sync + 'static,
    {
        self.hooks.on_periodic_tick = Some(Arc::new(hook));
        self
    }

    /// Set the `on_spell_hit_dealt` hook.
    #[must_use]
    pub fn on_spell_hit_dealt<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Simulation, AuraRef, &SpellHit) -> SimResult<()> + Send + Sync + 'static,
    {
        self.hooks.on_spell_hit_dealt = Some(Arc::new(hook));
        self
    }

    /// Set the `on_spell_hit_taken` hook.
    #[must_use]
    pub fn on_spell_hit_taken<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Simulation, AuraRef, &SpellHit) -> SimResult<()> + Send + Sync + 'static,
    {
        self.hooks.on_spell_hit_taken = Some(Arc::new(hook));
        self
    }

    /// Set the `on_resource_change` hook.
    #[must_use]
    pub fn on_resource_change<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Simulation, AuraRef, ResourceMetricsId) -> SimResult<()>
            + Send
            + Sync
            + 'static,
    {
        self.hooks.on_resource_change = Some(Arc::new(hook));
        self
    }
}

// =============================================================================
// Aura
// =============================================================================

/// A registered aura and its per-iteration state.
#[derive(Debug, Clone)]
pub struct Aura {
    handle: AuraRef,
    label: String,
    action_id: Option<ActionId>,
    duration: SimTime,
    max_stacks: u32,
    tick_length: Option<SimTime>,
    hooks: AuraHooks,

    active: bool,
    stacks: u32,
    started_at: SimTime,
    expires_at: SimTime,
    next_tick_at: SimTime,
    /// Bumped on every activation, refresh and deactivation.
    generation: u64,
    /// Bumped only on inactive → active.
    activation_serial: u64,
    /// Seconds active (value) and activations (events).
    activity: IterationTally,
}

impl Aura {
    fn new(handle: AuraRef, config: AuraConfig) -> Self {
        Self {
            handle,
            label: config.label,
            action_id: config.action_id,
            duration: config.duration,
            max_stacks: config.max_stacks,
            tick_length: config.tick_length,
            hooks: config.hooks,
            active: false,
            stacks: 0,
            started_at: SimTime::ZERO,
            expires_at: SimTime::NEVER,
            next_tick_at: SimTime::NEVER,
            generation: 0,
            activation_serial: 0,
            activity: IterationTally::new(),
        }
    }

    /// Handle.
    #[must_use]
    pub fn handle(&self) -> AuraRef {
        self.handle
    }

    /// Display label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Action identity, if any.
    #[must_use]
    pub fn action_id(&self) -> Option<ActionId> {
        self.action_id
    }

    /// Configured duration.
    #[must_use]
    pub fn duration(&self) -> SimTime {
        self.duration
    }

    /// Stack cap.
    #[must_use]
    pub fn max_stacks(&self) -> u32 {
        self.max_stacks
    }

    /// Whether the aura is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Current stacks.
    #[must_use]
    pub fn stacks(&self) -> u32 {
        self.stacks
    }

    /// Expiration time of the current activation, [`SimTime::NEVER`] when
    /// inactive or permanent.
    #[must_use]
    pub fn expires_at(&self) -> SimTime {
        self.expires_at
    }

    /// Time left before expiration.
    #[must_use]
    pub fn remaining(&self, now: SimTime) -> SimTime {
        if self.expires_at.is_never() {
            SimTime::NEVER
        } else {
            (self.expires_at - now).max_zero()
        }
    }

    /// Seconds active (value) and activations (events) per iteration.
    #[must_use]
    pub fn activity(&self) -> &IterationTally {
        &self.activity
    }

    pub(crate) fn hooks(&self) -> &AuraHooks {
        &self.hooks
    }

    pub(crate) fn reset_iteration(&mut self) {
        self.active = false;
        self.stacks = 0;
        self.started_at = SimTime::ZERO;
        self.expires_at = SimTime::NEVER;
        self.next_tick_at = SimTime::NEVER;
        self.generation += 1;
        self.activity.reset_iteration();
    }

    pub(crate) fn done_iteration(&mut self) {
        self.activity.done_iteration();
    }
}

// =============================================================================
// AuraTable
// =============================================================================

/// The auras of one unit, in registration order.
#[derive(Debug, Clone, Default)]
pub struct AuraTable {
    auras: Vec<Aura>,
}

impl AuraTable {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Aura by id.
    #[must_use]
    pub fn get(&self, id: AuraId) -> Option<&Aura> {
        self.auras.get(id.index())
    }

    pub(crate) fn get_mut(&mut self, id: AuraId) -> Option<&mut Aura> {
        self.auras.get_mut(id.index())
    }

    /// All auras in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Aura> {
        self.auras.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Aura> {
        self.auras.iter_mut()
    }

    /// Number of auras.
    #[must_use]
    pub fn len(&self) -> usize {
        self.auras.len()
    }

    /// True if the unit has no auras.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.auras.is_empty()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn push(&mut self, unit: UnitId, config: AuraConfig) -> AuraRef {
        let handle = AuraRef {
            unit,
            aura: AuraId::new(self.auras.len() as u32),
        };
        self.auras.push(Aura::new(handle, config));
        handle
    }

    /// Active auras carrying the selected hook, with the activation serial
    /// each was captured at.
    fn snapshot<H>(&self, select: impl Fn(&AuraHooks) -> Option<H>) -> Vec<(AuraRef, u64, H)> {
        self.auras
            .iter()
            .filter(|aura| aura.active)
            .filter_map(|aura| {
                select(&aura.hooks).map(|hook| (aura.handle, aura.activation_serial, hook))
            })
            .collect()
    }
}

// =============================================================================
// Simulation surface
// =============================================================================

impl Simulation {
    /// Register an aura on `unit`.
    ///
    /// # Errors
    ///
    /// Unknown unit, [`SimError::RegistrationClosed`] after finalize, or
    /// [`SimError::InvalidConfig`] for a non-positive tick length or a
    /// negative duration.
    pub fn register_aura(&mut self, unit: UnitId, config: AuraConfig) -> SimResult<AuraRef> {
        self.ensure_registration_open(unit)?;
        if config.tick_length.is_some_and(|t| t <= SimTime::ZERO) {
            return Err(SimError::InvalidConfig(format!(
                "aura {} has a non-positive tick length",
                config.label
            )));
        }
        if config.duration.is_negative() {
            return Err(SimError::InvalidConfig(format!(
                "aura {} has a negative duration",
                config.label
            )));
        }
        Ok(self.unit_mut(unit)?.auras_mut().push(unit, config))
    }

    /// Look up an aura.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownAura`].
    pub fn aura(&self, aura: AuraRef) -> SimResult<&Aura> {
        self.unit(aura.unit)?
            .auras()
            .get(aura.aura)
            .ok_or(SimError::UnknownAura(aura))
    }

    fn aura_mut(&mut self, aura: AuraRef) -> SimResult<&mut Aura> {
        self.unit_mut(aura.unit)?
            .auras_mut()
            .get_mut(aura.aura)
            .ok_or(SimError::UnknownAura(aura))
    }

    /// Whether the aura is active.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownAura`].
    pub fn is_aura_active(&self, aura: AuraRef) -> SimResult<bool> {
        Ok(self.aura(aura)?.is_active())
    }

    /// Activate the aura, or refresh it when already active.
    ///
    /// Activation fires `on_gain`. Both activation and refresh schedule the
    /// expiration (unless permanent) and restart periodic ticks.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownAura`] or errors raised by `on_gain`.
    pub fn activate_aura(&mut self, aura: AuraRef) -> SimResult<()> {
        let now = self.now();
        let state = self.aura_mut(aura)?;
        let gained = !state.active;
        state.generation += 1;
        if gained {
            state.active = true;
            state.started_at = now;
            state.activation_serial += 1;
            state.activity.count();
        }
        let generation = state.generation;
        let duration = state.duration;
        let tick_length = state.tick_length;
        state.expires_at = if duration.is_never() {
            SimTime::NEVER
        } else {
            now + duration
        };
        state.next_tick_at = tick_length.map_or(SimTime::NEVER, |t| now + t);
        let (expires_at, next_tick_at) = (state.expires_at, state.next_tick_at);
        let on_gain = state.hooks.on_gain.clone();

        trace!(aura = %aura, now = %now, gained, "Aura activated until {}", expires_at);

        if !expires_at.is_never() {
            self.schedule_at(expires_at, move |sim: &mut Simulation| {
                sim.expire_aura(aura, generation)
            })?;
        }
        if !next_tick_at.is_never() && next_tick_at <= expires_at {
            self.schedule_at(next_tick_at, move |sim: &mut Simulation| {
                sim.tick_aura(aura, generation)
            })?;
        }
        match on_gain {
            Some(hook) if gained => hook(self, aura),
            _ => Ok(()),
        }
    }

    /// Deactivate the aura. Fires `on_expire`, records uptime, drops the
    /// stacks and invalidates pending expirations and ticks. No-op when
    /// inactive.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownAura`] or errors raised by `on_expire`.
    pub fn deactivate_aura(&mut self, aura: AuraRef) -> SimResult<()> {
        let now = self.now();
        let state = self.aura_mut(aura)?;
        if !state.active {
            return Ok(());
        }
        state.active = false;
        state.stacks = 0;
        state.generation += 1;
        state.expires_at = SimTime::NEVER;
        state.next_tick_at = SimTime::NEVER;
        state.activity.add((now - state.started_at).as_secs_f64());
        let on_expire = state.hooks.on_expire.clone();

        trace!(aura = %aura, now = %now, "Aura expired");

        match on_expire {
            Some(hook) => hook(self, aura),
            None => Ok(()),
        }
    }

    /// Set the stack count, clamped to `max_stacks`.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownAura`].
    pub fn set_stacks(&mut self, aura: AuraRef, stacks: u32) -> SimResult<()> {
        let state = self.aura_mut(aura)?;
        state.stacks = stacks.min(state.max_stacks);
        Ok(())
    }

    /// Add one stack, up to `max_stacks`.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownAura`].
    pub fn add_stack(&mut self, aura: AuraRef) -> SimResult<()> {
        let stacks = self.aura(aura)?.stacks();
        self.set_stacks(aura, stacks.saturating_add(1))
    }

    fn expire_aura(&mut self, aura: AuraRef, generation: u64) -> SimResult<()> {
        let now = self.now();
        let state = self.aura(aura)?;
        if !state.active || state.generation != generation {
            return Ok(());
        }
        // A tick due now fires before the expiration.
        if state.tick_length.is_some() && state.next_tick_at == now {
            self.fire_tick(aura)?;
            let state = self.aura(aura)?;
            if !state.active || state.generation != generation {
                return Ok(());
            }
        }
        self.deactivate_aura(aura)
    }

    fn tick_aura(&mut self, aura: AuraRef, generation: u64) -> SimResult<()> {
        let state = self.aura(aura)?;
        if !state.active || state.generation != generation {
            return Ok(());
        }
        let next = self.fire_tick(aura)?;
        if let Some(next) = next {
            self.schedule_at(next, move |sim: &mut Simulation| {
                sim.tick_aura(aura, generation)
            })?;
        }
        Ok(())
    }

    /// Advance the tick time, run the hook, and return the next tick time
    /// if it falls within the current activation.
    fn fire_tick(&mut self, aura: AuraRef) -> SimResult<Option<SimTime>> {
        let now = self.now();
        let state = self.aura_mut(aura)?;
        let Some(tick_length) = state.tick_length else {
            return Ok(None);
        };
        let next = now + tick_length;
        state.next_tick_at = next;
        let within = next <= state.expires_at;
        let hook = state.hooks.on_periodic_tick.clone();
        if let Some(hook) = hook {
            hook(self, aura)?;
        }
        Ok(within.then_some(next))
    }

    /// Fire `on_init` on every aura of every unit.
    pub(crate) fn init_auras(&mut self) -> SimResult<()> {
        for (aura, hook) in self.collect_hooks(|h| h.on_init.clone()) {
            hook(self, aura)?;
        }
        Ok(())
    }

    /// Fire `on_reset` on every aura of every unit.
    pub(crate) fn reset_auras(&mut self) -> SimResult<()> {
        for (aura, hook) in self.collect_hooks(|h| h.on_reset.clone()) {
            hook(self, aura)?;
        }
        Ok(())
    }

    /// Deactivate every active aura, in unit then registration order.
    pub(crate) fn expire_all_auras(&mut self) -> SimResult<()> {
        let active: Vec<AuraRef> = self
            .units()
            .iter()
            .flat_map(|unit| unit.auras().iter())
            .filter(|aura| aura.is_active())
            .map(Aura::handle)
            .collect();
        for aura in active {
            self.deactivate_aura(aura)?;
        }
        Ok(())
    }

    fn collect_hooks(&self, select: impl Fn(&AuraHooks) -> Option<AuraHook>) -> Vec<(AuraRef, AuraHook)> {
        self.units()
            .iter()
            .flat_map(|unit| unit.auras().iter())
            .filter_map(|aura| select(aura.hooks()).map(|hook| (aura.handle(), hook)))
            .collect()
    }

    fn still_active(&self, aura: AuraRef, serial: u64) -> SimResult<bool> {
        let state = self.aura(aura)?;
        Ok(state.active && state.activation_serial == serial)
    }

    /// Fire `on_spell_hit_dealt` on the caster's active auras.
    pub(crate) fn dispatch_hit_dealt(&mut self, hit: &SpellHit) -> SimResult<()> {
        let snapshot = self
            .unit(hit.spell.unit)?
            .auras()
            .snapshot(|h| h.on_spell_hit_dealt.clone());
        for (aura, serial, hook) in snapshot {
            if self.still_active(aura, serial)? {
                hook(self, aura, hit)?;
            }
        }
        Ok(())
    }

    /// Fire `on_spell_hit_taken` on the target's active auras.
    pub(crate) fn dispatch_hit_taken(&mut self, hit: &SpellHit) -> SimResult<()> {
        let snapshot = self
            .unit(hit.target)?
            .auras()
            .snapshot(|h| h.on_spell_hit_taken.clone());
        for (aura, serial, hook) in snapshot {
            if self.still_active(aura, serial)? {
                hook(self, aura, hit)?;
            }
        }
        Ok(())
    }

    /// Fire `on_resource_change` on the unit's active auras.
    pub(crate) fn dispatch_resource_change(
        &mut self,
        unit: UnitId,
        metrics: ResourceMetricsId,
    ) -> SimResult<()> {
        let snapshot = self
            .unit(unit)?
            .auras()
            .snapshot(|h| h.on_resource_change.clone());
        for (aura, serial, hook) in snapshot {
            if self.still_active(aura, serial)? {
                hook(self, aura, metrics)?;
            }
        }
        Ok(())
    }
}
