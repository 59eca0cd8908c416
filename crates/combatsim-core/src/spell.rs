//! Spells and their mutable field surface.
//!
//! A [`Spell`] is registered on a unit from a [`SpellConfig`]. Its numeric
//! fields are public: spell mods rewrite them while active (see
//! [`crate::spell_mod`]) and content reads them when computing damage.
//!
//! Spells are matched by capability tags rather than identity: a class
//! mask, a [`SpellSchool`] and a [`ProcMask`]. [`SpellFlags::NO_SPELL_MODS`]
//! exempts a spell from every mod.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::cost::{CostOptions, SpellCost};
use crate::error::SimResult;
use crate::metrics::{ActionId, ResourceMetricsId, SpellMetrics};
use crate::simulation::Simulation;
use crate::time::SimTime;
use crate::unit::UnitId;

bitflags! {
    /// Damage school of a spell.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SpellSchool: u8 {
        const PHYSICAL = 1 << 0;
        const ARCANE   = 1 << 1;
        const FIRE     = 1 << 2;
        const FROST    = 1 << 3;
        const HOLY     = 1 << 4;
        const NATURE   = 1 << 5;
        const SHADOW   = 1 << 6;
    }
}

bitflags! {
    /// What kind of event a spell is, for proc and mod matching.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ProcMask: u32 {
        const MELEE_MH_AUTO    = 1 << 0;
        const MELEE_OH_AUTO    = 1 << 1;
        const MELEE_MH_SPECIAL = 1 << 2;
        const MELEE_OH_SPECIAL = 1 << 3;
        const RANGED_AUTO      = 1 << 4;
        const RANGED_SPECIAL   = 1 << 5;
        const SPELL_DAMAGE     = 1 << 6;
        const PERIODIC_DAMAGE  = 1 << 7;

        const MELEE_WHITE   = Self::MELEE_MH_AUTO.bits() | Self::MELEE_OH_AUTO.bits();
        const MELEE_SPECIAL = Self::MELEE_MH_SPECIAL.bits() | Self::MELEE_OH_SPECIAL.bits();
    }
}

bitflags! {
    /// Behavior flags of a spell.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SpellFlags: u32 {
        /// Never matched by spell mods.
        const NO_SPELL_MODS = 1 << 0;
        /// Casts and damage are not recorded.
        const NO_METRICS    = 1 << 1;
    }
}

bitflags! {
    /// Outcome of a hit roll.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct HitOutcome: u16 {
        const MISS   = 1 << 0;
        const HIT    = 1 << 1;
        const CRIT   = 1 << 2;
        const DODGE  = 1 << 3;
        const PARRY  = 1 << 4;
        const BLOCK  = 1 << 5;
        const GLANCE = 1 << 6;
    }
}

impl HitOutcome {
    /// True unless the attack missed, was dodged or was parried.
    #[must_use]
    pub fn landed(self) -> bool {
        !self.intersects(Self::MISS | Self::DODGE | Self::PARRY)
    }
}

// =============================================================================
// Handles
// =============================================================================

/// Index of a spell within its unit's spell book.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpellId(u32);

impl SpellId {
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

/// Globally unique handle to a spell: owning unit plus spell id.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpellRef {
    /// Owning unit.
    pub unit: UnitId,
    /// Spell within the unit.
    pub spell: SpellId,
}

impl fmt::Display for SpellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/spell#{}", self.unit, self.spell.0)
    }
}

// =============================================================================
// Field groups
// =============================================================================

/// Cast parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Cast {
    /// Resource cost. On the current cast, the effective cost of the last
    /// requirement check.
    pub cost: f64,
    /// Time from cast start to completion.
    pub cast_time: SimTime,
    /// Global cooldown started by the cast.
    pub gcd: SimTime,
}

/// Cooldown state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cooldown {
    /// Base duration.
    pub duration: SimTime,
    /// Added to the base duration.
    pub flat_modifier: SimTime,
    /// Scales the modified duration.
    pub multiplier: f64,
    /// Time at which the spell is ready again.
    pub ready_at: SimTime,
}

impl Cooldown {
    /// Cooldown of `duration`, ready immediately.
    #[must_use]
    pub fn new(duration: SimTime) -> Self {
        Self {
            duration,
            flat_modifier: SimTime::ZERO,
            multiplier: 1.0,
            ready_at: SimTime::ZERO,
        }
    }

    /// `max(0, (duration + flat) × multiplier)`.
    #[must_use]
    pub fn effective_duration(&self) -> SimTime {
        (self.duration + self.flat_modifier)
            .mul_f64(self.multiplier)
            .max_zero()
    }

    /// True if ready at `now`.
    #[must_use]
    pub fn is_ready(&self, now: SimTime) -> bool {
        self.ready_at <= now
    }
}

impl Default for Cooldown {
    fn default() -> Self {
        Self::new(SimTime::ZERO)
    }
}

/// Periodic damage component of a spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dot {
    /// Number of ticks per application.
    pub number_of_ticks: i32,
    /// Time between ticks.
    pub tick_length: SimTime,
}

impl Dot {
    /// Total duration of one application.
    #[must_use]
    pub fn duration(&self) -> SimTime {
        SimTime::from_nanos(self.tick_length.as_nanos() * i64::from(self.number_of_ticks))
    }
}

/// Effects run when a cast completes: `(sim, spell, target)`.
pub type SpellEffect = Arc<dyn Fn(&mut Simulation, SpellRef, UnitId) -> SimResult<()> + Send + Sync>;

// =============================================================================
// SpellConfig
// =============================================================================

/// Registration data for a spell.
#[derive(Clone)]
pub struct SpellConfig {
    /// Identity for metrics and logs.
    pub action_id: ActionId,
    /// Class membership bits matched by spell mods.
    pub class_mask: u64,
    /// Damage school.
    pub school: SpellSchool,
    /// Event kind.
    pub proc_mask: ProcMask,
    /// Behavior flags.
    pub flags: SpellFlags,
    /// Resource cost, if any.
    pub cost: Option<CostOptions>,
    /// Base cast time.
    pub cast_time: SimTime,
    /// Global cooldown triggered by the cast.
    pub gcd: SimTime,
    /// Base cooldown.
    pub cooldown: SimTime,
    /// Initial damage multiplier.
    pub damage_multiplier: f64,
    /// Initial crit damage bonus.
    pub crit_damage_bonus: f64,
    /// Initial bonus coefficient.
    pub bonus_coefficient: f64,
    /// Periodic components.
    pub dots: Vec<Dot>,
    /// Duration of the self-buff the spell applies, if any.
    pub buff_duration: Option<SimTime>,
    /// Durations of debuffs the spell applies, by key.
    pub debuff_durations: BTreeMap<String, SimTime>,
    /// Effects run on cast completion.
    pub apply_effects: Option<SpellEffect>,
}

impl SpellConfig {
    /// Config with neutral defaults for `action_id`.
    #[must_use]
    pub fn new(action_id: ActionId) -> Self {
        Self {
            action_id,
            class_mask: 0,
            school: SpellSchool::PHYSICAL,
            proc_mask: ProcMask::empty(),
            flags: SpellFlags::empty(),
            cost: None,
            cast_time: SimTime::ZERO,
            gcd: SimTime::ZERO,
            cooldown: SimTime::ZERO,
            damage_multiplier: 1.0,
            crit_damage_bonus: 0.0,
            bonus_coefficient: 0.0,
            dots: Vec::new(),
            buff_duration: None,
            debuff_durations: BTreeMap::new(),
            apply_effects: None,
        }
    }

    /// Set the class mask.
    #[must_use]
    pub fn with_class_mask(mut self, class_mask: u64) -> Self {
        self.class_mask = class_mask;
        self
    }

    /// Set the school.
    #[must_use]
    pub fn with_school(mut self, school: SpellSchool) -> Self {
        self.school = school;
        self
    }

    /// Set the proc mask.
    #[must_use]
    pub fn with_proc_mask(mut self, proc_mask: ProcMask) -> Self {
        self.proc_mask = proc_mask;
        self
    }

    /// Set the flags.
    #[must_use]
    pub fn with_flags(mut self, flags: SpellFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the cost.
    #[must_use]
    pub fn with_cost(mut self, cost: CostOptions) -> Self {
        self.cost = Some(cost);
        self
    }

    /// Set cast time and GCD.
    #[must_use]
    pub fn with_cast(mut self, cast_time: SimTime, gcd: SimTime) -> Self {
        self.cast_time = cast_time;
        self.gcd = gcd;
        self
    }

    /// Set the cooldown.
    #[must_use]
    pub fn with_cooldown(mut self, cooldown: SimTime) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Add a periodic component.
    #[must_use]
    pub fn with_dot(mut self, number_of_ticks: i32, tick_length: SimTime) -> Self {
        self.dots.push(Dot {
            number_of_ticks,
            tick_length,
        });
        self
    }

    /// Set the self-buff duration.
    #[must_use]
    pub fn with_buff_duration(mut self, duration: SimTime) -> Self {
        self.buff_duration = Some(duration);
        self
    }

    /// Add a keyed debuff duration.
    #[must_use]
    pub fn with_debuff_duration(mut self, key: impl Into<String>, duration: SimTime) -> Self {
        self.debuff_durations.insert(key.into(), duration);
        self
    }

    /// Set the crit damage bonus.
    #[must_use]
    pub fn with_crit_damage_bonus(mut self, bonus: f64) -> Self {
        self.crit_damage_bonus = bonus;
        self
    }

    /// Set the effects callback.
    #[must_use]
    pub fn with_effects<F>(mut self, effects: F) -> Self
    where
        F: Fn(&mut Simulation, SpellRef, UnitId) -> SimResult<()> + Send + Sync + 'static,
    {
        self.apply_effects = Some(Arc::new(effects));
        self
    }
}

impl fmt::Debug for SpellConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpellConfig")
            .field("action_id", &self.action_id)
            .field("class_mask", &self.class_mask)
            .field("school", &self.school)
            .field("proc_mask", &self.proc_mask)
            .field("flags", &self.flags)
            .field("cost", &self.cost)
            .field("has_effects", &self.apply_effects.is_some())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Spell
// =============================================================================

/// A registered spell.
#[derive(Clone)]
pub struct Spell {
    id: SpellId,
    unit: UnitId,
    /// Identity for metrics and logs.
    pub action_id: ActionId,
    /// Class membership bits.
    pub class_mask: u64,
    /// Damage school.
    pub school: SpellSchool,
    /// Event kind.
    pub proc_mask: ProcMask,
    /// Behavior flags.
    pub flags: SpellFlags,
    /// Cost numbers and policy.
    pub cost: Option<SpellCost>,
    /// Cast parameters as configured (mods rewrite these).
    pub default_cast: Cast,
    /// Cast parameters of the cast in progress.
    pub current_cast: Cast,
    /// Cooldown.
    pub cooldown: Cooldown,
    /// Multiplicative damage modifier.
    pub damage_multiplier: f64,
    /// Additive damage modifier.
    pub damage_multiplier_additive: f64,
    /// Additive modifier on base damage.
    pub base_damage_multiplier_additive: f64,
    /// Additive modifier on periodic damage.
    pub periodic_damage_multiplier_additive: f64,
    /// Additive modifier on direct damage.
    pub impact_damage_multiplier_additive: f64,
    /// Extra crit damage, `0.0` for the standard double damage.
    pub crit_damage_bonus: f64,
    /// Scales cast time.
    pub cast_time_multiplier: f64,
    /// Extra crit rating.
    pub bonus_crit_rating: f64,
    /// Extra hit rating.
    pub bonus_hit_rating: f64,
    /// Extra power coefficient.
    pub bonus_coefficient: f64,
    /// Flat damage added to the base.
    pub bonus_damage: f64,
    /// Periodic components.
    pub dots: Vec<Dot>,
    /// Self-buff duration.
    pub buff_duration: Option<SimTime>,
    /// Keyed debuff durations.
    pub debuff_durations: BTreeMap<String, SimTime>,
    /// Metrics for resource the spell generates without a cost (auto attacks).
    pub resource_metrics: Option<ResourceMetricsId>,
    /// Effects run on cast completion.
    pub apply_effects: Option<SpellEffect>,
    /// Casts, hits and damage.
    pub metrics: SpellMetrics,
}

impl Spell {
    pub(crate) fn from_config(
        unit: UnitId,
        id: SpellId,
        config: SpellConfig,
        cost: Option<SpellCost>,
    ) -> Self {
        let default_cast = Cast {
            cost: cost.as_ref().map_or(0.0, |c| c.base_cost),
            cast_time: config.cast_time,
            gcd: config.gcd,
        };
        Self {
            id,
            unit,
            action_id: config.action_id,
            class_mask: config.class_mask,
            school: config.school,
            proc_mask: config.proc_mask,
            flags: config.flags,
            cost,
            default_cast,
            current_cast: default_cast,
            cooldown: Cooldown::new(config.cooldown),
            damage_multiplier: config.damage_multiplier,
            damage_multiplier_additive: 1.0,
            base_damage_multiplier_additive: 1.0,
            periodic_damage_multiplier_additive: 1.0,
            impact_damage_multiplier_additive: 1.0,
            crit_damage_bonus: config.crit_damage_bonus,
            cast_time_multiplier: 1.0,
            bonus_crit_rating: 0.0,
            bonus_hit_rating: 0.0,
            bonus_coefficient: config.bonus_coefficient,
            bonus_damage: 0.0,
            dots: config.dots,
            buff_duration: config.buff_duration,
            debuff_durations: config.debuff_durations,
            resource_metrics: None,
            apply_effects: config.apply_effects,
            metrics: SpellMetrics::default(),
        }
    }

    /// Id within the unit.
    #[must_use]
    pub fn id(&self) -> SpellId {
        self.id
    }

    /// Owning unit.
    #[must_use]
    pub fn unit(&self) -> UnitId {
        self.unit
    }

    /// Global handle.
    #[must_use]
    pub fn spell_ref(&self) -> SpellRef {
        SpellRef {
            unit: self.unit,
            spell: self.id,
        }
    }

    /// True if the spell has periodic components.
    #[must_use]
    pub fn has_dots(&self) -> bool {
        !self.dots.is_empty()
    }

    /// True if the class mask shares a bit with `mask`.
    #[must_use]
    pub fn matches_class(&self, mask: u64) -> bool {
        self.class_mask & mask != 0
    }

    /// Cast time after the cast-time multiplier.
    #[must_use]
    pub fn effective_cast_time(&self) -> SimTime {
        self.default_cast
            .cast_time
            .mul_f64(self.cast_time_multiplier)
            .max_zero()
    }

    /// Damage multiplier applied to a crit: `1 + (2 - 1) × (1 + bonus)`.
    #[must_use]
    pub fn crit_multiplier(&self) -> f64 {
        1.0 + (2.0 - 1.0) * (1.0 + self.crit_damage_bonus)
    }

    /// Product of the multipliers applied to direct damage.
    #[must_use]
    pub fn impact_multiplier(&self) -> f64 {
        self.damage_multiplier
            * self.damage_multiplier_additive
            * self.base_damage_multiplier_additive
            * self.impact_damage_multiplier_additive
    }

    /// Product of the multipliers applied to periodic damage.
    #[must_use]
    pub fn periodic_multiplier(&self) -> f64 {
        self.damage_multiplier
            * self.damage_multiplier_additive
            * self.base_damage_multiplier_additive
            * self.periodic_damage_multiplier_additive
    }

    pub(crate) fn reset_iteration(&mut self) {
        self.cooldown.ready_at = SimTime::ZERO;
        self.current_cast = self.default_cast;
        self.metrics.reset_iteration();
    }
}

impl fmt::Debug for Spell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spell")
            .field("id", &self.id)
            .field("unit", &self.unit)
            .field("action_id", &self.action_id)
            .field("cost", &self.cost)
            .field("default_cast", &self.default_cast)
            .field("cooldown", &self.cooldown)
            .field("damage_multiplier", &self.damage_multiplier)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// SpellHit
// =============================================================================

/// Result of one damage calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpellHit {
    /// The spell that hit.
    pub spell: SpellRef,
    /// Unit that was hit.
    pub target: UnitId,
    /// Roll outcome.
    pub outcome: HitOutcome,
    /// Damage actually dealt.
    pub damage: f64,
    /// Damage before miss/dodge/parry and crit were applied.
    pub pre_outcome_damage: f64,
}

impl SpellHit {
    /// See [`HitOutcome::landed`].
    #[must_use]
    pub fn landed(&self) -> bool {
        self.outcome.landed()
    }
}
