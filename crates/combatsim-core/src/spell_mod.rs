//! Reversible spell modifiers.
//!
//! A [`SpellMod`] rewrites one field of every spell it matches while it is
//! active. Matching happens once, when a spell is registered on the mod's
//! unit; it is never re-evaluated afterwards, so a mod built after a spell
//! never touches that spell.
//!
//! ```text
//! inactive ──activate──▶ active
//!    ▲                     │
//!    └─────deactivate──────┘
//! ```
//!
//! Activating applies the kind's field transform to every matched spell and
//! records an [`Applied`] entry holding the exact reversal. Deactivating
//! replays those reversals. Both are no-ops when the mod is already in the
//! target state; the transforms themselves are not idempotent.
//!
//! | kind | payload | field |
//! |------|---------|-------|
//! | `DamageDonePct` | float | `damage_multiplier *= 1 + v` |
//! | `DamageDoneFlat` | float | `damage_multiplier_additive += v` |
//! | `BaseDamageDoneFlat` | float | `base_damage_multiplier_additive += v` |
//! | `PeriodicDamageDoneFlat` | float | `periodic_damage_multiplier_additive += v` (spells with dots) |
//! | `ImpactDamageDoneFlat` | float | `impact_damage_multiplier_additive += v` |
//! | `CritDamageBonusFlat` | float | `crit_damage_bonus += v` |
//! | `PowerCostPct` | int | `cost.multiplier += v` |
//! | `PowerCostFlat` | int | `cost.flat_modifier += v` |
//! | `CooldownFlat` | time | `cooldown.flat_modifier += v` |
//! | `CooldownMultiFlat` | float | `cooldown.multiplier += v` |
//! | `CooldownMultiPct` | float | `cooldown.multiplier *= 1 + v` |
//! | `CastTimePct` | float | `cast_time_multiplier += v` |
//! | `CastTimeFlat` | time | `default_cast.cast_time += v` |
//! | `BonusCritFlat` | float | `bonus_crit_rating += v` |
//! | `BonusHitFlat` | float | `bonus_hit_rating += v` |
//! | `DotNumberOfTicksFlat` | int | every dot's `number_of_ticks += v` |
//! | `DotTickLengthFlat` | time | every dot's `tick_length += v` |
//! | `GlobalCooldownFlat` | time | `default_cast.gcd += v` |
//! | `BonusCoefficientFlat` | float | `bonus_coefficient += v` |
//! | `BonusDamageFlat` | float | `bonus_damage += v` |
//! | `BuffDurationFlat` | time | `buff_duration += v` (if set) |
//! | `DebuffDurationFlat` | key, time | `debuff_durations[key] += v` (if present) |
//! | `Custom` | any | caller-supplied apply/remove |

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::simulation::Simulation;
use crate::spell::{ProcMask, Spell, SpellFlags, SpellId, SpellSchool};
use crate::time::SimTime;
use crate::unit::UnitId;

// =============================================================================
// Kinds and payloads
// =============================================================================

/// Closed set of field transforms.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpellModKind {
    /// `damage_multiplier *= 1 + float`.
    DamageDonePct,
    /// `damage_multiplier_additive += float`.
    DamageDoneFlat,
    /// `base_damage_multiplier_additive += float`.
    BaseDamageDoneFlat,
    /// `periodic_damage_multiplier_additive += float`, spells with dots only.
    PeriodicDamageDoneFlat,
    /// `impact_damage_multiplier_additive += float`.
    ImpactDamageDoneFlat,
    /// `crit_damage_bonus += float`.
    CritDamageBonusFlat,
    /// `cost.multiplier += int` (percent points).
    PowerCostPct,
    /// `cost.flat_modifier += int`.
    PowerCostFlat,
    /// `cooldown.flat_modifier += time`.
    CooldownFlat,
    /// `cooldown.multiplier += float`.
    CooldownMultiFlat,
    /// `cooldown.multiplier *= 1 + float`.
    CooldownMultiPct,
    /// `cast_time_multiplier += float`.
    CastTimePct,
    /// `default_cast.cast_time += time`.
    CastTimeFlat,
    /// `bonus_crit_rating += float`.
    BonusCritFlat,
    /// `bonus_hit_rating += float`.
    BonusHitFlat,
    /// Every dot's `number_of_ticks += int`.
    DotNumberOfTicksFlat,
    /// Every dot's `tick_length += time`.
    DotTickLengthFlat,
    /// `default_cast.gcd += time`.
    GlobalCooldownFlat,
    /// `bonus_coefficient += float`.
    BonusCoefficientFlat,
    /// `bonus_damage += float`.
    BonusDamageFlat,
    /// `buff_duration += time`, if the spell has a buff.
    BuffDurationFlat,
    /// `debuff_durations[key] += time`, if the key is present.
    DebuffDurationFlat,
    /// Caller-supplied apply and remove functions.
    Custom,
}

impl SpellModKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 23] = [
        Self::DamageDonePct,
        Self::DamageDoneFlat,
        Self::BaseDamageDoneFlat,
        Self::PeriodicDamageDoneFlat,
        Self::ImpactDamageDoneFlat,
        Self::CritDamageBonusFlat,
        Self::PowerCostPct,
        Self::PowerCostFlat,
        Self::CooldownFlat,
        Self::CooldownMultiFlat,
        Self::CooldownMultiPct,
        Self::CastTimePct,
        Self::CastTimeFlat,
        Self::BonusCritFlat,
        Self::BonusHitFlat,
        Self::DotNumberOfTicksFlat,
        Self::DotTickLengthFlat,
        Self::GlobalCooldownFlat,
        Self::BonusCoefficientFlat,
        Self::BonusDamageFlat,
        Self::BuffDurationFlat,
        Self::DebuffDurationFlat,
        Self::Custom,
    ];
}

/// Payload of a mod. Each kind reads only the fields it needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModValues {
    /// Integer payload.
    pub int_value: i32,
    /// Float payload.
    pub float_value: f64,
    /// Time payload.
    pub time_value: SimTime,
    /// Debuff key.
    pub key_value: Option<String>,
}

/// Custom apply or remove function.
pub type SpellModFn = Arc<dyn Fn(&ModValues, &mut Spell) + Send + Sync>;

/// How to undo one application, computed when it was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Reversal {
    /// Divide the kind's field by this factor.
    Divide(f64),
    /// Subtract from the kind's float field.
    SubtractFloat(f64),
    /// Subtract from the kind's integer field(s).
    SubtractInt(i32),
    /// Subtract from the kind's time field(s).
    SubtractTime(SimTime),
    /// Subtract from a keyed debuff duration.
    SubtractDebuff {
        /// Debuff key.
        key: String,
        /// Amount added on apply.
        amount: SimTime,
    },
    /// Run the custom remove function.
    Custom,
    /// Nothing was applied (the spell lacks the field).
    Skipped,
}

/// One application of a mod to one spell.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    /// The spell.
    pub spell: SpellId,
    /// Its reversal.
    pub reversal: Reversal,
}

// =============================================================================
// Config
// =============================================================================

/// Construction data for a [`SpellMod`].
///
/// # Example
///
/// ```
/// use combatsim_core::spell::ProcMask;
/// use combatsim_core::spell_mod::{SpellModConfig, SpellModKind};
///
/// let config = SpellModConfig::new(SpellModKind::DamageDonePct)
///     .with_proc_mask(ProcMask::MELEE_SPECIAL)
///     .with_float_value(0.10);
/// assert_eq!(config.values.float_value, 0.10);
/// ```
#[derive(Clone)]
pub struct SpellModConfig {
    /// Transform.
    pub kind: SpellModKind,
    /// Class selector; zero matches everything.
    pub class_mask: u64,
    /// School selector; empty matches everything.
    pub school: SpellSchool,
    /// Proc selector; empty matches everything.
    pub proc_mask: ProcMask,
    /// Payload.
    pub values: ModValues,
    /// Apply function for [`SpellModKind::Custom`].
    pub apply_custom: Option<SpellModFn>,
    /// Remove function for [`SpellModKind::Custom`].
    pub remove_custom: Option<SpellModFn>,
}

impl SpellModConfig {
    /// Wildcard config of `kind` with zero payload.
    #[must_use]
    pub fn new(kind: SpellModKind) -> Self {
        Self {
            kind,
            class_mask: 0,
            school: SpellSchool::empty(),
            proc_mask: ProcMask::empty(),
            values: ModValues::default(),
            apply_custom: None,
            remove_custom: None,
        }
    }

    /// Set the class selector.
    #[must_use]
    pub fn with_class_mask(mut self, class_mask: u64) -> Self {
        self.class_mask = class_mask;
        self
    }

    /// Set the school selector.
    #[must_use]
    pub fn with_school(mut self, school: SpellSchool) -> Self {
        self.school = school;
        self
    }

    /// Set the proc selector.
    #[must_use]
    pub fn with_proc_mask(mut self, proc_mask: ProcMask) -> Self {
        self.proc_mask = proc_mask;
        self
    }

    /// Set the integer payload.
    #[must_use]
    pub fn with_int_value(mut self, value: i32) -> Self {
        self.values.int_value = value;
        self
    }

    /// Set the float payload.
    #[must_use]
    pub fn with_float_value(mut self, value: f64) -> Self {
        self.values.float_value = value;
        self
    }

    /// Set the time payload.
    #[must_use]
    pub fn with_time_value(mut self, value: SimTime) -> Self {
        self.values.time_value = value;
        self
    }

    /// Set the debuff key.
    #[must_use]
    pub fn with_key_value(mut self, key: impl Into<String>) -> Self {
        self.values.key_value = Some(key.into());
        self
    }

    /// Set custom apply and remove functions.
    #[must_use]
    pub fn with_custom<A, R>(mut self, apply: A, remove: R) -> Self
    where
        A: Fn(&ModValues, &mut Spell) + Send + Sync + 'static,
        R: Fn(&ModValues, &mut Spell) + Send + Sync + 'static,
    {
        self.apply_custom = Some(Arc::new(apply));
        self.remove_custom = Some(Arc::new(remove));
        self
    }
}

impl fmt::Debug for SpellModConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpellModConfig")
            .field("kind", &self.kind)
            .field("class_mask", &self.class_mask)
            .field("school", &self.school)
            .field("proc_mask", &self.proc_mask)
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Handles
// =============================================================================

/// Index of a mod within its unit.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpellModId(u32);

impl SpellModId {
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

/// Globally unique handle to a spell mod.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpellModRef {
    /// Owning unit.
    pub unit: UnitId,
    /// Mod within the unit.
    pub id: SpellModId,
}

impl fmt::Display for SpellModRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/mod#{}", self.unit, self.id.0)
    }
}

// =============================================================================
// SpellMod
// =============================================================================

/// A reversible, tag-matched mutation of spell fields.
pub struct SpellMod {
    kind: SpellModKind,
    class_mask: u64,
    school: SpellSchool,
    proc_mask: ProcMask,
    values: ModValues,
    custom: Option<(SpellModFn, SpellModFn)>,
    active: bool,
    is_static: bool,
    matched: Vec<SpellId>,
    applied: Vec<Applied>,
}

impl SpellMod {
    /// Build an inactive mod with an empty matched set.
    ///
    /// # Errors
    ///
    /// [`SimError::MissingModField`] for a `Custom` mod without both
    /// functions or a `DebuffDurationFlat` mod without a key, and
    /// [`SimError::ZeroModFactor`] for a percentage mod of -100%.
    pub fn build(config: SpellModConfig) -> SimResult<Self> {
        let custom = match (config.kind, config.apply_custom, config.remove_custom) {
            (SpellModKind::Custom, Some(apply), Some(remove)) => Some((apply, remove)),
            (SpellModKind::Custom, _, _) => {
                return Err(SimError::MissingModField {
                    kind: SpellModKind::Custom,
                    field: "apply and remove functions",
                })
            }
            _ => None,
        };
        if config.kind == SpellModKind::DebuffDurationFlat && config.values.key_value.is_none() {
            return Err(SimError::MissingModField {
                kind: config.kind,
                field: "debuff key",
            });
        }
        check_float_value(config.kind, config.values.float_value)?;

        Ok(Self {
            kind: config.kind,
            class_mask: config.class_mask,
            school: config.school,
            proc_mask: config.proc_mask,
            values: config.values,
            custom,
            active: false,
            is_static: false,
            matched: Vec::new(),
            applied: Vec::new(),
        })
    }

    /// Transform kind.
    #[must_use]
    pub fn kind(&self) -> SpellModKind {
        self.kind
    }

    /// True while applied.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// True for mods added with [`Simulation::add_static_mod`]. Other mods
    /// are deactivated at every iteration reset.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Current payload.
    #[must_use]
    pub fn values(&self) -> &ModValues {
        &self.values
    }

    /// Spells matched at their registration.
    #[must_use]
    pub fn matched_spells(&self) -> &[SpellId] {
        &self.matched
    }

    /// Applications of the current activation.
    #[must_use]
    pub fn applied(&self) -> &[Applied] {
        &self.applied
    }

    /// Whether this mod's selectors accept `spell`.
    #[must_use]
    pub fn matches(&self, spell: &Spell) -> bool {
        if spell.flags.contains(SpellFlags::NO_SPELL_MODS) {
            return false;
        }
        if self.class_mask != 0 && !spell.matches_class(self.class_mask) {
            return false;
        }
        if !self.school.is_empty() && !self.school.intersects(spell.school) {
            return false;
        }
        if !self.proc_mask.is_empty() && !self.proc_mask.intersects(spell.proc_mask) {
            return false;
        }
        true
    }

    /// Registration notification. A matching spell joins the matched set
    /// and, if the mod is active, is modified immediately.
    pub fn on_spell_registered(&mut self, spell: &mut Spell) {
        if !self.matches(spell) {
            return;
        }
        self.matched.push(spell.id());
        if self.active {
            let reversal = self.apply_to(spell);
            self.applied.push(Applied {
                spell: spell.id(),
                reversal,
            });
        }
    }

    /// Apply to every matched spell. No-op when already active.
    pub fn activate(&mut self, spells: &mut [Spell]) {
        if self.active {
            return;
        }
        self.applied.clear();
        for i in 0..self.matched.len() {
            let id = self.matched[i];
            if let Some(spell) = spells.get_mut(id.index()) {
                let reversal = self.apply_to(spell);
                self.applied.push(Applied {
                    spell: id,
                    reversal,
                });
            }
        }
        self.active = true;
    }

    /// Undo every recorded application, in order. No-op when inactive.
    pub fn deactivate(&mut self, spells: &mut [Spell]) {
        if !self.active {
            return;
        }
        let applied = std::mem::take(&mut self.applied);
        for entry in &applied {
            if let Some(spell) = spells.get_mut(entry.spell.index()) {
                self.remove_from(spell, &entry.reversal);
            }
        }
        self.active = false;
    }

    /// Replace the integer payload, reapplying if active.
    pub fn update_int_value(&mut self, value: i32, spells: &mut [Spell]) {
        self.update(spells, |values| values.int_value = value);
    }

    /// Replace the float payload, reapplying if active.
    ///
    /// # Errors
    ///
    /// [`SimError::ZeroModFactor`] when a percentage kind would scale by
    /// zero; the mod is left untouched.
    pub fn update_float_value(&mut self, value: f64, spells: &mut [Spell]) -> SimResult<()> {
        check_float_value(self.kind, value)?;
        self.update(spells, |values| values.float_value = value);
        Ok(())
    }

    /// Replace the time payload, reapplying if active.
    pub fn update_time_value(&mut self, value: SimTime, spells: &mut [Spell]) {
        self.update(spells, |values| values.time_value = value);
    }

    fn update(&mut self, spells: &mut [Spell], store: impl FnOnce(&mut ModValues)) {
        if self.active {
            self.deactivate(spells);
            store(&mut self.values);
            self.activate(spells);
        } else {
            store(&mut self.values);
        }
    }

    fn apply_to(&self, spell: &mut Spell) -> Reversal {
        let kind = self.kind;
        let v = &self.values;
        match kind {
            SpellModKind::DamageDonePct | SpellModKind::CooldownMultiPct => {
                let factor = 1.0 + v.float_value;
                match float_field(kind, spell) {
                    Some(field) => {
                        *field *= factor;
                        Reversal::Divide(factor)
                    }
                    None => Reversal::Skipped,
                }
            }
            SpellModKind::PeriodicDamageDoneFlat if !spell.has_dots() => Reversal::Skipped,
            SpellModKind::DamageDoneFlat
            | SpellModKind::BaseDamageDoneFlat
            | SpellModKind::PeriodicDamageDoneFlat
            | SpellModKind::ImpactDamageDoneFlat
            | SpellModKind::CritDamageBonusFlat
            | SpellModKind::CooldownMultiFlat
            | SpellModKind::CastTimePct
            | SpellModKind::BonusCritFlat
            | SpellModKind::BonusHitFlat
            | SpellModKind::BonusCoefficientFlat
            | SpellModKind::BonusDamageFlat => match float_field(kind, spell) {
                Some(field) => {
                    *field += v.float_value;
                    Reversal::SubtractFloat(v.float_value)
                }
                None => Reversal::Skipped,
            },
            SpellModKind::PowerCostPct | SpellModKind::PowerCostFlat => {
                match spell.cost.as_mut() {
                    Some(cost) if kind == SpellModKind::PowerCostPct => {
                        cost.multiplier += v.int_value;
                        Reversal::SubtractInt(v.int_value)
                    }
                    Some(cost) => {
                        cost.flat_modifier += v.int_value;
                        Reversal::SubtractInt(v.int_value)
                    }
                    None => Reversal::Skipped,
                }
            }
            SpellModKind::DotNumberOfTicksFlat => {
                for dot in &mut spell.dots {
                    dot.number_of_ticks += v.int_value;
                }
                Reversal::SubtractInt(v.int_value)
            }
            SpellModKind::DotTickLengthFlat => {
                for dot in &mut spell.dots {
                    dot.tick_length += v.time_value;
                }
                Reversal::SubtractTime(v.time_value)
            }
            SpellModKind::CooldownFlat
            | SpellModKind::CastTimeFlat
            | SpellModKind::GlobalCooldownFlat
            | SpellModKind::BuffDurationFlat => match time_field(kind, spell) {
                Some(field) => {
                    *field += v.time_value;
                    Reversal::SubtractTime(v.time_value)
                }
                None => Reversal::Skipped,
            },
            SpellModKind::DebuffDurationFlat => {
                let Some(key) = v.key_value.as_ref() else {
                    return Reversal::Skipped;
                };
                match spell.debuff_durations.get_mut(key) {
                    Some(duration) => {
                        *duration += v.time_value;
                        Reversal::SubtractDebuff {
                            key: key.clone(),
                            amount: v.time_value,
                        }
                    }
                    None => Reversal::Skipped,
                }
            }
            SpellModKind::Custom => match &self.custom {
                Some((apply, _)) => {
                    apply(v, spell);
                    Reversal::Custom
                }
                None => Reversal::Skipped,
            },
        }
    }

    fn remove_from(&self, spell: &mut Spell, reversal: &Reversal) {
        let kind = self.kind;
        match reversal {
            Reversal::Divide(factor) => {
                if let Some(field) = float_field(kind, spell) {
                    *field /= factor;
                }
            }
            Reversal::SubtractFloat(amount) => {
                if let Some(field) = float_field(kind, spell) {
                    *field -= amount;
                }
            }
            Reversal::SubtractInt(amount) => match kind {
                SpellModKind::DotNumberOfTicksFlat => {
                    for dot in &mut spell.dots {
                        dot.number_of_ticks -= amount;
                    }
                }
                SpellModKind::PowerCostPct => {
                    if let Some(cost) = spell.cost.as_mut() {
                        cost.multiplier -= amount;
                    }
                }
                _ => {
                    if let Some(cost) = spell.cost.as_mut() {
                        cost.flat_modifier -= amount;
                    }
                }
            },
            Reversal::SubtractTime(amount) => {
                if kind == SpellModKind::DotTickLengthFlat {
                    for dot in &mut spell.dots {
                        dot.tick_length -= *amount;
                    }
                } else if let Some(field) = time_field(kind, spell) {
                    *field -= *amount;
                }
            }
            Reversal::SubtractDebuff { key, amount } => {
                if let Some(duration) = spell.debuff_durations.get_mut(key) {
                    *duration -= *amount;
                }
            }
            Reversal::Custom => {
                if let Some((_, remove)) = &self.custom {
                    remove(&self.values, spell);
                }
            }
            Reversal::Skipped => {}
        }
    }
}

impl fmt::Debug for SpellMod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpellMod")
            .field("kind", &self.kind)
            .field("values", &self.values)
            .field("active", &self.active)
            .field("is_static", &self.is_static)
            .field("matched", &self.matched)
            .field("applied", &self.applied.len())
            .finish_non_exhaustive()
    }
}

fn float_field(kind: SpellModKind, spell: &mut Spell) -> Option<&mut f64> {
    match kind {
        SpellModKind::DamageDonePct => Some(&mut spell.damage_multiplier),
        SpellModKind::DamageDoneFlat => Some(&mut spell.damage_multiplier_additive),
        SpellModKind::BaseDamageDoneFlat => Some(&mut spell.base_damage_multiplier_additive),
        SpellModKind::PeriodicDamageDoneFlat => {
            Some(&mut spell.periodic_damage_multiplier_additive)
        }
        SpellModKind::ImpactDamageDoneFlat => Some(&mut spell.impact_damage_multiplier_additive),
        SpellModKind::CritDamageBonusFlat => Some(&mut spell.crit_damage_bonus),
        SpellModKind::CooldownMultiFlat | SpellModKind::CooldownMultiPct => {
            Some(&mut spell.cooldown.multiplier)
        }
        SpellModKind::CastTimePct => Some(&mut spell.cast_time_multiplier),
        SpellModKind::BonusCritFlat => Some(&mut spell.bonus_crit_rating),
        SpellModKind::BonusHitFlat => Some(&mut spell.bonus_hit_rating),
        SpellModKind::BonusCoefficientFlat => Some(&mut spell.bonus_coefficient),
        SpellModKind::BonusDamageFlat => Some(&mut spell.bonus_damage),
        _ => None,
    }
}

fn time_field(kind: SpellModKind, spell: &mut Spell) -> Option<&mut SimTime> {
    match kind {
        SpellModKind::CooldownFlat => Some(&mut spell.cooldown.flat_modifier),
        SpellModKind::CastTimeFlat => Some(&mut spell.default_cast.cast_time),
        SpellModKind::GlobalCooldownFlat => Some(&mut spell.default_cast.gcd),
        SpellModKind::BuffDurationFlat => spell.buff_duration.as_mut(),
        _ => None,
    }
}

// =============================================================================
// Simulation surface
// =============================================================================

impl Simulation {
    /// Build a mod on `unit` and activate it immediately.
    ///
    /// # Errors
    ///
    /// Construction errors, an unknown unit, or
    /// [`SimError::RegistrationClosed`] after finalize.
    pub fn add_static_mod(&mut self, unit: UnitId, config: SpellModConfig) -> SimResult<SpellModRef> {
        let handle = self.add_dynamic_mod(unit, config)?;
        self.with_mod(handle, |m, spells| {
            m.is_static = true;
            m.activate(spells);
            Ok(())
        })?;
        Ok(handle)
    }

    /// Build an inactive mod on `unit`.
    ///
    /// Dynamic mods are deactivated at every iteration reset, so a mod
    /// switched on by a rotation does not leak into the next iteration.
    ///
    /// # Errors
    ///
    /// Construction errors, an unknown unit, or
    /// [`SimError::RegistrationClosed`] after finalize.
    pub fn add_dynamic_mod(&mut self, unit: UnitId, config: SpellModConfig) -> SimResult<SpellModRef> {
        self.ensure_registration_open(unit)?;
        let spell_mod = SpellMod::build(config)?;
        let id = self.unit_mut(unit)?.add_mod(spell_mod);
        Ok(SpellModRef { unit, id })
    }

    /// Look up a mod.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownSpellMod`].
    pub fn spell_mod(&self, handle: SpellModRef) -> SimResult<&SpellMod> {
        self.unit(handle.unit)?
            .spell_mod(handle.id)
            .ok_or(SimError::UnknownSpellMod(handle))
    }

    /// Activate a mod.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownSpellMod`].
    pub fn activate_mod(&mut self, handle: SpellModRef) -> SimResult<()> {
        self.with_mod(handle, |m, spells| {
            m.activate(spells);
            Ok(())
        })
    }

    /// Deactivate a mod.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownSpellMod`].
    pub fn deactivate_mod(&mut self, handle: SpellModRef) -> SimResult<()> {
        self.with_mod(handle, |m, spells| {
            m.deactivate(spells);
            Ok(())
        })
    }

    /// See [`SpellMod::update_int_value`].
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownSpellMod`].
    pub fn update_mod_int_value(&mut self, handle: SpellModRef, value: i32) -> SimResult<()> {
        self.with_mod(handle, |m, spells| {
            m.update_int_value(value, spells);
            Ok(())
        })
    }

    /// See [`SpellMod::update_float_value`].
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownSpellMod`] or [`SimError::ZeroModFactor`].
    pub fn update_mod_float_value(&mut self, handle: SpellModRef, value: f64) -> SimResult<()> {
        self.with_mod(handle, |m, spells| m.update_float_value(value, spells))
    }

    /// See [`SpellMod::update_time_value`].
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownSpellMod`].
    pub fn update_mod_time_value(&mut self, handle: SpellModRef, value: SimTime) -> SimResult<()> {
        self.with_mod(handle, |m, spells| {
            m.update_time_value(value, spells);
            Ok(())
        })
    }

    fn with_mod(
        &mut self,
        handle: SpellModRef,
        op: impl FnOnce(&mut SpellMod, &mut [Spell]) -> SimResult<()>,
    ) -> SimResult<()> {
        let (mods, spells) = self.unit_mut(handle.unit)?.mods_and_spells_mut();
        let spell_mod = mods
            .get_mut(handle.id.index())
            .ok_or(SimError::UnknownSpellMod(handle))?;
        op(spell_mod, spells)
    }
}

/// Percentage kinds divide by `1 + v` on removal, so `v = -1` is fatal.
fn check_float_value(kind: SpellModKind, value: f64) -> SimResult<()> {
    let scales = matches!(
        kind,
        SpellModKind::DamageDonePct | SpellModKind::CooldownMultiPct
    );
    if scales && (1.0 + value).abs() < f64::EPSILON {
        return Err(SimError::ZeroModFactor { kind, value });
    }
    Ok(())
}
