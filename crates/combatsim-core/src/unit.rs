//! Units: the actors of a simulation.
//!
//! A unit owns its resource bar, spell book, spell mods and auras. All of
//! them are registered before [`Simulation::finalize`]; afterwards the unit
//! is sealed and only its per-iteration state changes.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::aura::AuraTable;
use crate::cost::SpellCost;
use crate::error::SimResult;
use crate::resource::ResourceBar;
use crate::simulation::Simulation;
use crate::spell::{Spell, SpellConfig, SpellId};
use crate::spell_mod::{SpellMod, SpellModId};
use crate::time::SimTime;

// =============================================================================
// UnitId
// =============================================================================

/// Index of a unit within its simulation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(u32);

impl UnitId {
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

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

// =============================================================================
// Rotation
// =============================================================================

/// Decision logic of a unit.
///
/// `on_react` runs at iteration start, when the unit's GCD or cast ends,
/// and (unless the run is interactive) shortly after each resource gain.
pub trait Rotation: Send + Sync {
    /// Decide what, if anything, to do now.
    ///
    /// # Errors
    ///
    /// Any fatal error aborts the iteration.
    fn on_react(&self, sim: &mut Simulation, unit: UnitId) -> SimResult<()>;
}

impl<F> Rotation for F
where
    F: Fn(&mut Simulation, UnitId) -> SimResult<()> + Send + Sync,
{
    fn on_react(&self, sim: &mut Simulation, unit: UnitId) -> SimResult<()> {
        self(sim, unit)
    }
}

// =============================================================================
// Unit
// =============================================================================

/// Construction data for a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitConfig {
    /// Display label.
    pub label: String,
    /// Character level.
    pub level: i32,
}

impl UnitConfig {
    /// Unit named `label` at `level`.
    #[must_use]
    pub fn new(label: impl Into<String>, level: i32) -> Self {
        Self {
            label: label.into(),
            level,
        }
    }
}

/// One actor: bar, spells, mods, auras and decision logic.
pub struct Unit {
    id: UnitId,
    label: String,
    level: i32,
    bar: Option<ResourceBar>,
    spells: Vec<Spell>,
    mods: Vec<SpellMod>,
    auras: AuraTable,
    rotation: Option<Arc<dyn Rotation>>,
    busy_until: SimTime,
    damage_done: f64,
    dps: tally::ScalarStats,
    sealed: bool,
}

impl Unit {
    pub(crate) fn new(id: UnitId, config: UnitConfig) -> Self {
        Self {
            id,
            label: config.label,
            level: config.level,
            bar: None,
            spells: Vec::new(),
            mods: Vec::new(),
            auras: AuraTable::new(),
            rotation: None,
            busy_until: SimTime::ZERO,
            damage_done: 0.0,
            dps: tally::ScalarStats::empty(),
            sealed: false,
        }
    }

    /// Id.
    #[must_use]
    pub fn id(&self) -> UnitId {
        self.id
    }

    /// Display label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Character level.
    #[must_use]
    pub fn level(&self) -> i32 {
        self.level
    }

    /// Resource bar, if one was enabled.
    #[must_use]
    pub fn resource_bar(&self) -> Option<&ResourceBar> {
        self.bar.as_ref()
    }

    pub(crate) fn resource_bar_mut(&mut self) -> Option<&mut ResourceBar> {
        self.bar.as_mut()
    }

    pub(crate) fn set_resource_bar(&mut self, bar: ResourceBar) {
        self.bar = Some(bar);
    }

    /// Spell book in registration order.
    #[must_use]
    pub fn spells(&self) -> &[Spell] {
        &self.spells
    }

    /// Spell by id.
    #[must_use]
    pub fn spell(&self, id: SpellId) -> Option<&Spell> {
        self.spells.get(id.index())
    }

    pub(crate) fn spell_mut(&mut self, id: SpellId) -> Option<&mut Spell> {
        self.spells.get_mut(id.index())
    }

    /// Spell mods in registration order.
    #[must_use]
    pub fn spell_mods(&self) -> &[SpellMod] {
        &self.mods
    }

    /// Spell mod by id.
    #[must_use]
    pub fn spell_mod(&self, id: SpellModId) -> Option<&SpellMod> {
        self.mods.get(id.index())
    }

    /// Auras in registration order.
    #[must_use]
    pub fn auras(&self) -> &AuraTable {
        &self.auras
    }

    pub(crate) fn auras_mut(&mut self) -> &mut AuraTable {
        &mut self.auras
    }

    /// Time until which the unit is on GCD or casting.
    #[must_use]
    pub fn busy_until(&self) -> SimTime {
        self.busy_until
    }

    pub(crate) fn set_busy_until(&mut self, time: SimTime) {
        self.busy_until = time;
    }

    /// Damage dealt so far this iteration.
    #[must_use]
    pub fn damage_done(&self) -> f64 {
        self.damage_done
    }

    pub(crate) fn add_damage_done(&mut self, damage: f64) {
        self.damage_done += damage;
    }

    /// Damage per second over committed iterations.
    #[must_use]
    pub fn dps(&self) -> &tally::ScalarStats {
        &self.dps
    }

    pub(crate) fn rotation(&self) -> Option<Arc<dyn Rotation>> {
        self.rotation.clone()
    }

    pub(crate) fn set_rotation(&mut self, rotation: Arc<dyn Rotation>) {
        self.rotation = Some(rotation);
    }

    /// Whether registration is closed.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub(crate) fn seal(&mut self) {
        self.sealed = true;
    }

    /// Add a spell, letting every existing mod match it first.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn register_spell(&mut self, config: SpellConfig, cost: Option<SpellCost>) -> SpellId {
        let id = SpellId::new(self.spells.len() as u32);
        let mut spell = Spell::from_config(self.id, id, config, cost);
        for spell_mod in &mut self.mods {
            spell_mod.on_spell_registered(&mut spell);
        }
        self.spells.push(spell);
        id
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn add_mod(&mut self, spell_mod: SpellMod) -> SpellModId {
        let id = SpellModId::new(self.mods.len() as u32);
        self.mods.push(spell_mod);
        id
    }

    pub(crate) fn mods_and_spells_mut(&mut self) -> (&mut [SpellMod], &mut [Spell]) {
        (&mut self.mods, &mut self.spells)
    }

    pub(crate) fn reset_iteration(&mut self) {
        if let Some(bar) = self.bar.as_mut() {
            bar.reset();
        }
        for spell_mod in self.mods.iter_mut().filter(|m| !m.is_static()) {
            spell_mod.deactivate(&mut self.spells);
        }
        for spell in &mut self.spells {
            spell.reset_iteration();
        }
        for aura in self.auras.iter_mut() {
            aura.reset_iteration();
        }
        self.busy_until = SimTime::ZERO;
        self.damage_done = 0.0;
    }

    pub(crate) fn done_iteration(&mut self, duration: SimTime) {
        for spell in &mut self.spells {
            spell.metrics.done_iteration();
        }
        for aura in self.auras.iter_mut() {
            aura.done_iteration();
        }
        let secs = duration.as_secs_f64();
        if secs > 0.0 {
            self.dps.push(self.damage_done / secs);
        }
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("level", &self.level)
            .field("bar", &self.bar)
            .field("spells", &self.spells.len())
            .field("mods", &self.mods.len())
            .field("auras", &self.auras.len())
            .field("has_rotation", &self.rotation.is_some())
            .field("sealed", &self.sealed)
            .finish_non_exhaustive()
    }
}
