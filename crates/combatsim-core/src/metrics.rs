//! Metrics sink.
//!
//! Every resource mutation is attributed to exactly one [`ResourceMetrics`]
//! record. Records are owned by the simulation-wide [`MetricsRegistry`];
//! spells, cost policies and bars hold [`ResourceMetricsId`] handles.
//!
//! Per-iteration totals live in [`IterationTally`] counters and are
//! committed into cross-iteration statistics when the iteration ends.

use std::fmt;

use serde::{Deserialize, Serialize};
use tally::{IterationTally, ScalarStats};

use crate::error::{SimError, SimResult};
use crate::resource::PowerType;
use crate::unit::UnitId;

// =============================================================================
// ActionId
// =============================================================================

/// Pseudo-actions that are not spells but still move resources.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OtherAction {
    /// Plain melee swing.
    Attack,
    /// Resource generated from being hit.
    DamageTaken,
    /// Cost refunds.
    Refund,
}

impl fmt::Display for OtherAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Attack => "attack",
            Self::DamageTaken => "damage taken",
            Self::Refund => "refund",
        };
        write!(f, "{name}")
    }
}

/// What an action is: a spell or a pseudo-action.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionSource {
    /// A spell, by its numeric id.
    Spell(u32),
    /// A pseudo-action.
    Other(OtherAction),
}

/// Identity of a resource-affecting cause.
///
/// The tag distinguishes variants of the same action (for example an
/// off-hand swing of the same attack).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActionId {
    /// The underlying action.
    pub source: ActionSource,
    /// Variant tag; zero by default.
    pub tag: i32,
}

impl ActionId {
    /// Action id of a spell.
    #[must_use]
    pub const fn spell(id: u32) -> Self {
        Self {
            source: ActionSource::Spell(id),
            tag: 0,
        }
    }

    /// Action id of a pseudo-action.
    #[must_use]
    pub const fn other(action: OtherAction) -> Self {
        Self {
            source: ActionSource::Other(action),
            tag: 0,
        }
    }

    /// Same action with a different tag.
    #[must_use]
    pub const fn with_tag(self, tag: i32) -> Self {
        Self {
            source: self.source,
            tag,
        }
    }

    /// True if both ids refer to the same action, whatever their tags.
    #[must_use]
    pub fn same_action_ignore_tag(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source {
            ActionSource::Spell(id) => write!(f, "{{SpellID: {id}")?,
            ActionSource::Other(other) => write!(f, "{{OtherID: {other}")?,
        }
        if self.tag != 0 {
            write!(f, ", Tag: {}", self.tag)?;
        }
        write!(f, "}}")
    }
}

// =============================================================================
// ResourceMetrics
// =============================================================================

/// Handle to a [`ResourceMetrics`] record in the [`MetricsRegistry`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceMetricsId(u32);

impl ResourceMetricsId {
    /// Creates a handle from a raw index.
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

impl fmt::Display for ResourceMetricsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceMetrics({})", self.0)
    }
}

/// Resource flow attributed to one cause on one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceMetrics {
    action: ActionId,
    power: PowerType,
    unit: UnitId,
    requested: f64,
    last_requested: f64,
    last_gain: f64,
    gain: IterationTally,
    requested_stats: ScalarStats,
}

impl ResourceMetrics {
    /// Empty record for `action` moving `power` on `unit`.
    #[must_use]
    pub fn new(unit: UnitId, action: ActionId, power: PowerType) -> Self {
        Self {
            action,
            power,
            unit,
            requested: 0.0,
            last_requested: 0.0,
            last_gain: 0.0,
            gain: IterationTally::new(),
            requested_stats: ScalarStats::empty(),
        }
    }

    /// Record one event. `requested` is the amount asked for, `actual` the
    /// net change after clamping.
    pub fn add_event(&mut self, requested: f64, actual: f64) {
        self.requested += requested;
        self.last_requested = requested;
        self.last_gain = actual;
        self.gain.record(actual);
    }

    /// The cause.
    #[must_use]
    pub fn action(&self) -> ActionId {
        self.action
    }

    /// Power type moved.
    #[must_use]
    pub fn power(&self) -> PowerType {
        self.power
    }

    /// Owning unit.
    #[must_use]
    pub fn unit(&self) -> UnitId {
        self.unit
    }

    /// Net change of the most recent event.
    #[must_use]
    pub fn last_gain(&self) -> f64 {
        self.last_gain
    }

    /// Requested amount of the most recent event.
    #[must_use]
    pub fn last_requested(&self) -> f64 {
        self.last_requested
    }

    /// Events recorded in the current iteration.
    #[must_use]
    pub fn events_for_current_iteration(&self) -> u64 {
        self.gain.current_events()
    }

    /// Net change recorded in the current iteration.
    #[must_use]
    pub fn actual_gain_for_current_iteration(&self) -> f64 {
        self.gain.current_value()
    }

    /// Requested total of the current iteration.
    #[must_use]
    pub fn requested_for_current_iteration(&self) -> f64 {
        self.requested
    }

    /// Committed per-iteration net gain and event statistics.
    #[must_use]
    pub fn gain(&self) -> &IterationTally {
        &self.gain
    }

    /// Committed per-iteration requested totals.
    #[must_use]
    pub fn requested_stats(&self) -> &ScalarStats {
        &self.requested_stats
    }

    fn reset_iteration(&mut self) {
        self.requested = 0.0;
        self.last_requested = 0.0;
        self.last_gain = 0.0;
        self.gain.reset_iteration();
    }

    fn done_iteration(&mut self) {
        self.requested_stats.push(self.requested);
        self.gain.done_iteration();
        self.reset_iteration();
    }
}

// =============================================================================
// MetricsRegistry
// =============================================================================

/// Owner of every [`ResourceMetrics`] record of a simulation.
#[derive(Debug, Clone, Default)]
pub struct MetricsRegistry {
    resources: Vec<ResourceMetrics>,
}

impl MetricsRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh record and return its handle.
    #[allow(clippy::cast_possible_truncation)]
    pub fn new_resource_metrics(
        &mut self,
        unit: UnitId,
        action: ActionId,
        power: PowerType,
    ) -> ResourceMetricsId {
        let id = ResourceMetricsId::new(self.resources.len() as u32);
        self.resources
            .push(ResourceMetrics::new(unit, action, power));
        id
    }

    /// Look up a record.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnknownMetrics`] for a stale handle.
    pub fn resource(&self, id: ResourceMetricsId) -> SimResult<&ResourceMetrics> {
        self.resources
            .get(id.index())
            .ok_or(SimError::UnknownMetrics(id))
    }

    /// Look up a record mutably.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnknownMetrics`] for a stale handle.
    pub fn resource_mut(&mut self, id: ResourceMetricsId) -> SimResult<&mut ResourceMetrics> {
        self.resources
            .get_mut(id.index())
            .ok_or(SimError::UnknownMetrics(id))
    }

    /// All records in creation order.
    #[allow(clippy::cast_possible_truncation)]
    pub fn resources(&self) -> impl Iterator<Item = (ResourceMetricsId, &ResourceMetrics)> {
        self.resources
            .iter()
            .enumerate()
            .map(|(i, m)| (ResourceMetricsId::new(i as u32), m))
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// True if no records exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Discard the running totals of every record.
    pub fn reset_iteration(&mut self) {
        for m in &mut self.resources {
            m.reset_iteration();
        }
    }

    /// Commit every record's running totals as one sample.
    pub fn done_iteration(&mut self) {
        for m in &mut self.resources {
            m.done_iteration();
        }
    }
}

// =============================================================================
// SpellMetrics
// =============================================================================

/// Per-spell casts, hits and damage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpellMetrics {
    /// Casts per iteration (events only).
    pub casts: IterationTally,
    /// Damage per iteration; events are hits.
    pub damage: IterationTally,
}

impl SpellMetrics {
    /// Discard running totals.
    pub fn reset_iteration(&mut self) {
        self.casts.reset_iteration();
        self.damage.reset_iteration();
    }

    /// Commit running totals.
    pub fn done_iteration(&mut self) {
        self.casts.done_iteration();
        self.damage.done_iteration();
    }
}
