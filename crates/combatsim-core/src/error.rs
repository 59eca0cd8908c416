//! Error types for the simulation core.
//!
//! Every [`SimError`] is a programming-invariant violation: it means the
//! content wired into the simulation is wrong, so the iteration and the whole
//! run abort. Conditions a rotation is expected to handle (not enough
//! resource, spell on cooldown) are reported as `bool` instead.

use crate::aura::AuraRef;
use crate::metrics::{ActionId, ResourceMetricsId};
use crate::resource::PowerType;
use crate::spell::SpellRef;
use crate::spell_mod::{SpellModKind, SpellModRef};
use crate::time::SimTime;
use crate::unit::UnitId;

/// Fatal simulation error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    /// A negative amount was passed to a resource gain.
    #[error("trying to add negative {power}: {amount}")]
    NegativeGain {
        /// Power type of the bar.
        power: PowerType,
        /// The offending amount.
        amount: f64,
    },

    /// A negative amount was passed to a resource spend.
    #[error("trying to spend negative {power}: {amount}")]
    NegativeSpend {
        /// Power type of the bar.
        power: PowerType,
        /// The offending amount.
        amount: f64,
    },

    /// An action was scheduled before the current simulation time.
    #[error("action scheduled at {due_at} but the clock is already at {now}")]
    ScheduleInPast {
        /// Requested due time.
        due_at: SimTime,
        /// Clock time at the moment of scheduling.
        now: SimTime,
    },

    /// A spell mod kind was built without a field it requires.
    #[error("spell mod {kind:?} requires {field}")]
    MissingModField {
        /// Kind of the mod being built.
        kind: SpellModKind,
        /// Name of the missing field.
        field: &'static str,
    },

    /// A percentage spell mod was given a value that scales by zero, which
    /// cannot be reversed.
    #[error("spell mod {kind:?} cannot scale by 1 + {value}")]
    ZeroModFactor {
        /// Kind of the mod.
        kind: SpellModKind,
        /// The offending float value.
        value: f64,
    },

    /// A spell generated resource but has no metrics to attribute it to.
    #[error("spell {action} generated resource but has no resource metrics")]
    MissingResourceMetrics {
        /// Action identity of the spell.
        action: ActionId,
    },

    /// The unit has no resource bar.
    #[error("unit {unit} has no resource bar")]
    NoResourceBar {
        /// The unit.
        unit: UnitId,
    },

    /// The unit's resource bar is not of the required power type.
    #[error("unit {unit} has a {actual} bar, {expected} required")]
    PowerTypeMismatch {
        /// The unit.
        unit: UnitId,
        /// Power type the caller needs.
        expected: PowerType,
        /// Power type the unit actually has.
        actual: PowerType,
    },

    /// A unit handle does not exist.
    #[error("unknown unit {0}")]
    UnknownUnit(UnitId),

    /// A spell handle does not exist.
    #[error("unknown spell {0}")]
    UnknownSpell(SpellRef),

    /// An aura handle does not exist.
    #[error("unknown aura {0}")]
    UnknownAura(AuraRef),

    /// A spell mod handle does not exist.
    #[error("unknown spell mod {0}")]
    UnknownSpellMod(SpellModRef),

    /// A resource metrics handle does not exist.
    #[error("unknown resource metrics {0}")]
    UnknownMetrics(ResourceMetricsId),

    /// Units, spells, mods and auras can only be registered before
    /// [`Simulation::finalize`](crate::simulation::Simulation::finalize).
    #[error("registration on unit {unit} after the simulation was finalized")]
    RegistrationClosed {
        /// The unit being registered on (or the next free id for new units).
        unit: UnitId,
    },

    /// The simulation configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Per-batch reports could not be merged.
    #[error("report mismatch: {0}")]
    ReportMismatch(String),
}

/// Result type used throughout the simulation core.
pub type SimResult<T> = Result<T, SimError>;
