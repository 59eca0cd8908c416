//! Mana: a pool that starts full and is spent by spells.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cost::{require_power, CostPolicy, SpellCost};
use crate::error::SimResult;
use crate::metrics::{ActionId, OtherAction, ResourceMetricsId};
use crate::resource::{PowerType, ResourceBar};
use crate::simulation::Simulation;
use crate::spell::SpellRef;
use crate::unit::UnitId;

/// Options for [`Simulation::enable_mana_bar`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManaBarOptions {
    /// Bar capacity.
    pub max_mana: f64,
    /// Mana at every iteration start; defaults to full.
    pub starting_mana: Option<f64>,
    /// Reference for percentage costs; defaults to `max_mana`.
    pub base_mana: Option<f64>,
}

impl ManaBarOptions {
    /// Full bar of `max_mana`.
    #[must_use]
    pub fn new(max_mana: f64) -> Self {
        Self {
            max_mana,
            ..Self::default()
        }
    }
}

impl Simulation {
    /// Give `unit` a mana bar.
    ///
    /// # Errors
    ///
    /// Unknown unit, or [`SimError::RegistrationClosed`](crate::error::SimError::RegistrationClosed)
    /// after finalize.
    pub fn enable_mana_bar(&mut self, unit: UnitId, options: &ManaBarOptions) -> SimResult<()> {
        self.ensure_registration_open(unit)?;

        let refund = self.metrics_mut().new_resource_metrics(
            unit,
            ActionId::other(OtherAction::Refund),
            PowerType::Mana,
        );
        let starting = options.starting_mana.unwrap_or(options.max_mana);
        let mut bar = ResourceBar::new(PowerType::Mana, options.max_mana, starting);
        bar.set_base_value(options.base_mana.unwrap_or(options.max_mana));
        bar.set_refund_metrics(refund);
        self.unit_mut(unit)?.set_resource_bar(bar);
        Ok(())
    }
}

/// Options for a mana-costing spell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManaCostOptions {
    /// Cost as a fraction of the caster's base mana.
    pub base_cost: f64,
    /// Flat cost added to the fractional part.
    pub flat_cost: f64,
}

/// [`CostPolicy`] spending mana. Mana costs are never refunded.
#[derive(Debug, Clone)]
pub struct ManaCost {
    resource_metrics: ResourceMetricsId,
}

impl ManaCost {
    pub(crate) fn build(
        sim: &mut Simulation,
        unit: UnitId,
        action: ActionId,
        options: &ManaCostOptions,
    ) -> SimResult<SpellCost> {
        require_power(sim, unit, PowerType::Mana)?;

        let base_mana = sim.resource_bar(unit)?.base_value();
        let resource_metrics = sim
            .metrics_mut()
            .new_resource_metrics(unit, action, PowerType::Mana);
        let cost = options.base_cost * base_mana + options.flat_cost;
        Ok(SpellCost::new(cost, Arc::new(Self { resource_metrics })))
    }
}

impl CostPolicy for ManaCost {
    fn power_type(&self) -> PowerType {
        PowerType::Mana
    }

    fn resource_metrics(&self) -> ResourceMetricsId {
        self.resource_metrics
    }

    fn meets_requirement(&self, sim: &mut Simulation, spell: SpellRef) -> SimResult<bool> {
        let cost = sim.refresh_current_cost(spell)?;
        Ok(sim.current_resource(spell.unit)? >= cost)
    }

    fn cost_failure_reason(&self, sim: &Simulation, spell: SpellRef) -> SimResult<String> {
        Ok(format!(
            "not enough mana (Current Mana = {:.3}, Mana Cost = {:.3})",
            sim.current_resource(spell.unit)?,
            sim.spell(spell)?.current_cast.cost
        ))
    }

    fn spend_cost(&self, sim: &mut Simulation, spell: SpellRef) -> SimResult<()> {
        let cost = sim.spell(spell)?.current_cast.cost;
        if cost > 0.0 {
            sim.spend_resource(spell.unit, cost, self.resource_metrics)?;
        }
        Ok(())
    }

    fn issue_refund(&self, _sim: &mut Simulation, _spell: SpellRef) -> SimResult<()> {
        Ok(())
    }
}
