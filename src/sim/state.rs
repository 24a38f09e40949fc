//! Running accumulators and the serializable system snapshot.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::environment::{EnvironmentSample, PriceSignal};
use crate::error::Result;

use super::types::SimPhase;

/// Episode accumulators.
///
/// Energy totals (kWh, litres) never decrease within an episode;
/// `total_cost` may go down when export revenue exceeds spend. Ratios are
/// derived from the totals on every read.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub steps: usize,
    pub total_cost: f64,
    pub total_renewable_energy: f64,
    /// Served load energy.
    pub total_energy_consumed: f64,
    /// Requested load energy, served or not.
    pub total_demand_energy: f64,
    pub total_import_energy: f64,
    pub total_export_energy: f64,
    pub total_fuel_l: f64,
    pub total_unmet_energy: f64,
    pub total_curtailed_energy: f64,
}

/// Per-step increments applied to [`Statistics`].
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StepTotals {
    pub cost: f64,
    pub renewable_kwh: f64,
    pub consumed_kwh: f64,
    pub demand_kwh: f64,
    pub import_kwh: f64,
    pub export_kwh: f64,
    pub fuel_l: f64,
    pub unmet_kwh: f64,
    pub curtailed_kwh: f64,
}

impl Statistics {
    pub(crate) fn record(&mut self, t: &StepTotals) {
        self.steps += 1;
        self.total_cost += t.cost;
        self.total_renewable_energy += t.renewable_kwh.max(0.0);
        self.total_energy_consumed += t.consumed_kwh.max(0.0);
        self.total_demand_energy += t.demand_kwh.max(0.0);
        self.total_import_energy += t.import_kwh.max(0.0);
        self.total_export_energy += t.export_kwh.max(0.0);
        self.total_fuel_l += t.fuel_l.max(0.0);
        self.total_unmet_energy += t.unmet_kwh.max(0.0);
        self.total_curtailed_energy += t.curtailed_kwh.max(0.0);
    }

    /// Share of served load covered by renewables, capped at 1.
    pub fn renewable_ratio(&self) -> f64 {
        ratio(self.total_renewable_energy, self.total_energy_consumed).min(1.0)
    }

    /// Share of served load covered by grid imports.
    pub fn grid_dependency(&self) -> f64 {
        ratio(self.total_import_energy, self.total_energy_consumed)
    }

    /// Share of requested load actually served; 1 when nothing was requested.
    pub fn supply_reliability(&self) -> f64 {
        if self.total_demand_energy > 0.0 {
            1.0 - self.total_unmet_energy / self.total_demand_energy
        } else {
            1.0
        }
    }

    /// Serializable view with the derived ratios filled in.
    pub fn report(&self) -> StatisticsReport {
        StatisticsReport {
            totals: self.clone(),
            renewable_ratio: self.renewable_ratio(),
            grid_dependency: self.grid_dependency(),
            supply_reliability: self.supply_reliability(),
        }
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 { num / den } else { 0.0 }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsReport {
    #[serde(flatten)]
    pub totals: Statistics,
    pub renewable_ratio: f64,
    pub grid_dependency: f64,
    pub supply_reliability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceState {
    pub output_kw: f64,
    pub capacity_kw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatteryState {
    pub soc: f64,
    pub stored_kwh: f64,
    pub capacity_kwh: f64,
    pub soc_min: f64,
    pub soc_max: f64,
    pub max_charge_kw: f64,
    pub max_discharge_kw: f64,
    pub cycle_count: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DieselState {
    pub enabled: bool,
    pub running: bool,
    pub capacity_kw: f64,
    pub run_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridState {
    pub connected: bool,
    pub max_import_kw: f64,
    pub max_export_kw: f64,
    /// Exchange during the last completed step, positive = import.
    pub last_exchange_kw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentState {
    pub solar: SourceState,
    pub wind: SourceState,
    pub battery: BatteryState,
    pub diesel: DieselState,
    pub grid: GridState,
    pub load_kw: f64,
}

/// Everything a front-end needs to render the current moment.
///
/// Built by [`MicrogridCore::get_state`](crate::sim::engine::MicrogridCore::get_state).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemState {
    pub timestamp: NaiveDateTime,
    pub step: usize,
    pub horizon: usize,
    pub phase: SimPhase,
    pub weather: EnvironmentSample,
    pub price: PriceSignal,
    pub components: ComponentState,
    pub statistics: StatisticsReport,
}

impl SystemState {
    /// Pretty-printed JSON rendering.
    ///
    /// # Errors
    ///
    /// Returns `MicrogridError::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
