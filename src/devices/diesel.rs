use serde::Serialize;

use crate::config::DieselSpec;

/// A dispatchable diesel generator with a minimum stable load.
///
/// When running, output follows the requested power but never drops below
/// `capacity · min_load_ratio` or exceeds `capacity`.
#[derive(Debug, Clone, Serialize)]
pub struct DieselGenerator {
    pub enabled: bool,
    pub capacity_kw: f64,
    pub min_load_ratio: f64,
    /// Litres of fuel per kWh produced.
    pub fuel_l_per_kwh: f64,
    pub fuel_price: f64,
    running: bool,
    run_hours: f64,
}

impl DieselGenerator {
    pub fn new(spec: &DieselSpec) -> Self {
        Self {
            enabled: spec.enabled,
            capacity_kw: spec.capacity_kw.max(0.0),
            min_load_ratio: spec.min_load_ratio.clamp(0.0, 1.0),
            fuel_l_per_kwh: spec.fuel_l_per_kwh.max(0.0),
            fuel_price: spec.fuel_price.max(0.0),
            running: false,
            run_hours: 0.0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Cumulative running time in hours.
    pub fn run_hours(&self) -> f64 {
        self.run_hours
    }

    /// Minimum output while running (kW).
    pub fn min_output_kw(&self) -> f64 {
        self.capacity_kw * self.min_load_ratio
    }

    /// Starts or stops the unit. A disabled or zero-capacity unit never starts.
    pub fn set_running(&mut self, on: bool) {
        self.running = on && self.enabled && self.capacity_kw > 0.0;
    }

    /// Stops the unit and clears its runtime counter.
    pub fn reset(&mut self) {
        self.running = false;
        self.run_hours = 0.0;
    }

    /// Produces power for one step of `dt_hours`.
    ///
    /// # Returns
    ///
    /// `(actual_kw, fuel_l)`; both zero when the unit is stopped.
    pub fn output(&mut self, required_kw: f64, dt_hours: f64) -> (f64, f64) {
        if !self.running {
            return (0.0, 0.0);
        }
        let required = if required_kw.is_finite() { required_kw } else { 0.0 };
        let actual_kw = required.clamp(self.min_output_kw(), self.capacity_kw);
        let fuel_l = actual_kw * self.fuel_l_per_kwh * dt_hours;
        self.run_hours += dt_hours;
        (actual_kw, fuel_l)
    }

    /// Fuel cost for `fuel_l` litres.
    pub fn fuel_cost(&self, fuel_l: f64) -> f64 {
        fuel_l * self.fuel_price
    }
}
