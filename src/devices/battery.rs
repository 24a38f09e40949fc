use serde::Serialize;

use crate::config::BatterySpec;

/// A battery energy storage system that can charge and discharge electricity.
///
/// `BatteryStorage` models a battery with configurable capacity, charge/discharge
/// rates, efficiencies and a usable SOC window. [`charge`](Self::charge) and
/// [`discharge`](Self::discharge) are the only operations that move the state of
/// charge during an episode; requests beyond a rate cap or the SOC window are
/// silently attenuated.
///
/// # Power Flow Convention
/// - Positive power: Charging (consuming power from the bus)
/// - Negative power: Discharging (supplying power to the bus)
#[derive(Debug, Clone, Serialize)]
pub struct BatteryStorage {
    /// Battery capacity in kilowatt-hours.
    pub capacity_kwh: f64,

    /// Maximum charge power in kilowatts (positive value).
    pub max_charge_kw: f64,

    /// Maximum discharge power in kilowatts (positive value).
    pub max_discharge_kw: f64,

    /// Charging efficiency (0..1.0).
    pub eta_c: f64,

    /// Discharging efficiency (0..1.0).
    pub eta_d: f64,

    /// Lower SOC bound.
    pub soc_min: f64,

    /// Upper SOC bound.
    pub soc_max: f64,

    /// State of charge as a fraction of capacity.
    soc: f64,

    /// Equivalent full cycles, accumulated as `Σ|ΔSOC| / 2`.
    cycle_count: f64,
}

impl BatteryStorage {
    /// Creates a new battery from its static spec, starting at `spec.initial_soc`.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero/negative, the SOC window is empty, the initial
    /// SOC lies outside it, or efficiencies are outside `(0, 1]`.
    pub fn new(spec: &BatterySpec) -> Self {
        assert!(spec.capacity_kwh > 0.0);
        assert!(spec.soc_min < spec.soc_max);
        assert!((spec.soc_min..=spec.soc_max).contains(&spec.initial_soc));
        assert!(spec.max_charge_kw >= 0.0 && spec.max_discharge_kw >= 0.0);
        assert!(spec.charge_efficiency > 0.0 && spec.charge_efficiency <= 1.0);
        assert!(spec.discharge_efficiency > 0.0 && spec.discharge_efficiency <= 1.0);

        Self {
            capacity_kwh: spec.capacity_kwh,
            max_charge_kw: spec.max_charge_kw,
            max_discharge_kw: spec.max_discharge_kw,
            eta_c: spec.charge_efficiency,
            eta_d: spec.discharge_efficiency,
            soc_min: spec.soc_min,
            soc_max: spec.soc_max,
            soc: spec.initial_soc,
            cycle_count: 0.0,
        }
    }

    /// Current state of charge.
    pub fn soc(&self) -> f64 {
        self.soc
    }

    /// Equivalent full cycles since construction or the last reset.
    pub fn cycle_count(&self) -> f64 {
        self.cycle_count
    }

    /// Energy currently stored in kWh.
    pub fn stored_kwh(&self) -> f64 {
        self.soc * self.capacity_kwh
    }

    /// Restores the SOC for a new episode and clears the cycle counter.
    ///
    /// The value is clipped into the SOC window.
    pub fn reset(&mut self, soc: f64) {
        self.soc = soc.clamp(self.soc_min, self.soc_max);
        self.cycle_count = 0.0;
    }

    /// Largest charge power (kW) that fits under `soc_max` in one step.
    pub fn charge_headroom_kw(&self, dt_hours: f64) -> f64 {
        let max_kwh_this_step = (self.soc_max - self.soc) * self.capacity_kwh / self.eta_c;
        (max_kwh_this_step / dt_hours).max(0.0)
    }

    /// Largest discharge power (kW) that keeps SOC above `soc_min` in one step.
    pub fn discharge_headroom_kw(&self, dt_hours: f64) -> f64 {
        let max_kwh_this_step = (self.soc - self.soc_min) * self.capacity_kwh * self.eta_d;
        (max_kwh_this_step / dt_hours).max(0.0)
    }

    /// Charges at up to `power_kw` for `dt_hours`.
    ///
    /// Actual power is `min(requested, max_charge_kw, headroom)`. Non-finite or
    /// negative requests are treated as zero.
    ///
    /// # Returns
    ///
    /// `(actual_kw, energy_stored_kwh)` where the stored energy is the bus-side
    /// energy times the charge efficiency.
    pub fn charge(&mut self, power_kw: f64, dt_hours: f64) -> (f64, f64) {
        let requested = if power_kw.is_finite() { power_kw.max(0.0) } else { 0.0 };
        let headroom_kw = self.charge_headroom_kw(dt_hours);
        let actual_kw = requested.min(self.max_charge_kw).min(headroom_kw);
        if actual_kw <= 0.0 {
            return (0.0, 0.0);
        }

        let stored_kwh = actual_kw * dt_hours * self.eta_c;
        let target = if actual_kw >= headroom_kw {
            self.soc_max
        } else {
            self.soc + stored_kwh / self.capacity_kwh
        };
        self.set_soc(target);
        (actual_kw, stored_kwh)
    }

    /// Discharges at up to `power_kw` for `dt_hours`.
    ///
    /// Mirror of [`charge`](Self::charge) with efficiency on the output side:
    /// the battery gives up `actual_kw · dt / eta_d` kWh to deliver
    /// `actual_kw · dt` to the bus.
    ///
    /// # Returns
    ///
    /// `(actual_kw, energy_delivered_kwh)`.
    pub fn discharge(&mut self, power_kw: f64, dt_hours: f64) -> (f64, f64) {
        let requested = if power_kw.is_finite() { power_kw.max(0.0) } else { 0.0 };
        let headroom_kw = self.discharge_headroom_kw(dt_hours);
        let actual_kw = requested.min(self.max_discharge_kw).min(headroom_kw);
        if actual_kw <= 0.0 {
            return (0.0, 0.0);
        }

        let delivered_kwh = actual_kw * dt_hours;
        let target = if actual_kw >= headroom_kw {
            self.soc_min
        } else {
            self.soc - delivered_kwh / (self.eta_d * self.capacity_kwh)
        };
        self.set_soc(target);
        (actual_kw, delivered_kwh)
    }

    /// Applies a signed setpoint (positive = charge) and returns the signed actual power.
    pub fn dispatch(&mut self, setpoint_kw: f64, dt_hours: f64) -> f64 {
        if setpoint_kw > 0.0 {
            self.charge(setpoint_kw, dt_hours).0
        } else if setpoint_kw < 0.0 {
            -self.discharge(-setpoint_kw, dt_hours).0
        } else {
            0.0
        }
    }

    // Headroom-limited moves land exactly on the bound.
    fn set_soc(&mut self, target: f64) {
        let before = self.soc;
        self.soc = target.clamp(self.soc_min, self.soc_max);
        self.cycle_count += (self.soc - before).abs() / 2.0;
    }
}
