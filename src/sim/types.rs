//! Core simulation types: actions, observations and per-step records.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::environment::{EnvironmentSample, PricePeriod, PriceSignal};
use crate::error::{MicrogridError, Result};

/// Control decision for one step.
///
/// `battery` is a normalized command in `[-1, 1]`: positive charges at that
/// fraction of the maximum charge rate, negative discharges at that fraction of
/// the maximum discharge rate. Finite values outside the range are clamped;
/// non-finite values are rejected by [`Action::validate`].
///
/// # Examples
///
/// ```
/// use microgrid_twin::sim::types::Action;
///
/// let a = Action::from_slice(&[-0.5, 1.0]).unwrap();
/// assert_eq!(a, Action::new(-0.5, true));
/// assert!(Action::from_slice(&[f64::NAN]).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Action {
    /// Normalized battery command, positive = charge.
    pub battery: f64,
    /// Request the diesel generator to run this step.
    pub diesel_on: bool,
}

impl Action {
    /// Do nothing: battery idle, diesel off.
    pub const IDLE: Self = Self {
        battery: 0.0,
        diesel_on: false,
    };

    pub const fn new(battery: f64, diesel_on: bool) -> Self {
        Self { battery, diesel_on }
    }

    /// Charge at `fraction` of the maximum charge rate.
    pub const fn charge(fraction: f64) -> Self {
        Self::new(fraction, false)
    }

    /// Discharge at `fraction` of the maximum discharge rate.
    pub const fn discharge(fraction: f64) -> Self {
        Self::new(-fraction, false)
    }

    /// Builds an action from a raw vector: `[battery]` or `[battery, diesel]`,
    /// where `diesel > 0.5` means on.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAction` on a wrong length or a non-finite entry.
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        let action = match values {
            [battery] => Self::new(*battery, false),
            [battery, diesel] => {
                if !diesel.is_finite() {
                    return Err(MicrogridError::InvalidAction(format!(
                        "diesel flag must be finite, got {diesel}"
                    )));
                }
                Self::new(*battery, *diesel > 0.5)
            }
            _ => {
                return Err(MicrogridError::InvalidAction(format!(
                    "expected 1 or 2 values, got {}",
                    values.len()
                )));
            }
        };
        action.validate()?;
        Ok(action)
    }

    /// Rejects NaN and infinite battery commands.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAction` describing the offending value.
    pub fn validate(&self) -> Result<()> {
        if self.battery.is_finite() {
            Ok(())
        } else {
            Err(MicrogridError::InvalidAction(format!(
                "battery command must be finite, got {}",
                self.battery
            )))
        }
    }

    /// Returns a copy with the battery command clamped to `[-1, 1]`.
    pub fn clamped(&self) -> Self {
        Self {
            battery: self.battery.clamp(-1.0, 1.0),
            diesel_on: self.diesel_on,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "battery={:+.2} diesel={}",
            self.battery,
            if self.diesel_on { "on" } else { "off" }
        )
    }
}

/// Number of features in an [`Observation`].
pub const OBSERVATION_LEN: usize = 10;

/// Feature names in observation order. The layout is fixed; trained agents
/// depend on it.
pub const OBSERVATION_FEATURES: [&str; OBSERVATION_LEN] = [
    "hour_of_day",
    "solar_output",
    "wind_output",
    "load",
    "soc",
    "buy_price",
    "irradiance",
    "wind_speed",
    "temperature",
    "grid_connected",
];

/// Divisor applied to the buy price.
pub const PRICE_SCALE: f64 = 1.5;
/// Divisor applied to irradiance (W/m²).
pub const IRRADIANCE_SCALE: f64 = 1000.0;
/// Divisor applied to wind speed (m/s).
pub const WIND_SPEED_SCALE: f64 = 30.0;
/// Divisor applied to ambient temperature (°C).
pub const TEMPERATURE_SCALE: f64 = 40.0;

/// Normalized policy input.
///
/// | index | feature | divisor |
/// |---|---|---|
/// | 0 | hour of day | 24 |
/// | 1 | solar output | solar capacity |
/// | 2 | wind output | wind capacity |
/// | 3 | load | peak load |
/// | 4 | battery SOC | 1 |
/// | 5 | buy price | 1.5 |
/// | 6 | irradiance | 1000 |
/// | 7 | wind speed | 30 |
/// | 8 | temperature | 40 |
/// | 9 | grid connected | 1 (0 or 1) |
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation(pub [f64; OBSERVATION_LEN]);

impl Observation {
    pub const HOUR: usize = 0;
    pub const SOLAR: usize = 1;
    pub const WIND: usize = 2;
    pub const LOAD: usize = 3;
    pub const SOC: usize = 4;
    pub const PRICE: usize = 5;
    pub const IRRADIANCE: usize = 6;
    pub const WIND_SPEED: usize = 7;
    pub const TEMPERATURE: usize = 8;
    pub const GRID_CONNECTED: usize = 9;

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn soc(&self) -> f64 {
        self.0[Self::SOC]
    }
}

/// Lifecycle phase of the simulation core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimPhase {
    /// Constructed or reset, no step taken yet.
    Initialized,
    /// At least one step taken, horizon not reached.
    Running,
    /// Horizon reached; only `reset()` continues.
    Terminated,
}

/// Exogenous conditions for the current timestamp, sampled once per step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    pub timestamp: NaiveDateTime,
    pub weather: EnvironmentSample,
    pub price: PriceSignal,
    /// Sampled site demand (kW).
    pub load_kw: f64,
    /// Solar output implied by `weather` (kW).
    pub solar_kw: f64,
    /// Wind output implied by `weather` (kW).
    pub wind_kw: f64,
}

/// Complete record of one simulation step.
///
/// Powers are in kW and hold for the whole step. All values are the clipped
/// actual values, never the requested ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Step index within the episode.
    pub step: usize,
    /// Timestamp at the start of the step.
    pub timestamp: NaiveDateTime,
    pub dt_hours: f64,
    pub irradiance: f64,
    pub ambient_temperature: f64,
    pub wind_speed: f64,
    pub cloud_cover: f64,
    pub solar_kw: f64,
    pub wind_kw: f64,
    pub diesel_kw: f64,
    /// Demand before any shedding.
    pub load_kw: f64,
    /// Demand actually served (`load_kw - unmet_load_kw`).
    pub served_load_kw: f64,
    /// Signed battery power, positive = charging.
    pub battery_kw: f64,
    /// SOC at the end of the step.
    pub soc: f64,
    /// Signed grid exchange, positive = import.
    pub grid_kw: f64,
    /// Demand that neither local supply nor the grid could cover.
    pub unmet_load_kw: f64,
    /// Surplus that could be neither stored nor exported.
    pub curtailed_kw: f64,
    pub buy_price: f64,
    pub sell_price: f64,
    pub period: PricePeriod,
    /// Diesel fuel burned this step (litres).
    pub fuel_l: f64,
    pub fuel_cost: f64,
    /// Grid energy cost plus fuel cost; negative when export revenue dominates.
    pub step_cost: f64,
    /// Renewable power serving load after curtailment.
    pub renewable_used_kw: f64,
    pub renewable_ratio: f64,
    /// Whether the diesel unit actually ran.
    pub diesel_on: bool,
    /// Battery command after clamping to `[-1, 1]`.
    pub battery_command: f64,
    pub reward: f64,
}

impl Snapshot {
    pub fn charge_kw(&self) -> f64 {
        self.battery_kw.max(0.0)
    }

    pub fn discharge_kw(&self) -> f64 {
        (-self.battery_kw).max(0.0)
    }

    pub fn import_kw(&self) -> f64 {
        self.grid_kw.max(0.0)
    }

    pub fn export_kw(&self) -> f64 {
        (-self.grid_kw).max(0.0)
    }

    /// Solar plus wind plus diesel, before curtailment.
    pub fn generation_kw(&self) -> f64 {
        self.solar_kw + self.wind_kw + self.diesel_kw
    }
}

/// Result of [`MicrogridCore::step`](crate::sim::engine::MicrogridCore::step).
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// Observation for the next step.
    pub observation: Observation,
    pub reward: f64,
    /// `true` once the horizon is reached.
    pub done: bool,
    /// Full record of the step just taken.
    pub info: Snapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_slice_shapes() {
        assert_eq!(Action::from_slice(&[0.3]).ok(), Some(Action::new(0.3, false)));
        assert_eq!(
            Action::from_slice(&[0.3, 0.9]).ok(),
            Some(Action::new(0.3, true))
        );
        assert!(matches!(
            Action::from_slice(&[]),
            Err(MicrogridError::InvalidAction(_))
        ));
        assert!(matches!(
            Action::from_slice(&[0.1, 0.0, 1.0]),
            Err(MicrogridError::InvalidAction(_))
        ));
    }

    #[test]
    fn validate_rejects_non_finite() {
        assert!(Action::new(f64::NAN, false).validate().is_err());
        assert!(Action::new(f64::INFINITY, false).validate().is_err());
        assert!(Action::new(f64::NEG_INFINITY, true).validate().is_err());
        assert!(Action::new(5.0, false).validate().is_ok());
    }

    #[test]
    fn clamped_bounds_command() {
        assert_eq!(Action::new(5.0, true).clamped(), Action::new(1.0, true));
        assert_eq!(Action::new(-3.0, false).clamped(), Action::new(-1.0, false));
        assert_eq!(Action::charge(0.4).clamped(), Action::charge(0.4));
    }

    #[test]
    fn action_display() {
        assert_eq!(Action::discharge(0.5).to_string(), "battery=-0.50 diesel=off");
    }

    #[test]
    fn feature_names_match_layout() {
        assert_eq!(OBSERVATION_FEATURES[Observation::SOC], "soc");
        assert_eq!(OBSERVATION_FEATURES[Observation::GRID_CONNECTED], "grid_connected");
    }
}
