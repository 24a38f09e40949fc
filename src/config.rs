//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::MicrogridError;

/// Top-level scenario configuration parsed from TOML.
///
/// All sections have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Simulation timing and global parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Photovoltaic array.
    #[serde(default)]
    pub solar: SolarSpec,
    /// Wind turbine.
    #[serde(default)]
    pub wind: WindSpec,
    /// Battery storage.
    #[serde(default)]
    pub battery: BatterySpec,
    /// Backup diesel generator.
    #[serde(default)]
    pub diesel: DieselSpec,
    /// Site demand.
    #[serde(default)]
    pub load: LoadSpec,
    /// Utility interconnect.
    #[serde(default)]
    pub grid: GridSpec,
    /// Synthetic weather generator.
    #[serde(default)]
    pub weather: WeatherConfig,
    /// Time-of-use tariff.
    #[serde(default)]
    pub tariff: TariffConfig,
    /// Reward shaping used by learning policies.
    #[serde(default)]
    pub reward: RewardConfig,
    /// Rule-based agent thresholds.
    #[serde(default)]
    pub rule_agent: RuleConfig,
    /// Learning agent hyper-parameters.
    #[serde(default)]
    pub learning_agent: LearningConfig,
    /// Rolling-window monitor and alert thresholds.
    #[serde(default)]
    pub monitor: MonitorConfig,
}

/// Simulation timing and global parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Timestamp of the first step (`"YYYY-MM-DDTHH:MM:SS"`).
    pub start_time: NaiveDateTime,
    /// Step length in minutes (must be > 0).
    pub step_minutes: u32,
    /// Episode length in steps; the core terminates once reached.
    pub horizon_steps: usize,
    /// Maximum number of snapshots kept in history.
    pub history_capacity: usize,
    /// Master random seed. Every stochastic stream derives from it.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_time: NaiveDate::from_ymd_opt(2024, 6, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap_or_default(),
            step_minutes: 60,
            horizon_steps: 168,
            history_capacity: 1440,
            seed: 42,
        }
    }
}

impl SimulationConfig {
    /// Step length in hours.
    pub fn dt_hours(&self) -> f64 {
        f64::from(self.step_minutes) / 60.0
    }

    /// Timestamp reached after the last step.
    ///
    /// `None` when the episode runs past the calendar range chrono can represent.
    pub fn end_time(&self) -> Option<NaiveDateTime> {
        let step = TimeDelta::try_minutes(i64::from(self.step_minutes))?;
        let steps = i32::try_from(self.horizon_steps).ok()?;
        self.start_time.checked_add_signed(step.checked_mul(steps)?)
    }
}

/// Photovoltaic array parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolarSpec {
    /// Inverter-limited output ceiling (kW).
    pub capacity_kw: f64,
    /// Panel conversion efficiency (0..1].
    pub efficiency: f64,
    /// Panel area (m²).
    pub area_m2: f64,
    /// Output change per °C above 25 °C (negative for silicon).
    pub temperature_coefficient: f64,
}

impl Default for SolarSpec {
    fn default() -> Self {
        Self {
            capacity_kw: 100.0,
            efficiency: 0.18,
            area_m2: 500.0,
            temperature_coefficient: -0.004,
        }
    }
}

/// Wind turbine power-curve parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindSpec {
    /// Rated output (kW).
    pub capacity_kw: f64,
    /// Wind speed below which output is zero (m/s).
    pub cut_in_speed: f64,
    /// Wind speed at which rated output is reached (m/s).
    pub rated_speed: f64,
    /// Wind speed above which the turbine shuts down (m/s).
    pub cut_out_speed: f64,
}

impl Default for WindSpec {
    fn default() -> Self {
        Self {
            capacity_kw: 50.0,
            cut_in_speed: 3.0,
            rated_speed: 12.0,
            cut_out_speed: 25.0,
        }
    }
}

/// Battery storage parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatterySpec {
    /// Total energy capacity (kWh).
    pub capacity_kwh: f64,
    /// Maximum charging power (kW).
    pub max_charge_kw: f64,
    /// Maximum discharging power (kW).
    pub max_discharge_kw: f64,
    /// Charge efficiency (0.0–1.0).
    pub charge_efficiency: f64,
    /// Discharge efficiency (0.0–1.0).
    pub discharge_efficiency: f64,
    /// Lower SOC bound.
    pub soc_min: f64,
    /// Upper SOC bound.
    pub soc_max: f64,
    /// SOC at construction and after `reset()`.
    pub initial_soc: f64,
}

impl Default for BatterySpec {
    fn default() -> Self {
        Self {
            capacity_kwh: 200.0,
            max_charge_kw: 50.0,
            max_discharge_kw: 50.0,
            charge_efficiency: 0.95,
            discharge_efficiency: 0.95,
            soc_min: 0.1,
            soc_max: 0.9,
            initial_soc: 0.5,
        }
    }
}

/// Diesel generator parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DieselSpec {
    /// A disabled generator ignores on-commands.
    pub enabled: bool,
    /// Rated output (kW).
    pub capacity_kw: f64,
    /// Minimum stable load as a fraction of capacity.
    pub min_load_ratio: f64,
    /// Fuel consumption (litres per kWh produced).
    pub fuel_l_per_kwh: f64,
    /// Fuel price per litre.
    pub fuel_price: f64,
}

impl Default for DieselSpec {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity_kw: 100.0,
            min_load_ratio: 0.3,
            fuel_l_per_kwh: 0.3,
            fuel_price: 8.0,
        }
    }
}

/// Normalized 24-hour demand shape, index = hour of day.
pub const DEFAULT_LOAD_PROFILE: [f64; 24] = [
    0.6, 0.5, 0.45, 0.4, 0.45, 0.5, 0.6, 0.8, 1.0, 0.95, 0.9, 0.85, 0.8, 0.85, 0.9, 0.95, 1.0, 1.0,
    0.95, 0.9, 0.85, 0.8, 0.7, 0.65,
];

/// Site demand parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadSpec {
    /// Demand at profile value 0 (kW).
    pub base_kw: f64,
    /// Demand at profile value 1 (kW).
    pub peak_kw: f64,
    /// Hourly shape in [0, 1]; exactly 24 entries.
    pub profile: Vec<f64>,
    /// Standard deviation of the multiplicative demand noise.
    pub noise_ratio: f64,
}

impl Default for LoadSpec {
    fn default() -> Self {
        Self {
            base_kw: 80.0,
            peak_kw: 150.0,
            profile: DEFAULT_LOAD_PROFILE.to_vec(),
            noise_ratio: 0.05,
        }
    }
}

/// Utility interconnect limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridSpec {
    /// Islanded sites exchange nothing with the grid.
    pub connected: bool,
    /// Maximum import power (kW).
    pub max_import_kw: f64,
    /// Maximum export power (kW, positive magnitude).
    pub max_export_kw: f64,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            connected: true,
            max_import_kw: 100.0,
            max_export_kw: 50.0,
        }
    }
}

/// Synthetic weather generator parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeatherConfig {
    /// Clear-sky irradiance at solar noon (W/m²).
    pub peak_irradiance: f64,
    /// Irradiance noise standard deviation (W/m²).
    pub irradiance_noise_std: f64,
    /// Mean ambient temperature (°C).
    pub base_temperature: f64,
    /// Temperature noise standard deviation (°C).
    pub temperature_noise_std: f64,
    /// Cloud cover at the start of an episode.
    pub initial_cloud_cover: f64,
    /// Standard deviation of the cloud random walk per step.
    pub cloud_step_std: f64,
    /// Mean wind speed (m/s).
    pub wind_base_speed: f64,
    /// Amplitude of the daily wind cycle (m/s).
    pub wind_daily_amplitude: f64,
    /// Mean of the exponential gust term (m/s).
    pub wind_gust_mean: f64,
    /// Upper clip on wind speed (m/s).
    pub max_wind_speed: f64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            peak_irradiance: 1000.0,
            irradiance_noise_std: 20.0,
            base_temperature: 20.0,
            temperature_noise_std: 2.0,
            initial_cloud_cover: 0.3,
            cloud_step_std: 0.05,
            wind_base_speed: 5.0,
            wind_daily_amplitude: 3.0,
            wind_gust_mean: 2.0,
            max_wind_speed: 30.0,
        }
    }
}

/// Half-open hour-of-day window `[start, end)`. Wraps midnight when `start > end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HourWindow {
    pub start: u32,
    pub end: u32,
}

impl HourWindow {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Returns `true` if `hour` falls inside the window.
    pub fn contains(&self, hour: u32) -> bool {
        if self.start <= self.end {
            hour >= self.start && hour < self.end
        } else {
            hour >= self.start || hour < self.end
        }
    }
}

/// Time-of-use tariff parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TariffConfig {
    /// Buy price during valley hours.
    pub valley_price: f64,
    /// Buy price outside valley and peak hours.
    pub normal_price: f64,
    /// Buy price during peak hours.
    pub peak_price: f64,
    /// Export price as a fraction of the buy price.
    pub sell_ratio: f64,
    /// Lowest buy price the tariff may ever quote.
    pub price_floor: f64,
    /// Standard deviation of the buy-price perturbation (0 disables it).
    pub noise_std: f64,
    /// Valley windows. Checked before peak windows.
    pub valley_hours: Vec<HourWindow>,
    /// Peak windows.
    pub peak_hours: Vec<HourWindow>,
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            valley_price: 0.4,
            normal_price: 0.8,
            peak_price: 1.2,
            sell_ratio: 0.7,
            price_floor: 0.3,
            noise_std: 0.0,
            valley_hours: vec![HourWindow::new(23, 7)],
            peak_hours: vec![HourWindow::new(9, 12), HourWindow::new(17, 21)],
        }
    }
}

/// Reward shaping weights for the learning policies.
///
/// Defaults reproduce the reference shaping:
/// `-10·cost + 5·renewable_ratio + soc_term - 0.01·|grid_kw| - 0.5·diesel_on`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RewardConfig {
    pub cost_weight: f64,
    pub renewable_weight: f64,
    /// Healthy SOC band, inclusive.
    pub soc_band: [f64; 2],
    pub soc_band_bonus: f64,
    /// SOC below this is penalized.
    pub soc_critical_low: f64,
    /// SOC above this is penalized.
    pub soc_critical_high: f64,
    pub soc_penalty: f64,
    pub grid_weight: f64,
    pub diesel_penalty: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            cost_weight: 10.0,
            renewable_weight: 5.0,
            soc_band: [0.3, 0.7],
            soc_band_bonus: 1.0,
            soc_critical_low: 0.15,
            soc_critical_high: 0.85,
            soc_penalty: 2.0,
            grid_weight: 0.01,
            diesel_penalty: 0.5,
        }
    }
}

/// Thresholds for the rule-based agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleConfig {
    /// Stop surplus charging at or above this SOC.
    pub soc_high: f64,
    /// Never discharge at or below this SOC.
    pub soc_low: f64,
    /// Diesel backup is allowed below this SOC.
    pub soc_critical: f64,
    /// Valley charging stops at or above this SOC.
    pub valley_soc_ceiling: f64,
    /// Renewable surplus that triggers charging (kW).
    pub surplus_kw: f64,
    /// Deficit that triggers discharging (kW).
    pub deficit_kw: f64,
    /// Deficit that triggers the diesel backup (kW).
    pub emergency_deficit_kw: f64,
    /// Surplus/deficit mapped to a full-rate command (kW).
    pub scale_kw: f64,
    /// Command magnitude used by the price rules.
    pub fixed_rate: f64,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            soc_high: 0.8,
            soc_low: 0.3,
            soc_critical: 0.2,
            valley_soc_ceiling: 0.7,
            surplus_kw: 20.0,
            deficit_kw: 30.0,
            emergency_deficit_kw: 50.0,
            scale_kw: 50.0,
            fixed_rate: 0.5,
        }
    }
}

/// Which regressor backs the learning agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproximatorKind {
    Linear,
    Mlp,
}

/// Learning agent hyper-parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LearningConfig {
    pub approximator: ApproximatorKind,
    /// Hidden layer widths for the `mlp` approximator.
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f64,
    /// Discount factor.
    pub gamma: f64,
    pub epsilon_start: f64,
    pub epsilon_decay: f64,
    pub epsilon_min: f64,
    pub batch_size: usize,
    pub buffer_capacity: usize,
    /// Hard target copy every this many training steps.
    pub target_sync_interval: u64,
    /// Number of evenly spaced battery commands in `[-1, 1]`.
    pub battery_bins: usize,
    /// TD errors are clipped to `±td_clip` before the gradient step.
    pub td_clip: f64,
    /// Seed for exploration, replay sampling and weight init.
    pub seed: u64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            approximator: ApproximatorKind::Mlp,
            hidden_layers: vec![128, 64],
            learning_rate: 1e-3,
            gamma: 0.99,
            epsilon_start: 1.0,
            epsilon_decay: 0.995,
            epsilon_min: 0.01,
            batch_size: 64,
            buffer_capacity: 10_000,
            target_sync_interval: 100,
            battery_bins: 11,
            td_clip: 1.0,
            seed: 7,
        }
    }
}

impl LearningConfig {
    /// Validates the hyper-parameters on their own, for agents built outside a scenario.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut c = Checker { errors: Vec::new() };
        let la = self;
        c.positive(la.learning_rate, "learning_agent.learning_rate");
        c.fraction(la.gamma, "learning_agent.gamma");
        c.fraction(la.epsilon_start, "learning_agent.epsilon_start");
        c.fraction(la.epsilon_min, "learning_agent.epsilon_min");
        c.efficiency(la.epsilon_decay, "learning_agent.epsilon_decay");
        c.require(la.batch_size > 0, "learning_agent.batch_size", "must be > 0");
        c.require(
            la.buffer_capacity >= la.batch_size,
            "learning_agent.buffer_capacity",
            "must be >= learning_agent.batch_size",
        );
        c.require(
            la.target_sync_interval > 0,
            "learning_agent.target_sync_interval",
            "must be > 0",
        );
        c.require(
            la.battery_bins >= 2,
            "learning_agent.battery_bins",
            "must be >= 2",
        );
        c.require(
            la.hidden_layers.iter().all(|&n| n > 0),
            "learning_agent.hidden_layers",
            "layer widths must be > 0",
        );
        c.positive(la.td_clip, "learning_agent.td_clip");

        c.errors
    }
}

/// Rolling-window monitor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    /// Number of most recent steps kept per channel.
    pub window_size: usize,
    /// SOC below this raises a warning.
    pub soc_low: f64,
    /// SOC above this raises an info alert.
    pub soc_high: f64,
    /// Demand above this raises a warning (kW).
    pub high_load_kw: f64,
    /// Alerts older than this, in simulated minutes, are dropped.
    pub alert_retention_minutes: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window_size: 60,
            soc_low: 0.15,
            soc_high: 0.9,
            high_load_kw: 140.0,
            alert_retention_minutes: 30,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"battery.soc_min"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Collects constraint violations for [`ScenarioConfig::validate`].
struct Checker {
    errors: Vec<ConfigError>,
}

impl Checker {
    fn require(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.errors.push(ConfigError::new(field, message));
        }
    }

    // NaN fails every range check below.
    fn non_negative(&mut self, value: f64, field: &str) {
        self.require(value >= 0.0 && value.is_finite(), field, "must be finite and >= 0");
    }

    fn positive(&mut self, value: f64, field: &str) {
        self.require(value > 0.0 && value.is_finite(), field, "must be finite and > 0");
    }

    fn fraction(&mut self, value: f64, field: &str) {
        self.require((0.0..=1.0).contains(&value), field, "must be in [0.0, 1.0]");
    }

    fn efficiency(&mut self, value: f64, field: &str) {
        self.require(value > 0.0 && value <= 1.0, field, "must be in (0.0, 1.0]");
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: grid-tied site with solar, wind, storage and backup diesel.
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Returns the island preset: no grid connection, larger storage, diesel backup.
    pub fn island() -> Self {
        Self {
            battery: BatterySpec {
                capacity_kwh: 400.0,
                max_charge_kw: 80.0,
                max_discharge_kw: 80.0,
                ..BatterySpec::default()
            },
            diesel: DieselSpec {
                capacity_kw: 150.0,
                ..DieselSpec::default()
            },
            grid: GridSpec {
                connected: false,
                ..GridSpec::default()
            },
            ..Self::default()
        }
    }

    /// Returns the solar-rich preset: oversized PV with a generous export limit.
    pub fn solar_rich() -> Self {
        Self {
            solar: SolarSpec {
                capacity_kw: 180.0,
                area_m2: 1000.0,
                ..SolarSpec::default()
            },
            grid: GridSpec {
                max_export_kw: 80.0,
                ..GridSpec::default()
            },
            ..Self::default()
        }
    }

    /// Returns the storage-heavy preset: doubled battery energy and power.
    pub fn storage_heavy() -> Self {
        Self {
            battery: BatterySpec {
                capacity_kwh: 400.0,
                max_charge_kw: 100.0,
                max_discharge_kw: 100.0,
                ..BatterySpec::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "island", "solar_rich", "storage_heavy"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "island" => Ok(Self::island()),
            "solar_rich" => Ok(Self::solar_rich()),
            "storage_heavy" => Ok(Self::storage_heavy()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Runs [`validate`](Self::validate) and converts any findings into an error.
    ///
    /// # Errors
    ///
    /// Returns `MicrogridError::Configuration` listing every violated constraint.
    pub fn ensure_valid(&self) -> Result<(), MicrogridError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(MicrogridError::Configuration(errors))
        }
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut c = Checker { errors: Vec::new() };

        let s = &self.simulation;
        c.require(s.step_minutes > 0, "simulation.step_minutes", "must be > 0");
        c.require(s.horizon_steps > 0, "simulation.horizon_steps", "must be > 0");
        c.require(
            s.end_time().is_some(),
            "simulation.step_minutes",
            "step_minutes × horizon_steps runs past the supported date range",
        );
        c.require(
            s.history_capacity > 0,
            "simulation.history_capacity",
            "must be > 0",
        );

        let sol = &self.solar;
        c.non_negative(sol.capacity_kw, "solar.capacity_kw");
        c.efficiency(sol.efficiency, "solar.efficiency");
        c.non_negative(sol.area_m2, "solar.area_m2");
        c.require(
            sol.temperature_coefficient.is_finite(),
            "solar.temperature_coefficient",
            "must be finite",
        );

        let w = &self.wind;
        c.non_negative(w.capacity_kw, "wind.capacity_kw");
        c.non_negative(w.cut_in_speed, "wind.cut_in_speed");
        c.require(
            w.cut_in_speed < w.rated_speed,
            "wind.cut_in_speed",
            "must be < wind.rated_speed",
        );
        c.require(
            w.rated_speed <= w.cut_out_speed && w.cut_out_speed.is_finite(),
            "wind.rated_speed",
            "must be <= wind.cut_out_speed",
        );

        let bat = &self.battery;
        c.positive(bat.capacity_kwh, "battery.capacity_kwh");
        c.non_negative(bat.max_charge_kw, "battery.max_charge_kw");
        c.non_negative(bat.max_discharge_kw, "battery.max_discharge_kw");
        c.efficiency(bat.charge_efficiency, "battery.charge_efficiency");
        c.efficiency(bat.discharge_efficiency, "battery.discharge_efficiency");
        c.fraction(bat.soc_min, "battery.soc_min");
        c.fraction(bat.soc_max, "battery.soc_max");
        c.require(
            bat.soc_min < bat.soc_max,
            "battery.soc_min",
            "must be < battery.soc_max",
        );
        c.require(
            bat.initial_soc >= bat.soc_min && bat.initial_soc <= bat.soc_max,
            "battery.initial_soc",
            "must be in [battery.soc_min, battery.soc_max]",
        );

        let d = &self.diesel;
        c.non_negative(d.capacity_kw, "diesel.capacity_kw");
        c.fraction(d.min_load_ratio, "diesel.min_load_ratio");
        c.non_negative(d.fuel_l_per_kwh, "diesel.fuel_l_per_kwh");
        c.non_negative(d.fuel_price, "diesel.fuel_price");

        let l = &self.load;
        c.non_negative(l.base_kw, "load.base_kw");
        c.require(
            l.peak_kw >= l.base_kw && l.peak_kw.is_finite(),
            "load.peak_kw",
            "must be >= load.base_kw",
        );
        c.require(
            l.profile.len() == 24,
            "load.profile",
            "must have exactly 24 hourly entries",
        );
        c.require(
            l.profile.iter().all(|v| (0.0..=1.0).contains(v)),
            "load.profile",
            "entries must be in [0.0, 1.0]",
        );
        c.require(
            (0.0..1.0).contains(&l.noise_ratio),
            "load.noise_ratio",
            "must be in [0.0, 1.0)",
        );

        let g = &self.grid;
        c.non_negative(g.max_import_kw, "grid.max_import_kw");
        c.non_negative(g.max_export_kw, "grid.max_export_kw");

        let wx = &self.weather;
        c.non_negative(wx.peak_irradiance, "weather.peak_irradiance");
        c.non_negative(wx.irradiance_noise_std, "weather.irradiance_noise_std");
        c.non_negative(wx.temperature_noise_std, "weather.temperature_noise_std");
        c.fraction(wx.initial_cloud_cover, "weather.initial_cloud_cover");
        c.non_negative(wx.cloud_step_std, "weather.cloud_step_std");
        c.non_negative(wx.wind_gust_mean, "weather.wind_gust_mean");
        c.non_negative(wx.max_wind_speed, "weather.max_wind_speed");

        let t = &self.tariff;
        c.non_negative(t.price_floor, "tariff.price_floor");
        c.non_negative(t.valley_price, "tariff.valley_price");
        c.non_negative(t.normal_price, "tariff.normal_price");
        c.non_negative(t.peak_price, "tariff.peak_price");
        c.fraction(t.sell_ratio, "tariff.sell_ratio");
        c.non_negative(t.noise_std, "tariff.noise_std");
        c.require(
            t.valley_hours
                .iter()
                .chain(&t.peak_hours)
                .all(|w| w.start < 24 && w.end <= 24),
            "tariff.hours",
            "window bounds must be within 0..=24",
        );

        let r = &self.rule_agent;
        c.require(
            r.soc_low < r.soc_high,
            "rule_agent.soc_low",
            "must be < rule_agent.soc_high",
        );
        c.positive(r.scale_kw, "rule_agent.scale_kw");
        c.fraction(r.fixed_rate, "rule_agent.fixed_rate");

        c.errors.extend(self.learning_agent.validate());

        let m = &self.monitor;
        c.require(m.window_size > 0, "monitor.window_size", "must be > 0");
        c.fraction(m.soc_low, "monitor.soc_low");
        c.fraction(m.soc_high, "monitor.soc_high");
        c.require(
            m.soc_low < m.soc_high,
            "monitor.soc_low",
            "must be < monitor.soc_high",
        );
        c.non_negative(m.high_load_kw, "monitor.high_load_kw");

        c.errors
    }
}
