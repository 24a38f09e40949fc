use std::f64::consts::PI;

use chrono::{Datelike, NaiveDateTime, Timelike};
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Exp};
use serde::{Deserialize, Serialize};

use super::bounded_noise;
use crate::config::WeatherConfig;

/// Weather conditions at one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSample {
    /// Global horizontal irradiance (W/m²), never negative.
    pub irradiance: f64,
    /// Ambient temperature (°C).
    pub ambient_temperature: f64,
    /// Hub-height wind speed (m/s), never negative.
    pub wind_speed: f64,
    /// Sky cover fraction in `[0, 1]`.
    pub cloud_cover: f64,
    /// Relative humidity (%).
    pub humidity: f64,
}

/// Fractional hour of day, e.g. 13:30 → 13.5.
pub fn hour_of_day(timestamp: NaiveDateTime) -> f64 {
    f64::from(timestamp.hour()) + f64::from(timestamp.minute()) / 60.0
}

/// Sun elevation factor in `[0, 1]`: a half sine between 06:00 and 18:00.
pub fn solar_elevation_factor(hour: f64) -> f64 {
    if (6.0..=18.0).contains(&hour) {
        (PI * (hour - 6.0) / 12.0).sin().max(0.0)
    } else {
        0.0
    }
}

/// Seasonal irradiance factor in `[0.4, 1.0]`, peaking near the June solstice.
pub fn seasonal_factor(day_of_year: u32) -> f64 {
    0.7 + 0.3 * (2.0 * PI * (f64::from(day_of_year) - 80.0) / 365.0).sin()
}

/// Seeded synthetic weather generator.
///
/// Cloud cover evolves as a clipped random walk across calls, so samples must
/// be requested in timestamp order for the walk to be meaningful.
#[derive(Debug, Clone)]
pub struct WeatherModel {
    config: WeatherConfig,
    seed: u64,
    rng: StdRng,
    cloud_cover: f64,
}

impl WeatherModel {
    /// Creates a generator from its configuration and stream seed.
    pub fn new(config: WeatherConfig, seed: u64) -> Self {
        let cloud_cover = config.initial_cloud_cover.clamp(0.0, 1.0);
        Self {
            config,
            seed,
            rng: StdRng::seed_from_u64(seed),
            cloud_cover,
        }
    }

    /// Rewinds the PRNG stream and cloud state to their initial values.
    pub fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.cloud_cover = self.config.initial_cloud_cover.clamp(0.0, 1.0);
    }

    /// Samples weather at `timestamp`, advancing the cloud random walk one step.
    pub fn sample(&mut self, timestamp: NaiveDateTime) -> EnvironmentSample {
        let cfg = &self.config;
        let hour = hour_of_day(timestamp);
        let doy = timestamp.ordinal();

        let step = bounded_noise(&mut self.rng, cfg.cloud_step_std);
        self.cloud_cover = (self.cloud_cover + step).clamp(0.0, 1.0);

        let clear_sky = cfg.peak_irradiance * solar_elevation_factor(hour) * seasonal_factor(doy);
        let irradiance = (clear_sky * (1.0 - 0.7 * self.cloud_cover)
            + bounded_noise(&mut self.rng, cfg.irradiance_noise_std))
        .max(0.0);

        let ambient_temperature = cfg.base_temperature
            + 8.0 * (PI * (hour - 6.0) / 12.0).sin()
            + 10.0 * (2.0 * PI * (f64::from(doy) - 80.0) / 365.0).sin()
            + bounded_noise(&mut self.rng, cfg.temperature_noise_std);

        let gust = match Exp::new(1.0 / cfg.wind_gust_mean) {
            Ok(exp) if cfg.wind_gust_mean > 0.0 => exp.sample(&mut self.rng),
            _ => 0.0,
        };
        let wind_speed = (cfg.wind_base_speed
            + cfg.wind_daily_amplitude * (2.0 * PI * hour / 24.0).sin()
            + gust)
            .clamp(0.0, cfg.max_wind_speed);

        let humidity =
            (50.0 + 30.0 * self.cloud_cover + bounded_noise(&mut self.rng, 5.0)).clamp(0.0, 100.0);

        debug_assert!(irradiance >= 0.0, "irradiance must never be negative");
        debug_assert!(wind_speed >= 0.0, "wind speed must never be negative");

        EnvironmentSample {
            irradiance,
            ambient_temperature,
            wind_speed,
            cloud_cover: self.cloud_cover,
            humidity,
        }
    }
}
