//! Shared fixtures for integration tests.
#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};

use microgrid_twin::config::{ApproximatorKind, LearningConfig, ScenarioConfig};

/// Baseline preset (seed 42, hourly steps) with a custom horizon.
pub fn baseline(horizon: usize) -> ScenarioConfig {
    let mut cfg = ScenarioConfig::baseline();
    cfg.simulation.horizon_steps = horizon;
    cfg
}

/// `2024-06-01` at `hour`:00.
pub fn june_first(hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .unwrap()
}

/// No solar, no wind, no diesel, and a constant noise-free demand.
pub fn dark_site(load_kw: f64, horizon: usize) -> ScenarioConfig {
    let mut cfg = baseline(horizon);
    cfg.solar.capacity_kw = 0.0;
    cfg.wind.capacity_kw = 0.0;
    cfg.diesel.enabled = false;
    cfg.load.base_kw = load_kw;
    cfg.load.peak_kw = load_kw;
    cfg.load.noise_ratio = 0.0;
    cfg
}

/// Clear-sky noon with oversized PV and a tiny constant demand.
pub fn sunny_noon(horizon: usize) -> ScenarioConfig {
    let mut cfg = baseline(horizon);
    cfg.simulation.start_time = june_first(12);
    cfg.weather.initial_cloud_cover = 0.0;
    cfg.weather.cloud_step_std = 0.0;
    cfg.weather.irradiance_noise_std = 0.0;
    cfg.solar.capacity_kw = 1000.0;
    cfg.solar.area_m2 = 10_000.0;
    cfg.solar.efficiency = 0.2;
    cfg.wind.capacity_kw = 0.0;
    cfg.load.base_kw = 1.0;
    cfg.load.peak_kw = 1.0;
    cfg.load.noise_ratio = 0.0;
    cfg
}

/// Small linear learner that trains after a handful of steps.
pub fn linear_learning() -> LearningConfig {
    LearningConfig {
        approximator: ApproximatorKind::Linear,
        batch_size: 16,
        buffer_capacity: 500,
        target_sync_interval: 20,
        ..LearningConfig::default()
    }
}
