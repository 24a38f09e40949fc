//! Scenario loading and validation.

use microgrid_twin::config::{ApproximatorKind, ScenarioConfig};
use microgrid_twin::error::MicrogridError;
use microgrid_twin::sim::engine::MicrogridCore;
use microgrid_twin::sim::types::Action;

const WINTER_WEEK: &str = include_str!("../scenarios/winter_week.toml");

#[test]
fn bundled_scenario_parses_and_runs() {
    let cfg = ScenarioConfig::from_toml_str(WINTER_WEEK).unwrap();
    assert!(cfg.validate().is_empty());
    assert_eq!(cfg.simulation.step_minutes, 15);
    assert_eq!(cfg.learning_agent.approximator, ApproximatorKind::Linear);
    // untouched sections keep their defaults
    assert_eq!(cfg.grid.max_import_kw, 100.0);

    let mut core = MicrogridCore::new(cfg).unwrap();
    assert_eq!(core.dt_hours(), 0.25);
    for _ in 0..96 {
        core.step(Action::IDLE).unwrap();
    }
    assert_eq!(core.history().len(), 96);
}

#[test]
fn scenario_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("site.toml");
    std::fs::write(&path, WINTER_WEEK).unwrap();
    let from_file = ScenarioConfig::from_toml_file(&path).unwrap();
    assert_eq!(from_file.simulation.seed, 2024);
    assert!(ScenarioConfig::from_toml_file(&dir.path().join("nope.toml")).is_err());
}

#[test]
fn unknown_fields_are_rejected() {
    let err = ScenarioConfig::from_toml_str("[battery]\ncapacity = 10.0\n").unwrap_err();
    assert_eq!(err.field, "toml");
}

#[test]
fn every_invalid_field_is_reported() {
    let mut cfg = ScenarioConfig::baseline();
    cfg.battery.soc_min = 0.95;
    cfg.load.noise_ratio = 2.0;
    cfg.learning_agent.batch_size = 0;
    match MicrogridCore::new(cfg) {
        Err(MicrogridError::Configuration(errors)) => {
            let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
            assert!(fields.contains(&"battery.soc_min"));
            assert!(fields.contains(&"load.noise_ratio"));
            assert!(fields.contains(&"learning_agent.batch_size"));
        }
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn presets_are_valid_and_distinct() {
    for name in ScenarioConfig::PRESETS {
        let cfg = ScenarioConfig::from_preset(name).unwrap();
        assert!(cfg.validate().is_empty(), "{name}");
    }
    assert!(!ScenarioConfig::island().grid.connected);
    assert!(ScenarioConfig::solar_rich().solar.capacity_kw > ScenarioConfig::baseline().solar.capacity_kw);
    assert!(
        ScenarioConfig::storage_heavy().battery.capacity_kwh
            > ScenarioConfig::baseline().battery.capacity_kwh
    );
}
