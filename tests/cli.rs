//! End-to-end tests of the `microgrid-twin` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_microgrid-twin"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn write_scenario(dir: &Path) -> String {
    let path = dir.join("site.toml");
    fs::write(
        &path,
        r#"
[simulation]
start_time = "2024-01-15T06:00:00"
horizon_steps = 12
seed = 5

[learning_agent]
approximator = "linear"
batch_size = 4
buffer_capacity = 64
"#,
    )
    .unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn rule_run_prints_steps_and_report() {
    let out = run(&["--steps", "6", "--policy", "rule"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert_eq!(text.lines().filter(|l| l.starts_with('[')).count(), 6);
    assert!(text.contains("--- Evaluation: rule ---"));
    assert!(text.contains("Score:"));
    assert!(text.contains("--- Monitor (last 6 steps) ---"));
}

#[test]
fn history_and_state_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("history.csv");
    let out = run(&[
        "--steps",
        "5",
        "--quiet",
        "--state-json",
        "--history-out",
        csv.to_str().unwrap(),
    ]);
    assert!(out.status.success());
    assert_eq!(fs::read_to_string(&csv).unwrap().lines().count(), 6);
    assert!(stdout(&out).contains("\"components\""));
}

#[test]
fn unknown_preset_fails() {
    let out = run(&["--preset", "moonbase"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("unknown preset"));
}

#[test]
fn train_save_and_reload_agent() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = write_scenario(dir.path());
    let agent = dir.path().join("agent.json");
    let agent = agent.to_str().unwrap();

    let out = run(&[
        "--scenario",
        &scenario,
        "--policy",
        "learning",
        "--train-episodes",
        "2",
        "--save-agent",
        agent,
        "--quiet",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(Path::new(agent).exists());

    let out = run(&[
        "--scenario",
        &scenario,
        "--policy",
        "hybrid",
        "--load-agent",
        agent,
        "--quiet",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(stdout(&out).contains("--- Evaluation: hybrid ---"));
}

#[test]
fn compare_ranks_policies() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = write_scenario(dir.path());
    let out = run(&["--scenario", &scenario, "--compare", "--quiet"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let text = stdout(&out);
    assert!(text.contains("--- Strategy Comparison ---"));
    for name in ["idle", "rule", "learning", "hybrid"] {
        assert!(text.contains(&format!("--- Evaluation: {name} ---")));
    }
}
