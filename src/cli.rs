//! Command-line arguments.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use microgrid_twin::config::ScenarioConfig;
use microgrid_twin::error::Result;

#[derive(Debug, Parser)]
#[command(name = "microgrid-twin")]
#[command(version, about = "Microgrid digital twin: simulate, control and evaluate")]
#[command(
    long_about = "Simulates a microgrid (solar, wind, battery, diesel, load, grid) step by step\n\
    under a chosen control policy, then prints an evaluation report.\n\
    \nIf neither --scenario nor --preset is given, the baseline preset is used.\n\
    \nExamples:\n  \
    microgrid-twin --policy rule\n  \
    microgrid-twin --preset island --policy hybrid --train-episodes 20\n  \
    microgrid-twin --scenario site.toml --compare --history-out run.csv"
)]
pub struct Cli {
    /// Load the scenario from a TOML file
    #[arg(long, value_name = "PATH", conflicts_with = "preset")]
    pub scenario: Option<PathBuf>,

    /// Built-in preset (baseline, island, solar_rich, storage_heavy)
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,

    /// Override the scenario seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Control policy for the run
    #[arg(long, value_enum, default_value_t = PolicyKind::Rule)]
    pub policy: PolicyKind,

    /// Train the learning agent for this many episodes before the run
    #[arg(long, default_value_t = 0, value_name = "N")]
    pub train_episodes: usize,

    /// Stop after this many steps instead of the full horizon
    #[arg(long, value_name = "N")]
    pub steps: Option<usize>,

    /// Write the step history to a CSV file
    #[arg(long, value_name = "PATH")]
    pub history_out: Option<PathBuf>,

    /// Print the final system state as JSON
    #[arg(long, default_value_t = false)]
    pub state_json: bool,

    /// Run every policy on the same scenario and rank them
    #[arg(long, default_value_t = false)]
    pub compare: bool,

    /// Save the learning agent after training and the run
    #[arg(long, value_name = "PATH")]
    pub save_agent: Option<PathBuf>,

    /// Start from a previously saved learning agent
    #[arg(long, value_name = "PATH")]
    pub load_agent: Option<PathBuf>,

    /// Suppress per-step lines
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyKind {
    Idle,
    Rule,
    Learning,
    Hybrid,
}

impl PolicyKind {
    pub fn uses_agent(self) -> bool {
        matches!(self, Self::Learning | Self::Hybrid)
    }
}

impl Cli {
    /// Resolves the scenario source and applies the seed override.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` for an unreadable file, bad TOML or an unknown preset.
    pub fn load_config(&self) -> Result<ScenarioConfig> {
        let mut config = match (&self.scenario, &self.preset) {
            (Some(path), _) => ScenarioConfig::from_toml_file(path)?,
            (None, Some(name)) => ScenarioConfig::from_preset(name)?,
            (None, None) => ScenarioConfig::baseline(),
        };
        if let Some(seed) = self.seed {
            config.simulation.seed = seed;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["microgrid-twin"]);
        assert_eq!(cli.policy, PolicyKind::Rule);
        assert_eq!(cli.train_episodes, 0);
        assert!(!cli.compare);
        let cfg = cli.load_config().unwrap();
        assert_eq!(cfg.simulation.seed, 42);
    }

    #[test]
    fn seed_override_and_preset() {
        let cli = Cli::parse_from([
            "microgrid-twin",
            "--preset",
            "island",
            "--seed",
            "9",
            "--policy",
            "hybrid",
            "-vv",
        ]);
        assert_eq!(cli.verbose, 2);
        assert!(cli.policy.uses_agent());
        let cfg = cli.load_config().unwrap();
        assert_eq!(cfg.simulation.seed, 9);
        assert!(!cfg.grid.connected);
    }

    #[test]
    fn scenario_conflicts_with_preset() {
        let res = Cli::try_parse_from([
            "microgrid-twin",
            "--scenario",
            "a.toml",
            "--preset",
            "baseline",
        ]);
        assert!(res.is_err());
    }
}
