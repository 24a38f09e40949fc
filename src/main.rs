//! Microgrid digital twin entry point: CLI wiring and policy selection.

mod cli;

use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use microgrid_twin::config::{ConfigError, ScenarioConfig};
use microgrid_twin::error::{MicrogridError, Result};
use microgrid_twin::evaluation::Evaluation;
use microgrid_twin::io::export::export_csv;
use microgrid_twin::monitor::Monitor;
use microgrid_twin::policy::{
    AdaptiveManager, ControlMode, IdlePolicy, LearningAgent, Policy, RuleBasedAgent,
};
use microgrid_twin::runner::{EpisodeResult, compare_policies, run_episode, train_learning_agent};
use microgrid_twin::sim::engine::MicrogridCore;
use microgrid_twin::sim::types::{OBSERVATION_LEN, StepOutcome};
use microgrid_twin::telemetry::init_tracing;

use cli::{Cli, PolicyKind};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.load_config()?;
    let needs_agent = cli.compare || cli.policy.uses_agent() || cli.save_agent.is_some();
    let mut agent = if needs_agent {
        Some(build_agent(cli, &config)?)
    } else {
        None
    };

    if let Some(agent) = agent.as_mut().filter(|_| cli.train_episodes > 0) {
        println!("Training learning agent for {} episodes...", cli.train_episodes);
        let rewards = train_learning_agent(&config, agent, cli.train_episodes)?;
        if let (Some(first), Some(last)) = (rewards.first(), rewards.last()) {
            println!(
                "Episode reward {first:.2} -> {last:.2}, epsilon {:.3}",
                agent.epsilon()
            );
        }
    }

    if cli.compare {
        run_comparison(cli, &config, agent.as_ref())?;
    } else {
        let mut monitor = Monitor::new(config.monitor.clone());
        let (result, core) = run_single(cli, &config, &mut agent, &mut monitor)?;
        println!();
        println!("{}", Evaluation::new(result.policy.as_str(), &result.history));
        if let Some(stats) = monitor.statistics() {
            println!();
            println!("{stats}");
        }
        let mut alerts = monitor.recent_alerts(10).peekable();
        if alerts.peek().is_some() {
            println!("Recent alerts:");
            for alert in alerts {
                println!("  {alert}");
            }
        }

        if let Some(path) = &cli.history_out {
            export_csv(&result.history, path)?;
            println!("History written to {}", path.display());
        }
        if cli.state_json {
            println!("{}", core.get_state().to_json()?);
        }
    }

    if let (Some(path), Some(agent)) = (&cli.save_agent, &agent) {
        agent.save(path)?;
        println!("Agent saved to {}", path.display());
    }
    Ok(())
}

fn build_agent(cli: &Cli, config: &ScenarioConfig) -> Result<LearningAgent> {
    let Some(path) = &cli.load_agent else {
        return LearningAgent::new(config.learning_agent.clone(), OBSERVATION_LEN);
    };
    let agent = LearningAgent::load(path)?;
    if agent.state_dim() != OBSERVATION_LEN {
        return Err(MicrogridError::from(ConfigError::new(
            "load_agent",
            format!(
                "agent expects {} observation features, the core produces {OBSERVATION_LEN}",
                agent.state_dim()
            ),
        )));
    }
    info!(path = %path.display(), steps = agent.training_steps(), "agent loaded");
    Ok(agent)
}

fn run_single(
    cli: &Cli,
    config: &ScenarioConfig,
    agent: &mut Option<LearningAgent>,
    monitor: &mut Monitor,
) -> Result<(EpisodeResult, MicrogridCore)> {
    let mut core = MicrogridCore::new(config.clone())?;
    let quiet = cli.quiet;
    let on_step = |o: &StepOutcome| {
        monitor.update(&o.info);
        if !quiet {
            print_step(o);
        }
    };

    let result = match (cli.policy, agent.take()) {
        (PolicyKind::Idle, restored) => {
            *agent = restored;
            run_episode(&mut core, &mut IdlePolicy, cli.steps, on_step)?
        }
        (PolicyKind::Rule, restored) => {
            *agent = restored;
            let mut rule = RuleBasedAgent::new(config.rule_agent.clone());
            run_episode(&mut core, &mut rule, cli.steps, on_step)?
        }
        (PolicyKind::Learning, Some(mut learner)) => {
            learner.set_training(false);
            let result = run_episode(&mut core, &mut learner, cli.steps, on_step)?;
            *agent = Some(learner);
            result
        }
        (PolicyKind::Hybrid, Some(mut learner)) => {
            learner.set_training(false);
            let rule = RuleBasedAgent::new(config.rule_agent.clone());
            let mut manager = AdaptiveManager::new(ControlMode::Hybrid, rule, learner);
            let result = run_episode(&mut core, &mut manager, cli.steps, on_step)?;
            println!("Final RL confidence: {:.2}", manager.rl_confidence());
            *agent = Some(manager.into_learner());
            result
        }
        (PolicyKind::Learning | PolicyKind::Hybrid, None) => {
            return Err(ConfigError::new("policy", "learning policies need an agent").into());
        }
    };
    Ok((result, core))
}

fn run_comparison(cli: &Cli, config: &ScenarioConfig, agent: Option<&LearningAgent>) -> Result<()> {
    let mut policies: Vec<Box<dyn Policy + Send>> = vec![
        Box::new(IdlePolicy),
        Box::new(RuleBasedAgent::new(config.rule_agent.clone())),
    ];
    if let Some(agent) = agent {
        let mut learner = agent.clone();
        learner.set_training(false);
        policies.push(Box::new(learner.clone()));
        policies.push(Box::new(AdaptiveManager::new(
            ControlMode::Hybrid,
            RuleBasedAgent::new(config.rule_agent.clone()),
            learner,
        )));
    }

    let (results, comparison) = compare_policies(config, policies, cli.steps)?;
    for e in &comparison.entries {
        println!("{e}");
        println!();
    }
    println!("{comparison}");

    if let Some(path) = &cli.history_out {
        // only the first run's history fits one file
        if let Some(first) = results.first() {
            export_csv(&first.history, path)?;
            println!("History of \"{}\" written to {}", first.policy, path.display());
        }
    }
    Ok(())
}

fn print_step(o: &StepOutcome) {
    let s = &o.info;
    println!(
        "[{:>4}] {} {:<6} load {:7.2} kW  pv {:6.2}  wind {:6.2}  bat {:+7.2} (soc {:.3})  \
         diesel {:6.2}  grid {:+7.2}  cost {:+8.3}  reward {:+8.3}",
        s.step,
        s.timestamp.format("%m-%d %H:%M"),
        s.period.to_string(),
        s.load_kw,
        s.solar_kw,
        s.wind_kw,
        s.battery_kw,
        s.soc,
        s.diesel_kw,
        s.grid_kw,
        s.step_cost,
        o.reward,
    );
}
