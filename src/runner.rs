//! Episode loops shared by the binary and the integration tests.

use std::thread;

use tracing::info;

use crate::config::ScenarioConfig;
use crate::error::Result;
use crate::evaluation::{Comparison, compare};
use crate::policy::learning::LearningAgent;
use crate::policy::{Policy, Transition};
use crate::sim::engine::MicrogridCore;
use crate::sim::state::StatisticsReport;
use crate::sim::types::{Snapshot, StepOutcome};

/// Outcome of one episode.
#[derive(Debug, Clone)]
pub struct EpisodeResult {
    pub policy: String,
    pub steps: usize,
    pub total_reward: f64,
    /// Whether the horizon was reached (as opposed to a step limit).
    pub completed: bool,
    pub statistics: StatisticsReport,
    pub history: Vec<Snapshot>,
}

/// Resets `core` and drives it with `policy` until the horizon or `max_steps`.
///
/// The policy hears about the reset through [`Policy::on_reset`]. Every
/// transition is fed back through [`Policy::observe`]; `on_step` sees
/// each outcome after the policy.
///
/// # Errors
///
/// Propagates step errors, which only occur for non-finite actions.
pub fn run_episode<P, F>(
    core: &mut MicrogridCore,
    policy: &mut P,
    max_steps: Option<usize>,
    mut on_step: F,
) -> Result<EpisodeResult>
where
    P: Policy + ?Sized,
    F: FnMut(&StepOutcome),
{
    let mut observation = core.reset();
    policy.on_reset();
    let limit = max_steps.unwrap_or(usize::MAX);
    let mut steps = 0;
    let mut total_reward = 0.0;
    let mut done = false;

    while !done && steps < limit {
        let action = policy.select_action(core);
        let outcome = core.step(action)?;
        policy.observe(&Transition {
            observation,
            action,
            reward: outcome.reward,
            next_observation: outcome.observation,
            done: outcome.done,
        });
        on_step(&outcome);

        observation = outcome.observation;
        total_reward += outcome.reward;
        done = outcome.done;
        steps += 1;
    }

    let statistics = core.get_state().statistics;
    info!(
        policy = policy.name(),
        steps,
        total_reward,
        total_cost = statistics.totals.total_cost,
        "episode finished"
    );
    Ok(EpisodeResult {
        policy: policy.name().to_string(),
        steps,
        total_reward,
        completed: done,
        statistics,
        history: core.history().to_vec(),
    })
}

/// Trains `agent` for `episodes` full episodes on a fresh core.
///
/// Returns the total reward of each episode.
///
/// # Errors
///
/// Returns `Configuration` if `config` is invalid.
pub fn train_learning_agent(
    config: &ScenarioConfig,
    agent: &mut LearningAgent,
    episodes: usize,
) -> Result<Vec<f64>> {
    let mut core = MicrogridCore::new(config.clone())?;
    let was_training = agent.is_training();
    agent.set_training(true);

    let mut rewards = Vec::with_capacity(episodes);
    for episode in 0..episodes {
        let result = run_episode(&mut core, agent, None, |_| {})?;
        info!(
            episode = episode + 1,
            of = episodes,
            reward = result.total_reward,
            epsilon = agent.epsilon(),
            "training episode"
        );
        rewards.push(result.total_reward);
    }

    agent.set_training(was_training);
    Ok(rewards)
}

/// Runs every policy on its own core in parallel and ranks the results.
///
/// Each policy gets an independent core built from the same config, so all
/// runs see identical weather, prices and demand.
///
/// # Errors
///
/// Returns the first error raised by any run.
pub fn compare_policies(
    config: &ScenarioConfig,
    policies: Vec<Box<dyn Policy + Send>>,
    max_steps: Option<usize>,
) -> Result<(Vec<EpisodeResult>, Comparison)> {
    let results: Vec<Result<EpisodeResult>> = thread::scope(|scope| {
        let handles: Vec<_> = policies
            .into_iter()
            .map(|mut policy| {
                scope.spawn(move || {
                    let mut core = MicrogridCore::new(config.clone())?;
                    run_episode(&mut core, &mut policy, max_steps, |_| {})
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });

    let results = results.into_iter().collect::<Result<Vec<_>>>()?;
    let runs: Vec<(&str, Vec<Snapshot>)> = results
        .iter()
        .map(|r| (r.policy.as_str(), r.history.clone()))
        .collect();
    let comparison = compare(&runs);
    Ok((results, comparison))
}
