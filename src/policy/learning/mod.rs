//! Value-learning agent over a discretized action space.
//!
//! The battery command is split into evenly spaced bins over `[-1, 1]`,
//! crossed with diesel off/on. Values are learned from replayed experience
//! against a periodically synchronized target copy of the approximator.

pub mod approximator;
pub mod replay;

pub use approximator::{
    Approximator, LinearModel, Mlp, TrainingExample, ValueApproximator,
};
pub use replay::{Experience, ReplayBuffer};

use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{ApproximatorKind, ConfigError, LearningConfig};
use crate::error::{MicrogridError, Result};
use crate::sim::engine::MicrogridCore;
use crate::sim::types::Action;

use super::{Policy, Transition};

/// Discrete actions: `index = bin * 2 + diesel`.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSpace {
    bins: Vec<f64>,
}

impl ActionSpace {
    /// `battery_bins` evenly spaced commands from -1 to 1 inclusive (minimum 2).
    pub fn new(battery_bins: usize) -> Self {
        let n = battery_bins.max(2);
        let step = 2.0 / (n - 1) as f64;
        let bins = (0..n).map(|i| -1.0 + step * i as f64).collect();
        Self { bins }
    }

    pub fn len(&self) -> usize {
        self.bins.len() * 2
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    /// Continuous action for a discrete index. Out-of-range indices wrap.
    pub fn action(&self, index: usize) -> Action {
        let index = index % self.len();
        Action::new(self.bins[index / 2], index % 2 == 1)
    }

    /// Index of the nearest bin for `action`.
    pub fn index_of(&self, action: &Action) -> usize {
        let battery = action.battery.clamp(-1.0, 1.0);
        let bin = self
            .bins
            .iter()
            .enumerate()
            .fold((0, f64::INFINITY), |(best, dist), (i, b)| {
                let d = (b - battery).abs();
                if d < dist { (i, d) } else { (best, dist) }
            })
            .0;
        bin * 2 + usize::from(action.diesel_on)
    }
}

/// Persisted form of a [`LearningAgent`]. The replay buffer is not saved.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SavedAgent {
    config: LearningConfig,
    state_dim: usize,
    q_network: Approximator,
    target_network: Approximator,
    epsilon: f64,
    training_steps: u64,
    episode_rewards: Vec<f64>,
}

/// Epsilon-greedy learner with experience replay and a hard-synced target copy.
///
/// All randomness (weight init, exploration, replay sampling) comes from one
/// private generator seeded by `LearningConfig::seed`, so two agents built
/// with the same config behave identically.
#[derive(Debug, Clone)]
pub struct LearningAgent {
    config: LearningConfig,
    state_dim: usize,
    actions: ActionSpace,
    q_network: Approximator,
    target_network: Approximator,
    buffer: ReplayBuffer,
    rng: StdRng,
    epsilon: f64,
    training_steps: u64,
    episode_rewards: Vec<f64>,
    episode_reward: f64,
    training: bool,
}

impl LearningAgent {
    /// Builds an untrained agent for observations of length `state_dim`.
    ///
    /// # Errors
    ///
    /// Returns `MicrogridError::Configuration` on invalid hyper-parameters or
    /// a zero `state_dim`.
    pub fn new(config: LearningConfig, state_dim: usize) -> Result<Self> {
        let mut errors = config.validate();
        if state_dim == 0 {
            errors.push(ConfigError::new("state_dim", "must be > 0"));
        }
        if !errors.is_empty() {
            return Err(MicrogridError::Configuration(errors));
        }

        let actions = ActionSpace::new(config.battery_bins);
        let mut rng = StdRng::seed_from_u64(config.seed);
        let q_network = match config.approximator {
            ApproximatorKind::Linear => {
                Approximator::Linear(LinearModel::new(state_dim, actions.len()))
            }
            ApproximatorKind::Mlp => Approximator::Mlp(Mlp::new(
                state_dim,
                &config.hidden_layers,
                actions.len(),
                &mut rng,
            )),
        };

        Ok(Self {
            state_dim,
            target_network: q_network.clone(),
            q_network,
            buffer: ReplayBuffer::new(config.buffer_capacity),
            rng,
            epsilon: config.epsilon_start,
            training_steps: 0,
            episode_rewards: Vec::new(),
            episode_reward: 0.0,
            training: true,
            actions,
            config,
        })
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    /// Observation length the approximator was built for.
    pub fn state_dim(&self) -> usize {
        self.state_dim
    }

    pub fn action_space(&self) -> &ActionSpace {
        &self.actions
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn training_steps(&self) -> u64 {
        self.training_steps
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Total reward of every finished episode, oldest first.
    pub fn episode_rewards(&self) -> &[f64] {
        &self.episode_rewards
    }

    pub fn is_training(&self) -> bool {
        self.training
    }

    /// Toggles exploration and learning when driven through [`Policy`].
    pub fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    pub fn q_values(&self, state: &[f64]) -> Vec<f64> {
        self.q_network.predict(state)
    }

    /// Epsilon-greedy choice when `training`, greedy otherwise.
    pub fn select_action(&mut self, state: &[f64], training: bool) -> Action {
        let index = self.select_index(state, training);
        self.actions.action(index)
    }

    fn select_index(&mut self, state: &[f64], training: bool) -> usize {
        if training && self.rng.random::<f64>() < self.epsilon {
            return self.rng.random_range(0..self.actions.len());
        }
        argmax(&self.q_network.predict(state))
    }

    /// Stores the transition and, once enough experience is buffered, trains
    /// on one sampled batch.
    ///
    /// Epsilon decays and the step counter advances on every call; the target
    /// copy is synchronized every `target_sync_interval` calls. Returns the
    /// batch loss when a batch was trained.
    pub fn train_step(
        &mut self,
        state: &[f64],
        action: &Action,
        reward: f64,
        next_state: &[f64],
        done: bool,
    ) -> Option<f64> {
        self.buffer.push(Experience {
            state: state.to_vec(),
            action: self.actions.index_of(action),
            reward,
            next_state: next_state.to_vec(),
            done,
        });

        let loss = if self.buffer.len() >= self.config.batch_size {
            let batch: Vec<TrainingExample> = self
                .buffer
                .sample(&mut self.rng, self.config.batch_size)
                .into_iter()
                .map(|e| {
                    let future = if e.done {
                        0.0
                    } else {
                        self.target_network
                            .predict(&e.next_state)
                            .into_iter()
                            .fold(f64::NEG_INFINITY, f64::max)
                    };
                    TrainingExample {
                        state: e.state.clone(),
                        action: e.action,
                        target: e.reward + self.config.gamma * future,
                    }
                })
                .collect();
            Some(
                self.q_network
                    .update(&batch, self.config.learning_rate, self.config.td_clip),
            )
        } else {
            None
        };

        self.training_steps += 1;
        self.epsilon = (self.epsilon * self.config.epsilon_decay).max(self.config.epsilon_min);
        if self.training_steps % self.config.target_sync_interval == 0 {
            self.target_network = self.q_network.clone();
            debug!(training_steps = self.training_steps, "target network synced");
        }
        loss
    }

    /// Records the total reward of a finished episode.
    pub fn end_episode(&mut self, total_reward: f64) {
        self.episode_rewards.push(total_reward);
        self.episode_reward = 0.0;
        info!(
            episode = self.episode_rewards.len(),
            total_reward,
            epsilon = self.epsilon,
            "episode finished"
        );
    }

    /// Serializes parameters, epsilon, step count and episode rewards.
    ///
    /// # Errors
    ///
    /// Returns `MicrogridError::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        let saved = SavedAgent {
            config: self.config.clone(),
            state_dim: self.state_dim,
            q_network: self.q_network.clone(),
            target_network: self.target_network.clone(),
            epsilon: self.epsilon,
            training_steps: self.training_steps,
            episode_rewards: self.episode_rewards.clone(),
        };
        Ok(serde_json::to_string(&saved)?)
    }

    /// Restores an agent written by [`to_json`](Self::to_json).
    ///
    /// The replay buffer starts empty and the generator is reseeded from the
    /// config seed and the restored step count.
    ///
    /// # Errors
    ///
    /// Returns `Json` on malformed input, or `Configuration` if the stored
    /// config or network shapes are inconsistent.
    pub fn from_json(json: &str) -> Result<Self> {
        let saved: SavedAgent = serde_json::from_str(json)?;
        let mut agent = Self::new(saved.config, saved.state_dim)?;
        let probe = vec![0.0; saved.state_dim];
        for net in [&saved.q_network, &saved.target_network] {
            if net.predict(&probe).len() != agent.actions.len() {
                return Err(ConfigError::new(
                    "agent",
                    "stored network does not match the action space",
                )
                .into());
            }
        }
        agent.q_network = saved.q_network;
        agent.target_network = saved.target_network;
        agent.epsilon = saved.epsilon;
        agent.training_steps = saved.training_steps;
        agent.episode_rewards = saved.episode_rewards;
        agent.rng = StdRng::seed_from_u64(agent.config.seed ^ agent.training_steps);
        Ok(agent)
    }

    /// Writes [`to_json`](Self::to_json) output to `path`.
    ///
    /// # Errors
    ///
    /// Returns `Io` or `Json` on failure.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        info!(path = %path.display(), "agent saved");
        Ok(())
    }

    /// Reads an agent saved with [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Returns `Io`, `Json` or `Configuration` on failure.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Index of the first maximum. NaN never wins.
fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best, max), (i, &v)| {
            if v > max { (i, v) } else { (best, max) }
        })
        .0
}

impl Policy for LearningAgent {
    fn select_action(&mut self, core: &MicrogridCore) -> Action {
        let obs = core.get_observation();
        let training = self.training;
        LearningAgent::select_action(self, obs.as_slice(), training)
    }

    // A run cut short by a step limit never reaches `end_episode`.
    fn on_reset(&mut self) {
        self.episode_reward = 0.0;
    }

    fn observe(&mut self, t: &Transition) {
        if self.training {
            self.train_step(
                t.observation.as_slice(),
                &t.action,
                t.reward,
                t.next_observation.as_slice(),
                t.done,
            );
        }
        self.episode_reward += t.reward;
        if t.done {
            self.end_episode(self.episode_reward);
        }
    }

    fn name(&self) -> &str {
        "learning"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_config() -> LearningConfig {
        LearningConfig {
            approximator: ApproximatorKind::Linear,
            batch_size: 4,
            buffer_capacity: 16,
            target_sync_interval: 5,
            ..LearningConfig::default()
        }
    }

    #[test]
    fn action_space_layout() {
        let space = ActionSpace::new(11);
        assert_eq!(space.len(), 22);
        assert_eq!(space.action(0), Action::new(-1.0, false));
        assert_eq!(space.action(1), Action::new(-1.0, true));
        assert_eq!(space.action(21), Action::new(1.0, true));
        assert!((space.action(10).battery).abs() < 1e-12);
        for i in 0..space.len() {
            assert_eq!(space.index_of(&space.action(i)), i);
        }
    }

    #[test]
    fn index_of_snaps_to_nearest_bin() {
        let space = ActionSpace::new(11);
        // 0.27 is nearest to 0.2 (bin 6)
        assert_eq!(space.index_of(&Action::new(0.27, false)), 12);
        assert_eq!(space.index_of(&Action::new(5.0, true)), 21);
    }

    #[test]
    fn rejects_invalid_config() {
        let cfg = LearningConfig {
            batch_size: 0,
            ..LearningConfig::default()
        };
        assert!(matches!(
            LearningAgent::new(cfg, 10),
            Err(MicrogridError::Configuration(_))
        ));
        assert!(LearningAgent::new(LearningConfig::default(), 0).is_err());
    }

    #[test]
    fn epsilon_decays_every_call() {
        let mut agent = LearningAgent::new(linear_config(), 2).unwrap();
        let s = [0.0, 1.0];
        for _ in 0..3 {
            assert!(agent.train_step(&s, &Action::IDLE, 1.0, &s, false).is_none());
        }
        assert_eq!(agent.training_steps(), 3);
        assert!((agent.epsilon() - 0.995_f64.powi(3)).abs() < 1e-12);
        assert!(agent.train_step(&s, &Action::IDLE, 1.0, &s, false).is_some());
    }

    #[test]
    fn epsilon_floor() {
        let cfg = LearningConfig {
            epsilon_decay: 0.5,
            ..linear_config()
        };
        let mut agent = LearningAgent::new(cfg, 1).unwrap();
        for _ in 0..50 {
            agent.train_step(&[0.0], &Action::IDLE, 0.0, &[0.0], true);
        }
        assert_eq!(agent.epsilon(), 0.01);
    }

    #[test]
    fn target_syncs_on_interval() {
        let mut agent = LearningAgent::new(linear_config(), 1).unwrap();
        for _ in 0..4 {
            agent.train_step(&[1.0], &Action::charge(1.0), 1.0, &[1.0], true);
        }
        assert_ne!(agent.q_network, agent.target_network);
        agent.train_step(&[1.0], &Action::charge(1.0), 1.0, &[1.0], true);
        assert_eq!(agent.q_network, agent.target_network);
    }

    #[test]
    fn greedy_selection_is_deterministic() {
        let mut agent = LearningAgent::new(LearningConfig::default(), 10).unwrap();
        let s = [0.3; 10];
        let first = agent.select_action(&s, false);
        for _ in 0..5 {
            assert_eq!(agent.select_action(&s, false), first);
        }
    }

    #[test]
    fn same_seed_same_choices() {
        let mut a = LearningAgent::new(LearningConfig::default(), 10).unwrap();
        let mut b = LearningAgent::new(LearningConfig::default(), 10).unwrap();
        let s = [0.5; 10];
        for _ in 0..20 {
            assert_eq!(a.select_action(&s, true), b.select_action(&s, true));
        }
    }

    #[test]
    fn json_round_trip() {
        let mut agent = LearningAgent::new(linear_config(), 2).unwrap();
        for i in 0..7 {
            agent.train_step(&[0.1, 0.2], &Action::discharge(0.4), i as f64, &[0.2, 0.1], false);
        }
        agent.end_episode(12.5);
        let json = agent.to_json().unwrap();
        let back = LearningAgent::from_json(&json).unwrap();
        assert!((back.epsilon() - agent.epsilon()).abs() < 1e-12);
        assert_eq!(back.training_steps(), 7);
        assert_eq!(back.episode_rewards(), &[12.5]);
        let (q_back, q_orig) = (back.q_values(&[0.1, 0.2]), agent.q_values(&[0.1, 0.2]));
        for (a, b) in q_back.iter().zip(&q_orig) {
            assert!((a - b).abs() < 1e-9);
        }
        assert_eq!(back.buffer_len(), 0);
    }

    #[test]
    fn argmax_prefers_first() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0]), 1);
        assert_eq!(argmax(&[f64::NAN, 0.0]), 1);
        assert_eq!(argmax(&[]), 0);
    }
}
