//! Mode switch and confidence-weighted blend of the rule and learning agents.

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::sim::engine::MicrogridCore;
use crate::sim::types::Action;

use super::learning::LearningAgent;
use super::rule::{RuleBasedAgent, RuleInput};
use super::{Policy, Transition};

const CONFIDENCE_START: f64 = 0.5;
const CONFIDENCE_STEP: f64 = 0.01;
const CONFIDENCE_MIN: f64 = 0.3;
const CONFIDENCE_MAX: f64 = 0.95;
/// Rewards kept for status reporting.
const REWARD_WINDOW: usize = 100;
/// Rewards averaged for each confidence update.
const RECENT_REWARDS: usize = 50;

/// Which agent drives the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    Rule,
    Learning,
    Hybrid,
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rule => write!(f, "rule"),
            Self::Learning => write!(f, "learning"),
            Self::Hybrid => write!(f, "hybrid"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManagerStatus {
    pub mode: ControlMode,
    pub rl_confidence: f64,
    pub epsilon: f64,
    pub training_steps: u64,
    pub buffer_size: usize,
    /// Mean of the retained reward window, 0 when empty.
    pub recent_performance: f64,
}

/// Runs either agent alone, or blends their battery commands by `rl_confidence`.
///
/// In hybrid mode the diesel request is the OR of both agents. Every observed
/// transition trains the learning agent and nudges the confidence up when the
/// mean of the last 50 rewards is positive, down otherwise.
#[derive(Debug, Clone)]
pub struct AdaptiveManager {
    mode: ControlMode,
    rule: RuleBasedAgent,
    learner: LearningAgent,
    rl_confidence: f64,
    rewards: VecDeque<f64>,
}

impl AdaptiveManager {
    pub fn new(mode: ControlMode, rule: RuleBasedAgent, learner: LearningAgent) -> Self {
        Self {
            mode,
            rule,
            learner,
            rl_confidence: CONFIDENCE_START,
            rewards: VecDeque::with_capacity(REWARD_WINDOW),
        }
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ControlMode) {
        self.mode = mode;
    }

    pub fn rl_confidence(&self) -> f64 {
        self.rl_confidence
    }

    pub fn learner(&self) -> &LearningAgent {
        &self.learner
    }

    pub fn learner_mut(&mut self) -> &mut LearningAgent {
        &mut self.learner
    }

    pub fn into_learner(self) -> LearningAgent {
        self.learner
    }

    /// Linear blend of the two battery commands; diesel if either asks.
    pub fn blend(&self, learned: Action, rule: Action) -> Action {
        let c = self.rl_confidence;
        Action::new(
            c * learned.battery + (1.0 - c) * rule.battery,
            learned.diesel_on || rule.diesel_on,
        )
    }

    /// Records `reward` and adjusts confidence once enough rewards are seen.
    pub fn update_confidence(&mut self, reward: f64) {
        if self.rewards.len() == REWARD_WINDOW {
            self.rewards.pop_front();
        }
        self.rewards.push_back(reward);

        if self.rewards.len() >= RECENT_REWARDS {
            let recent: f64 =
                self.rewards.iter().rev().take(RECENT_REWARDS).sum::<f64>() / RECENT_REWARDS as f64;
            self.rl_confidence = if recent > 0.0 {
                (self.rl_confidence + CONFIDENCE_STEP).min(CONFIDENCE_MAX)
            } else {
                (self.rl_confidence - CONFIDENCE_STEP).max(CONFIDENCE_MIN)
            };
        }
    }

    pub fn status(&self) -> ManagerStatus {
        let recent_performance = if self.rewards.is_empty() {
            0.0
        } else {
            self.rewards.iter().sum::<f64>() / self.rewards.len() as f64
        };
        ManagerStatus {
            mode: self.mode,
            rl_confidence: self.rl_confidence,
            epsilon: self.learner.epsilon(),
            training_steps: self.learner.training_steps(),
            buffer_size: self.learner.buffer_len(),
            recent_performance,
        }
    }
}

impl Policy for AdaptiveManager {
    fn select_action(&mut self, core: &MicrogridCore) -> Action {
        match self.mode {
            ControlMode::Rule => self.rule.decide(&RuleInput::from_core(core)),
            ControlMode::Learning => Policy::select_action(&mut self.learner, core),
            ControlMode::Hybrid => {
                let learned = Policy::select_action(&mut self.learner, core);
                let rule = self.rule.decide(&RuleInput::from_core(core));
                let action = self.blend(learned, rule);
                debug!(%learned, %rule, %action, confidence = self.rl_confidence, "hybrid blend");
                action
            }
        }
    }

    fn on_reset(&mut self) {
        self.learner.on_reset();
    }

    fn observe(&mut self, transition: &Transition) {
        self.learner.observe(transition);
        self.update_confidence(transition.reward);
    }

    fn name(&self) -> &str {
        "hybrid"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApproximatorKind, LearningConfig};

    fn manager(mode: ControlMode) -> AdaptiveManager {
        let cfg = LearningConfig {
            approximator: ApproximatorKind::Linear,
            ..LearningConfig::default()
        };
        let learner = LearningAgent::new(cfg, 10).unwrap();
        AdaptiveManager::new(mode, RuleBasedAgent::default(), learner)
    }

    #[test]
    fn blend_weights_by_confidence() {
        let m = manager(ControlMode::Hybrid);
        let a = m.blend(Action::new(1.0, false), Action::new(-0.5, true));
        assert!((a.battery - 0.25).abs() < 1e-12);
        assert!(a.diesel_on);
    }

    #[test]
    fn confidence_waits_for_fifty_rewards() {
        let mut m = manager(ControlMode::Hybrid);
        for _ in 0..49 {
            m.update_confidence(1.0);
        }
        assert_eq!(m.rl_confidence(), 0.5);
        m.update_confidence(1.0);
        assert!((m.rl_confidence() - 0.51).abs() < 1e-12);
    }

    #[test]
    fn confidence_is_bounded() {
        let mut m = manager(ControlMode::Hybrid);
        for _ in 0..500 {
            m.update_confidence(1.0);
        }
        assert!((m.rl_confidence() - 0.95).abs() < 1e-12);
        for _ in 0..500 {
            m.update_confidence(-1.0);
        }
        assert!((m.rl_confidence() - 0.3).abs() < 1e-12);
        assert_eq!(m.status().recent_performance, -1.0);
    }

    #[test]
    fn status_reports_learner() {
        let m = manager(ControlMode::Rule);
        let s = m.status();
        assert_eq!(s.mode, ControlMode::Rule);
        assert_eq!(s.epsilon, 1.0);
        assert_eq!(s.buffer_size, 0);
        assert_eq!(s.recent_performance, 0.0);
    }
}
