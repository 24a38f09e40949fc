//! Decision policies that choose a battery/diesel action each step.
//!
//! A policy reads the core through a shared reference and returns an
//! [`Action`]; it never mutates the core. Learning policies receive the
//! resulting [`Transition`] through [`Policy::observe`].

pub mod hybrid;
pub mod learning;
pub mod rule;

pub use hybrid::{AdaptiveManager, ControlMode};
pub use learning::LearningAgent;
pub use rule::{RuleBasedAgent, RuleInput};

use crate::sim::engine::MicrogridCore;
use crate::sim::types::{Action, Observation};

/// One step of experience as seen by a policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub observation: Observation,
    pub action: Action,
    pub reward: f64,
    pub next_observation: Observation,
    pub done: bool,
}

/// Common interface for control strategies.
pub trait Policy {
    /// Chooses the action for the conditions the core will step next.
    fn select_action(&mut self, core: &MicrogridCore) -> Action;

    /// Called after the core resets, before the first action of an episode.
    fn on_reset(&mut self) {}

    /// Feeds back the outcome of the last action. No-op by default.
    fn observe(&mut self, _transition: &Transition) {}

    /// Short label used in logs and reports.
    fn name(&self) -> &str;
}

/// Never touches the battery or the diesel unit; the grid absorbs everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdlePolicy;

impl Policy for IdlePolicy {
    fn select_action(&mut self, _core: &MicrogridCore) -> Action {
        Action::IDLE
    }

    fn name(&self) -> &str {
        "idle"
    }
}

impl<P: Policy + ?Sized> Policy for Box<P> {
    fn select_action(&mut self, core: &MicrogridCore) -> Action {
        (**self).select_action(core)
    }

    fn on_reset(&mut self) {
        (**self).on_reset();
    }

    fn observe(&mut self, transition: &Transition) {
        (**self).observe(transition);
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
