//! Microgrid digital twin: environment, component models, a step-wise
//! simulation core, rule and learning controllers, and post-hoc evaluation.

pub mod config;
pub mod devices;
pub mod environment;
pub mod error;
pub mod evaluation;
pub mod io;
pub mod monitor;
/// Decision policies: rule table, value learner and their hybrid.
pub mod policy;
pub mod runner;
/// Simulation clock, power balance, history and the core state machine.
pub mod sim;
pub mod telemetry;
