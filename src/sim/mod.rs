/// Simulation clock for timestep management.
pub mod clock;
pub mod engine;
pub mod history;
pub mod power_balance;
pub mod reward;
pub mod state;
pub mod types;
