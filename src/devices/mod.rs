//! Component models converting conditions and commands into power.

/// Stationary battery storage model.
pub mod battery;
/// Backup diesel generator.
pub mod diesel;
/// Utility interconnect.
pub mod grid;
/// Profile-driven site demand.
pub mod load;
/// Photovoltaic generation model.
pub mod solar;
pub mod types;
/// Wind turbine power curve.
pub mod wind;

// Re-export the main types for convenience
pub use battery::BatteryStorage;
pub use diesel::DieselGenerator;
pub use grid::GridConnection;
pub use load::Load;
pub use solar::SolarArray;
pub use types::Generator;
pub use wind::WindTurbine;
