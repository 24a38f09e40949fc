//! Common types and traits for component models.

use crate::environment::EnvironmentSample;

/// A weather-driven source whose output is a pure function of conditions.
///
/// Implemented by the renewable sources so the simulation core can treat them
/// uniformly when computing generation and observation features.
pub trait Generator {
    /// Returns the power output in kW for the given conditions.
    ///
    /// Output is always within `[0, capacity_kw()]`.
    fn output_kw(&self, env: &EnvironmentSample) -> f64;

    /// Nameplate output ceiling in kW.
    fn capacity_kw(&self) -> f64;

    /// Returns a human-readable type name for the device.
    fn device_type(&self) -> &'static str;

    /// Output as a fraction of capacity. Zero-capacity devices report 0.
    fn capacity_factor(&self, output_kw: f64) -> f64 {
        let cap = self.capacity_kw();
        if cap > 0.0 { output_kw / cap } else { 0.0 }
    }
}
