//! Scalar reward shaping for learning policies.

use crate::config::RewardConfig;

/// Quantities the reward is computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardInput {
    /// Cost of the step (currency, negative when exporting).
    pub cost: f64,
    /// Instantaneous renewable share of served load.
    pub renewable_ratio: f64,
    /// SOC after the step.
    pub soc: f64,
    /// Signed grid exchange (kW).
    pub grid_kw: f64,
    pub diesel_on: bool,
}

/// Computes the shaped reward.
///
/// ```text
/// reward = -cost_weight · cost
///        + renewable_weight · renewable_ratio
///        + soc_term
///        - grid_weight · |grid_kw|
///        - diesel_penalty · diesel_on
/// ```
///
/// `soc_term` is `+soc_band_bonus` inside `soc_band` (inclusive),
/// `-soc_penalty` below `soc_critical_low` or above `soc_critical_high`,
/// and 0 otherwise.
pub fn shaped_reward(weights: &RewardConfig, input: &RewardInput) -> f64 {
    let [band_lo, band_hi] = weights.soc_band;
    let soc_term = if (band_lo..=band_hi).contains(&input.soc) {
        weights.soc_band_bonus
    } else if input.soc < weights.soc_critical_low || input.soc > weights.soc_critical_high {
        -weights.soc_penalty
    } else {
        0.0
    };
    let diesel = if input.diesel_on { 1.0 } else { 0.0 };

    -weights.cost_weight * input.cost + weights.renewable_weight * input.renewable_ratio + soc_term
        - weights.grid_weight * input.grid_kw.abs()
        - weights.diesel_penalty * diesel
}
