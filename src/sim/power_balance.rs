//! Bus power balance and grid settlement.

use crate::devices::GridConnection;

use super::types::Snapshot;

/// Relative tolerance for the per-step energy balance.
pub const BALANCE_TOLERANCE: f64 = 1e-6;

/// Net local surplus on the bus in kW.
///
/// Positive means local supply exceeds local demand.
///
/// # Arguments
///
/// * `generation_kw` - Solar + wind + diesel output
/// * `discharge_kw` - Battery discharge (positive magnitude)
/// * `load_kw` - Site demand
/// * `charge_kw` - Battery charge (positive magnitude)
pub fn net_surplus_kw(generation_kw: f64, discharge_kw: f64, load_kw: f64, charge_kw: f64) -> f64 {
    generation_kw + discharge_kw - load_kw - charge_kw
}

/// How a step's surplus or deficit was resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settlement {
    /// Grid exchange, positive = import.
    pub grid_kw: f64,
    /// Deficit left after the grid (load shed).
    pub unmet_kw: f64,
    /// Surplus left after the grid (generation dumped).
    pub curtailed_kw: f64,
}

/// Routes the residual `-net_kw` through the grid connection.
///
/// Whatever the connection cannot absorb becomes unmet load (deficit) or
/// curtailment (surplus), so the bus always balances.
pub fn settle(net_kw: f64, grid: &GridConnection) -> Settlement {
    let requested = -net_kw;
    let grid_kw = grid.exchange(requested);
    let residual = requested - grid_kw;
    Settlement {
        grid_kw,
        unmet_kw: residual.max(0.0),
        curtailed_kw: (-residual).max(0.0),
    }
}

/// Supply minus demand for a recorded step, in kW.
///
/// Supply is `solar + wind + diesel - curtailed + discharge + import`; demand is
/// `served_load + charge + export`. Zero for every step the core produces.
pub fn balance_residual_kw(s: &Snapshot) -> f64 {
    let supply = s.generation_kw() - s.curtailed_kw + s.discharge_kw() + s.import_kw();
    let demand = s.served_load_kw + s.charge_kw() + s.export_kw();
    supply - demand
}

/// Returns `true` if the step balances within [`BALANCE_TOLERANCE`], relative
/// to the larger of 1 kW and the total supply.
pub fn is_balanced(s: &Snapshot) -> bool {
    let scale = (s.generation_kw() + s.discharge_kw() + s.import_kw()).max(1.0);
    balance_residual_kw(s).abs() <= BALANCE_TOLERANCE * scale
}
