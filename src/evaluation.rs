//! Post-hoc metrics, strategy comparison and scoring from recorded history.

use std::fmt;

use serde::Serialize;

use crate::sim::types::Snapshot;

/// Step length assumed when the history has fewer than two snapshots.
pub const DEFAULT_DT_HOURS: f64 = 1.0 / 60.0;
/// kg CO2 per kWh imported from the grid.
pub const GRID_CO2_PER_KWH: f64 = 0.5;
/// kg CO2 per litre of diesel burnt.
pub const DIESEL_CO2_PER_L: f64 = 2.7;
/// SOC outside `[SOC_HEALTH_MIN, SOC_HEALTH_MAX]` counts as a violation.
pub const SOC_HEALTH_MIN: f64 = 0.1;
pub const SOC_HEALTH_MAX: f64 = 0.9;

/// Aggregate indicators of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub steps: usize,
    pub dt_hours: f64,
    /// Renewable energy that reached load (kWh).
    pub total_renewable_energy: f64,
    /// Served load (kWh).
    pub total_consumption: f64,
    /// Requested load (kWh).
    pub total_demand: f64,
    pub total_import: f64,
    pub total_export: f64,
    /// Import cost plus fuel cost.
    pub total_cost: f64,
    pub total_revenue: f64,
    pub net_cost: f64,
    pub renewable_ratio: f64,
    pub grid_dependency: f64,
    pub battery_cycles: f64,
    pub average_soc: f64,
    pub soc_violations: usize,
    pub diesel_runtime_hours: f64,
    pub total_fuel_l: f64,
    pub co2_kg: f64,
    pub curtailed_energy: f64,
    pub unmet_energy: f64,
    pub supply_reliability: f64,
}

/// Computes [`Metrics`] in a single pass over `history`.
///
/// The step length is taken from the first two timestamps; with fewer than
/// two snapshots (or non-increasing timestamps) [`DEFAULT_DT_HOURS`] is used.
pub fn evaluate<'a, I>(history: I) -> Metrics
where
    I: IntoIterator<Item = &'a Snapshot>,
{
    let mut steps = 0_usize;
    let mut first_ts = None;
    let mut dt_hours = None;

    // kW sums, scaled by dt at the end
    let mut renewable_kw = 0.0;
    let mut served_kw = 0.0;
    let mut demand_kw = 0.0;
    let mut import_kw = 0.0;
    let mut export_kw = 0.0;
    let mut import_cost_kw = 0.0;
    let mut revenue_kw = 0.0;
    let mut curtailed_kw = 0.0;
    let mut unmet_kw = 0.0;
    let mut diesel_steps = 0_usize;

    let mut fuel_cost = 0.0;
    let mut fuel_l = 0.0;
    let mut soc_sum = 0.0;
    let mut soc_delta = 0.0;
    let mut prev_soc: Option<f64> = None;
    let mut soc_violations = 0;

    for s in history {
        match (first_ts, dt_hours) {
            (None, _) => first_ts = Some(s.timestamp),
            (Some(t0), None) => {
                let secs = (s.timestamp - t0).num_seconds();
                dt_hours = Some(if secs > 0 {
                    secs as f64 / 3600.0
                } else {
                    DEFAULT_DT_HOURS
                });
            }
            _ => {}
        }
        steps += 1;

        renewable_kw += s.renewable_used_kw;
        served_kw += s.served_load_kw;
        demand_kw += s.load_kw;
        import_kw += s.import_kw();
        export_kw += s.export_kw();
        import_cost_kw += s.import_kw() * s.buy_price;
        revenue_kw += s.export_kw() * s.sell_price;
        curtailed_kw += s.curtailed_kw;
        unmet_kw += s.unmet_load_kw;
        if s.diesel_on {
            diesel_steps += 1;
        }

        fuel_cost += s.fuel_cost;
        fuel_l += s.fuel_l;
        soc_sum += s.soc;
        if let Some(p) = prev_soc {
            soc_delta += (s.soc - p).abs();
        }
        prev_soc = Some(s.soc);
        if !(SOC_HEALTH_MIN..=SOC_HEALTH_MAX).contains(&s.soc) {
            soc_violations += 1;
        }
    }

    if steps == 0 {
        return Metrics {
            dt_hours: DEFAULT_DT_HOURS,
            supply_reliability: 1.0,
            ..Metrics::default()
        };
    }

    let dt = dt_hours.unwrap_or(DEFAULT_DT_HOURS);
    let total_consumption = served_kw * dt;
    let total_demand = demand_kw * dt;
    let total_import = import_kw * dt;
    let total_renewable_energy = renewable_kw * dt;
    let total_cost = import_cost_kw * dt + fuel_cost;
    let total_revenue = revenue_kw * dt;
    let unmet_energy = unmet_kw * dt;

    Metrics {
        steps,
        dt_hours: dt,
        total_renewable_energy,
        total_consumption,
        total_demand,
        total_import,
        total_export: export_kw * dt,
        total_cost,
        total_revenue,
        net_cost: total_cost - total_revenue,
        renewable_ratio: ratio(total_renewable_energy, total_consumption).min(1.0),
        grid_dependency: ratio(total_import, total_consumption),
        battery_cycles: soc_delta / 2.0,
        average_soc: soc_sum / steps as f64,
        soc_violations,
        diesel_runtime_hours: diesel_steps as f64 * dt,
        total_fuel_l: fuel_l,
        co2_kg: total_import * GRID_CO2_PER_KWH + fuel_l * DIESEL_CO2_PER_L,
        curtailed_energy: curtailed_kw * dt,
        unmet_energy,
        supply_reliability: if total_demand > 0.0 {
            1.0 - unmet_energy / total_demand
        } else {
            1.0
        },
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 { num / den } else { 0.0 }
}

/// Overall grade from a [`score`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    NeedsImprovement,
    Pass,
    Fair,
    Good,
    Excellent,
}

impl Rating {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 90.0 => Self::Excellent,
            s if s >= 80.0 => Self::Good,
            s if s >= 70.0 => Self::Fair,
            s if s >= 60.0 => Self::Pass,
            _ => Self::NeedsImprovement,
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Pass => "pass",
            Self::NeedsImprovement => "needs improvement",
        };
        f.write_str(label)
    }
}

/// Weighted score in `[0, 100]`.
///
/// | component          | weight | formula                                  |
/// |--------------------|--------|------------------------------------------|
/// | cost               | 30     | `30 - 20 · net_cost / kWh consumed`      |
/// | renewable share    | 25     | `25 · renewable_ratio`                   |
/// | grid independence  | 15     | `15 · (1 - grid_dependency)`             |
/// | SOC health         | 15     | `15 - 0.5 · soc_violations`              |
/// | emissions          | 15     | `15`, minus `0.1` per kg above 50 kg     |
///
/// Each component is clipped to `[0, weight]`.
pub fn score(m: &Metrics) -> f64 {
    let cost_per_kwh = ratio(m.net_cost, m.total_consumption);
    let cost = (30.0 - 20.0 * cost_per_kwh).clamp(0.0, 30.0);
    let renewable = (25.0 * m.renewable_ratio).clamp(0.0, 25.0);
    let independence = (15.0 * (1.0 - m.grid_dependency)).clamp(0.0, 15.0);
    let soc_health = (15.0 - 0.5 * m.soc_violations as f64).clamp(0.0, 15.0);
    let emissions = if m.co2_kg < 50.0 {
        15.0
    } else {
        (15.0 - 0.1 * (m.co2_kg - 50.0)).max(0.0)
    };
    (cost + renewable + independence + soc_health + emissions).clamp(0.0, 100.0)
}

/// Improvement hints for weak indicators; a single "keep monitoring" line when
/// nothing stands out.
pub fn suggestions(m: &Metrics) -> Vec<&'static str> {
    let mut out = Vec::new();
    if m.renewable_ratio < 0.5 {
        out.push("add renewable capacity to raise the clean energy share");
    }
    if m.grid_dependency > 0.3 {
        out.push("shift storage dispatch to reduce grid imports");
    }
    if m.soc_violations > 10 {
        out.push("keep the battery away from deep discharge and overcharge");
    }
    if m.diesel_runtime_hours > 2.0 {
        out.push("cut diesel runtime to lower fuel cost and emissions");
    }
    if m.battery_cycles > 2.0 {
        out.push("smooth charge/discharge to extend battery life");
    }
    if m.supply_reliability < 1.0 {
        out.push("load was shed: add firm capacity or import headroom");
    }
    if out.is_empty() {
        out.push("strategy performs well; keep monitoring");
    }
    out
}

/// Metrics plus score, rating and hints for one named run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub name: String,
    pub metrics: Metrics,
    pub score: f64,
    pub rating: Rating,
    pub suggestions: Vec<&'static str>,
}

impl Evaluation {
    pub fn new<'a, I>(name: impl Into<String>, history: I) -> Self
    where
        I: IntoIterator<Item = &'a Snapshot>,
    {
        let metrics = evaluate(history);
        let score = score(&metrics);
        Self {
            name: name.into(),
            suggestions: suggestions(&metrics),
            rating: Rating::from_score(score),
            metrics,
            score,
        }
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.metrics;
        writeln!(f, "--- Evaluation: {} ---", self.name)?;
        writeln!(f, "Steps:               {} ({:.3} h each)", m.steps, m.dt_hours)?;
        writeln!(f, "Consumption:         {:.2} kWh", m.total_consumption)?;
        writeln!(f, "Renewable share:     {:.1}%", 100.0 * m.renewable_ratio)?;
        writeln!(f, "Grid import/export:  {:.2} / {:.2} kWh", m.total_import, m.total_export)?;
        writeln!(f, "Grid dependency:     {:.1}%", 100.0 * m.grid_dependency)?;
        writeln!(
            f,
            "Cost / revenue:      {:.2} / {:.2} (net {:.2})",
            m.total_cost, m.total_revenue, m.net_cost
        )?;
        writeln!(
            f,
            "Battery:             {:.2} cycles, avg SOC {:.1}%, {} violations",
            m.battery_cycles,
            100.0 * m.average_soc,
            m.soc_violations
        )?;
        writeln!(
            f,
            "Diesel:              {:.2} h, {:.2} L",
            m.diesel_runtime_hours, m.total_fuel_l
        )?;
        writeln!(f, "CO2:                 {:.2} kg", m.co2_kg)?;
        writeln!(
            f,
            "Curtailed / unmet:   {:.2} / {:.2} kWh",
            m.curtailed_energy, m.unmet_energy
        )?;
        writeln!(f, "Supply reliability:  {:.2}%", 100.0 * m.supply_reliability)?;
        writeln!(f, "Score:               {:.1} ({})", self.score, self.rating)?;
        write!(f, "Suggestions:")?;
        for s in &self.suggestions {
            write!(f, "\n  - {s}")?;
        }
        Ok(())
    }
}

/// Metric used for ranking, with its preferred direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankedMetric {
    NetCost,
    RenewableRatio,
    GridDependency,
    Co2,
    SupplyReliability,
    BatteryCycles,
    Score,
}

impl RankedMetric {
    pub const ALL: [Self; 7] = [
        Self::NetCost,
        Self::RenewableRatio,
        Self::GridDependency,
        Self::Co2,
        Self::SupplyReliability,
        Self::BatteryCycles,
        Self::Score,
    ];

    fn value(self, e: &Evaluation) -> f64 {
        let m = &e.metrics;
        match self {
            Self::NetCost => m.net_cost,
            Self::RenewableRatio => m.renewable_ratio,
            Self::GridDependency => m.grid_dependency,
            Self::Co2 => m.co2_kg,
            Self::SupplyReliability => m.supply_reliability,
            Self::BatteryCycles => m.battery_cycles,
            Self::Score => e.score,
        }
    }

    fn higher_is_better(self) -> bool {
        matches!(
            self,
            Self::RenewableRatio | Self::SupplyReliability | Self::Score
        )
    }
}

impl fmt::Display for RankedMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NetCost => "net cost",
            Self::RenewableRatio => "renewable ratio",
            Self::GridDependency => "grid dependency",
            Self::Co2 => "co2",
            Self::SupplyReliability => "supply reliability",
            Self::BatteryCycles => "battery cycles",
            Self::Score => "score",
        };
        f.write_str(label)
    }
}

/// Per-metric ranks; `ranks[i]` belongs to `entries[i]`, 1 = best.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    pub metric: RankedMetric,
    pub ranks: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub entries: Vec<Evaluation>,
    pub rankings: Vec<Ranking>,
}

impl Comparison {
    /// Name of the entry ranked first on `metric`.
    pub fn best(&self, metric: RankedMetric) -> Option<&str> {
        let ranking = self.rankings.iter().find(|r| r.metric == metric)?;
        let idx = ranking.ranks.iter().position(|&r| r == 1)?;
        self.entries.get(idx).map(|e| e.name.as_str())
    }
}

/// Evaluates every named history and ranks them on each [`RankedMetric`].
///
/// Ties keep input order.
pub fn compare<'a, S, H>(runs: &'a [(S, H)]) -> Comparison
where
    S: AsRef<str>,
    &'a H: IntoIterator<Item = &'a Snapshot>,
{
    let entries: Vec<Evaluation> = runs
        .iter()
        .map(|(name, history)| Evaluation::new(name.as_ref(), history))
        .collect();

    let rankings = RankedMetric::ALL
        .iter()
        .map(|&metric| {
            let mut order: Vec<usize> = (0..entries.len()).collect();
            // stable sort keeps input order on ties
            order.sort_by(|&a, &b| {
                let (va, vb) = (metric.value(&entries[a]), metric.value(&entries[b]));
                if metric.higher_is_better() {
                    vb.total_cmp(&va)
                } else {
                    va.total_cmp(&vb)
                }
            });
            let mut ranks = vec![0; entries.len()];
            for (pos, idx) in order.into_iter().enumerate() {
                ranks[idx] = pos + 1;
            }
            Ranking { metric, ranks }
        })
        .collect();

    Comparison { entries, rankings }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Strategy Comparison ---")?;
        write!(f, "{:<20}", "metric")?;
        for e in &self.entries {
            write!(f, "{:>14}", e.name)?;
        }
        for r in &self.rankings {
            write!(f, "\n{:<20}", r.metric.to_string())?;
            for (e, rank) in self.entries.iter().zip(&r.ranks) {
                let cell = format!("{:.3} (#{rank})", r.metric.value(e));
                write!(f, "{cell:>14}")?;
            }
        }
        Ok(())
    }
}
