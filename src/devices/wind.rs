use crate::config::WindSpec;
use crate::devices::types::Generator;
use crate::environment::EnvironmentSample;

/// A wind turbine with a piecewise power curve.
///
/// - below cut-in or above cut-out: 0
/// - cut-in to rated: cubic ramp `capacity · ((v - cut_in) / (rated - cut_in))³`
/// - rated to cut-out: flat `capacity`
#[derive(Debug, Clone)]
pub struct WindTurbine {
    pub capacity_kw: f64,
    pub cut_in_speed: f64,
    pub rated_speed: f64,
    pub cut_out_speed: f64,
}

impl WindTurbine {
    pub fn new(spec: &WindSpec) -> Self {
        Self {
            capacity_kw: spec.capacity_kw.max(0.0),
            cut_in_speed: spec.cut_in_speed,
            rated_speed: spec.rated_speed,
            cut_out_speed: spec.cut_out_speed,
        }
    }

    /// Evaluates the power curve at `wind_speed` (m/s).
    pub fn power_at(&self, wind_speed: f64) -> f64 {
        if wind_speed < self.cut_in_speed || wind_speed > self.cut_out_speed {
            0.0
        } else if wind_speed < self.rated_speed {
            let x = (wind_speed - self.cut_in_speed) / (self.rated_speed - self.cut_in_speed);
            self.capacity_kw * x.powi(3)
        } else {
            self.capacity_kw
        }
    }
}

impl Generator for WindTurbine {
    fn output_kw(&self, env: &EnvironmentSample) -> f64 {
        self.power_at(env.wind_speed).clamp(0.0, self.capacity_kw)
    }

    fn capacity_kw(&self) -> f64 {
        self.capacity_kw
    }

    fn device_type(&self) -> &'static str {
        "WindTurbine"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turbine() -> WindTurbine {
        WindTurbine::new(&WindSpec::default())
    }

    #[test]
    fn test_below_cut_in() {
        assert_eq!(turbine().power_at(0.0), 0.0);
        assert_eq!(turbine().power_at(2.99), 0.0);
    }

    #[test]
    fn test_cubic_ramp() {
        // halfway between 3 and 12 m/s → 50 · 0.5³
        let kw = turbine().power_at(7.5);
        assert!((kw - 6.25).abs() < 1e-9);
    }

    #[test]
    fn test_flat_between_rated_and_cut_out() {
        assert_eq!(turbine().power_at(12.0), 50.0);
        assert_eq!(turbine().power_at(20.0), 50.0);
        assert_eq!(turbine().power_at(25.0), 50.0);
    }

    #[test]
    fn test_shutdown_above_cut_out() {
        assert_eq!(turbine().power_at(25.01), 0.0);
    }

    #[test]
    fn test_curve_is_monotone_up_to_rated() {
        let t = turbine();
        let mut prev = 0.0;
        for i in 0..=120 {
            let kw = t.power_at(f64::from(i) * 0.1);
            assert!(kw >= prev);
            prev = kw;
        }
    }
}
