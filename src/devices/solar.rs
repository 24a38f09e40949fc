use crate::config::SolarSpec;
use crate::devices::types::Generator;
use crate::environment::EnvironmentSample;

/// Temperature derate is clipped to this range.
pub const DERATE_BOUNDS: (f64, f64) = (0.7, 1.1);

/// Reference cell temperature for the derate (°C).
const REFERENCE_TEMPERATURE_C: f64 = 25.0;

/// A photovoltaic array whose output follows irradiance and temperature.
///
/// `SolarArray` is stateless: output is recomputed from each
/// [`EnvironmentSample`] as
/// `clip(0, capacity, irradiance/1000 · area · efficiency · derate(T))`.
#[derive(Debug, Clone)]
pub struct SolarArray {
    /// Inverter-limited output ceiling in kilowatts.
    pub capacity_kw: f64,

    /// Panel conversion efficiency.
    pub efficiency: f64,

    /// Panel area in square metres.
    pub area_m2: f64,

    /// Fractional output change per °C above 25 °C.
    pub temperature_coefficient: f64,
}

impl SolarArray {
    /// Creates an array from its static spec.
    ///
    /// Negative capacity or area are clamped to zero.
    pub fn new(spec: &SolarSpec) -> Self {
        Self {
            capacity_kw: spec.capacity_kw.max(0.0),
            efficiency: spec.efficiency,
            area_m2: spec.area_m2.max(0.0),
            temperature_coefficient: spec.temperature_coefficient,
        }
    }

    /// Linear temperature derate, clipped to [`DERATE_BOUNDS`].
    pub fn temperature_derate(&self, ambient_temperature: f64) -> f64 {
        let (lo, hi) = DERATE_BOUNDS;
        (1.0 + self.temperature_coefficient * (ambient_temperature - REFERENCE_TEMPERATURE_C))
            .clamp(lo, hi)
    }
}

impl Generator for SolarArray {
    fn output_kw(&self, env: &EnvironmentSample) -> f64 {
        let raw = (env.irradiance / 1000.0)
            * self.area_m2
            * self.efficiency
            * self.temperature_derate(env.ambient_temperature);
        raw.clamp(0.0, self.capacity_kw)
    }

    fn capacity_kw(&self) -> f64 {
        self.capacity_kw
    }

    fn device_type(&self) -> &'static str {
        "SolarArray"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(irradiance: f64, temp: f64) -> EnvironmentSample {
        EnvironmentSample {
            irradiance,
            ambient_temperature: temp,
            wind_speed: 0.0,
            cloud_cover: 0.0,
            humidity: 50.0,
        }
    }

    #[test]
    fn test_new_solar_array() {
        let pv = SolarArray::new(&SolarSpec::default());
        assert_eq!(pv.capacity_kw, 100.0);
        assert_eq!(pv.efficiency, 0.18);
        assert_eq!(pv.area_m2, 500.0);
    }

    #[test]
    fn test_negative_capacity_clamped_to_zero() {
        let spec = SolarSpec {
            capacity_kw: -5.0,
            ..SolarSpec::default()
        };
        let pv = SolarArray::new(&spec);
        assert_eq!(pv.capacity_kw, 0.0);
        assert_eq!(pv.output_kw(&env(1000.0, 25.0)), 0.0);
    }

    #[test]
    fn test_no_generation_in_the_dark() {
        let pv = SolarArray::new(&SolarSpec::default());
        assert_eq!(pv.output_kw(&env(0.0, 15.0)), 0.0);
    }

    #[test]
    fn test_reference_conditions() {
        // 1000 W/m² at 25 °C: 500 m² · 0.18 = 90 kW
        let pv = SolarArray::new(&SolarSpec::default());
        assert!((pv.output_kw(&env(1000.0, 25.0)) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_hot_panels_derate() {
        // 50 °C → 1 - 0.004·25 = 0.9
        let pv = SolarArray::new(&SolarSpec::default());
        assert!((pv.temperature_derate(50.0) - 0.9).abs() < 1e-12);
        assert!((pv.output_kw(&env(1000.0, 50.0)) - 81.0).abs() < 1e-9);
    }

    #[test]
    fn test_derate_is_clipped() {
        let pv = SolarArray::new(&SolarSpec::default());
        assert_eq!(pv.temperature_derate(200.0), 0.7);
        assert_eq!(pv.temperature_derate(-200.0), 1.1);
    }

    #[test]
    fn test_output_capped_at_capacity() {
        let spec = SolarSpec {
            capacity_kw: 50.0,
            ..SolarSpec::default()
        };
        let pv = SolarArray::new(&spec);
        assert_eq!(pv.output_kw(&env(1000.0, 25.0)), 50.0);
        assert!((pv.capacity_factor(50.0) - 1.0).abs() < 1e-12);
    }
}
