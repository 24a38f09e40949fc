//! Synthetic weather and time-of-use market signals.
//!
//! Both generators are deterministic base curves (diurnal and seasonal sines,
//! tariff tiers) plus bounded perturbations drawn from a private seeded PRNG,
//! so a fixed seed reproduces the same sequence.

pub mod tariff;
pub mod weather;

pub use tariff::{PricePeriod, PriceSignal, TariffModel};
pub use weather::{EnvironmentSample, WeatherModel};

use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

/// Gaussian perturbations are truncated at this many standard deviations.
pub const NOISE_SIGMA_BOUND: f64 = 3.0;

/// Draws zero-mean Gaussian noise truncated to `±3σ`.
///
/// Returns 0.0 without consuming randomness when `std_dev` is not positive.
pub fn bounded_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 || !std_dev.is_finite() {
        return 0.0;
    }
    match Normal::new(0.0, std_dev) {
        Ok(normal) => {
            let bound = NOISE_SIGMA_BOUND * std_dev;
            normal.sample(rng).clamp(-bound, bound)
        }
        Err(_) => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn noise_is_bounded() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..10_000 {
            let n = bounded_noise(&mut rng, 2.0);
            assert!(n.abs() <= 6.0);
        }
    }

    #[test]
    fn zero_std_is_silent() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(bounded_noise(&mut rng, 0.0), 0.0);
        assert_eq!(bounded_noise(&mut rng, f64::NAN), 0.0);
    }
}
