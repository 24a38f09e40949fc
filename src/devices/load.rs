use rand::{SeedableRng, rngs::StdRng};

use crate::config::LoadSpec;
use crate::environment::bounded_noise;

/// Site demand following a normalized 24-hour profile.
///
/// `Load` scales the profile between `base_kw` and `peak_kw` and applies a
/// bounded multiplicative noise term drawn from its own seeded stream.
///
/// # Examples
///
/// ```
/// use microgrid_twin::config::LoadSpec;
/// use microgrid_twin::devices::Load;
///
/// let mut load = Load::new(&LoadSpec::default(), 42);
///
/// // Noise-free demand at 08:00 (profile value 1.0)
/// assert_eq!(load.nominal_kw(8), 150.0);
///
/// // Sampled demand stays non-negative
/// assert!(load.demand_kw(8) >= 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct Load {
    /// Demand at profile value 0, in kilowatts
    pub base_kw: f64,

    /// Demand at profile value 1, in kilowatts
    pub peak_kw: f64,

    /// Hourly shape, one entry per hour of day
    profile: Vec<f64>,

    /// Standard deviation of the multiplicative noise
    pub noise_ratio: f64,

    seed: u64,

    /// Random number generator for noise generation
    rng: StdRng,
}

impl Load {
    /// Creates a new demand model.
    ///
    /// # Arguments
    ///
    /// * `spec` - Static demand parameters
    /// * `seed` - Random seed for reproducible noise generation
    pub fn new(spec: &LoadSpec, seed: u64) -> Self {
        Self {
            base_kw: spec.base_kw.max(0.0),
            peak_kw: spec.peak_kw.max(spec.base_kw),
            profile: spec.profile.clone(),
            noise_ratio: spec.noise_ratio.max(0.0),
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Rewinds the noise stream.
    pub fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
    }

    /// Profile value for `hour`; hours wrap modulo the profile length.
    fn shape(&self, hour: usize) -> f64 {
        if self.profile.is_empty() {
            return 1.0;
        }
        self.profile[hour % self.profile.len()]
    }

    /// Noise-free demand at `hour` of day.
    pub fn nominal_kw(&self, hour: usize) -> f64 {
        self.base_kw + (self.peak_kw - self.base_kw) * self.shape(hour)
    }

    /// Samples demand at `hour` of day.
    ///
    /// The demand is guaranteed to be non-negative.
    pub fn demand_kw(&mut self, hour: usize) -> f64 {
        let noise = bounded_noise(&mut self.rng, self.noise_ratio);
        (self.nominal_kw(hour) * (1.0 + noise)).max(0.0)
    }
}
