use std::fmt;

use chrono::{NaiveDateTime, Timelike};
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use super::bounded_noise;
use crate::config::TariffConfig;

/// Time-of-use tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricePeriod {
    Valley,
    Normal,
    Peak,
}

impl fmt::Display for PricePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Valley => "valley",
            Self::Normal => "normal",
            Self::Peak => "peak",
        };
        f.write_str(s)
    }
}

/// Import and export prices in effect for one step (currency per kWh).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSignal {
    pub buy_price: f64,
    pub sell_price: f64,
    pub period: PricePeriod,
}

/// Time-of-use tariff with optional bounded price noise.
#[derive(Debug, Clone)]
pub struct TariffModel {
    config: TariffConfig,
    seed: u64,
    rng: StdRng,
}

impl TariffModel {
    pub fn new(config: TariffConfig, seed: u64) -> Self {
        Self {
            config,
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Rewinds the noise stream.
    pub fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
    }

    /// Classifies an hour of day. Valley windows take precedence over peak windows.
    pub fn period(&self, hour: u32) -> PricePeriod {
        if self.config.valley_hours.iter().any(|w| w.contains(hour)) {
            PricePeriod::Valley
        } else if self.config.peak_hours.iter().any(|w| w.contains(hour)) {
            PricePeriod::Peak
        } else {
            PricePeriod::Normal
        }
    }

    /// Quotes the buy and sell prices at `timestamp`.
    ///
    /// The buy price never drops below `price_floor`; the sell price is a
    /// fixed fraction of the buy price.
    pub fn price(&mut self, timestamp: NaiveDateTime) -> PriceSignal {
        let period = self.period(timestamp.hour());
        let base = match period {
            PricePeriod::Valley => self.config.valley_price,
            PricePeriod::Normal => self.config.normal_price,
            PricePeriod::Peak => self.config.peak_price,
        };
        let buy_price =
            (base + bounded_noise(&mut self.rng, self.config.noise_std)).max(self.config.price_floor);
        debug_assert!(buy_price >= self.config.price_floor);

        PriceSignal {
            buy_price,
            sell_price: buy_price * self.config.sell_ratio,
            period,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .and_then(|d| d.and_hms_opt(hour, 30, 0))
            .unwrap()
    }

    #[test]
    fn default_tiers() {
        let mut tariff = TariffModel::new(TariffConfig::default(), 0);
        let expected = [
            (0, PricePeriod::Valley, 0.4),
            (6, PricePeriod::Valley, 0.4),
            (7, PricePeriod::Normal, 0.8),
            (9, PricePeriod::Peak, 1.2),
            (11, PricePeriod::Peak, 1.2),
            (12, PricePeriod::Normal, 0.8),
            (17, PricePeriod::Peak, 1.2),
            (20, PricePeriod::Peak, 1.2),
            (21, PricePeriod::Normal, 0.8),
            (23, PricePeriod::Valley, 0.4),
        ];
        for (hour, period, price) in expected {
            let p = tariff.price(at(hour));
            assert_eq!(p.period, period, "hour {hour}");
            assert!((p.buy_price - price).abs() < 1e-12, "hour {hour}");
            assert!((p.sell_price - price * 0.7).abs() < 1e-12, "hour {hour}");
        }
    }

    #[test]
    fn noisy_price_respects_floor() {
        let config = TariffConfig {
            noise_std: 0.5,
            ..TariffConfig::default()
        };
        let mut tariff = TariffModel::new(config, 11);
        for _ in 0..1000 {
            let p = tariff.price(at(2));
            assert!(p.buy_price >= 0.3);
            assert!(p.sell_price <= p.buy_price);
        }
    }

    #[test]
    fn period_display() {
        assert_eq!(PricePeriod::Peak.to_string(), "peak");
        assert_eq!(PricePeriod::Valley.to_string(), "valley");
    }
}
