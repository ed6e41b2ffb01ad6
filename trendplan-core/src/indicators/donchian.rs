//! Prior Donchian channel — highest high / lowest low of the `period`
//! candles *before* the current one.
//!
//! - Upper: max(high[t-period..t])
//! - Lower: min(low[t-period..t])
//!
//! The current candle is excluded so a close can be compared against the
//! structure it is breaking. Lookback: period.

use super::Indicator;
use crate::domain::Candle;

/// Which band of the channel to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonchianBand {
    Upper,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Donchian {
    period: usize,
    band: DonchianBand,
    name: String,
}

impl Donchian {
    pub fn upper(period: usize) -> Self {
        assert!(period >= 1, "Donchian period must be >= 1");
        Self {
            period,
            band: DonchianBand::Upper,
            name: format!("prior_high_{period}"),
        }
    }

    pub fn lower(period: usize) -> Self {
        assert!(period >= 1, "Donchian period must be >= 1");
        Self {
            period,
            band: DonchianBand::Lower,
            name: format!("prior_low_{period}"),
        }
    }
}

impl Indicator for Donchian {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let n = candles.len();
        let mut result = vec![f64::NAN; n];

        for i in self.period..n {
            let window = &candles[i - self.period..i];
            result[i] = match self.band {
                DonchianBand::Upper => window
                    .iter()
                    .map(|c| c.high)
                    .fold(f64::NEG_INFINITY, f64::max),
                DonchianBand::Lower => window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min),
            };
        }

        result
    }
}
