//! Momentum — percentage change of close over a lookback.
//!
//! momentum[t] = close[t] / close[t-period] - 1
//! Lookback: period.

use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Momentum {
    period: usize,
    name: String,
}

impl Momentum {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Momentum period must be >= 1");
        Self {
            period,
            name: format!("momentum_{period}"),
        }
    }
}

impl Indicator for Momentum {
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
            let prev = candles[i - self.period].close;
            let curr = candles[i].close;
            if prev.is_nan() || curr.is_nan() || prev == 0.0 {
                continue;
            }
            result[i] = curr / prev - 1.0;
        }

        result
    }
}
