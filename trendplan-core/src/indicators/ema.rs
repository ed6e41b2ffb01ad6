//! Exponential Moving Average (EMA), span-parameterized and bias-adjusted.
//!
//! alpha = 2 / (span + 1). Each value is the weighted mean of all closes so
//! far with weights (1 - alpha)^k, k = 0 for the newest close:
//!   num[t] = close[t] + (1 - alpha) * num[t-1]
//!   den[t] = 1        + (1 - alpha) * den[t-1]
//!   EMA[t] = num[t] / den[t]
//! No minimum-periods floor: EMA[0] = close[0]. Lookback: 0.

use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Ema {
    span: usize,
    name: String,
}

impl Ema {
    pub fn new(span: usize) -> Self {
        assert!(span >= 1, "EMA span must be >= 1");
        Self {
            span,
            name: format!("ema_{span}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        ema_of_series(&closes, self.span)
    }
}

/// Bias-adjusted EMA of an arbitrary series. NaN inputs taint every later value.
pub fn ema_of_series(values: &[f64], span: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if span == 0 {
        return result;
    }

    let decay = 1.0 - 2.0 / (span as f64 + 1.0);
    let mut num = 0.0;
    let mut den = 0.0;

    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            return result;
        }
        num = v + decay * num;
        den = 1.0 + decay * den;
        result[i] = num / den;
    }

    result
}
