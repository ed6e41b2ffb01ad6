//! Simple Moving Average (SMA) over a chosen per-candle source series.
//!
//! Sources: close, volume, high-low range, and the open gap
//! |open[t] - close[t-1]| (undefined on the first candle).
//! Lookback: period - 1, plus one for the gap source.

use super::Indicator;
use crate::domain::Candle;

/// Per-candle value an [`Sma`] averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmaSource {
    Close,
    Volume,
    Range,
    Gap,
}

impl SmaSource {
    fn key(&self) -> &'static str {
        match self {
            SmaSource::Close => "close",
            SmaSource::Volume => "volume",
            SmaSource::Range => "range",
            SmaSource::Gap => "gap",
        }
    }

    /// Extract the raw source series.
    pub fn series(&self, candles: &[Candle]) -> Vec<f64> {
        match self {
            SmaSource::Close => candles.iter().map(|c| c.close).collect(),
            SmaSource::Volume => candles.iter().map(|c| c.volume).collect(),
            SmaSource::Range => candles.iter().map(Candle::range).collect(),
            SmaSource::Gap => gap_series(candles),
        }
    }
}

/// |open[t] - close[t-1]|, NaN at index 0.
pub fn gap_series(candles: &[Candle]) -> Vec<f64> {
    let mut gaps = vec![f64::NAN; candles.len()];
    for i in 1..candles.len() {
        gaps[i] = (candles[i].open - candles[i - 1].close).abs();
    }
    gaps
}

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    source: SmaSource,
    name: String,
}

impl Sma {
    pub fn new(source: SmaSource, period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            source,
            name: format!("sma_{}_{period}", source.key()),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        let base = self.period.saturating_sub(1);
        if self.source == SmaSource::Gap {
            base + 1
        } else {
            base
        }
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        rolling_mean(&self.source.series(candles), self.period)
    }
}

/// Rolling mean over a fixed window. Any NaN inside the window yields NaN.
///
/// Each window is summed on its own rather than with a running sum, so a
/// window of zeros is exactly zero no matter what left it.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period {
        return result;
    }

    for (i, window) in values.windows(period).enumerate() {
        // NaN propagates through the sum.
        let sum: f64 = window.iter().sum();
        result[i + period - 1] = sum / period as f64;
    }

    result
}
