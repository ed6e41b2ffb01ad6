//! Concrete indicator implementations feeding the feature pipeline.
//!
//! Indicators are pure functions: candle history in, numeric series out, one
//! value per candle. Warm-up positions hold `f64::NAN`; the pipeline drops any
//! row where a series is still warming up.

pub mod donchian;
pub mod ema;
pub mod momentum;
pub mod rsi;
pub mod sma;

pub use donchian::{Donchian, DonchianBand};
pub use ema::Ema;
pub use momentum::Momentum;
pub use rsi::Rsi;
pub use sma::{Sma, SmaSource};

use crate::domain::Candle;

/// Trait for indicators.
///
/// # Look-ahead contamination guard
/// No value at candle t may depend on data from candle t+1 or later. Every
/// indicator must pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ema_14", "rsi_14").
    fn name(&self) -> &str;

    /// Number of leading candles whose output is `f64::NAN`.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the whole series. Output length equals input length.
    fn compute(&self, candles: &[Candle]) -> Vec<f64>;
}

/// Create synthetic candles from close prices for testing.
///
/// open = prev_close (or close for the first candle),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000,
/// one hour apart.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle {
                timestamp: base + chrono::Duration::hours(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Create candles from explicit (open, high, low, close) tuples for testing.
#[cfg(test)]
pub fn make_ohlc_candles(data: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Candle {
            timestamp: base + chrono::Duration::hours(i as i64),
            open,
            high,
            low,
            close,
            volume: 1000.0,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
