//! Candle — the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PlanError;

/// OHLCV candle for a single interval.
///
/// Volume is fractional because crypto venues report base-asset volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Returns true if any OHLCV field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite())
    }

    /// Basic OHLCV sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
            && self.volume >= 0.0
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// High-low range of the candle.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// Check the basic shape of a candle series before any feature is derived.
///
/// The series must be non-empty, strictly ascending by timestamp and every
/// candle must pass [`Candle::is_sane`].
pub fn validate_series(candles: &[Candle]) -> Result<(), PlanError> {
    if candles.is_empty() {
        return Err(PlanError::InvalidTimeframeData(
            "candle series is empty".into(),
        ));
    }

    for (i, candle) in candles.iter().enumerate() {
        if !candle.is_sane() {
            return Err(PlanError::InvalidTimeframeData(format!(
                "candle {i} at {} failed OHLCV sanity check",
                candle.timestamp
            )));
        }
        if i > 0 && candle.timestamp <= candles[i - 1].timestamp {
            return Err(PlanError::InvalidTimeframeData(format!(
                "timestamps not strictly ascending at candle {i} ({} after {})",
                candle.timestamp,
                candles[i - 1].timestamp
            )));
        }
    }

    Ok(())
}
