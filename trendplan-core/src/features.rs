//! Feature pipeline: raw candles → per-candle technical feature rows.
//!
//! Every series is computed once over the full candle history, then rows are
//! assembled only where all rolling windows are warm. Rows before the longest
//! warm-up are dropped rather than zero-filled, so the first row sits at input
//! index [`WARMUP`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{validate_series, Candle};
use crate::error::PlanError;
use crate::indicators::{Donchian, Ema, Indicator, Momentum, Rsi, Sma, SmaSource};

pub const EMA_FAST: usize = 14;
pub const EMA_SLOW: usize = 50;
pub const RSI_PERIOD: usize = 14;
pub const VOLATILITY_PERIOD: usize = 14;
pub const MOMENTUM_PERIOD: usize = 7;
pub const VOLUME_PERIOD: usize = 20;
pub const STRUCTURE_PERIOD: usize = 20;
pub const GAP_PERIOD: usize = 20;

/// body / range below this marks a doji.
pub const DOJI_BODY_RATIO: f64 = 0.1;
/// A gap larger than this multiple of its rolling mean is a fair value gap.
pub const GAP_MULTIPLE: f64 = 2.0;

/// Leading candles that never produce a row (the longest indicator lookback).
pub const WARMUP: usize = 20;

/// Technical features derived for a single candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Position of the source candle in the input series.
    pub index: usize,
    pub candle: Candle,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub rsi: f64,
    /// Rolling mean of high - low; an ATR stand-in.
    pub volatility: f64,
    pub momentum: f64,
    pub volume_sma: f64,
    pub volume_ratio: f64,
    pub body_size: f64,
    pub upper_shadow: f64,
    pub lower_shadow: f64,
    /// Bullish engulfing only.
    pub engulfing: bool,
    pub doji: bool,
    pub break_of_structure: bool,
    pub fair_value_gap: bool,
}

impl FeatureRow {
    pub fn close(&self) -> f64 {
        self.candle.close
    }

    /// Volatility feature, or the candle's own range if it is not usable.
    pub fn volatility_proxy(&self) -> f64 {
        if self.volatility.is_finite() {
            self.volatility
        } else {
            (self.candle.high - self.candle.low).abs()
        }
    }
}

/// Validate the candle series, then derive feature rows.
pub fn derive_features(candles: &[Candle]) -> Result<Vec<FeatureRow>, PlanError> {
    validate_series(candles)?;
    let rows = compute_features(candles);
    debug!(
        candles = candles.len(),
        rows = rows.len(),
        "derived feature rows"
    );
    Ok(rows)
}

/// Derive feature rows without validating the input.
pub fn compute_features(candles: &[Candle]) -> Vec<FeatureRow> {
    let ema_fast = Ema::new(EMA_FAST).compute(candles);
    let ema_slow = Ema::new(EMA_SLOW).compute(candles);
    let rsi = Rsi::new(RSI_PERIOD).compute(candles);
    let volatility = Sma::new(SmaSource::Range, VOLATILITY_PERIOD).compute(candles);
    let momentum = Momentum::new(MOMENTUM_PERIOD).compute(candles);
    let volume_sma = Sma::new(SmaSource::Volume, VOLUME_PERIOD).compute(candles);
    let prior_high = Donchian::upper(STRUCTURE_PERIOD).compute(candles);
    let prior_low = Donchian::lower(STRUCTURE_PERIOD).compute(candles);
    let gap = SmaSource::Gap.series(candles);
    let gap_mean = Sma::new(SmaSource::Gap, GAP_PERIOD).compute(candles);

    let mut rows = Vec::with_capacity(candles.len().saturating_sub(WARMUP));

    for (i, candle) in candles.iter().enumerate() {
        let windows = [
            ema_fast[i],
            ema_slow[i],
            rsi[i],
            volatility[i],
            momentum[i],
            volume_sma[i],
            prior_high[i],
            prior_low[i],
            gap[i],
            gap_mean[i],
        ];
        if windows.iter().any(|v| !v.is_finite()) {
            continue;
        }

        // Zero volume mean: ratio is 0 rather than undefined, so the row is
        // kept instead of dropped like other undefined features.
        let volume_ratio = if volume_sma[i] > 0.0 {
            candle.volume / volume_sma[i]
        } else {
            0.0
        };

        let body_size = (candle.close - candle.open).abs();
        let range = candle.range();

        rows.push(FeatureRow {
            index: i,
            candle: candle.clone(),
            ema_fast: ema_fast[i],
            ema_slow: ema_slow[i],
            rsi: rsi[i],
            volatility: volatility[i],
            momentum: momentum[i],
            volume_sma: volume_sma[i],
            volume_ratio,
            body_size,
            upper_shadow: candle.high - candle.close.max(candle.open),
            lower_shadow: candle.close.min(candle.open) - candle.low,
            engulfing: i > 0 && is_bullish_engulfing(&candles[i - 1], candle),
            doji: is_doji(body_size, range),
            break_of_structure: candle.close > prior_high[i] || candle.close < prior_low[i],
            fair_value_gap: gap[i] > gap_mean[i] * GAP_MULTIPLE,
        });
    }

    rows
}

/// Bullish candle whose body swallows the previous bearish body.
pub fn is_bullish_engulfing(prev: &Candle, curr: &Candle) -> bool {
    curr.is_bullish() && prev.is_bearish() && curr.open < prev.close && curr.close > prev.open
}

/// Zero-range candles are never dojis.
pub fn is_doji(body_size: f64, range: f64) -> bool {
    range > 0.0 && body_size / range < DOJI_BODY_RATIO
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_candles;

    fn rising(n: usize) -> Vec<Candle> {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        make_candles(&closes)
    }

    #[test]
    fn warmup_rows_are_dropped() {
        let candles = rising(30);
        let rows = compute_features(&candles);
        assert_eq!(rows.len(), 30 - WARMUP);
        assert_eq!(rows[0].index, WARMUP);
        assert_eq!(rows.last().unwrap().index, 29);
    }

    #[test]
    fn too_short_series_has_no_rows() {
        assert!(compute_features(&rising(WARMUP)).is_empty());
        assert_eq!(compute_features(&rising(WARMUP + 1)).len(), 1);
    }

    #[test]
    fn engulfing_spot_check() {
        let base = make_candles(&[1.0, 2.0]);
        let mut prev = base[0].clone();
        prev.open = 10.0;
        prev.close = 9.0;
        prev.high = 10.2;
        prev.low = 8.8;
        let mut curr = base[1].clone();
        curr.open = 8.9;
        curr.close = 10.5;
        curr.high = 10.6;
        curr.low = 8.8;
        assert!(is_bullish_engulfing(&prev, &curr));

        // Bearish engulfing is not detected.
        assert!(!is_bullish_engulfing(&curr, &prev));

        // Open must be below the previous close: 9.5 sits inside the prior body.
        curr.open = 9.5;
        assert!(!is_bullish_engulfing(&prev, &curr));

        // Close must clear the previous open.
        curr.open = 8.9;
        curr.close = 9.9;
        assert!(!is_bullish_engulfing(&prev, &curr));
    }

    #[test]
    fn doji_ratio() {
        assert!(is_doji(0.05, 1.0));
        assert!(!is_doji(0.2, 1.0));
        assert!(!is_doji(0.1, 1.0));
        assert!(!is_doji(0.0, 0.0));
    }

    #[test]
    fn rising_series_features() {
        let rows = compute_features(&rising(80));
        let last = rows.last().unwrap();
        assert!(last.ema_fast > last.ema_slow);
        assert_eq!(last.rsi, 100.0);
        assert!(last.momentum > 0.0);
        assert!((last.volume_ratio - 1.0).abs() < 1e-12);
        // Each close is one above the prior high (prev close + 1).
        assert!(!last.break_of_structure);
        assert!((last.volatility - 3.0).abs() < 1e-9);
        assert!((last.body_size - 1.0).abs() < 1e-12);
        assert!((last.upper_shadow - 1.0).abs() < 1e-12);
        assert!((last.lower_shadow - 1.0).abs() < 1e-12);
        assert!(!last.engulfing);
        assert!(!last.doji);
        assert!(!last.fair_value_gap);
    }

    #[test]
    fn breakout_above_prior_high_flags_structure() {
        let mut closes: Vec<f64> = vec![100.0; 30];
        closes.push(110.0);
        let rows = compute_features(&make_candles(&closes));
        let last = rows.last().unwrap();
        assert!(last.break_of_structure);
    }

    #[test]
    fn gap_spike_flags_fair_value_gap() {
        let mut candles = rising(40);
        let last = candles.last_mut().unwrap();
        last.open += 5.0;
        last.high = last.high.max(last.open) + 1.0;
        let rows = compute_features(&candles);
        assert!(rows.last().unwrap().fair_value_gap);
        assert!(!rows[rows.len() - 2].fair_value_gap);
    }

    #[test]
    fn flat_tail_after_large_move_has_no_phantom_signals() {
        let mut closes = vec![0.656, 0.0253];
        closes.extend([0.01; 26]);
        let candles: Vec<Candle> = make_candles(&closes)
            .into_iter()
            .map(|mut c| {
                c.high = c.open.max(c.close) * 1.02;
                c.low = c.open.min(c.close) * 0.98;
                c
            })
            .collect();
        let rows = compute_features(&candles);
        let last = rows.last().unwrap();
        assert_eq!(last.rsi, 100.0);
        assert_eq!(last.volatility.signum(), 1.0);
        assert!(!last.fair_value_gap);
        assert!(rows.iter().all(|r| !r.fair_value_gap));
    }

    #[test]
    fn zero_volume_history_gives_zero_ratio() {
        let mut candles = rising(25);
        for c in &mut candles {
            c.volume = 0.0;
        }
        let rows = compute_features(&candles);
        assert!(rows.iter().all(|r| r.volume_ratio == 0.0));
    }

    #[test]
    fn derive_features_rejects_empty_input() {
        let err = derive_features(&[]).unwrap_err();
        assert!(matches!(err, PlanError::InvalidTimeframeData(_)));
    }

    #[test]
    fn volatility_proxy_falls_back_to_range() {
        let mut row = compute_features(&rising(25)).pop().unwrap();
        row.volatility = f64::NAN;
        assert_eq!(row.volatility_proxy(), row.candle.high - row.candle.low);
    }
}
