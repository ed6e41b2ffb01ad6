//! Signal scoring and explanation for the most recent feature row.
//!
//! Six conditions are checked in a fixed order. Each one that fires adds one
//! reason and one point to the active count. The RSI check is a single
//! condition with two mutually exclusive branches.

use serde::{Deserialize, Serialize};

use crate::features::FeatureRow;

pub const RSI_BULLISH: f64 = 60.0;
pub const RSI_BEARISH: f64 = 40.0;

/// Number of conditions evaluated; the denominator of `strength_pct`.
pub const CONDITION_COUNT: usize = 6;

const NEUTRAL_SUMMARY: &str =
    "Model predicts market direction without support from any dominant technical signal.";

/// Reasons quoted in the summary before it is cut short.
const SUMMARY_REASONS: usize = 3;

type Condition = fn(&FeatureRow) -> Option<String>;

const CONDITIONS: [(&str, Condition); CONDITION_COUNT] = [
    ("engulfing", engulfing),
    ("doji", doji),
    ("ema_trend", ema_trend),
    ("rsi_pressure", rsi_pressure),
    ("break_of_structure", break_of_structure),
    ("fair_value_gap", fair_value_gap),
];

fn engulfing(row: &FeatureRow) -> Option<String> {
    row.engulfing
        .then(|| "Bullish engulfing pattern detected".to_string())
}

fn doji(row: &FeatureRow) -> Option<String> {
    row.doji
        .then(|| "Doji candle signals market indecision".to_string())
}

fn ema_trend(row: &FeatureRow) -> Option<String> {
    (row.ema_fast > row.ema_slow)
        .then(|| "EMA 14 is above EMA 50 (short-term uptrend)".to_string())
}

fn rsi_pressure(row: &FeatureRow) -> Option<String> {
    if row.rsi > RSI_BULLISH {
        Some(format!("High RSI ({:.1}) indicates buying pressure", row.rsi))
    } else if row.rsi < RSI_BEARISH {
        Some(format!("Low RSI ({:.1}) indicates selling pressure", row.rsi))
    } else {
        None
    }
}

fn break_of_structure(row: &FeatureRow) -> Option<String> {
    row.break_of_structure
        .then(|| "Break of structure confirmed".to_string())
}

fn fair_value_gap(row: &FeatureRow) -> Option<String> {
    row.fair_value_gap
        .then(|| "Fair value gap active near price".to_string())
}

/// Qualitative rating of the active count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rating {
    None,
    Weak,
    Moderate,
    Strong,
}

impl Rating {
    pub fn from_active_count(count: usize) -> Self {
        match count {
            0 => Rating::None,
            1 => Rating::Weak,
            2 | 3 => Rating::Moderate,
            _ => Rating::Strong,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalAssessment {
    pub reasons: Vec<String>,
    pub active_count: usize,
    pub rating: Rating,
    /// One-line rating sentence, e.g. "Moderate technical signal (2/6 indicators active = 33%)".
    pub headline: String,
    pub summary: String,
    pub strength_pct: f64,
}

impl SignalAssessment {
    /// Assessment attached to a degraded plan.
    pub fn failed(message: &str) -> Self {
        Self {
            reasons: vec!["Error in analysis".to_string()],
            active_count: 0,
            rating: Rating::None,
            headline: "Analysis error".to_string(),
            summary: format!("Analysis failed: {message}"),
            strength_pct: 0.0,
        }
    }
}

/// Score a single feature row.
pub fn assess(row: &FeatureRow) -> SignalAssessment {
    let reasons: Vec<String> = CONDITIONS
        .iter()
        .filter_map(|(_, condition)| condition(row))
        .collect();
    let active_count = reasons.len();
    let strength_pct = active_count as f64 / CONDITION_COUNT as f64 * 100.0;
    let rating = Rating::from_active_count(active_count);

    SignalAssessment {
        headline: headline(rating, active_count, strength_pct),
        summary: summary(&reasons),
        reasons,
        active_count,
        rating,
        strength_pct,
    }
}

/// Names of the conditions that fire on a row, in evaluation order.
pub fn active_conditions(row: &FeatureRow) -> Vec<&'static str> {
    CONDITIONS
        .iter()
        .filter(|(_, condition)| condition(row).is_some())
        .map(|(name, _)| *name)
        .collect()
}

fn headline(rating: Rating, active: usize, pct: f64) -> String {
    let label = match rating {
        Rating::None => return "No dominant technical signal".to_string(),
        Rating::Weak => "Weak",
        Rating::Moderate => "Moderate",
        Rating::Strong => "Strong",
    };
    format!("{label} technical signal ({active}/{CONDITION_COUNT} indicators active = {pct:.0}%)")
}

fn summary(reasons: &[String]) -> String {
    if reasons.is_empty() {
        return NEUTRAL_SUMMARY.to_string();
    }
    let quoted: Vec<&str> = reasons
        .iter()
        .take(SUMMARY_REASONS)
        .map(String::as_str)
        .collect();
    let tail = if reasons.len() > SUMMARY_REASONS {
        ", etc."
    } else {
        "."
    };
    format!(
        "Model predicts market direction supported by {} active indicators such as: {}{}",
        reasons.len(),
        quoted.join("; "),
        tail
    )
}
