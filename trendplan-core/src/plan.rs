//! Trading plan synthesis: direction + probabilities + last feature row →
//! entry, stop-loss, take-profit, confidence tier and technical rationale.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{Candle, Confidence, Direction};
use crate::error::PlanError;
use crate::features::{derive_features, FeatureRow};
use crate::model_input::{ModelInput, Predictor};
use crate::profile::{ProfileTable, TimeframeProfile};
use crate::resolver::{resolve_direction, round_to, ModelOutput, ProbabilityMap};
use crate::scoring::{active_conditions, assess, SignalAssessment};

/// Decimal places kept on price levels.
const PRICE_DECIMALS: i32 = 6;
/// Decimal places kept on the signal strength percentage.
const STRENGTH_DECIMALS: i32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingPlan {
    pub timeframe: String,
    pub direction: Direction,
    pub confidence: Confidence,
    /// Percentages, two decimals.
    pub probabilities: ProbabilityMap,
    pub entry: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub assessment: SignalAssessment,
    /// Set only on degraded plans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TradingPlan {
    /// Well-formed stand-in returned when planning fails.
    ///
    /// Direction is WAIT with all probability mass on WAIT, no stop-loss or
    /// take-profit, and the error message embedded in the summary.
    pub fn degraded(timeframe: &str, candles: &[Candle], err: &PlanError) -> Self {
        let message = err.to_string();
        let entry = candles
            .last()
            .map(|c| c.close)
            .filter(|c| c.is_finite())
            .map(|c| round_to(c, PRICE_DECIMALS))
            .unwrap_or(0.0);
        Self {
            timeframe: timeframe.to_string(),
            direction: Direction::Wait,
            confidence: Confidence::Low,
            probabilities: ProbabilityMap {
                short: 0.0,
                wait: 100.0,
                long: 0.0,
            },
            entry,
            stop_loss: None,
            take_profit: None,
            assessment: SignalAssessment::failed(&message),
            error: Some(message),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Plans against a profile table.
#[derive(Debug, Clone, Copy)]
pub struct Planner<'a> {
    profiles: &'a ProfileTable,
}

impl Default for Planner<'static> {
    fn default() -> Self {
        Self::new(ProfileTable::builtin())
    }
}

impl<'a> Planner<'a> {
    pub fn new(profiles: &'a ProfileTable) -> Self {
        Self { profiles }
    }

    /// Candles + model output → plan.
    pub fn plan(
        &self,
        candles: &[Candle],
        timeframe: &str,
        output: &ModelOutput,
    ) -> Result<TradingPlan, PlanError> {
        let profile = self.profile_for(timeframe);
        let rows = derive_features(candles)?;
        plan_from_rows(&rows, timeframe, profile, output)
    }

    /// Like [`Planner::plan`], but errors become a degraded plan.
    pub fn plan_or_degraded(
        &self,
        candles: &[Candle],
        timeframe: &str,
        output: &ModelOutput,
    ) -> TradingPlan {
        self.plan(candles, timeframe, output)
            .unwrap_or_else(|err| degrade(timeframe, candles, err))
    }

    /// Full path: candles → features → scaled window → predictor → plan.
    pub fn analyze(
        &self,
        candles: &[Candle],
        timeframe: &str,
        predictor: &dyn Predictor,
    ) -> Result<TradingPlan, PlanError> {
        let profile = self.profile_for(timeframe);
        let rows = derive_features(candles)?;
        let input = ModelInput::from_rows(&rows, timeframe, profile.sequence_len)?;
        let output = predictor.predict(&input)?;
        plan_from_rows(&rows, timeframe, profile, &output)
    }

    pub fn analyze_or_degraded(
        &self,
        candles: &[Candle],
        timeframe: &str,
        predictor: &dyn Predictor,
    ) -> TradingPlan {
        self.analyze(candles, timeframe, predictor)
            .unwrap_or_else(|err| degrade(timeframe, candles, err))
    }

    fn profile_for(&self, timeframe: &str) -> &'a TimeframeProfile {
        let profile = self.profiles.resolve(timeframe);
        if !self.profiles.is_known(timeframe) {
            debug!(timeframe, "unknown timeframe, using fallback profile");
        }
        profile
    }
}

fn degrade(timeframe: &str, candles: &[Candle], err: PlanError) -> TradingPlan {
    warn!(timeframe, error = %err, "planning failed, returning degraded plan");
    TradingPlan::degraded(timeframe, candles, &err)
}

/// Plan with the built-in profile table.
pub fn synthesize_plan(
    candles: &[Candle],
    timeframe: &str,
    output: &ModelOutput,
) -> Result<TradingPlan, PlanError> {
    Planner::default().plan(candles, timeframe, output)
}

/// Plan with the built-in profile table; never fails.
pub fn synthesize_plan_or_degraded(
    candles: &[Candle],
    timeframe: &str,
    output: &ModelOutput,
) -> TradingPlan {
    Planner::default().plan_or_degraded(candles, timeframe, output)
}

/// Plan from feature rows that were already derived.
pub fn plan_from_rows(
    rows: &[FeatureRow],
    timeframe: &str,
    profile: &TimeframeProfile,
    output: &ModelOutput,
) -> Result<TradingPlan, PlanError> {
    let last = match rows.last() {
        Some(last) if rows.len() >= profile.sequence_len => last,
        _ => {
            return Err(PlanError::InsufficientData {
                timeframe: timeframe.to_string(),
                required: profile.sequence_len.max(1),
                available: rows.len(),
            })
        }
    };

    output.validate()?;
    let (direction, probabilities) = resolve_direction(output);

    let entry = last.close();
    let (stop_loss, take_profit) = risk_levels(direction, entry, last.volatility_proxy(), profile);

    let mut assessment = assess(last);
    assessment.strength_pct = round_to(assessment.strength_pct, STRENGTH_DECIMALS);

    debug!(
        timeframe,
        %direction,
        rows = rows.len(),
        active = assessment.active_count,
        conditions = ?active_conditions(last),
        "synthesized plan"
    );

    Ok(TradingPlan {
        timeframe: timeframe.to_string(),
        direction,
        confidence: Confidence::from_max_probability(probabilities.max()),
        probabilities: probabilities.as_percentages(),
        entry: round_to(entry, PRICE_DECIMALS),
        stop_loss: stop_loss.map(|p| round_to(p, PRICE_DECIMALS)),
        take_profit: take_profit.map(|p| round_to(p, PRICE_DECIMALS)),
        assessment,
        error: None,
    })
}

/// (stop_loss, take_profit) at volatility-scaled distances from entry.
fn risk_levels(
    direction: Direction,
    entry: f64,
    volatility: f64,
    profile: &TimeframeProfile,
) -> (Option<f64>, Option<f64>) {
    let sl_buffer = volatility * profile.sl_multiplier;
    let tp_buffer = volatility * profile.tp_multiplier;
    match direction {
        Direction::Long => (Some(entry - sl_buffer), Some(entry + tp_buffer)),
        Direction::Short => (Some(entry + sl_buffer), Some(entry - tp_buffer)),
        Direction::Wait => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_candles;
    use crate::profile::resolve;

    fn rising(n: usize) -> Vec<Candle> {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        make_candles(&closes)
    }

    #[test]
    fn long_plan_levels() {
        let candles = rising(80);
        let plan = synthesize_plan(&candles, "1h", &ModelOutput::ThreeClass([0.05, 0.15, 0.80]))
            .unwrap();
        assert_eq!(plan.direction, Direction::Long);
        assert_eq!(plan.entry, 179.0);
        // volatility 3.0, 1h multipliers 0.8 / 1.5
        assert_eq!(plan.stop_loss, Some(176.6));
        assert_eq!(plan.take_profit, Some(183.5));
        assert_eq!(plan.probabilities.long, 80.0);
        assert!(plan.error.is_none());
    }

    #[test]
    fn short_plan_mirrors_levels() {
        let candles = rising(80);
        let plan = synthesize_plan(&candles, "4h", &ModelOutput::Scalar(0.1)).unwrap();
        assert_eq!(plan.direction, Direction::Short);
        // volatility 3.0, 4h multipliers 1.2 / 2.0
        assert_eq!(plan.stop_loss, Some(182.6));
        assert_eq!(plan.take_profit, Some(173.0));
        assert_eq!(plan.confidence, Confidence::VeryHigh);
    }

    #[test]
    fn wait_plan_has_no_levels() {
        let candles = rising(80);
        let plan = synthesize_plan(&candles, "1h", &ModelOutput::Scalar(0.5)).unwrap();
        assert_eq!(plan.direction, Direction::Wait);
        assert_eq!(plan.stop_loss, None);
        assert_eq!(plan.take_profit, None);
        assert_eq!(plan.entry, 179.0);
        // max(0.5, 0.0, 0.5) = 0.5
        assert_eq!(plan.confidence, Confidence::Low);
    }

    #[test]
    fn insufficient_rows_fail_with_counts() {
        let candles = rising(60);
        let err = synthesize_plan(&candles, "1h", &ModelOutput::Scalar(0.7)).unwrap_err();
        assert_eq!(
            err,
            PlanError::InsufficientData {
                timeframe: "1h".into(),
                required: 48,
                available: 40,
            }
        );
    }

    #[test]
    fn malformed_output_is_rejected() {
        let candles = rising(80);
        let err = synthesize_plan(&candles, "1h", &ModelOutput::Scalar(3.0)).unwrap_err();
        assert!(matches!(err, PlanError::MalformedModelOutput(_)));
    }

    #[test]
    fn degraded_plan_shape() {
        let candles = rising(10);
        let plan = synthesize_plan_or_degraded(&candles, "15m", &ModelOutput::Scalar(0.7));
        assert!(plan.is_degraded());
        assert_eq!(plan.direction, Direction::Wait);
        assert_eq!(plan.confidence, Confidence::Low);
        assert_eq!(plan.probabilities.wait, 100.0);
        assert_eq!(plan.probabilities.long, 0.0);
        assert_eq!(plan.stop_loss, None);
        assert_eq!(plan.take_profit, None);
        assert_eq!(plan.entry, 109.0);
        assert!(plan.assessment.summary.starts_with("Analysis failed: "));
        assert!(plan.assessment.summary.contains("need 64"));
    }

    #[test]
    fn degraded_plan_for_empty_candles_has_zero_entry() {
        let plan = synthesize_plan_or_degraded(&[], "1h", &ModelOutput::Scalar(0.7));
        assert_eq!(plan.entry, 0.0);
        assert!(plan.error.as_deref().unwrap().contains("empty"));
    }

    #[test]
    fn plan_from_rows_uses_given_profile() {
        let candles = rising(80);
        let rows = crate::features::compute_features(&candles);
        let plan = plan_from_rows(
            &rows,
            "1d",
            resolve("1d"),
            &ModelOutput::ThreeClass([0.1, 0.2, 0.7]),
        )
        .unwrap();
        // volatility 3.0, 1d multipliers 2.0 / 3.0
        assert_eq!(plan.stop_loss, Some(173.0));
        assert_eq!(plan.take_profit, Some(188.0));
        assert_eq!(plan.confidence, Confidence::High);
    }

    #[test]
    fn degraded_plan_omits_error_field_only_when_healthy() {
        let candles = rising(80);
        let plan = synthesize_plan(&candles, "1h", &ModelOutput::Scalar(0.7)).unwrap();
        let json = serde_json::to_value(&plan).unwrap();
        assert!(json.get("error").is_none());
        assert!(json["stop_loss"].is_number());

        let degraded = TradingPlan::degraded("1h", &candles, &PlanError::Inference("x".into()));
        let json = serde_json::to_value(&degraded).unwrap();
        assert_eq!(json["error"], "inference failed: x");
        assert!(json["stop_loss"].is_null());
    }
}
