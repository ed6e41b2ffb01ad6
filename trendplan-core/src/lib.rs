//! TrendPlan Core — candle features, signal scoring, direction resolution and
//! trading plan synthesis.
//!
//! This crate is the deterministic part of the recommendation path:
//! - Timeframe profiles (model window length, risk multipliers)
//! - Feature pipeline over OHLCV candles (EMA, RSI, volatility, patterns)
//! - Rule-based signal scoring with a natural-language rationale
//! - Direction resolution from a three-class or scalar model output
//! - Plan synthesis: entry, stop-loss, take-profit, confidence tier
//!
//! The inference model itself is a collaborator behind [`model_input::Predictor`].

pub mod domain;
pub mod error;
pub mod features;
pub mod indicators;
pub mod model_input;
pub mod plan;
pub mod profile;
pub mod resolver;
pub mod scoring;

pub use domain::{Candle, Confidence, Direction};
pub use error::PlanError;
pub use features::{derive_features, FeatureRow};
pub use model_input::{FixedPredictor, ModelInput, Predictor};
pub use plan::{synthesize_plan, synthesize_plan_or_degraded, Planner, TradingPlan};
pub use profile::{ProfileTable, TimeframeProfile};
pub use resolver::{resolve_direction, ModelOutput, ProbabilityMap};
pub use scoring::{assess, Rating, SignalAssessment};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: every public data type is Send + Sync, so
    /// independent requests can be planned on separate threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<Candle>();
        require_sync::<Candle>();
        require_send::<FeatureRow>();
        require_sync::<FeatureRow>();
        require_send::<ModelOutput>();
        require_sync::<ModelOutput>();
        require_send::<ModelInput>();
        require_sync::<ModelInput>();
        require_send::<TradingPlan>();
        require_sync::<TradingPlan>();
        require_send::<ProfileTable>();
        require_sync::<ProfileTable>();
        require_send::<PlanError>();
        require_sync::<PlanError>();
        require_send::<Planner<'static>>();
        require_sync::<Planner<'static>>();
    }

    /// Architecture contract: the predictor only sees the scaled window.
    #[test]
    fn predictor_trait_takes_only_model_input() {
        fn _check_trait_object_builds(
            predictor: &dyn Predictor,
            input: &ModelInput,
        ) -> Result<ModelOutput, PlanError> {
            predictor.predict(input)
        }
    }
}
