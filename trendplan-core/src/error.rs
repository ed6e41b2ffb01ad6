//! Structured error types for plan synthesis.
//!
//! Every variant is recoverable: the boundary turns any of them into a
//! degraded plan via [`crate::plan::TradingPlan::degraded`].

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("not enough data for {timeframe} timeframe: need {required} feature rows, got {available}")]
    InsufficientData {
        timeframe: String,
        required: usize,
        available: usize,
    },

    #[error("malformed model output: {0}")]
    MalformedModelOutput(String),

    #[error("invalid candle data: {0}")]
    InvalidTimeframeData(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_names_required_and_available() {
        let err = PlanError::InsufficientData {
            timeframe: "1h".into(),
            required: 48,
            available: 12,
        };
        let msg = err.to_string();
        assert!(msg.contains("need 48"));
        assert!(msg.contains("got 12"));
        assert!(msg.contains("1h"));
    }
}
