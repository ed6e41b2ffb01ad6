//! Model input: min-max scaled feature window, and the predictor seam.
//!
//! Scaling is fitted over the whole available feature history, then the last
//! `sequence_len` rows are kept. A constant column scales to zero.

use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::features::FeatureRow;
use crate::resolver::ModelOutput;

/// Columns fed to the model, in order.
pub const FEATURE_COLUMNS: [&str; 11] = [
    "close",
    "volume",
    "ema_fast",
    "ema_slow",
    "rsi",
    "volatility",
    "momentum",
    "volume_ratio",
    "body_size",
    "upper_shadow",
    "lower_shadow",
];

pub const FEATURE_COUNT: usize = FEATURE_COLUMNS.len();

fn column_values(row: &FeatureRow) -> [f64; FEATURE_COUNT] {
    [
        row.candle.close,
        row.candle.volume,
        row.ema_fast,
        row.ema_slow,
        row.rsi,
        row.volatility,
        row.momentum,
        row.volume_ratio,
        row.body_size,
        row.upper_shadow,
        row.lower_shadow,
    ]
}

/// A `sequence_len × FEATURE_COUNT` matrix of values in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInput {
    pub timeframe: String,
    pub rows: Vec<[f64; FEATURE_COUNT]>,
}

impl ModelInput {
    pub fn from_rows(
        rows: &[FeatureRow],
        timeframe: &str,
        sequence_len: usize,
    ) -> Result<Self, PlanError> {
        if rows.len() < sequence_len || rows.is_empty() {
            return Err(PlanError::InsufficientData {
                timeframe: timeframe.to_string(),
                required: sequence_len.max(1),
                available: rows.len(),
            });
        }

        let raw: Vec<[f64; FEATURE_COUNT]> = rows.iter().map(column_values).collect();

        let mut min = [f64::INFINITY; FEATURE_COUNT];
        let mut max = [f64::NEG_INFINITY; FEATURE_COUNT];
        for values in &raw {
            for (col, &v) in values.iter().enumerate() {
                min[col] = min[col].min(v);
                max[col] = max[col].max(v);
            }
        }

        let scaled = raw[raw.len() - sequence_len..]
            .iter()
            .map(|values| {
                let mut out = [0.0; FEATURE_COUNT];
                for col in 0..FEATURE_COUNT {
                    let span = max[col] - min[col];
                    out[col] = if span > 0.0 {
                        (values[col] - min[col]) / span
                    } else {
                        0.0
                    };
                }
                out
            })
            .collect();

        Ok(Self {
            timeframe: timeframe.to_string(),
            rows: scaled,
        })
    }

    pub fn sequence_len(&self) -> usize {
        self.rows.len()
    }
}

/// Stateless inference collaborator: `predict(sequence) -> probabilities`.
pub trait Predictor: Send + Sync {
    fn predict(&self, input: &ModelInput) -> Result<ModelOutput, PlanError>;
}

/// A predictor that always answers with the same output. Useful when the
/// probabilities were produced out of process.
#[derive(Debug, Clone, Copy)]
pub struct FixedPredictor(pub ModelOutput);

impl Predictor for FixedPredictor {
    fn predict(&self, _input: &ModelInput) -> Result<ModelOutput, PlanError> {
        Ok(self.0)
    }
}
