//! Direction resolver: model output → direction label + probability map.
//!
//! Two model heads are supported and kept statically distinct:
//! - a three-class softmax in class order SHORT, WAIT, LONG
//! - a single up-probability from a binary head

use serde::{Deserialize, Serialize};

use crate::domain::Direction;
use crate::error::PlanError;

/// Scalar above this is LONG.
pub const SCALAR_LONG_THRESHOLD: f64 = 0.6;
/// Scalar below this is SHORT.
pub const SCALAR_SHORT_THRESHOLD: f64 = 0.4;

/// Raw output of the inference model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged, try_from = "RawModelOutput")]
pub enum ModelOutput {
    ThreeClass([f64; 3]),
    Scalar(f64),
}

/// Shapes accepted on the wire before validation: `0.7`, `[0.7]` or `[a, b, c]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawModelOutput {
    Scalar(f64),
    Values(Vec<f64>),
}

impl TryFrom<RawModelOutput> for ModelOutput {
    type Error = String;

    fn try_from(raw: RawModelOutput) -> Result<Self, Self::Error> {
        match raw {
            RawModelOutput::Scalar(p) => Ok(ModelOutput::Scalar(p)),
            RawModelOutput::Values(values) => classify(&values),
        }
    }
}

fn classify(values: &[f64]) -> Result<ModelOutput, String> {
    match *values {
        [short, wait, long] => Ok(ModelOutput::ThreeClass([short, wait, long])),
        [p] => Ok(ModelOutput::Scalar(p)),
        _ => Err(format!(
            "expected 3 class probabilities or 1 scalar, got {} values",
            values.len()
        )),
    }
}

impl ModelOutput {
    /// Interpret a flat output vector: length 3 is a class distribution,
    /// length 1 is a scalar. Anything else is malformed.
    pub fn from_values(values: &[f64]) -> Result<Self, PlanError> {
        classify(values).map_err(PlanError::MalformedModelOutput)
    }

    /// Every value must be finite and inside [0, 1].
    pub fn validate(&self) -> Result<(), PlanError> {
        let values: &[f64] = match self {
            ModelOutput::ThreeClass(v) => v,
            ModelOutput::Scalar(p) => std::slice::from_ref(p),
        };
        match values
            .iter()
            .find(|v| !(v.is_finite() && (0.0..=1.0).contains(*v)))
        {
            Some(bad) => Err(PlanError::MalformedModelOutput(format!(
                "probability {bad} is outside [0, 1]"
            ))),
            None => Ok(()),
        }
    }
}

/// Per-direction probabilities. Values are non-negative and at most 1 but
/// need not sum to 1 (the scalar head is mapped heuristically).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ProbabilityMap {
    pub short: f64,
    pub wait: f64,
    pub long: f64,
}

impl ProbabilityMap {
    pub fn max(&self) -> f64 {
        self.short.max(self.wait).max(self.long)
    }

    /// Scale to percentages rounded to two decimals.
    pub fn as_percentages(&self) -> ProbabilityMap {
        let pct = |p: f64| round_to(p * 100.0, 2);
        ProbabilityMap {
            short: pct(self.short),
            wait: pct(self.wait),
            long: pct(self.long),
        }
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Resolve a validated model output into a direction and probability map.
pub fn resolve_direction(output: &ModelOutput) -> (Direction, ProbabilityMap) {
    match *output {
        ModelOutput::ThreeClass(probs) => resolve_three_class(probs),
        ModelOutput::Scalar(p) => resolve_scalar(p),
    }
}

/// Argmax; exact ties go to the lower class index.
fn resolve_three_class(probs: [f64; 3]) -> (Direction, ProbabilityMap) {
    let mut best = 0;
    for i in 1..probs.len() {
        if probs[i] > probs[best] {
            best = i;
        }
    }
    let direction = Direction::from_class_index(best).unwrap_or(Direction::Wait);
    let map = ProbabilityMap {
        short: probs[0],
        wait: probs[1],
        long: probs[2],
    };
    (direction, map)
}

/// [0.4, 0.6] is the indecision band.
fn resolve_scalar(p: f64) -> (Direction, ProbabilityMap) {
    let direction = if p > SCALAR_LONG_THRESHOLD {
        Direction::Long
    } else if p < SCALAR_SHORT_THRESHOLD {
        Direction::Short
    } else {
        Direction::Wait
    };
    let map = ProbabilityMap {
        short: 1.0 - p,
        wait: (0.5 - p).abs() * 2.0,
        long: p,
    };
    (direction, map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_class_argmax() {
        let (d, map) = resolve_direction(&ModelOutput::ThreeClass([0.05, 0.15, 0.80]));
        assert_eq!(d, Direction::Long);
        assert_eq!(map.long, 0.80);
        assert_eq!(map.short, 0.05);

        let (d, _) = resolve_direction(&ModelOutput::ThreeClass([0.7, 0.2, 0.1]));
        assert_eq!(d, Direction::Short);
    }

    #[test]
    fn three_class_ties_prefer_lower_index() {
        let (d, _) = resolve_direction(&ModelOutput::ThreeClass([0.4, 0.4, 0.2]));
        assert_eq!(d, Direction::Short);
        let (d, _) = resolve_direction(&ModelOutput::ThreeClass([0.2, 0.4, 0.4]));
        assert_eq!(d, Direction::Wait);
        let (d, _) = resolve_direction(&ModelOutput::ThreeClass([0.3, 0.3, 0.3]));
        assert_eq!(d, Direction::Short);
    }

    #[test]
    fn scalar_band_boundaries_are_wait() {
        assert_eq!(resolve_direction(&ModelOutput::Scalar(0.6)).0, Direction::Wait);
        assert_eq!(resolve_direction(&ModelOutput::Scalar(0.4)).0, Direction::Wait);
        assert_eq!(resolve_direction(&ModelOutput::Scalar(0.61)).0, Direction::Long);
        assert_eq!(resolve_direction(&ModelOutput::Scalar(0.39)).0, Direction::Short);
    }

    #[test]
    fn scalar_probability_heuristic() {
        let (_, map) = resolve_direction(&ModelOutput::Scalar(0.9));
        assert!((map.long - 0.9).abs() < 1e-12);
        assert!((map.short - 0.1).abs() < 1e-12);
        assert!((map.wait - 0.8).abs() < 1e-12);

        let (_, map) = resolve_direction(&ModelOutput::Scalar(0.5));
        assert_eq!(map.wait, 0.0);
    }

    #[test]
    fn from_values_shapes() {
        assert_eq!(
            ModelOutput::from_values(&[0.1, 0.2, 0.7]).unwrap(),
            ModelOutput::ThreeClass([0.1, 0.2, 0.7])
        );
        assert_eq!(
            ModelOutput::from_values(&[0.7]).unwrap(),
            ModelOutput::Scalar(0.7)
        );
        for bad in [&[][..], &[0.5, 0.5][..], &[0.1, 0.2, 0.3, 0.4][..]] {
            assert!(matches!(
                ModelOutput::from_values(bad),
                Err(PlanError::MalformedModelOutput(_))
            ));
        }
    }

    #[test]
    fn validate_rejects_out_of_range() {
        assert!(ModelOutput::Scalar(1.2).validate().is_err());
        assert!(ModelOutput::Scalar(f64::NAN).validate().is_err());
        assert!(ModelOutput::ThreeClass([0.1, -0.1, 0.5]).validate().is_err());
        assert!(ModelOutput::ThreeClass([0.0, 0.0, 1.0]).validate().is_ok());
    }

    #[test]
    fn deserializes_from_json_shapes() {
        let out: ModelOutput = serde_json::from_str("0.72").unwrap();
        assert_eq!(out, ModelOutput::Scalar(0.72));
        let out: ModelOutput = serde_json::from_str("[0.72]").unwrap();
        assert_eq!(out, ModelOutput::Scalar(0.72));
        let out: ModelOutput = serde_json::from_str("[0.1, 0.2, 0.7]").unwrap();
        assert_eq!(out, ModelOutput::ThreeClass([0.1, 0.2, 0.7]));
        let err = serde_json::from_str::<ModelOutput>("[0.1, 0.9]").unwrap_err();
        assert!(err.to_string().starts_with("expected 3 class probabilities"));
        assert!(serde_json::from_str::<ModelOutput>("\"LONG\"").is_err());
    }

    #[test]
    fn percentages_round_to_two_decimals() {
        let map = ProbabilityMap {
            short: 0.123456,
            wait: 0.5,
            long: 0.376544,
        };
        let pct = map.as_percentages();
        assert_eq!(pct.short, 12.35);
        assert_eq!(pct.wait, 50.0);
        assert_eq!(pct.long, 37.65);
        assert_eq!(map.max(), 0.5);
    }

    #[test]
    fn serializes_with_direction_keys() {
        let map = ProbabilityMap {
            short: 0.1,
            wait: 0.2,
            long: 0.7,
        };
        let json = serde_json::to_value(map).unwrap();
        assert_eq!(json["SHORT"], 0.1);
        assert_eq!(json["LONG"], 0.7);
    }
}
