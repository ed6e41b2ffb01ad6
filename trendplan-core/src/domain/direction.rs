//! Direction and confidence labels carried by a trading plan.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Recommended trade direction. Class order matches the model output:
/// index 0 = SHORT, 1 = WAIT, 2 = LONG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Short,
    Wait,
    Long,
}

impl Direction {
    pub const ALL: [Direction; 3] = [Direction::Short, Direction::Wait, Direction::Long];

    pub fn from_class_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn label(&self) -> &'static str {
        match self {
            Direction::Short => "SHORT",
            Direction::Wait => "WAIT",
            Direction::Long => "LONG",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Confidence tier derived from the largest class probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Confidence {
    /// >0.8 very high, >0.65 high, >0.55 medium, otherwise low.
    pub fn from_max_probability(p: f64) -> Self {
        if p > 0.8 {
            Confidence::VeryHigh
        } else if p > 0.65 {
            Confidence::High
        } else if p > 0.55 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}
