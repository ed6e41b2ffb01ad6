//! Domain types for TrendPlan

pub mod candle;
pub mod direction;

pub use candle::{validate_series, Candle};
pub use direction::{Confidence, Direction};
