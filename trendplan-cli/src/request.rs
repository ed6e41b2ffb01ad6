//! JSON plan requests and responses.
//!
//! A request carries the timeframe, the model output and the market data,
//! either as explicit candles or as `[ms, value]` price/volume points. Any
//! failure while reading a request becomes a degraded plan, so a response is
//! always well-formed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use trendplan_core::profile::DEFAULT_TIMEFRAME;
use trendplan_core::{Candle, ModelOutput, PlanError, Planner, TradingPlan};

/// Half-width of the synthetic high/low band around a price point.
const POINT_BAND: f64 = 0.02;

#[derive(Debug, Deserialize)]
struct PlanRequest {
    #[serde(default = "default_timeframe")]
    timeframe: String,
    #[serde(default)]
    model_output: Value,
    #[serde(default)]
    candles: Option<Vec<Candle>>,
    #[serde(default)]
    historical_prices: Option<Vec<[f64; 2]>>,
    #[serde(default)]
    historical_volumes: Vec<[f64; 2]>,
    #[serde(flatten)]
    coin: CoinInfo,
}

fn default_timeframe() -> String {
    DEFAULT_TIMEFRAME.to_string()
}

/// Market context echoed back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinInfo {
    #[serde(default = "unknown_id", rename(deserialize = "coin_id"))]
    pub id: String,
    #[serde(default)]
    pub current_price: f64,
    #[serde(default)]
    pub market_cap: f64,
    #[serde(default)]
    pub volume_24h: f64,
}

fn unknown_id() -> String {
    "unknown".to_string()
}

impl Default for CoinInfo {
    fn default() -> Self {
        Self {
            id: unknown_id(),
            current_price: 0.0,
            market_cap: 0.0,
            volume_24h: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanResponse {
    #[serde(flatten)]
    pub plan: TradingPlan,
    pub coin_info: CoinInfo,
}

impl PlanResponse {
    pub fn is_degraded(&self) -> bool {
        self.plan.is_degraded()
    }
}

impl PlanRequest {
    fn model_output(&self) -> Result<ModelOutput, PlanError> {
        if self.model_output.is_null() {
            return Err(PlanError::MalformedModelOutput(
                "request has no model_output".into(),
            ));
        }
        ModelOutput::deserialize(&self.model_output)
            .map_err(|e| PlanError::MalformedModelOutput(e.to_string()))
    }

    fn candles(&self) -> Result<Vec<Candle>, PlanError> {
        if let Some(candles) = &self.candles {
            return Ok(candles.clone());
        }
        match &self.historical_prices {
            Some(prices) => candles_from_points(prices, &self.historical_volumes),
            None => Err(PlanError::InvalidTimeframeData(
                "request has neither candles nor historical_prices".into(),
            )),
        }
    }
}

/// Expand `[ms, price]` points into candles: open = close = price, high and
/// low at ±2 %. Volume is matched by position; missing volume is zero.
pub fn candles_from_points(
    prices: &[[f64; 2]],
    volumes: &[[f64; 2]],
) -> Result<Vec<Candle>, PlanError> {
    let mut candles = prices
        .iter()
        .enumerate()
        .map(|(i, &[ms, price])| {
            let timestamp = DateTime::<Utc>::from_timestamp_millis(ms as i64).ok_or_else(|| {
                PlanError::InvalidTimeframeData(format!("price point {i} has bad timestamp {ms}"))
            })?;
            Ok(Candle {
                timestamp,
                open: price,
                high: price * (1.0 + POINT_BAND),
                low: price * (1.0 - POINT_BAND),
                close: price,
                volume: volumes.get(i).map(|v| v[1]).unwrap_or(0.0),
            })
        })
        .collect::<Result<Vec<_>, PlanError>>()?;
    candles.sort_by_key(|c| c.timestamp);
    Ok(candles)
}

/// Plan a raw JSON request. Never fails: errors become a degraded plan.
pub fn handle_request(raw: &str, planner: &Planner) -> PlanResponse {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => return degraded(DEFAULT_TIMEFRAME, &invalid_request(e), CoinInfo::default()),
    };

    // Best-effort timeframe so even a broken request echoes it back.
    let timeframe = value
        .get("timeframe")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_TIMEFRAME)
        .to_string();

    let request: PlanRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => return degraded(&timeframe, &invalid_request(e), CoinInfo::default()),
    };

    let candles = match request.candles() {
        Ok(candles) => candles,
        Err(err) => return degraded(&request.timeframe, &err, request.coin),
    };

    let plan = match request.model_output() {
        Ok(output) => planner.plan_or_degraded(&candles, &request.timeframe, &output),
        Err(err) => {
            tracing::warn!(error = %err, "rejecting request");
            TradingPlan::degraded(&request.timeframe, &candles, &err)
        }
    };

    PlanResponse {
        plan,
        coin_info: request.coin,
    }
}

fn invalid_request(e: serde_json::Error) -> PlanError {
    PlanError::InvalidTimeframeData(format!("malformed request: {e}"))
}

fn degraded(timeframe: &str, err: &PlanError, coin_info: CoinInfo) -> PlanResponse {
    tracing::warn!(error = %err, "rejecting request");
    PlanResponse {
        plan: TradingPlan::degraded(timeframe, &[], err),
        coin_info,
    }
}
