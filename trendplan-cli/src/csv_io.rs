//! CSV import of candles and export of feature rows.
//!
//! Candle files carry a header `timestamp,open,high,low,close,volume`. The
//! timestamp is either RFC 3339 or epoch milliseconds.

use std::io::{Read, Write};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use trendplan_core::{Candle, FeatureRow};

#[derive(Debug, Deserialize)]
struct CandleRecord {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ms) = raw.parse::<i64>() {
        return DateTime::<Utc>::from_timestamp_millis(ms)
            .ok_or_else(|| anyhow!("epoch millis out of range: {ms}"));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("unrecognised timestamp '{raw}'"))
}

/// Read candles from CSV. Order is preserved; validation happens in the core.
pub fn read_candles<R: Read>(reader: R) -> Result<Vec<Candle>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut candles = Vec::new();
    for (line, record) in rdr.deserialize::<CandleRecord>().enumerate() {
        let record = record.with_context(|| format!("bad candle record {}", line + 1))?;
        candles.push(Candle {
            timestamp: parse_timestamp(&record.timestamp)
                .with_context(|| format!("bad candle record {}", line + 1))?,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
        });
    }
    Ok(candles)
}

/// Write feature rows as CSV, one line per row.
pub fn write_features<W: Write>(rows: &[FeatureRow], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record([
        "index",
        "timestamp",
        "close",
        "ema_fast",
        "ema_slow",
        "rsi",
        "volatility",
        "momentum",
        "volume_ratio",
        "body_size",
        "upper_shadow",
        "lower_shadow",
        "engulfing",
        "doji",
        "break_of_structure",
        "fair_value_gap",
    ])?;

    for row in rows {
        wtr.write_record([
            row.index.to_string(),
            row.candle.timestamp.to_rfc3339(),
            format!("{:.6}", row.close()),
            format!("{:.6}", row.ema_fast),
            format!("{:.6}", row.ema_slow),
            format!("{:.2}", row.rsi),
            format!("{:.6}", row.volatility),
            format!("{:.6}", row.momentum),
            format!("{:.4}", row.volume_ratio),
            format!("{:.6}", row.body_size),
            format!("{:.6}", row.upper_shadow),
            format!("{:.6}", row.lower_shadow),
            u8::from(row.engulfing).to_string(),
            u8::from(row.doji).to_string(),
            u8::from(row.break_of_structure).to_string(),
            u8::from(row.fair_value_gap).to_string(),
        ])?;
    }

    wtr.flush().context("failed to flush CSV writer")?;
    Ok(())
}
