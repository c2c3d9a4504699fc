//! CSV file market data adapter.
//!
//! Files live under a base directory as `<SYMBOL>_<timeframe>.csv`, with any
//! `/` removed from the symbol (`BTC/USDT` at `1h` reads `BTCUSDT_1h.csv`).
//! Header: `time,open,high,low,close,volume`.

use crate::domain::candle::Candle;
use crate::domain::error::BacktestError;
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Integer timestamps above this are taken as milliseconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

pub struct CsvAdapter {
    base_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CandleRow {
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn csv_path(&self, symbol: &str, timeframe: &str) -> PathBuf {
        let symbol: String = symbol.chars().filter(|c| *c != '/').collect();
        self.base_path.join(format!("{symbol}_{timeframe}.csv"))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_candles(&self, symbol: &str, timeframe: &str) -> Result<Vec<Candle>, BacktestError> {
        let path = self.csv_path(symbol, timeframe);
        tracing::debug!(path = %path.display(), "loading candles");
        read_candles(&path)
    }
}

/// Read a candle CSV. Rows come back sorted by time; on duplicate
/// timestamps the last row in the file wins.
pub fn read_candles(path: &Path) -> Result<Vec<Candle>, BacktestError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| BacktestError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

    let mut candles = Vec::new();
    for (line, row) in rdr.deserialize::<CandleRow>().enumerate() {
        let row = row.map_err(|e| BacktestError::Data {
            reason: format!("CSV parse error: {}", e),
        })?;
        let time = parse_time(&row.time).ok_or_else(|| BacktestError::Data {
            reason: format!("invalid time '{}' on data row {}", row.time, line + 1),
        })?;
        candles.push(Candle {
            time,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }

    candles.sort_by_key(|c| c.time);
    let mut deduped: Vec<Candle> = Vec::with_capacity(candles.len());
    for candle in candles {
        match deduped.last_mut() {
            Some(last) if last.time == candle.time => *last = candle,
            _ => deduped.push(candle),
        }
    }

    tracing::debug!(rows = deduped.len(), "candles loaded");
    Ok(deduped)
}

/// Unix seconds, Unix milliseconds, RFC 3339, `%Y-%m-%d %H:%M:%S` or `%Y-%m-%d` (UTC).
fn parse_time(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<i64>() {
        return Some(if n > MILLIS_THRESHOLD { n / 1000 } else { n });
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.and_utc().timestamp());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}
