#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use tradereplay::domain::backtest::{BacktestConfig, BacktestResult};
pub use tradereplay::domain::candle::Candle;
use tradereplay::domain::error::BacktestError;
use tradereplay::ports::data_port::DataPort;
use tradereplay::ports::report_port::ReportPort;

pub const START_TIME: i64 = 1_704_067_200;
pub const HOUR: i64 = 3_600;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Candle>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_candles(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.data.insert(symbol.to_string(), candles);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_candles(&self, symbol: &str, _timeframe: &str) -> Result<Vec<Candle>, BacktestError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(BacktestError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }
}

/// Captures the last written result instead of touching disk.
pub struct MockReportPort {
    pub written: RefCell<Option<(BacktestResult, String)>>,
}

impl MockReportPort {
    pub fn new() -> Self {
        Self {
            written: RefCell::new(None),
        }
    }
}

impl ReportPort for MockReportPort {
    fn write(&self, result: &BacktestResult, output_path: &str) -> Result<(), BacktestError> {
        *self.written.borrow_mut() = Some((result.clone(), output_path.to_string()));
        Ok(())
    }
}

pub fn make_candle(index: usize, close: f64) -> Candle {
    Candle {
        time: START_TIME + index as i64 * HOUR,
        open: close,
        high: close,
        low: close,
        close,
        volume: 1_000.0,
    }
}

pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_candle(i, c))
        .collect()
}

/// A deterministic oscillating series with a slow upward drift.
pub fn generate_candles(n: usize) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.35).sin() * 8.0 + i as f64 * 0.05;
            Candle {
                time: START_TIME + i as i64 * HOUR,
                open: close - 0.2,
                high: close + 0.5,
                low: close - 0.5,
                close,
                volume: 500.0 + i as f64,
            }
        })
        .collect()
}

pub fn sample_config() -> BacktestConfig {
    BacktestConfig {
        symbol: "BTC/USDT".to_string(),
        timeframe: "1h".to_string(),
        initial_capital: 10_000.0,
        sma_fast: 5,
        sma_slow: 15,
        risk_free_rate: 0.0,
    }
}

/// Render candles in the CSV adapter's format.
pub fn candles_csv(candles: &[Candle]) -> String {
    let mut out = String::from("time,open,high,low,close,volume\n");
    for c in candles {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            c.time, c.open, c.high, c.low, c.close, c.volume
        ));
    }
    out
}
