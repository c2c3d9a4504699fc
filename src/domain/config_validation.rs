//! Configuration and input validation.
//!
//! Config fields are checked before a run; candle preconditions are checked
//! once the data is loaded.

use crate::domain::candle::Candle;
use crate::domain::error::BacktestError;
use crate::ports::config_port::ConfigPort;

pub const MIN_INITIAL_CAPITAL: f64 = 100.0;
pub const SMA_FAST_RANGE: (i64, i64) = (2, 50);
pub const SMA_SLOW_RANGE: (i64, i64) = (10, 200);

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    validate_required(config, "symbol")?;
    validate_required(config, "timeframe")?;
    validate_initial_capital(config)?;
    validate_sma_periods(config)?;
    validate_risk_free_rate(config)?;
    Ok(())
}

/// Non-empty, strictly ascending timestamps, non-negative finite prices and volume.
pub fn validate_candles(candles: &[Candle]) -> Result<(), BacktestError> {
    if candles.is_empty() {
        return Err(BacktestError::InvalidCandles {
            index: 0,
            reason: "no candles".to_string(),
        });
    }

    for (index, candle) in candles.iter().enumerate() {
        let fields = [
            ("open", candle.open),
            ("high", candle.high),
            ("low", candle.low),
            ("close", candle.close),
            ("volume", candle.volume),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(BacktestError::InvalidCandles {
                index,
                reason: format!("{name} must be a non-negative number, got {value}"),
            });
        }
        if index > 0 && candle.time <= candles[index - 1].time {
            return Err(BacktestError::InvalidCandles {
                index,
                reason: format!(
                    "time {} does not follow {}",
                    candle.time,
                    candles[index - 1].time
                ),
            });
        }
    }
    Ok(())
}

fn invalid(key: &str, reason: impl Into<String>) -> BacktestError {
    BacktestError::ConfigInvalid {
        section: "backtest".to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_required(config: &dyn ConfigPort, key: &str) -> Result<(), BacktestError> {
    match config.get_string("backtest", key) {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(BacktestError::ConfigMissing {
            section: "backtest".to_string(),
            key: key.to_string(),
        }),
    }
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let value = config.get_double("backtest", "initial_capital", 0.0);
    if value < MIN_INITIAL_CAPITAL {
        return Err(invalid(
            "initial_capital",
            format!("initial_capital must be at least {MIN_INITIAL_CAPITAL}"),
        ));
    }
    Ok(())
}

fn validate_sma_periods(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let fast = config.get_int("backtest", "sma_fast", 0);
    let slow = config.get_int("backtest", "sma_slow", 0);

    let (lo, hi) = SMA_FAST_RANGE;
    if !(lo..=hi).contains(&fast) {
        return Err(invalid(
            "sma_fast",
            format!("sma_fast must be between {lo} and {hi}"),
        ));
    }
    let (lo, hi) = SMA_SLOW_RANGE;
    if !(lo..=hi).contains(&slow) {
        return Err(invalid(
            "sma_slow",
            format!("sma_slow must be between {lo} and {hi}"),
        ));
    }
    if fast >= slow {
        return Err(invalid("sma_fast", "sma_fast must be less than sma_slow"));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let value = config.get_double("backtest", "risk_free_rate", 0.0);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}
