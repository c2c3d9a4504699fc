//! Market data port.

use crate::domain::candle::Candle;
use crate::domain::error::BacktestError;

pub trait DataPort {
    /// Candles for `symbol` at `timeframe`, sorted ascending by time.
    fn fetch_candles(&self, symbol: &str, timeframe: &str) -> Result<Vec<Candle>, BacktestError>;
}
