//! Report output port.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::BacktestError;

pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output_path: &str) -> Result<(), BacktestError>;
}
