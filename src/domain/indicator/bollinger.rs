//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev is the sample standard deviation (divides by N-1).
//! Default parameters: period=20, multiplier=2.0

use crate::domain::indicator::{calculate_sma, calculate_stddev};

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_MULT_X100: u32 = 200;

/// Returns `(upper, middle, lower)`.
pub fn calculate_bollinger(
    closes: &[f64],
    period: usize,
    stddev_mult_x100: u32,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let mult = stddev_mult_x100 as f64 / 100.0;
    let middle = calculate_sma(closes, period);
    let stddev = calculate_stddev(closes, period);

    let upper = middle
        .iter()
        .zip(&stddev)
        .map(|(m, s)| m + mult * s)
        .collect();
    let lower = middle
        .iter()
        .zip(&stddev)
        .map(|(m, s)| m - mult * s)
        .collect();

    (upper, middle, lower)
}
