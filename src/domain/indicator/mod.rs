//! Technical indicator implementations.
//!
//! Every indicator is a pure function over the close series and returns values
//! aligned index-for-index with its input. Warm-up positions hold `NaN`.
//!
//! - `IndicatorKind`: indicator identity + parameters (tagged dispatch)
//! - `IndicatorOutput`: single- or multi-column output shape
//! - `IndicatorSeries`: a computed indicator with its named columns

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod stddev;

pub use bollinger::calculate_bollinger;
pub use ema::calculate_ema;
pub use macd::calculate_macd;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
pub use stddev::calculate_stddev;

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
    /// Unrecognised name. Computes to the raw close series.
    Unknown {
        name: String,
        period: Option<usize>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorOutput {
    Single(Vec<f64>),
    Macd {
        line: Vec<f64>,
        signal: Vec<f64>,
        histogram: Vec<f64>,
    },
    Bollinger {
        upper: Vec<f64>,
        middle: Vec<f64>,
        lower: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub kind: IndicatorKind,
    pub output: IndicatorOutput,
}

impl IndicatorKind {
    /// Column names this indicator contributes to a frame, in output order.
    pub fn column_names(&self) -> Vec<String> {
        match self {
            IndicatorKind::Sma(p) => vec![format!("sma_{p}")],
            IndicatorKind::Ema(p) => vec![format!("ema_{p}")],
            IndicatorKind::Rsi(p) => vec![format!("rsi_{p}")],
            IndicatorKind::Macd { .. } => vec![
                "macd".to_string(),
                "macd_signal".to_string(),
                "macd_histogram".to_string(),
            ],
            IndicatorKind::Bollinger { .. } => vec![
                "bb_upper".to_string(),
                "bb_middle".to_string(),
                "bb_lower".to_string(),
            ],
            IndicatorKind::Unknown { name, period } => {
                let base = name.trim().to_lowercase();
                match period {
                    Some(p) => vec![format!("{base}_{p}")],
                    None => vec![base],
                }
            }
        }
    }
}

impl IndicatorSeries {
    /// Named columns paired with their values.
    pub fn columns(&self) -> Vec<(String, &[f64])> {
        let names = self.kind.column_names();
        let values: Vec<&[f64]> = match &self.output {
            IndicatorOutput::Single(v) => vec![v.as_slice()],
            IndicatorOutput::Macd {
                line,
                signal,
                histogram,
            } => vec![line.as_slice(), signal.as_slice(), histogram.as_slice()],
            IndicatorOutput::Bollinger {
                upper,
                middle,
                lower,
            } => vec![upper.as_slice(), middle.as_slice(), lower.as_slice()],
        };
        names.into_iter().zip(values).collect()
    }

    pub fn len(&self) -> usize {
        match &self.output {
            IndicatorOutput::Single(v) => v.len(),
            IndicatorOutput::Macd { line, .. } => line.len(),
            IndicatorOutput::Bollinger { middle, .. } => middle.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Compute `kind` over `closes`.
pub fn compute(closes: &[f64], kind: &IndicatorKind) -> IndicatorSeries {
    let output = match kind {
        IndicatorKind::Sma(period) => IndicatorOutput::Single(calculate_sma(closes, *period)),
        IndicatorKind::Ema(period) => IndicatorOutput::Single(calculate_ema(closes, *period)),
        IndicatorKind::Rsi(period) => IndicatorOutput::Single(calculate_rsi(closes, *period)),
        IndicatorKind::Macd { fast, slow, signal } => {
            let (line, signal, histogram) = calculate_macd(closes, *fast, *slow, *signal);
            IndicatorOutput::Macd {
                line,
                signal,
                histogram,
            }
        }
        IndicatorKind::Bollinger {
            period,
            stddev_mult_x100,
        } => {
            let (upper, middle, lower) = calculate_bollinger(closes, *period, *stddev_mult_x100);
            IndicatorOutput::Bollinger {
                upper,
                middle,
                lower,
            }
        }
        IndicatorKind::Unknown { .. } => IndicatorOutput::Single(closes.to_vec()),
    };

    IndicatorSeries {
        kind: kind.clone(),
        output,
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::Sma(period) => write!(f, "SMA({})", period),
            IndicatorKind::Ema(period) => write!(f, "EMA({})", period),
            IndicatorKind::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorKind::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorKind::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
            IndicatorKind::Unknown { name, period: None } => write!(f, "{}", name),
            IndicatorKind::Unknown {
                name,
                period: Some(p),
            } => write!(f, "{}({})", name, p),
        }
    }
}
