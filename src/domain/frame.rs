//! Column frame a run evaluates conditions against.
//!
//! Holds the price columns (`open`, `high`, `low`, `close`, `volume`) and one
//! column per indicator output, all aligned with the candle index.

use crate::domain::candle::Candle;
use crate::domain::indicator::{self, IndicatorKind};
use std::collections::HashMap;

pub const PRICE_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

#[derive(Debug, Clone, Default)]
pub struct Frame {
    len: usize,
    columns: HashMap<String, Vec<f64>>,
}

impl Frame {
    pub fn from_candles(candles: &[Candle]) -> Self {
        let mut frame = Self {
            len: candles.len(),
            columns: HashMap::with_capacity(PRICE_COLUMNS.len()),
        };
        frame.insert("open", candles.iter().map(|c| c.open).collect());
        frame.insert("high", candles.iter().map(|c| c.high).collect());
        frame.insert("low", candles.iter().map(|c| c.low).collect());
        frame.insert("close", candles.iter().map(|c| c.close).collect());
        frame.insert("volume", candles.iter().map(|c| c.volume).collect());
        frame
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert or replace a column. Columns must match the frame length.
    pub fn insert(&mut self, name: &str, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.len, "column {name} misaligned");
        self.columns.insert(name.to_string(), values);
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(|v| v.as_slice())
    }

    /// Compute an indicator over the close column and add its outputs.
    /// A later indicator with the same column name replaces the earlier one.
    /// Outputs named like a price column are dropped; candle data is never
    /// overwritten.
    pub fn add_indicator(&mut self, kind: &IndicatorKind) -> Vec<String> {
        let closes = self.get("close").map(|c| c.to_vec()).unwrap_or_default();
        let series = indicator::compute(&closes, kind);
        let mut added = Vec::new();
        for (name, values) in series.columns() {
            if PRICE_COLUMNS.contains(&name.as_str()) {
                tracing::warn!(column = %name, "indicator output shadows a price column, skipped");
                continue;
            }
            self.insert(&name, values.to_vec());
            added.push(name);
        }
        added
    }

    /// True at rows where none of `names` is NaN. Unknown names are ignored.
    pub fn ready_mask(&self, names: &[String]) -> Vec<bool> {
        let cols: Vec<&[f64]> = names.iter().filter_map(|n| self.get(n)).collect();
        (0..self.len)
            .map(|i| cols.iter().all(|c| !c[i].is_nan()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_candles(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                time: 1_700_000_000 + i as i64 * 3600,
                open: close - 1.0,
                high: close + 1.0,
                low: close - 2.0,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn from_candles_builds_price_columns() {
        let frame = Frame::from_candles(&make_candles(&[10.0, 11.0]));
        assert_eq!(frame.len(), 2);
        for name in PRICE_COLUMNS {
            assert!(frame.get(name).is_some(), "missing {name}");
        }
        assert_eq!(frame.get("high"), Some(&[11.0, 12.0][..]));
    }

    #[test]
    fn add_indicator_inserts_named_columns() {
        let mut frame = Frame::from_candles(&make_candles(&[1.0, 2.0, 3.0, 4.0]));
        let added = frame.add_indicator(&IndicatorKind::Sma(2));
        assert_eq!(added, vec!["sma_2"]);
        let sma = frame.get("sma_2").unwrap();
        assert!(sma[0].is_nan());
        assert!((sma[3] - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn later_indicator_replaces_same_column() {
        let mut frame = Frame::from_candles(&make_candles(&[1.0, 2.0, 3.0, 4.0, 5.0]));
        frame.add_indicator(&IndicatorKind::Bollinger {
            period: 2,
            stddev_mult_x100: 100,
        });
        frame.add_indicator(&IndicatorKind::Bollinger {
            period: 3,
            stddev_mult_x100: 100,
        });
        let middle = frame.get("bb_middle").unwrap();
        assert!(middle[1].is_nan());
        assert!((middle[2] - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_indicator_cannot_replace_price_column() {
        let mut frame = Frame::from_candles(&make_candles(&[100.0, 101.0, 102.0]));
        let added = frame.add_indicator(&IndicatorKind::Unknown {
            name: "Volume".to_string(),
            period: None,
        });
        assert!(added.is_empty());
        assert_eq!(frame.get("volume"), Some(&[1000.0, 1000.0, 1000.0][..]));

        let added = frame.add_indicator(&IndicatorKind::Unknown {
            name: "atr".to_string(),
            period: Some(3),
        });
        assert_eq!(added, vec!["atr_3"]);
        assert_eq!(frame.get("atr_3"), Some(&[100.0, 101.0, 102.0][..]));
    }

    #[test]
    fn ready_mask_tracks_nan_rows() {
        let mut frame = Frame::from_candles(&make_candles(&[1.0, 2.0, 3.0, 4.0]));
        frame.add_indicator(&IndicatorKind::Sma(3));
        let mask = frame.ready_mask(&["sma_3".to_string(), "close".to_string()]);
        assert_eq!(mask, vec![false, false, true, true]);
    }

    #[test]
    fn ready_mask_ignores_unknown_columns() {
        let frame = Frame::from_candles(&make_candles(&[1.0, 2.0]));
        assert_eq!(frame.ready_mask(&["nope".to_string()]), vec![true, true]);
    }
}
