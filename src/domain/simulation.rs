//! Single-position trade replay.
//!
//! Walks the candle series once. Per candle, in order:
//! 1. Rows that are not ready (indicator warm-up) are skipped entirely
//! 2. FLAT + entry signal: open at the close
//! 3. OPEN (not opened on this candle): stop-loss, then take-profit, then exit signal
//!
//! A position still open after the last candle is dropped.

use crate::domain::candle::Candle;
use crate::domain::position::{Direction, ExitReason, Position, Trade};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimulationParams {
    pub direction: Direction,
    /// Fraction of entry price, e.g. 0.02 for 2%.
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub trailing_stop: bool,
}

pub fn simulate(
    candles: &[Candle],
    entry: &[bool],
    exit: &[bool],
    ready: &[bool],
    params: &SimulationParams,
) -> Vec<Trade> {
    let mut trades = Vec::new();
    let mut position: Option<Position> = None;

    for (i, candle) in candles.iter().enumerate() {
        if !ready.get(i).copied().unwrap_or(false) {
            continue;
        }

        match position.as_mut() {
            None => {
                if entry.get(i).copied().unwrap_or(false) {
                    position = Some(Position::open(
                        candle.time,
                        candle.close,
                        params.direction,
                        params.stop_loss,
                        params.take_profit,
                    ));
                }
            }
            Some(pos) => {
                let closing = if pos.should_stop_loss(candle.low, candle.high) {
                    pos.stop_loss_price.map(|p| (p, ExitReason::StopLoss))
                } else if pos.should_take_profit(candle.low, candle.high) {
                    pos.take_profit_price.map(|p| (p, ExitReason::TakeProfit))
                } else if exit.get(i).copied().unwrap_or(false) {
                    Some((candle.close, ExitReason::Signal))
                } else {
                    None
                };

                match closing {
                    Some((price, reason)) => {
                        trades.push(pos.close(candle.time, price, reason));
                        position = None;
                    }
                    None => {
                        if let (true, Some(sl)) = (params.trailing_stop, params.stop_loss) {
                            pos.trail_stop(candle.low, candle.high, sl);
                        }
                    }
                }
            }
        }
    }

    trades
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::Outcome;

    fn make_candles(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                time: 1000 + i as i64 * 60,
                open: close,
                high: close,
                low: close,
                close,
                volume: 1.0,
            })
            .collect()
    }

    fn flags(n: usize, on: &[usize]) -> Vec<bool> {
        (0..n).map(|i| on.contains(&i)).collect()
    }

    #[test]
    fn entry_then_signal_exit() {
        let candles = make_candles(&[10.0, 11.0, 12.0, 13.0]);
        let trades = simulate(
            &candles,
            &flags(4, &[1]),
            &flags(4, &[3]),
            &[true; 4],
            &SimulationParams::default(),
        );
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].entry_time, 1060);
        assert_eq!(trades[0].exit_time, 1180);
        assert!((trades[0].pnl - 2.0).abs() < f64::EPSILON);
        assert_eq!(trades[0].exit_reason, ExitReason::Signal);
    }

    #[test]
    fn no_exit_on_entry_candle() {
        let candles = make_candles(&[10.0, 11.0, 12.0]);
        let trades = simulate(
            &candles,
            &flags(3, &[0]),
            &flags(3, &[0, 2]),
            &[true; 3],
            &SimulationParams::default(),
        );
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit_time, 1120);
    }

    #[test]
    fn entry_ignored_while_open() {
        let candles = make_candles(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let trades = simulate(
            &candles,
            &flags(5, &[0, 1, 2]),
            &flags(5, &[3]),
            &[true; 5],
            &SimulationParams::default(),
        );
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].entry_time, 1000);
    }

    #[test]
    fn open_position_at_end_is_dropped() {
        let candles = make_candles(&[10.0, 11.0, 12.0]);
        let trades = simulate(
            &candles,
            &flags(3, &[1]),
            &flags(3, &[]),
            &[true; 3],
            &SimulationParams::default(),
        );
        assert!(trades.is_empty());
    }

    #[test]
    fn warmup_rows_are_skipped() {
        let candles = make_candles(&[10.0, 11.0, 12.0, 13.0]);
        let trades = simulate(
            &candles,
            &flags(4, &[0, 2]),
            &flags(4, &[3]),
            &[false, false, true, true],
            &SimulationParams::default(),
        );
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].entry_time, 1120);
    }

    #[test]
    fn stop_loss_has_priority_over_signal() {
        let mut candles = make_candles(&[100.0, 100.0, 100.0]);
        candles[2].low = 90.0;
        let params = SimulationParams {
            stop_loss: Some(0.05),
            ..Default::default()
        };
        let trades = simulate(&candles, &flags(3, &[0]), &flags(3, &[2]), &[true; 3], &params);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit_reason, ExitReason::StopLoss);
        assert!((trades[0].exit_price - 95.0).abs() < 1e-9);
        assert_eq!(trades[0].outcome, Outcome::Loss);
    }

    #[test]
    fn take_profit_exits_at_target() {
        let mut candles = make_candles(&[100.0, 100.0, 100.0]);
        candles[1].high = 112.0;
        let params = SimulationParams {
            take_profit: Some(0.1),
            ..Default::default()
        };
        let trades = simulate(&candles, &flags(3, &[0]), &flags(3, &[]), &[true; 3], &params);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit_reason, ExitReason::TakeProfit);
        assert!((trades[0].exit_price - 110.0).abs() < 1e-9);
    }

    #[test]
    fn stop_checked_before_take_profit() {
        let mut candles = make_candles(&[100.0, 100.0]);
        candles[1].high = 120.0;
        candles[1].low = 80.0;
        let params = SimulationParams {
            stop_loss: Some(0.05),
            take_profit: Some(0.05),
            ..Default::default()
        };
        let trades = simulate(&candles, &flags(2, &[0]), &flags(2, &[]), &[true; 2], &params);
        assert_eq!(trades[0].exit_reason, ExitReason::StopLoss);
    }

    #[test]
    fn short_direction_profits_on_decline() {
        let candles = make_candles(&[100.0, 90.0, 80.0]);
        let params = SimulationParams {
            direction: Direction::Short,
            ..Default::default()
        };
        let trades = simulate(&candles, &flags(3, &[0]), &flags(3, &[2]), &[true; 3], &params);
        assert!((trades[0].pnl - 20.0).abs() < f64::EPSILON);
        assert_eq!(trades[0].direction, Direction::Short);
    }

    #[test]
    fn trailing_stop_locks_in_gains() {
        let mut candles = make_candles(&[100.0, 120.0, 115.0, 105.0]);
        candles[3].low = 105.0;
        let params = SimulationParams {
            stop_loss: Some(0.1),
            trailing_stop: true,
            ..Default::default()
        };
        let trades = simulate(&candles, &flags(4, &[0]), &flags(4, &[]), &[true; 4], &params);
        // stop trails to 120 * 0.9 = 108 after candle 1
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit_reason, ExitReason::StopLoss);
        assert!((trades[0].exit_price - 108.0).abs() < 1e-9);
        assert_eq!(trades[0].outcome, Outcome::Win);
    }

    #[test]
    fn trades_never_overlap() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i % 7) as f64).collect();
        let candles = make_candles(&closes);
        let entry: Vec<bool> = (0..30).map(|i| i % 3 == 0).collect();
        let exit: Vec<bool> = (0..30).map(|i| i % 4 == 0).collect();
        let trades = simulate(&candles, &entry, &exit, &[true; 30], &SimulationParams::default());
        for t in &trades {
            assert!(t.exit_time > t.entry_time);
        }
        for pair in trades.windows(2) {
            assert!(pair[1].entry_time >= pair[0].exit_time);
        }
    }
}
