//! Performance analysis: equity curve, drawdown series and summary metrics.
//!
//! Markets are assumed continuous (24/7), so annualization uses 365 periods.
//! Every degenerate case (empty series, zero variance, no losing trades)
//! resolves to a documented finite value rather than NaN or infinity.

use crate::domain::candle::Candle;
use crate::domain::position::Trade;
use serde::{Deserialize, Serialize};

pub const ANNUALIZATION_DAYS: f64 = 365.0;

/// Sortino reported when there are no downside returns and the mean excess return is positive.
pub const SORTINO_NO_DOWNSIDE_CAP: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub time: i64,
    pub equity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawdownPoint {
    pub time: i64,
    pub drawdown: f64,
    pub drawdown_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    /// Largest peak-to-trough fall in currency, reported as a value <= 0.
    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub total_return: f64,
    pub total_return_pct: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub breakeven_trades: usize,
    pub gross_profit: f64,
    /// Sum of losing PnL, <= 0.
    pub gross_loss: f64,
    pub avg_win: f64,
    /// Mean losing PnL, <= 0.
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_trade_duration_secs: f64,
    pub final_equity: f64,
}

/// Everything the analyzer derives from one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub equity_curve: Vec<EquityPoint>,
    pub drawdown_series: Vec<DrawdownPoint>,
    pub metrics: PerformanceMetrics,
}

pub fn analyze(
    candles: &[Candle],
    trades: &[Trade],
    initial_capital: f64,
    risk_free_rate: f64,
) -> Analysis {
    let equity_curve = equity_curve(candles, trades, initial_capital);
    let drawdown_series = drawdown_series(&equity_curve);
    let metrics = PerformanceMetrics::compute(
        &equity_curve,
        &drawdown_series,
        trades,
        initial_capital,
        risk_free_rate,
    );
    Analysis {
        equity_curve,
        drawdown_series,
        metrics,
    }
}

impl PerformanceMetrics {
    pub fn compute(
        equity_curve: &[EquityPoint],
        drawdown_series: &[DrawdownPoint],
        trades: &[Trade],
        initial_capital: f64,
        risk_free_rate: f64,
    ) -> Self {
        let returns = returns(equity_curve);

        let max_drawdown = drawdown_series
            .iter()
            .map(|d| d.drawdown)
            .fold(0.0_f64, f64::min);
        let max_drawdown_pct = drawdown_series
            .iter()
            .map(|d| d.drawdown_pct)
            .fold(0.0_f64, f64::min);

        let mut winning_trades = 0usize;
        let mut losing_trades = 0usize;
        let mut breakeven_trades = 0usize;
        let mut gross_profit = 0.0_f64;
        let mut gross_loss = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_duration = 0i64;

        for trade in trades {
            // Classified at report precision.
            let pnl = round_to(trade.pnl, TRADE_PNL_PLACES);
            if pnl > 0.0 {
                winning_trades += 1;
                gross_profit += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                losing_trades += 1;
                gross_loss += pnl;
                largest_loss = largest_loss.min(pnl);
            } else {
                breakeven_trades += 1;
            }
            total_duration += trade.duration_secs();
        }

        let total_trades = trades.len();
        let total_return = gross_profit + gross_loss;
        let total_return_pct = if initial_capital != 0.0 {
            total_return / initial_capital * 100.0
        } else {
            0.0
        };

        let avg_win = if winning_trades > 0 {
            gross_profit / winning_trades as f64
        } else {
            0.0
        };
        let avg_loss = if losing_trades > 0 {
            gross_loss / losing_trades as f64
        } else {
            0.0
        };
        let avg_trade_duration_secs = if total_trades > 0 {
            total_duration as f64 / total_trades as f64
        } else {
            0.0
        };

        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_capital);

        PerformanceMetrics {
            sharpe_ratio: sharpe_ratio(&returns, risk_free_rate),
            sortino_ratio: sortino_ratio(&returns, risk_free_rate),
            max_drawdown,
            max_drawdown_pct,
            win_rate: win_rate(winning_trades, total_trades),
            profit_factor: profit_factor(gross_profit, gross_loss),
            total_return,
            total_return_pct,
            total_trades,
            winning_trades,
            losing_trades,
            breakeven_trades,
            gross_profit,
            gross_loss,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            avg_trade_duration_secs,
            final_equity,
        }
    }

    /// Ratios to 4 decimals, currency and percentages to 2.
    pub fn rounded(&self) -> Self {
        PerformanceMetrics {
            sharpe_ratio: round_to(self.sharpe_ratio, 4),
            sortino_ratio: round_to(self.sortino_ratio, 4),
            max_drawdown: round_to(self.max_drawdown, 2),
            max_drawdown_pct: round_to(self.max_drawdown_pct, 2),
            win_rate: round_to(self.win_rate, 2),
            profit_factor: round_to(self.profit_factor, 4),
            total_return: round_to(self.total_return, 2),
            total_return_pct: round_to(self.total_return_pct, 2),
            gross_profit: round_to(self.gross_profit, 2),
            gross_loss: round_to(self.gross_loss, 2),
            avg_win: round_to(self.avg_win, 2),
            avg_loss: round_to(self.avg_loss, 2),
            largest_win: round_to(self.largest_win, 2),
            largest_loss: round_to(self.largest_loss, 2),
            avg_trade_duration_secs: round_to(self.avg_trade_duration_secs, 2),
            final_equity: round_to(self.final_equity, 2),
            ..self.clone()
        }
    }
}

/// Initial capital plus realized PnL booked on each trade's exit candle.
/// Trades whose exit time matches no candle are not booked.
pub fn equity_curve(candles: &[Candle], trades: &[Trade], initial_capital: f64) -> Vec<EquityPoint> {
    let mut booked = vec![0.0; candles.len()];
    for trade in trades {
        if let Ok(idx) = candles.binary_search_by_key(&trade.exit_time, |c| c.time) {
            booked[idx] += trade.pnl;
        }
    }

    let mut cumulative = 0.0;
    candles
        .iter()
        .zip(booked)
        .map(|(candle, pnl)| {
            cumulative += pnl;
            EquityPoint {
                time: candle.time,
                equity: initial_capital + cumulative,
            }
        })
        .collect()
}

/// Period-over-period returns. The first return is 0; a zero previous equity yields 0.
pub fn returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    if equity_curve.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(equity_curve.len());
    out.push(0.0);
    for w in equity_curve.windows(2) {
        let prev = w[0].equity;
        let curr = w[1].equity;
        let r = if prev != 0.0 { (curr - prev) / prev } else { 0.0 };
        out.push(if r.is_finite() { r } else { 0.0 });
    }
    out
}

pub fn drawdown_series(equity_curve: &[EquityPoint]) -> Vec<DrawdownPoint> {
    let mut running_max = f64::NEG_INFINITY;
    equity_curve
        .iter()
        .map(|point| {
            running_max = running_max.max(point.equity);
            let drawdown = point.equity - running_max;
            let pct = drawdown / running_max * 100.0;
            DrawdownPoint {
                time: point.time,
                drawdown,
                drawdown_pct: if running_max != 0.0 && pct.is_finite() {
                    pct
                } else {
                    0.0
                },
            }
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator). NaN for fewer than two values.
fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn excess_returns(returns: &[f64], risk_free_rate: f64) -> Vec<f64> {
    let daily_rf = risk_free_rate / ANNUALIZATION_DAYS;
    returns.iter().map(|r| r - daily_rf).collect()
}

/// mean(excess) / std(excess) * sqrt(365). 0 when undefined.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let excess = excess_returns(returns, risk_free_rate);
    let std = sample_stddev(&excess);
    if std == 0.0 || !std.is_finite() {
        return 0.0;
    }
    let sharpe = mean(&excess) / std * ANNUALIZATION_DAYS.sqrt();
    if sharpe.is_finite() { sharpe } else { 0.0 }
}

/// mean(excess) / sqrt(mean(d^2)) * sqrt(365) over negative excess returns d.
pub fn sortino_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let excess = excess_returns(returns, risk_free_rate);
    let mean_excess = mean(&excess);
    let downside: Vec<f64> = excess.iter().copied().filter(|r| *r < 0.0).collect();

    if downside.is_empty() {
        return if mean_excess > 0.0 {
            SORTINO_NO_DOWNSIDE_CAP
        } else {
            0.0
        };
    }

    let downside_dev = mean(&downside.iter().map(|d| d * d).collect::<Vec<_>>()).sqrt();
    if downside_dev == 0.0 || !downside_dev.is_finite() {
        return 0.0;
    }
    let sortino = mean_excess / downside_dev * ANNUALIZATION_DAYS.sqrt();
    if sortino.is_finite() { sortino } else { 0.0 }
}

/// gross_profit / |gross_loss|; with no losses, the gross profit itself (0 if none).
pub fn profit_factor(gross_profit: f64, gross_loss: f64) -> f64 {
    if gross_loss == 0.0 {
        if gross_profit > 0.0 { gross_profit } else { 0.0 }
    } else {
        (gross_profit / gross_loss).abs()
    }
}

/// Percentage of winning trades, 0 with no trades.
pub fn win_rate(winning: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        winning as f64 / total as f64 * 100.0
    }
}

/// Decimal places trade pnl is reported and classified at.
pub const TRADE_PNL_PLACES: i32 = 4;

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 { 0.0 } else { rounded }
}
