//! Backtest orchestration.
//!
//! One run: compile the strategy, build the column frame, evaluate entry and
//! exit signals, replay trades and hand everything to the analyzer.

use crate::domain::candle::Candle;
use crate::domain::frame::Frame;
use crate::domain::metrics::{
    self, DrawdownPoint, EquityPoint, PerformanceMetrics, TRADE_PNL_PLACES, round_to,
};
use crate::domain::position::{Outcome, Trade};
use crate::domain::signal::evaluate_rules;
use crate::domain::simulation::simulate;
use crate::domain::strategy::{CompiledStrategy, StrategySpec};
use serde::{Deserialize, Serialize};

/// Candles required beyond the slow SMA period before a run is attempted.
pub const MIN_EXTRA_CANDLES: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub symbol: String,
    pub timeframe: String,
    pub initial_capital: f64,
    pub sma_fast: usize,
    pub sma_slow: usize,
    pub risk_free_rate: f64,
}

impl BacktestConfig {
    pub fn min_candles(&self) -> usize {
        self.sma_slow.saturating_add(MIN_EXTRA_CANDLES)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub symbol: String,
    pub timeframe: String,
    pub strategy_name: String,
    pub metrics: PerformanceMetrics,
    pub equity_curve: Vec<EquityPoint>,
    pub drawdown_series: Vec<DrawdownPoint>,
    pub trades: Vec<Trade>,
}

/// Run one backtest. With no `strategy` the SMA crossover of
/// `config.sma_fast`/`config.sma_slow` is used.
///
/// Too few candles yields a result with no trades and equity flat at the
/// initial capital.
pub fn run_backtest(
    candles: &[Candle],
    config: &BacktestConfig,
    strategy: Option<&StrategySpec>,
) -> BacktestResult {
    let compiled = match strategy {
        Some(spec) => CompiledStrategy::compile(spec, config.sma_fast, config.sma_slow),
        None => CompiledStrategy::default_crossover(config.sma_fast, config.sma_slow),
    };

    if candles.len() < config.min_candles() {
        tracing::warn!(
            candles = candles.len(),
            required = config.min_candles(),
            "insufficient data for backtest"
        );
        return assemble(candles, config, &compiled.name, Vec::new());
    }

    tracing::info!(
        symbol = %config.symbol,
        timeframe = %config.timeframe,
        strategy = %compiled.name,
        candles = candles.len(),
        "running backtest"
    );

    let trades = replay(candles, &compiled);
    let result = assemble(candles, config, &compiled.name, trades);

    tracing::info!(
        trades = result.metrics.total_trades,
        win_rate = result.metrics.win_rate,
        total_return_pct = result.metrics.total_return_pct,
        "backtest complete"
    );
    result
}

/// Indicators, signals and the simulation pass for a compiled strategy.
pub fn replay(candles: &[Candle], strategy: &CompiledStrategy) -> Vec<Trade> {
    let mut frame = Frame::from_candles(candles);
    for kind in &strategy.indicators {
        frame.add_indicator(kind);
    }

    let ready = frame.ready_mask(&strategy.referenced_columns());
    let entry = evaluate_rules(&frame, &strategy.entry);
    let exit = evaluate_rules(&frame, &strategy.exit);

    tracing::debug!(
        entries = entry.iter().filter(|e| **e).count(),
        exits = exit.iter().filter(|e| **e).count(),
        "signals evaluated"
    );

    simulate(candles, &entry, &exit, &ready, &strategy.simulation_params())
}

fn assemble(
    candles: &[Candle],
    config: &BacktestConfig,
    strategy_name: &str,
    trades: Vec<Trade>,
) -> BacktestResult {
    let trades: Vec<Trade> = trades.into_iter().map(round_trade).collect();
    let analysis = metrics::analyze(
        candles,
        &trades,
        config.initial_capital,
        config.risk_free_rate,
    );

    BacktestResult {
        symbol: config.symbol.clone(),
        timeframe: config.timeframe.clone(),
        strategy_name: strategy_name.to_string(),
        metrics: analysis.metrics.rounded(),
        equity_curve: analysis
            .equity_curve
            .into_iter()
            .map(|p| EquityPoint {
                time: p.time,
                equity: round_to(p.equity, 2),
            })
            .collect(),
        drawdown_series: analysis
            .drawdown_series
            .into_iter()
            .map(|d| DrawdownPoint {
                time: d.time,
                drawdown: round_to(d.drawdown, 2),
                drawdown_pct: round_to(d.drawdown_pct, 2),
            })
            .collect(),
        trades,
    }
}

fn round_trade(trade: Trade) -> Trade {
    let pnl = round_to(trade.pnl, TRADE_PNL_PLACES);
    Trade {
        pnl,
        pnl_percent: round_to(trade.pnl_percent, TRADE_PNL_PLACES),
        outcome: Outcome::from_pnl(pnl),
        ..trade
    }
}
