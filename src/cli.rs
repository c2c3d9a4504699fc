//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{self, CsvAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult};
use crate::domain::candle::{self, Candle};
use crate::domain::condition::Comparator;
use crate::domain::condition_parser;
use crate::domain::config_validation::{validate_backtest_config, validate_candles};
use crate::domain::error::BacktestError;
use crate::domain::indicator;
use crate::domain::strategy::{CompiledStrategy, IndicatorConfig, StrategySpec};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;
pub const DEFAULT_SMA_FAST: usize = 10;
pub const DEFAULT_SMA_SLOW: usize = 30;

#[derive(Parser, Debug)]
#[command(name = "tradereplay", about = "Replay trading rules over historical candles")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Declarative strategy JSON; SMA crossover when omitted
        #[arg(short, long)]
        strategy: Option<PathBuf>,
        /// Candle CSV, overriding the [data] directory lookup
        #[arg(long)]
        candles: Option<PathBuf>,
        /// Report path, `-` for stdout
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Compile a strategy and show how it will run
    Validate {
        #[arg(short, long)]
        strategy: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Compute one indicator over a candle CSV
    Indicator {
        #[arg(long)]
        candles: PathBuf,
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        period: Option<usize>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Backtest {
            config,
            strategy,
            candles,
            output,
        } => run_backtest(&config, strategy.as_deref(), candles.as_deref(), output.as_deref()),
        Command::Validate { strategy, config } => run_validate(&strategy, config.as_deref()),
        Command::Indicator {
            candles,
            name,
            period,
        } => run_indicator(&candles, &name, period),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, BacktestError> {
    FileConfigAdapter::from_file(path)
}

pub fn load_strategy(path: &Path) -> Result<StrategySpec, BacktestError> {
    let json = fs::read_to_string(path).map_err(|e| BacktestError::StrategyParse {
        reason: format!("failed to read {}: {e}", path.display()),
    })?;
    StrategySpec::from_json(&json)
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, BacktestError> {
    let required = |key: &str| {
        adapter
            .get_string("backtest", key)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BacktestError::ConfigMissing {
                section: "backtest".into(),
                key: key.into(),
            })
    };

    Ok(BacktestConfig {
        symbol: required("symbol")?,
        timeframe: required("timeframe")?,
        initial_capital: adapter.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL),
        sma_fast: period(adapter, "sma_fast", DEFAULT_SMA_FAST)?,
        sma_slow: period(adapter, "sma_slow", DEFAULT_SMA_SLOW)?,
        risk_free_rate: adapter.get_double("backtest", "risk_free_rate", 0.0),
    })
}

fn period(adapter: &dyn ConfigPort, key: &str, default: usize) -> Result<usize, BacktestError> {
    let value = adapter.get_int("backtest", key, default as i64);
    usize::try_from(value).map_err(|_| BacktestError::ConfigInvalid {
        section: "backtest".into(),
        key: key.into(),
        reason: format!("{key} must be positive"),
    })
}

/// Load candles from an explicit CSV, or `[data] path` through the CSV data port.
pub fn load_candles(
    adapter: &dyn ConfigPort,
    config: &BacktestConfig,
    candles_path: Option<&Path>,
) -> Result<Vec<Candle>, BacktestError> {
    match candles_path {
        Some(path) => {
            eprintln!("Loading candles from {}", path.display());
            csv_adapter::read_candles(path)
        }
        None => {
            let base = adapter.get_string_or("data", "path", ".");
            let data_port = CsvAdapter::new(PathBuf::from(base));
            eprintln!(
                "Loading candles from {}",
                data_port.csv_path(&config.symbol, &config.timeframe).display()
            );
            data_port.fetch_candles(&config.symbol, &config.timeframe)
        }
    }
}

/// Config, data and strategy through to a result, without writing a report.
pub fn run_backtest_pipeline(
    adapter: &dyn ConfigPort,
    strategy_path: Option<&Path>,
    candles_path: Option<&Path>,
) -> Result<BacktestResult, BacktestError> {
    validate_backtest_config(adapter)?;
    let config = build_backtest_config(adapter)?;

    let strategy = strategy_path
        .map(|path| {
            eprintln!("Loading strategy from {}", path.display());
            load_strategy(path)
        })
        .transpose()?;

    let candles = load_candles(adapter, &config, candles_path)?;
    validate_candles(&candles)?;

    Ok(backtest_engine::run_backtest(
        &candles,
        &config,
        strategy.as_ref(),
    ))
}

fn run_backtest(
    config_path: &Path,
    strategy_path: Option<&Path>,
    candles_path: Option<&Path>,
    output: Option<&str>,
) -> Result<(), BacktestError> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;

    let result = run_backtest_pipeline(&adapter, strategy_path, candles_path)?;
    print_summary(&result);

    let output_path = match output {
        Some(path) => path.to_string(),
        None => adapter.get_string_or("report", "output", "-"),
    };
    JsonReportAdapter::new().write(&result, &output_path)?;
    if output_path != "-" {
        eprintln!("\nReport written to: {output_path}");
    }
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    eprintln!(
        "\n=== {} | {} {} ===",
        result.strategy_name, result.symbol, result.timeframe
    );
    if let (Some(first), Some(last)) = (result.equity_curve.first(), result.equity_curve.last()) {
        eprintln!(
            "Period:           {} .. {}",
            candle::format_time(first.time),
            candle::format_time(last.time)
        );
    }
    eprintln!("Total Return:     {:.2} ({:.2}%)", m.total_return, m.total_return_pct);
    eprintln!("Final Equity:     {:.2}", m.final_equity);
    eprintln!("Sharpe Ratio:     {:.4}", m.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.4}", m.sortino_ratio);
    eprintln!("Max Drawdown:     {:.2} ({:.2}%)", m.max_drawdown, m.max_drawdown_pct);
    eprintln!(
        "Total Trades:     {} ({} won, {} lost, {} even)",
        m.total_trades, m.winning_trades, m.losing_trades, m.breakeven_trades
    );
    eprintln!("Win Rate:         {:.2}%", m.win_rate);
    eprintln!("Profit Factor:    {:.4}", m.profit_factor);
}

fn run_validate(strategy_path: &Path, config_path: Option<&Path>) -> Result<(), BacktestError> {
    eprintln!("Validating strategy: {}", strategy_path.display());
    let spec = load_strategy(strategy_path)?;

    let (sma_fast, sma_slow) = match config_path {
        Some(path) => {
            let adapter = load_config(path)?;
            (
                period(&adapter, "sma_fast", DEFAULT_SMA_FAST)?,
                period(&adapter, "sma_slow", DEFAULT_SMA_SLOW)?,
            )
        }
        None => (DEFAULT_SMA_FAST, DEFAULT_SMA_SLOW),
    };

    check_condition_syntax(&spec)?;
    let compiled = CompiledStrategy::compile(&spec, sma_fast, sma_slow);
    print_compiled(&compiled);
    eprintln!("\nStrategy is valid");
    Ok(())
}

/// Every free-text condition must parse. Bare comparators of the structured
/// form are checked at compile time instead.
pub fn check_condition_syntax(spec: &StrategySpec) -> Result<(), BacktestError> {
    let conditions = spec
        .entry_rules
        .iter()
        .map(|r| r.condition.as_str())
        .chain(spec.exit_rules.iter().map(|r| r.condition.as_str()));

    for text in conditions {
        if text.trim().is_empty() || Comparator::from_token(text).is_some() {
            continue;
        }
        if let Err(e) = condition_parser::parse(text) {
            eprintln!("  error:\n{}", e.display_with_context(text));
            return Err(e.into());
        }
    }
    Ok(())
}

fn print_compiled(compiled: &CompiledStrategy) {
    eprintln!("\nStrategy: {}", compiled.name);
    eprintln!("Direction: {:?}", compiled.direction);

    eprintln!("\nIndicators to compute:");
    for kind in &compiled.indicators {
        eprintln!("  {kind}");
    }

    eprintln!("\nEntry conditions:");
    for c in &compiled.entry {
        eprintln!("  {c}");
    }
    if compiled.entry.is_empty() {
        eprintln!("  (none, no trades will open)");
    }
    if compiled.entry_fallback {
        eprintln!("  note: no usable entry rule, SMA crossover used");
    }

    eprintln!("\nExit conditions:");
    for c in &compiled.exit {
        eprintln!("  {c}");
    }
    if compiled.exit_fallback {
        eprintln!("  note: no usable exit rule, SMA crossover used");
    }

    if let Some(sl) = compiled.stop_loss {
        let mode = if compiled.trailing_stop { " (trailing)" } else { "" };
        eprintln!("Stop loss:   {:.2}%{mode}", sl * 100.0);
    }
    if let Some(tp) = compiled.take_profit {
        eprintln!("Take profit: {:.2}%", tp * 100.0);
    }
}

fn run_indicator(candles_path: &Path, name: &str, period: Option<usize>) -> Result<(), BacktestError> {
    let candles = csv_adapter::read_candles(candles_path)?;
    validate_candles(&candles)?;

    let kind = IndicatorConfig {
        name: name.to_string(),
        period,
        ..Default::default()
    }
    .kind();
    tracing::debug!(indicator = %kind, rows = candles.len(), "computing indicator");

    let series = indicator::compute(&candle::closes(&candles), &kind);
    write_indicator_csv(std::io::stdout().lock(), &candles, &series)
}

/// `time,<column>...` rows; warm-up values are left empty.
pub fn write_indicator_csv<W: std::io::Write>(
    out: W,
    candles: &[Candle],
    series: &indicator::IndicatorSeries,
) -> Result<(), BacktestError> {
    let to_report = |e: csv::Error| BacktestError::Report {
        reason: format!("failed to write CSV: {e}"),
    };

    let columns = series.columns();
    let mut wtr = csv::Writer::from_writer(out);

    let mut header = vec!["time".to_string()];
    header.extend(columns.iter().map(|(name, _)| name.clone()));
    wtr.write_record(&header).map_err(to_report)?;

    for (i, candle) in candles.iter().enumerate() {
        let mut record = vec![candle.time.to_string()];
        record.extend(columns.iter().map(|(_, values)| match values.get(i) {
            Some(v) if !v.is_nan() => v.to_string(),
            _ => String::new(),
        }));
        wtr.write_record(&record).map_err(to_report)?;
    }
    wtr.flush()?;
    Ok(())
}
