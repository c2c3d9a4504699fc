//! Declarative strategy spec and its compilation into executable conditions.
//!
//! The spec is untrusted, best-effort input. Compilation never fails: rules that
//! cannot be used are skipped with a warning, and a side whose rules all fail
//! falls back to the SMA crossover.

use crate::domain::condition::{Comparator, Condition, Operand};
use crate::domain::condition_parser;
use crate::domain::error::BacktestError;
use crate::domain::frame::PRICE_COLUMNS;
use crate::domain::indicator::IndicatorKind;
use crate::domain::indicator::{bollinger, macd};
use crate::domain::position::Direction;
use crate::domain::simulation::SimulationParams;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

pub const DEFAULT_MA_PERIOD: usize = 20;
pub const DEFAULT_RSI_PERIOD: usize = 14;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySpec {
    pub strategy_name: String,
    pub indicators: Vec<IndicatorConfig>,
    pub entry_rules: Vec<EntryRule>,
    pub exit_rules: Vec<ExitRule>,
    pub constraints: Vec<Constraint>,
}

impl Default for StrategySpec {
    fn default() -> Self {
        Self {
            strategy_name: "Custom Strategy".to_string(),
            indicators: Vec::new(),
            entry_rules: Vec::new(),
            exit_rules: Vec::new(),
            constraints: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub name: String,
    pub period: Option<usize>,
    pub params: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryRule {
    pub condition: String,
    pub indicator: Option<String>,
    pub threshold: Option<f64>,
    pub direction: String,
}

impl Default for EntryRule {
    fn default() -> Self {
        Self {
            condition: String::new(),
            indicator: None,
            threshold: None,
            direction: "long".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitRule {
    pub condition: String,
    pub indicator: Option<String>,
    pub threshold: Option<f64>,
    /// Percent, e.g. 2.0 for 2%.
    pub stop_loss_pct: Option<f64>,
    pub take_profit_pct: Option<f64>,
    pub trailing_stop: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constraint {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    pub is_absolute: bool,
}

impl Default for Constraint {
    fn default() -> Self {
        Self {
            kind: String::new(),
            value: String::new(),
            is_absolute: true,
        }
    }
}

impl StrategySpec {
    pub fn from_json(json: &str) -> Result<Self, BacktestError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl IndicatorConfig {
    /// Map the declared name and parameters onto an indicator kind.
    pub fn kind(&self) -> IndicatorKind {
        match self.name.trim().to_uppercase().as_str() {
            "SMA" => IndicatorKind::Sma(self.period.unwrap_or(DEFAULT_MA_PERIOD)),
            "EMA" => IndicatorKind::Ema(self.period.unwrap_or(DEFAULT_MA_PERIOD)),
            "RSI" => IndicatorKind::Rsi(self.period.unwrap_or(DEFAULT_RSI_PERIOD)),
            "MACD" => IndicatorKind::Macd {
                fast: self.param_usize("fast").unwrap_or(macd::DEFAULT_FAST),
                slow: self.param_usize("slow").unwrap_or(macd::DEFAULT_SLOW),
                signal: self.param_usize("signal").unwrap_or(macd::DEFAULT_SIGNAL),
            },
            "BOLLINGER" | "BB" | "BBANDS" => IndicatorKind::Bollinger {
                period: self
                    .period
                    .or_else(|| self.param_usize("period"))
                    .unwrap_or(bollinger::DEFAULT_PERIOD),
                stddev_mult_x100: self
                    .param_f64("std_dev")
                    .map(|m| (m * 100.0).round().max(0.0) as u32)
                    .unwrap_or(bollinger::DEFAULT_MULT_X100),
            },
            _ => IndicatorKind::Unknown {
                name: self.name.clone(),
                period: self.period,
            },
        }
    }

    fn param_f64(&self, key: &str) -> Option<f64> {
        self.params.get(key).and_then(|v| v.as_f64())
    }

    fn param_usize(&self, key: &str) -> Option<usize> {
        self.param_f64(key)
            .filter(|v| *v >= 0.0)
            .map(|v| v.round() as usize)
    }
}

impl Constraint {
    /// Stop-loss percent carried by a constraint such as "max stop 3%".
    pub fn stop_loss_pct(&self) -> Option<f64> {
        if !self.value.to_lowercase().contains("stop") {
            return None;
        }
        parse_percent(&self.value)
    }
}

/// First `N%` or `N.N%` figure in `text`.
fn parse_percent(text: &str) -> Option<f64> {
    for (idx, _) in text.match_indices('%') {
        let before = text[..idx].trim_end();
        let digits_start = before
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_digit() || *c == '.')
            .last()
            .map(|(i, _)| i);
        if let Some(start) = digits_start {
            let number = before[start..].trim_start_matches('.');
            if let Ok(value) = number.parse::<f64>() {
                return Some(value);
            }
        }
    }
    None
}

/// A strategy ready to run: indicators to compute, AND-joined entry/exit
/// conditions and risk settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStrategy {
    pub name: String,
    pub indicators: Vec<IndicatorKind>,
    pub entry: Vec<Condition>,
    pub exit: Vec<Condition>,
    pub direction: Direction,
    /// Fraction of entry price.
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub trailing_stop: bool,
    pub entry_fallback: bool,
    pub exit_fallback: bool,
}

impl CompiledStrategy {
    /// SMA(fast) crossing SMA(slow): above enters, below exits.
    pub fn default_crossover(sma_fast: usize, sma_slow: usize) -> Self {
        let (entry, exit) = crossover_conditions(sma_fast, sma_slow);
        Self {
            name: "SMA Crossover".to_string(),
            indicators: vec![IndicatorKind::Sma(sma_fast), IndicatorKind::Sma(sma_slow)],
            entry: vec![entry],
            exit: vec![exit],
            direction: Direction::Long,
            stop_loss: None,
            take_profit: None,
            trailing_stop: false,
            entry_fallback: false,
            exit_fallback: false,
        }
    }

    /// Compile a declarative spec. The crossover SMAs are always computed so
    /// either side can fall back to them.
    pub fn compile(spec: &StrategySpec, sma_fast: usize, sma_slow: usize) -> Self {
        let mut indicators = vec![IndicatorKind::Sma(sma_fast), IndicatorKind::Sma(sma_slow)];
        indicators.extend(spec.indicators.iter().map(IndicatorConfig::kind));

        let known: BTreeSet<String> = PRICE_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(indicators.iter().flat_map(|k| k.column_names()))
            .collect();

        let (cross_entry, cross_exit) = crossover_conditions(sma_fast, sma_slow);

        let mut entry = Vec::new();
        let mut direction = None;
        for rule in &spec.entry_rules {
            match compile_rule(
                &rule.condition,
                rule.indicator.as_deref(),
                rule.threshold,
                &known,
            ) {
                Ok(conditions) => {
                    if direction.is_none() {
                        direction = Some(Direction::parse_lenient(&rule.direction));
                    }
                    entry.extend(conditions);
                }
                Err(reason) => {
                    tracing::warn!(condition = %rule.condition, %reason, "skipping entry rule")
                }
            }
        }
        let entry_fallback = !spec.entry_rules.is_empty() && entry.is_empty();
        if entry_fallback {
            tracing::info!("no usable entry rule, using SMA crossover");
            entry.push(cross_entry);
        }
        let direction = direction
            .or_else(|| {
                spec.entry_rules
                    .first()
                    .map(|r| Direction::parse_lenient(&r.direction))
            })
            .unwrap_or_default();

        let mut exit = Vec::new();
        for rule in &spec.exit_rules {
            match compile_rule(
                &rule.condition,
                rule.indicator.as_deref(),
                rule.threshold,
                &known,
            ) {
                Ok(conditions) => exit.extend(conditions),
                Err(reason) if rule.stop_loss_pct.is_some() || rule.take_profit_pct.is_some() => {
                    tracing::debug!(condition = %rule.condition, %reason, "exit rule carries risk limits only")
                }
                Err(reason) => {
                    tracing::warn!(condition = %rule.condition, %reason, "skipping exit rule")
                }
            }
        }
        let exit_fallback = !spec.exit_rules.is_empty() && exit.is_empty();
        if exit_fallback {
            tracing::info!("no usable exit rule, using SMA crossover");
            exit.push(cross_exit);
        }

        let rule_stop = spec
            .exit_rules
            .iter()
            .filter_map(|r| r.stop_loss_pct)
            .filter(|v| *v > 0.0)
            .last();
        let constraint_stop = spec
            .constraints
            .iter()
            .filter_map(Constraint::stop_loss_pct)
            .filter(|v| *v > 0.0)
            .last();
        if let (Some(rule), Some(user)) = (rule_stop, constraint_stop) {
            tracing::info!(rule, user, "stop-loss constraint overrides exit rule");
        }
        let stop_loss = constraint_stop.or(rule_stop).map(|pct| pct / 100.0);

        let take_profit = spec
            .exit_rules
            .iter()
            .filter_map(|r| r.take_profit_pct)
            .filter(|v| *v > 0.0)
            .last()
            .map(|pct| pct / 100.0);

        Self {
            name: spec.strategy_name.clone(),
            indicators,
            entry,
            exit,
            direction,
            stop_loss,
            take_profit,
            trailing_stop: spec.exit_rules.iter().any(|r| r.trailing_stop),
            entry_fallback,
            exit_fallback,
        }
    }

    /// Every column the entry and exit conditions read.
    pub fn referenced_columns(&self) -> Vec<String> {
        let set: BTreeSet<String> = self
            .entry
            .iter()
            .chain(&self.exit)
            .flat_map(|c| c.columns())
            .map(|c| c.to_string())
            .collect();
        set.into_iter().collect()
    }

    pub fn simulation_params(&self) -> SimulationParams {
        SimulationParams {
            direction: self.direction,
            stop_loss: self.stop_loss,
            take_profit: self.take_profit,
            trailing_stop: self.trailing_stop,
        }
    }
}

fn crossover_conditions(sma_fast: usize, sma_slow: usize) -> (Condition, Condition) {
    let fast = format!("sma_{sma_fast}");
    let slow = format!("sma_{sma_slow}");
    (
        Condition::crossover(&fast, Comparator::CrossesAbove, &slow),
        Condition::crossover(&fast, Comparator::CrossesBelow, &slow),
    )
}

/// Exact column name, else the single column named `<name>_...`.
fn resolve_column(name: &str, known: &BTreeSet<String>) -> Option<String> {
    let name = name.trim().to_lowercase();
    if known.contains(&name) {
        return Some(name);
    }
    let prefix = format!("{name}_");
    let mut matches = known.iter().filter(|k| k.starts_with(&prefix));
    match (matches.next(), matches.next()) {
        (Some(only), None) => Some(only.clone()),
        _ => None,
    }
}

fn compile_rule(
    condition: &str,
    indicator: Option<&str>,
    threshold: Option<f64>,
    known: &BTreeSet<String>,
) -> Result<Vec<Condition>, String> {
    let indicator_column = match indicator {
        Some(name) => Some(
            resolve_column(name, known).ok_or_else(|| format!("indicator '{name}' not available"))?,
        ),
        None => None,
    };

    if let Some(op) = Comparator::from_token(condition) {
        return match (indicator_column, threshold) {
            (Some(column), Some(value)) => Ok(vec![Condition::new(
                Operand::Column(column),
                op,
                Operand::Literal(value),
            )]),
            _ => Err(format!(
                "'{condition}' needs both indicator and threshold"
            )),
        };
    }

    let parsed = condition_parser::parse(condition).map_err(|e| e.to_string())?;
    parsed
        .into_iter()
        .map(|c| {
            Ok(Condition::new(
                resolve_operand(c.left, known)?,
                c.op,
                resolve_operand(c.right, known)?,
            ))
        })
        .collect()
}

fn resolve_operand(operand: Operand, known: &BTreeSet<String>) -> Result<Operand, String> {
    match operand {
        Operand::Column(name) => resolve_column(&name, known)
            .map(Operand::Column)
            .ok_or_else(|| format!("unknown column '{name}'")),
        literal => Ok(literal),
    }
}
