//! Open position state and closed trade records.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Long,
    Short,
}

impl Direction {
    /// `short` (any case) selects Short; anything else is Long.
    pub fn parse_lenient(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("short") {
            Direction::Short
        } else {
            Direction::Long
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Breakeven,
}

impl Outcome {
    pub fn from_pnl(pnl: f64) -> Self {
        if pnl > 0.0 {
            Outcome::Win
        } else if pnl < 0.0 {
            Outcome::Loss
        } else {
            Outcome::Breakeven
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Signal,
    StopLoss,
    TakeProfit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub entry_time: i64,
    pub entry_price: f64,
    pub direction: Direction,
    pub stop_loss_price: Option<f64>,
    pub take_profit_price: Option<f64>,
}

impl Position {
    /// Open at `price`. `stop_loss` and `take_profit` are fractions of the entry price.
    pub fn open(
        entry_time: i64,
        price: f64,
        direction: Direction,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
    ) -> Self {
        let stop_loss_price = stop_loss.map(|sl| match direction {
            Direction::Long => price * (1.0 - sl),
            Direction::Short => price * (1.0 + sl),
        });
        let take_profit_price = take_profit.map(|tp| match direction {
            Direction::Long => price * (1.0 + tp),
            Direction::Short => price * (1.0 - tp),
        });
        Self {
            entry_time,
            entry_price: price,
            direction,
            stop_loss_price,
            take_profit_price,
        }
    }

    pub fn should_stop_loss(&self, low: f64, high: f64) -> bool {
        match (self.stop_loss_price, self.direction) {
            (Some(stop), Direction::Long) => low <= stop,
            (Some(stop), Direction::Short) => high >= stop,
            (None, _) => false,
        }
    }

    pub fn should_take_profit(&self, low: f64, high: f64) -> bool {
        match (self.take_profit_price, self.direction) {
            (Some(target), Direction::Long) => high >= target,
            (Some(target), Direction::Short) => low <= target,
            (None, _) => false,
        }
    }

    /// Ratchet the stop toward price. It never moves against the position.
    pub fn trail_stop(&mut self, low: f64, high: f64, stop_loss: f64) {
        let Some(current) = self.stop_loss_price else {
            return;
        };
        self.stop_loss_price = Some(match self.direction {
            Direction::Long => current.max(high * (1.0 - stop_loss)),
            Direction::Short => current.min(low * (1.0 + stop_loss)),
        });
    }

    pub fn pnl(&self, exit_price: f64) -> f64 {
        match self.direction {
            Direction::Long => exit_price - self.entry_price,
            Direction::Short => self.entry_price - exit_price,
        }
    }

    pub fn close(&self, exit_time: i64, exit_price: f64, exit_reason: ExitReason) -> Trade {
        let pnl = self.pnl(exit_price);
        let pnl_percent = if self.entry_price != 0.0 {
            pnl / self.entry_price * 100.0
        } else {
            0.0
        };
        Trade {
            entry_time: self.entry_time,
            exit_time,
            entry_price: self.entry_price,
            exit_price,
            pnl,
            pnl_percent,
            direction: self.direction,
            outcome: Outcome::from_pnl(pnl),
            exit_reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_time: i64,
    pub exit_time: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl: f64,
    pub pnl_percent: f64,
    pub direction: Direction,
    pub outcome: Outcome,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn duration_secs(&self) -> i64 {
        self.exit_time - self.entry_time
    }
}
