//! Condition AST evaluated by the signal engine.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Frame column name. Resolved as a literal when the frame lacks it.
    Column(String),
    Literal(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    CrossesAbove,
    CrossesBelow,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub left: Operand,
    pub op: Comparator,
    pub right: Operand,
}

impl Comparator {
    /// Parse an operator token (`>`, `>=`, `crosses_above`, ...). Case-insensitive.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            ">" => Some(Comparator::Gt),
            "<" => Some(Comparator::Lt),
            ">=" => Some(Comparator::Ge),
            "<=" => Some(Comparator::Le),
            "==" | "=" => Some(Comparator::Eq),
            "crosses_above" => Some(Comparator::CrossesAbove),
            "crosses_below" => Some(Comparator::CrossesBelow),
            _ => None,
        }
    }
}

impl Condition {
    pub fn new(left: Operand, op: Comparator, right: Operand) -> Self {
        Self { left, op, right }
    }

    /// `fast crosses_above slow` over two column names.
    pub fn crossover(fast: &str, op: Comparator, slow: &str) -> Self {
        Self::new(
            Operand::Column(fast.to_string()),
            op,
            Operand::Column(slow.to_string()),
        )
    }

    /// Column names referenced by this condition.
    pub fn columns(&self) -> Vec<&str> {
        [&self.left, &self.right]
            .into_iter()
            .filter_map(|o| match o {
                Operand::Column(name) => Some(name.as_str()),
                Operand::Literal(_) => None,
            })
            .collect()
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Column(name) => write!(f, "{}", name),
            Operand::Literal(v) => write!(f, "{}", v),
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Comparator::Gt => ">",
            Comparator::Lt => "<",
            Comparator::Ge => ">=",
            Comparator::Le => "<=",
            Comparator::Eq => "==",
            Comparator::CrossesAbove => "crosses_above",
            Comparator::CrossesBelow => "crosses_below",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op, self.right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparator_from_token() {
        assert_eq!(Comparator::from_token(">="), Some(Comparator::Ge));
        assert_eq!(
            Comparator::from_token("CROSSES_ABOVE"),
            Some(Comparator::CrossesAbove)
        );
        assert_eq!(Comparator::from_token("="), Some(Comparator::Eq));
        assert_eq!(Comparator::from_token("between"), None);
    }

    #[test]
    fn condition_display() {
        let cond = Condition::new(
            Operand::Column("rsi_14".into()),
            Comparator::Lt,
            Operand::Literal(30.0),
        );
        assert_eq!(cond.to_string(), "rsi_14 < 30");
    }

    #[test]
    fn crossover_display_and_columns() {
        let cond = Condition::crossover("sma_10", Comparator::CrossesBelow, "sma_30");
        assert_eq!(cond.to_string(), "sma_10 crosses_below sma_30");
        assert_eq!(cond.columns(), vec!["sma_10", "sma_30"]);
    }

    #[test]
    fn columns_skip_literals() {
        let cond = Condition::new(
            Operand::Literal(1.0),
            Comparator::Gt,
            Operand::Column("close".into()),
        );
        assert_eq!(cond.columns(), vec!["close"]);
    }
}
