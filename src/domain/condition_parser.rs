//! Condition text parser.
//!
//! Recursive descent over the condition grammar used in strategy rules:
//!
//! ```text
//! rule       := condition (("and" | "&&") condition)*
//! condition  := fn_name "(" operand "," operand ")"
//!             | operand comparator operand
//! comparator := ">" | "<" | ">=" | "<=" | "==" | "crosses_above" | "crosses_below"
//! fn_name    := "crosses_above" | "crosses_below" | "above" | "below" | "equals"
//! operand    := number | identifier
//! ```
//!
//! Keywords are case-insensitive and identifiers are lower-cased. Errors carry
//! the byte offset where parsing stopped.

use crate::domain::condition::{Comparator, Condition, Operand};
use crate::domain::error::ParseError;

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.pos >= self.input.len()
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(ParseError {
                message: format!("expected '{}', found '{}'", expected, ch),
                position: self.pos,
            }),
            None => Err(ParseError {
                message: format!("expected '{}', found end of input", expected),
                position: self.pos,
            }),
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        let remaining = self.remaining();
        let matches_prefix = remaining
            .get(..keyword.len())
            .map(|p| p.eq_ignore_ascii_case(keyword))
            .unwrap_or(false);
        matches_prefix
            && !remaining[keyword.len()..]
                .chars()
                .next()
                .map(is_ident_char)
                .unwrap_or(false)
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn consume_exact(&mut self, s: &str) -> bool {
        if self.remaining().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn peek_word(&self) -> String {
        let word: String = self
            .remaining()
            .chars()
            .take_while(|&c| is_ident_char(c))
            .collect();
        if word.is_empty() {
            self.peek()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "end of input".to_string())
        } else {
            word
        }
    }

    /// A function-call condition starts with a keyword immediately followed by `(`.
    fn peek_call(&self, name: &str) -> bool {
        if !self.peek_keyword(name) {
            return false;
        }
        self.remaining()[name.len()..].trim_start().starts_with('(')
    }

    fn parse_rule(&mut self) -> Result<Vec<Condition>, ParseError> {
        if self.at_end() {
            return Err(ParseError {
                message: "empty condition".to_string(),
                position: self.pos,
            });
        }

        let mut conditions = vec![self.parse_condition()?];
        loop {
            self.skip_whitespace();
            if self.consume_keyword("and") || self.consume_exact("&&") {
                conditions.push(self.parse_condition()?);
            } else {
                break;
            }
        }

        if !self.at_end() {
            return Err(ParseError {
                message: format!("unexpected '{}'", self.peek_word()),
                position: self.pos,
            });
        }
        Ok(conditions)
    }

    fn parse_condition(&mut self) -> Result<Condition, ParseError> {
        self.skip_whitespace();

        const CALLS: [(&str, Comparator); 5] = [
            ("crosses_above", Comparator::CrossesAbove),
            ("crosses_below", Comparator::CrossesBelow),
            ("above", Comparator::Gt),
            ("below", Comparator::Lt),
            ("equals", Comparator::Eq),
        ];
        for (name, op) in CALLS {
            if self.peek_call(name) {
                self.pos += name.len();
                self.expect_char('(')?;
                let left = self.parse_operand()?;
                self.expect_char(',')?;
                let right = self.parse_operand()?;
                self.expect_char(')')?;
                return Ok(Condition::new(left, op, right));
            }
        }

        let left = self.parse_operand()?;
        let op = self.parse_comparator()?;
        let right = self.parse_operand()?;
        Ok(Condition::new(left, op, right))
    }

    fn parse_comparator(&mut self) -> Result<Comparator, ParseError> {
        self.skip_whitespace();
        for (token, op) in [
            (">=", Comparator::Ge),
            ("<=", Comparator::Le),
            ("==", Comparator::Eq),
            (">", Comparator::Gt),
            ("<", Comparator::Lt),
            ("=", Comparator::Eq),
        ] {
            if self.consume_exact(token) {
                return Ok(op);
            }
        }
        for (keyword, op) in [
            ("crosses_above", Comparator::CrossesAbove),
            ("crosses_below", Comparator::CrossesBelow),
        ] {
            if self.consume_keyword(keyword) {
                return Ok(op);
            }
        }
        Err(ParseError {
            message: format!("expected comparator, found '{}'", self.peek_word()),
            position: self.pos,
        })
    }

    fn parse_operand(&mut self) -> Result<Operand, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch.is_ascii_digit() || ch == '-' || ch == '.' => {
                self.parse_number().map(Operand::Literal)
            }
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let word = self.peek_word();
                self.pos += word.len();
                Ok(Operand::Column(word.to_lowercase()))
            }
            _ => Err(ParseError {
                message: format!("expected operand, found '{}'", self.peek_word()),
                position: self.pos,
            }),
        }
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        if self.peek() == Some('-') {
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(ParseError {
                message: "expected number".to_string(),
                position: start,
            });
        }

        let num_str = &self.input[start..self.pos];
        num_str.parse::<f64>().map_err(|_| ParseError {
            message: format!("invalid number: {}", num_str),
            position: start,
        })
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Parse a condition string into its AND-joined conditions.
pub fn parse(input: &str) -> Result<Vec<Condition>, ParseError> {
    Parser::new(input).parse_rule()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str) -> Operand {
        Operand::Column(name.to_string())
    }

    #[test]
    fn parse_simple_comparison() {
        let conds = parse("rsi_14 < 30").unwrap();
        assert_eq!(
            conds,
            vec![Condition::new(col("rsi_14"), Comparator::Lt, Operand::Literal(30.0))]
        );
    }

    #[test]
    fn parse_all_symbolic_comparators() {
        let cases = [
            ("a > b", Comparator::Gt),
            ("a < b", Comparator::Lt),
            ("a >= b", Comparator::Ge),
            ("a <= b", Comparator::Le),
            ("a == b", Comparator::Eq),
        ];
        for (input, expected) in cases {
            let conds = parse(input).unwrap();
            assert_eq!(conds[0].op, expected, "{input}");
        }
    }

    #[test]
    fn parse_infix_cross() {
        let conds = parse("sma_10 crosses_above sma_30").unwrap();
        assert_eq!(
            conds[0],
            Condition::new(col("sma_10"), Comparator::CrossesAbove, col("sma_30"))
        );
    }

    #[test]
    fn parse_function_cross() {
        let conds = parse("crosses_below(macd, macd_signal)").unwrap();
        assert_eq!(
            conds[0],
            Condition::new(col("macd"), Comparator::CrossesBelow, col("macd_signal"))
        );
    }

    #[test]
    fn parse_function_comparisons() {
        assert_eq!(parse("above(close, 100)").unwrap()[0].op, Comparator::Gt);
        assert_eq!(parse("below(close, bb_lower)").unwrap()[0].op, Comparator::Lt);
        assert_eq!(parse("equals(close, 5)").unwrap()[0].op, Comparator::Eq);
    }

    #[test]
    fn parse_identifier_named_like_function() {
        let conds = parse("above > 1").unwrap();
        assert_eq!(conds[0].left, col("above"));
    }

    #[test]
    fn parse_and_chain() {
        let conds = parse("close > sma_20 and rsi_14 < 70 && volume >= 1000").unwrap();
        assert_eq!(conds.len(), 3);
        assert_eq!(conds[2].right, Operand::Literal(1000.0));
    }

    #[test]
    fn parse_case_insensitive() {
        let conds = parse("SMA_10 CROSSES_ABOVE SMA_30 AND Close > 5").unwrap();
        assert_eq!(conds[0].left, col("sma_10"));
        assert_eq!(conds[0].op, Comparator::CrossesAbove);
        assert_eq!(conds[1].left, col("close"));
    }

    #[test]
    fn parse_negative_and_decimal_literals() {
        let conds = parse("macd_histogram > -0.5").unwrap();
        assert_eq!(conds[0].right, Operand::Literal(-0.5));
    }

    #[test]
    fn error_empty_input() {
        let err = parse("   ").unwrap_err();
        assert!(err.message.contains("empty"));
    }

    #[test]
    fn error_missing_comparator() {
        let err = parse("close sma_20").unwrap_err();
        assert!(err.message.contains("expected comparator"));
        assert_eq!(err.position, 6);
    }

    #[test]
    fn error_missing_right_operand() {
        let err = parse("close >").unwrap_err();
        assert!(err.message.contains("expected operand"));
        assert_eq!(err.position, 7);
    }

    #[test]
    fn error_trailing_input() {
        let err = parse("close > 1 or close < 0").unwrap_err();
        assert!(err.message.contains("unexpected 'or'"));
        assert_eq!(err.position, 10);
    }

    #[test]
    fn error_unclosed_call() {
        let err = parse("crosses_above(a, b").unwrap_err();
        assert!(err.message.contains("expected ')'"));
    }

    #[test]
    fn bare_comparator_is_not_a_condition() {
        assert!(parse("crosses_above").is_err());
        assert!(parse(">").is_err());
    }
}
