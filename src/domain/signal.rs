//! Vectorized condition evaluation.
//!
//! # Evaluation Semantics
//!
//! - Relational comparisons are elementwise; any comparison with `NaN` is `false`
//! - `==` uses an absolute tolerance of 1e-9
//! - `crosses_above`/`crosses_below` look at the previous row and are `false` at index 0
//! - A rule set is the AND of its conditions; an empty set never fires
//! - A column missing from the frame is read as a literal: its numeric parse, else `NaN`

use crate::domain::condition::{Comparator, Condition, Operand};
use crate::domain::frame::Frame;
use std::borrow::Cow;

const EPSILON: f64 = 1e-9;

/// Evaluate one condition at every row of `frame`.
pub fn evaluate_condition(frame: &Frame, condition: &Condition) -> Vec<bool> {
    let left = resolve_operand(frame, &condition.left);
    let right = resolve_operand(frame, &condition.right);
    let n = frame.len();

    match condition.op {
        Comparator::CrossesAbove => (0..n)
            .map(|i| i > 0 && left[i - 1] <= right[i - 1] && left[i] > right[i])
            .collect(),
        Comparator::CrossesBelow => (0..n)
            .map(|i| i > 0 && left[i - 1] >= right[i - 1] && left[i] < right[i])
            .collect(),
        op => (0..n).map(|i| compare(op, left[i], right[i])).collect(),
    }
}

/// AND of every condition in `conditions`. All `false` when the list is empty.
pub fn evaluate_rules(frame: &Frame, conditions: &[Condition]) -> Vec<bool> {
    if conditions.is_empty() {
        return vec![false; frame.len()];
    }

    let mut combined = vec![true; frame.len()];
    for condition in conditions {
        let values = evaluate_condition(frame, condition);
        for (acc, v) in combined.iter_mut().zip(values) {
            *acc = *acc && v;
        }
    }
    combined
}

fn compare(op: Comparator, left: f64, right: f64) -> bool {
    match op {
        Comparator::Gt => left > right,
        Comparator::Lt => left < right,
        Comparator::Ge => left >= right,
        Comparator::Le => left <= right,
        Comparator::Eq => (left - right).abs() < EPSILON,
        Comparator::CrossesAbove | Comparator::CrossesBelow => false,
    }
}

fn resolve_operand<'f>(frame: &'f Frame, operand: &Operand) -> Cow<'f, [f64]> {
    match operand {
        Operand::Column(name) => match frame.get(name) {
            Some(values) => Cow::Borrowed(values),
            None => {
                let literal = name.trim().parse::<f64>().unwrap_or(f64::NAN);
                Cow::Owned(vec![literal; frame.len()])
            }
        },
        Operand::Literal(v) => Cow::Owned(vec![*v; frame.len()]),
    }
}
