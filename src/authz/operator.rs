//! Comparison table shared by in-memory evaluation and the query predicate matcher.
//!
//! Both enforcement paths call [`apply`], so a record selected by one is selected by the other.

use std::cmp::Ordering;

use chrono::DateTime;
use serde_json::Value;

use crate::models::Operator;

/// Compare a record value (`None` when the field is absent) against a resolved expected value.
pub fn apply(operator: &Operator, value: Option<&Value>, expected: &Value) -> bool {
    match operator {
        Operator::Eq => value.map_or(false, |v| same(v, expected)),
        Operator::Ne => !value.map_or(false, |v| same(v, expected)),
        Operator::In => value.map_or(false, |v| members(expected).iter().any(|e| same(v, e))),
        Operator::NotIn => !value.map_or(false, |v| members(expected).iter().any(|e| same(v, e))),
        Operator::Gt => ordered(value, expected, |o| o == Ordering::Greater),
        Operator::Lt => ordered(value, expected, |o| o == Ordering::Less),
        Operator::Gte => ordered(value, expected, |o| o != Ordering::Less),
        Operator::Lte => ordered(value, expected, |o| o != Ordering::Greater),
        Operator::Contains => match (value, expected) {
            (Some(Value::String(haystack)), Value::String(needle)) => {
                haystack.to_lowercase().contains(&needle.to_lowercase())
            }
            _ => false,
        },
        Operator::Unknown(_) => false,
    }
}

/// `in`/`notIn` operands are coerced to a list.
pub fn members(expected: &Value) -> Vec<Value> {
    match expected {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

/// Strict equality, except that numbers compare by value (`1 == 1.0`).
fn same(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => match (l.as_f64(), r.as_f64()) {
            (Some(l), Some(r)) => l == r,
            _ => l == r,
        },
        _ => left == right,
    }
}

fn ordered(value: Option<&Value>, expected: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    value.and_then(|v| compare(v, expected)).map_or(false, accept)
}

/// Numbers numerically, RFC 3339 timestamps as instants, other strings lexicographically.
/// Mixed or non-scalar pairs are incomparable.
pub fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.as_f64()?.partial_cmp(&r.as_f64()?),
        (Value::String(l), Value::String(r)) => {
            match (DateTime::parse_from_rfc3339(l), DateTime::parse_from_rfc3339(r)) {
                (Ok(l), Ok(r)) => Some(l.cmp(&r)),
                _ => Some(l.cmp(r)),
            }
        }
        _ => None,
    }
}
