//! Translation of permission conditions into a backend-agnostic query predicate.
//!
//! The JSON shape follows the common ORM filter dialect:
//! `{field: value}`, `{field: {"not": v}}`, `{field: {"in": [..]}}`, `{"OR": [..]}`.
//! Callers adapt it to their actual query language. [`Predicate::matches`] evaluates a
//! predicate in memory with the same operator table the condition evaluator uses.
//!
//! Structured operands never appear bare: equality and inequality against an object or
//! array render as `{"equals": v}` / `{"not": {"equals": v}}`. Field names in
//! [`RESERVED_FIELDS`](super::RESERVED_FIELDS) cannot be filtered on, since they would
//! read as combinators.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use super::{operator, template};
use crate::models::{Conditions, Operator, Record};

/// Identifier no stored record can carry; the rendered form of [`Predicate::Nothing`].
pub const NO_ACCESS_SENTINEL: &str = "__no_access__";

/// One field comparison inside a predicate. Only known operators can be represented.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    operator: Operator,
    value: Value,
}

impl FieldFilter {
    /// `None` for unknown operators and for operands no record value can satisfy
    /// (ordering against a non-scalar, `contains` with a non-string).
    pub fn new(operator: Operator, value: Value) -> Option<Self> {
        let satisfiable = match operator {
            Operator::Unknown(_) => false,
            Operator::Gt | Operator::Lt | Operator::Gte | Operator::Lte => {
                value.is_number() || value.is_string()
            }
            Operator::Contains => value.is_string(),
            _ => true,
        };
        if !satisfiable {
            return None;
        }
        let value = match operator {
            Operator::In | Operator::NotIn => Value::Array(operator::members(&value)),
            _ => value,
        };
        Some(Self { operator, value })
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn matches(&self, value: Option<&Value>) -> bool {
        operator::apply(&self.operator, value, &self.value)
    }

    pub fn to_json(&self) -> Value {
        let v = self.value.clone();
        let structured = v.is_object() || v.is_array();
        match self.operator {
            // Bare values are shorthand for equality; structured ones need the explicit form.
            Operator::Eq if structured => json!({ "equals": v }),
            Operator::Eq => v,
            Operator::Ne if structured => json!({ "not": { "equals": v } }),
            Operator::Ne => json!({ "not": v }),
            Operator::In => json!({ "in": v }),
            Operator::NotIn => json!({ "notIn": v }),
            Operator::Gt => json!({ "gt": v }),
            Operator::Lt => json!({ "lt": v }),
            Operator::Gte => json!({ "gte": v }),
            Operator::Lte => json!({ "lte": v }),
            Operator::Contains => json!({ "contains": v, "mode": "insensitive" }),
            Operator::Unknown(_) => Value::Object(Map::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// No restriction.
    All,
    /// Matches no record.
    Nothing,
    /// Every field filter must hold.
    Where(BTreeMap<String, FieldFilter>),
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Logical OR that short-circuits on `All`, drops `Nothing` branches and
    /// returns a lone branch bare.
    pub fn any_of(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
        let mut branches = Vec::new();
        for predicate in predicates {
            match predicate {
                Predicate::All => return Predicate::All,
                Predicate::Nothing => {}
                Predicate::Or(inner) => branches.extend(inner),
                other => branches.push(other),
            }
        }

        match branches.len() {
            0 => Predicate::Nothing,
            1 => branches.pop().unwrap_or(Predicate::Nothing),
            _ => Predicate::Or(branches),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Predicate::All)
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Predicate::Nothing)
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Predicate::All => true,
            Predicate::Nothing => false,
            Predicate::Where(filters) => filters
                .iter()
                .all(|(field, filter)| filter.matches(record.get(field))),
            Predicate::Or(branches) => branches.iter().any(|branch| branch.matches(record)),
        }
    }

    /// Keep the records this predicate selects.
    pub fn select<'r>(&self, records: &'r [Record]) -> Vec<&'r Record> {
        records.iter().filter(|record| self.matches(record)).collect()
    }

    pub fn to_json(&self) -> Value {
        match self {
            Predicate::All => Value::Object(Map::new()),
            Predicate::Nothing => json!({ "id": NO_ACCESS_SENTINEL }),
            Predicate::Where(filters) => Value::Object(
                filters
                    .iter()
                    .map(|(field, filter)| (field.clone(), filter.to_json()))
                    .collect(),
            ),
            Predicate::Or(branches) => {
                json!({ "OR": branches.iter().map(Predicate::to_json).collect::<Vec<_>>() })
            }
        }
    }
}

impl Serialize for Predicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Re-express a condition set as a predicate.
///
/// Absent or empty conditions give [`Predicate::All`]. An unknown operator or an
/// operand that does not resolve makes the whole set unsatisfiable, so the result is
/// [`Predicate::Nothing`], the same outcome in-memory evaluation reaches. So does a
/// condition on a reserved field name or one whose operand can never be satisfied.
pub fn translate(conditions: Option<&Conditions>, ctx: &Value) -> Predicate {
    let conditions = match conditions {
        Some(conditions) if !conditions.is_empty() => conditions,
        _ => return Predicate::All,
    };

    let mut filters = BTreeMap::new();
    for (field, condition) in conditions {
        if super::is_reserved_field(field) {
            tracing::warn!(field = %field, "condition on reserved field name, predicate matches nothing");
            return Predicate::Nothing;
        }

        if !condition.operator.is_known() {
            tracing::warn!(
                field = %field,
                operator = %condition.operator.as_str(),
                "unknown condition operator, predicate matches nothing"
            );
            return Predicate::Nothing;
        }

        let Some(expected) = template::resolve(&condition.operand, ctx) else {
            tracing::debug!(field = %field, "condition operand did not resolve against context");
            return Predicate::Nothing;
        };

        match FieldFilter::new(condition.operator.clone(), expected) {
            Some(filter) => {
                filters.insert(field.clone(), filter);
            }
            None => return Predicate::Nothing,
        }
    }

    Predicate::Where(filters)
}
