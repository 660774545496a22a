use serde_json::Value;

use super::evaluator::evaluate;
use super::is_reserved_field;
use crate::models::{Conditions, Record};

/// AND of every field condition against `record`. Absent or empty conditions pass.
/// A condition on a reserved field name fails.
pub fn evaluate_conditions(conditions: Option<&Conditions>, record: &Record, ctx: &Value) -> bool {
    conditions.map_or(true, |conditions| {
        conditions.iter().all(|(field, condition)| {
            if is_reserved_field(field) {
                tracing::warn!(field = %field, "condition on reserved field name, denying");
                return false;
            }
            evaluate(record.get(field), condition, ctx)
        })
    })
}

/// Keep the records satisfying `conditions`.
pub fn filter_by_conditions(
    conditions: Option<&Conditions>,
    records: Vec<Record>,
    ctx: &Value,
) -> Vec<Record> {
    records
        .into_iter()
        .filter(|record| evaluate_conditions(conditions, record, ctx))
        .collect()
}
