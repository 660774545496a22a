use serde_json::Value;

use super::{operator, template};
use crate::models::Condition;

/// Evaluate one condition against one field value.
///
/// Evaluation order:
/// 1. unknown operator -> deny (logged)
/// 2. unresolvable operand -> deny
/// 3. operator table
pub fn evaluate(value: Option<&Value>, condition: &Condition, ctx: &Value) -> bool {
    if !condition.operator.is_known() {
        tracing::warn!(
            operator = %condition.operator.as_str(),
            "unknown condition operator, denying"
        );
        return false;
    }

    let expected = match template::resolve(&condition.operand, ctx) {
        Some(expected) => expected,
        None => {
            tracing::debug!(
                operator = %condition.operator.as_str(),
                operand = %condition.operand.to_json(),
                "condition operand did not resolve against context"
            );
            return false;
        }
    };

    operator::apply(&condition.operator, value, &expected)
}
