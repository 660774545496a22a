//! Resolution of context references inside condition operands.

use serde_json::Value;

use crate::models::Operand;

/// Walk `path` through nested objects in `ctx`. Any missing step yields `None`.
pub fn resolve_path<'a, S: AsRef<str>>(ctx: &'a Value, path: &[S]) -> Option<&'a Value> {
    path.iter()
        .try_fold(ctx, |current, segment| current.as_object()?.get(segment.as_ref()))
}

/// Resolve an operand to a concrete value.
///
/// Lists resolve element-wise; a list with any unresolved element is unresolved as a whole.
pub fn resolve(operand: &Operand, ctx: &Value) -> Option<Value> {
    match operand {
        Operand::Literal(value) => Some(value.clone()),
        Operand::ContextRef(path) => resolve_path(ctx, path.as_slice()).cloned(),
        Operand::List(items) => items
            .iter()
            .map(|item| resolve(item, ctx))
            .collect::<Option<Vec<_>>>()
            .map(Value::Array),
    }
}
