//! Field access policy: allow/deny lists over record keys.

use crate::models::{FieldPolicy, Record};

/// Deny is checked before allow; a policy with neither list allows everything.
pub fn can_access_field(policy: Option<&FieldPolicy>, field: &str) -> bool {
    let Some(policy) = policy else {
        return true;
    };

    if let Some(ref denied) = policy.denied {
        if denied.iter().any(|d| d == field) {
            return false;
        }
    }

    match policy.allowed {
        Some(ref allowed) => allowed.iter().any(|a| a == field),
        None => true,
    }
}

/// Fields readable under `policy`.
///
/// An allow-list is returned as written, without intersecting it against `all_fields`.
pub fn accessible_fields(policy: Option<&FieldPolicy>, all_fields: &[String]) -> Vec<String> {
    let Some(policy) = policy else {
        return all_fields.to_vec();
    };

    if let Some(ref allowed) = policy.allowed {
        return allowed.clone();
    }

    match policy.denied {
        Some(ref denied) => all_fields
            .iter()
            .filter(|f| !denied.contains(*f))
            .cloned()
            .collect(),
        None => all_fields.to_vec(),
    }
}

/// Project `record` onto the keys `policy` allows.
pub fn filter_object_fields(policy: Option<&FieldPolicy>, record: &Record) -> Record {
    record
        .iter()
        .filter(|(key, _)| can_access_field(policy, key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
