//! In-memory record filtering and the generated query predicate must select the same records.

use serde_json::{json, Value};

use records_authz::authz::operator::apply;
use records_authz::{Operator, PermissionChecker, Principal, Record};

fn fleet() -> Vec<Record> {
    let rows = json!([
        {"id": 1, "department": "Ops", "location": "Depot 4", "status": "new", "mileage": 1200,
         "plate": "OPS-001", "inspectedAt": "2024-01-10T09:00:00Z"},
        {"id": 2, "department": "Ops", "location": "HQ", "status": "under_review", "mileage": 98000,
         "plate": "ops-002", "inspectedAt": "2024-03-15T12:00:00+01:00"},
        {"id": 3, "department": "Sales", "location": "Depot 4", "status": "rejected", "mileage": 45000,
         "plate": "SAL-003", "inspectedAt": "2023-11-30T18:00:00Z"},
        {"id": 4, "department": "Sales", "location": "HQ", "status": "approved", "mileage": 150000,
         "plate": "SAL-004"},
        {"id": 5, "department": "Legal", "status": "new", "mileage": 1200.0, "plate": null},
        {"id": 6, "location": "Depot 4", "status": "archived", "mileage": "unknown", "plate": "XOPS-6"},
        {"id": 7, "status": "new", "meta": "x", "tags": ["a", "b"], "OR": "x"},
        {"id": 8, "status": "new", "meta": {"in": ["x"]}, "tags": ["b"], "mileage": 3}
    ]);
    rows.as_array()
        .expect("fixture array")
        .iter()
        .map(|row| row.as_object().cloned().expect("fixture object"))
        .collect()
}

fn checker_with(conditions: Vec<Value>) -> PermissionChecker {
    let permissions: Vec<Value> = conditions
        .into_iter()
        .map(|c| json!({"entityType": "vehicles", "actions": ["read"], "fields": null, "conditions": c}))
        .collect();
    let principal: Principal = serde_json::from_value(json!({
        "id": "u-fleet",
        "department": "Ops",
        "location": "Depot 4",
        "roles": ["dispatcher"],
        "permissions": permissions
    }))
    .expect("principal fixture");
    PermissionChecker::new(principal)
}

/// Reads the rendered predicate JSON the way a storage adapter would.
fn rendered_matches(predicate: &Value, record: &Record) -> bool {
    let Some(clauses) = predicate.as_object() else {
        panic!("predicate must render as an object: {predicate}");
    };

    clauses.iter().all(|(key, clause)| {
        if key == "OR" {
            let branches = clause.as_array().expect("OR takes a list");
            return branches.iter().any(|branch| rendered_matches(branch, record));
        }
        field_clause_matches(clause, record.get(key))
    })
}

fn field_clause_matches(clause: &Value, value: Option<&Value>) -> bool {
    let Some(ops) = clause.as_object() else {
        return apply(&Operator::Eq, value, clause);
    };

    ops.iter().all(|(op, operand)| match op.as_str() {
        "equals" => apply(&Operator::Eq, value, operand),
        "not" => !field_clause_matches(operand, value),
        "in" => apply(&Operator::In, value, operand),
        "notIn" => apply(&Operator::NotIn, value, operand),
        "gt" => apply(&Operator::Gt, value, operand),
        "lt" => apply(&Operator::Lt, value, operand),
        "gte" => apply(&Operator::Gte, value, operand),
        "lte" => apply(&Operator::Lte, value, operand),
        "contains" => apply(&Operator::Contains, value, operand),
        "mode" => operand == "insensitive",
        other => panic!("unexpected filter key `{other}` in {clause}"),
    })
}

fn ids(records: &[&Record]) -> Vec<Value> {
    records.iter().map(|r| r["id"].clone()).collect()
}

fn assert_paths_agree(label: &str, conditions: Vec<Value>) {
    let checker = checker_with(conditions);
    let data = fleet();

    let in_memory: Vec<&Record> = data
        .iter()
        .filter(|r| checker.can_access_record("read", "vehicles", r))
        .collect();
    let predicate = checker.query_predicate("read", "vehicles");
    let pushed_down = predicate.select(&data);

    assert_eq!(
        ids(&in_memory),
        ids(&pushed_down),
        "paths disagree for {label}: predicate {}",
        predicate.to_json()
    );

    let rendered = predicate.to_json();
    let from_rendered: Vec<&Record> = data.iter().filter(|r| rendered_matches(&rendered, r)).collect();
    assert_eq!(
        ids(&in_memory),
        ids(&from_rendered),
        "rendered predicate disagrees for {label}: {rendered}"
    );

    let filtered = checker.filter_records("read", "vehicles", data.clone());
    let filtered_ids: Vec<Value> = filtered.iter().map(|r| r["id"].clone()).collect();
    assert_eq!(filtered_ids, ids(&in_memory), "filter_records disagrees for {label}");
}

#[test]
fn every_operator_agrees_across_paths() {
    let cases = vec![
        ("eq template", json!({"department": {"eq": "${user.department}"}})),
        ("eq literal", json!({"status": {"eq": "new"}})),
        ("ne", json!({"status": {"ne": "rejected"}})),
        ("in", json!({"status": {"in": ["new", "under_review"]}})),
        ("in scalar", json!({"status": {"in": "approved"}})),
        ("in templated list", json!({"location": {"in": ["HQ", "${user.location}"]}})),
        ("notIn", json!({"status": {"notIn": ["archived", "rejected"]}})),
        ("gt", json!({"mileage": {"gt": 45000}})),
        ("lt", json!({"mileage": {"lt": 45000}})),
        ("gte", json!({"mileage": {"gte": 45000}})),
        ("lte", json!({"mileage": {"lte": 1200}})),
        ("timestamp", json!({"inspectedAt": {"gte": "2024-01-01T00:00:00Z"}})),
        ("contains", json!({"plate": {"contains": "ops"}})),
        ("unknown operator", json!({"plate": {"startsWith": "OPS"}})),
        ("unresolved template", json!({"department": {"eq": "${user.region}"}})),
        ("conjunction", json!({"department": {"eq": "${user.department}"}, "mileage": {"lt": 50000}})),
        ("empty", json!({})),
        ("ne structured", json!({"meta": {"ne": {"in": ["x"]}}})),
        ("eq structured", json!({"meta": {"eq": {"in": ["x"]}}})),
        ("ne list", json!({"tags": {"ne": ["a", "b"]}})),
        ("ordering against object", json!({"mileage": {"gt": {"lt": 5}}})),
        ("contains number", json!({"plate": {"contains": 1}})),
        ("reserved field", json!({"OR": {"eq": "x"}})),
    ];

    for (label, conditions) in cases {
        assert_paths_agree(label, vec![conditions]);
    }
}

#[test]
fn disjunction_of_permissions_agrees_across_paths() {
    assert_paths_agree(
        "department or location",
        vec![
            json!({"department": {"eq": "${user.department}"}}),
            json!({"location": {"eq": "${user.location}"}}),
        ],
    );
    assert_paths_agree(
        "valid or unknown operator",
        vec![
            json!({"status": {"eq": "new"}}),
            json!({"status": {"like": "%new%"}}),
        ],
    );
    assert_paths_agree(
        "conditional or unconditional",
        vec![json!({"status": {"eq": "new"}}), Value::Null],
    );
}

#[test]
fn disjunction_renders_or_branches() {
    let checker = checker_with(vec![
        json!({"department": {"eq": "${user.department}"}}),
        json!({"location": {"eq": "${user.location}"}, "mileage": {"lt": 100000}}),
    ]);

    assert_eq!(
        checker.query_predicate("read", "vehicles").to_json(),
        json!({"OR": [
            {"department": "Ops"},
            {"location": "Depot 4", "mileage": {"lt": 100000}}
        ]})
    );
}
