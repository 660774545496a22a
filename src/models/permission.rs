use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Field name -> condition. Every entry must hold for a record to pass.
pub type Conditions = BTreeMap<String, Condition>;

/// Attribute bag under test, typically a stored entity.
pub type Record = Map<String, Value>;

// =============================================================================
// PERMISSION
// =============================================================================

/// One grant of `actions` on `entity_type`, optionally narrowed by field and record policy.
///
/// `fields: None` and `conditions: None` mean unrestricted on that dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    #[serde(default, deserialize_with = "super::de::null_default")]
    pub entity_type: String,
    #[serde(default, deserialize_with = "super::de::null_default")]
    pub actions: Vec<String>,
    #[serde(default)]
    pub fields: Option<FieldPolicy>,
    #[serde(default)]
    pub conditions: Option<Conditions>,
}

impl Permission {
    pub fn new<A, S>(entity_type: impl Into<String>, actions: A) -> Self
    where
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entity_type: entity_type.into(),
            actions: actions.into_iter().map(Into::into).collect(),
            fields: None,
            conditions: None,
        }
    }

    pub fn with_fields(mut self, fields: FieldPolicy) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn with_condition(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.conditions
            .get_or_insert_with(Conditions::new)
            .insert(field.into(), condition);
        self
    }

    pub fn grants(&self, action: &str, entity_type: &str) -> bool {
        self.entity_type == entity_type && self.actions.iter().any(|a| a == action)
    }

    /// No record-level restriction: absent or empty conditions.
    pub fn is_unconditional(&self) -> bool {
        self.conditions.as_ref().map_or(true, |c| c.is_empty())
    }
}

// =============================================================================
// FIELD POLICY
// =============================================================================

/// Allow-list or deny-list over record keys. The two lists are not meant to be combined;
/// when both are present the deny list is consulted first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denied: Option<Vec<String>>,
}

impl FieldPolicy {
    pub fn allow<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: Some(fields.into_iter().map(Into::into).collect()),
            denied: None,
        }
    }

    pub fn deny<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: None,
            denied: Some(fields.into_iter().map(Into::into).collect()),
        }
    }
}

// =============================================================================
// CONDITION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    In,
    NotIn,
    Gt,
    Lt,
    Gte,
    Lte,
    Contains,
    /// Anything else found in policy data. Never matches.
    Unknown(String),
}

impl Operator {
    pub fn parse(name: &str) -> Self {
        match name {
            "eq" => Operator::Eq,
            "ne" => Operator::Ne,
            "in" => Operator::In,
            "notIn" => Operator::NotIn,
            "gt" => Operator::Gt,
            "lt" => Operator::Lt,
            "gte" => Operator::Gte,
            "lte" => Operator::Lte,
            "contains" => Operator::Contains,
            other => Operator::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::In => "in",
            Operator::NotIn => "notIn",
            Operator::Gt => "gt",
            Operator::Lt => "lt",
            Operator::Gte => "gte",
            Operator::Lte => "lte",
            Operator::Contains => "contains",
            Operator::Unknown(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Operator::Unknown(_))
    }
}

/// Expected value of a condition.
///
/// In the JSON form a string shaped `${a.b.c}` is a reference into the evaluation
/// context; built programmatically, `Literal` strings are never interpreted.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    ContextRef(Vec<String>),
    List(Vec<Operand>),
}

impl Operand {
    pub fn literal(value: impl Into<Value>) -> Self {
        Operand::Literal(value.into())
    }

    pub fn context_ref(path: &str) -> Self {
        Operand::ContextRef(path.split('.').map(str::to_string).collect())
    }

    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(s) => match template_path(&s) {
                Some(path) => Operand::context_ref(path),
                None => Operand::Literal(Value::String(s)),
            },
            Value::Array(items) => Operand::List(items.into_iter().map(Operand::from_json).collect()),
            other => Operand::Literal(other),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Operand::Literal(value) => value.clone(),
            Operand::ContextRef(path) => Value::String(format!("${{{}}}", path.join("."))),
            Operand::List(items) => Value::Array(items.iter().map(Operand::to_json).collect()),
        }
    }
}

fn template_path(s: &str) -> Option<&str> {
    s.strip_prefix("${")?.strip_suffix('}')
}

/// A single-operator predicate on one field, written `{operator: expected}` in policy JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub operator: Operator,
    pub operand: Operand,
}

impl Condition {
    pub fn new(operator: Operator, operand: Operand) -> Self {
        Self { operator, operand }
    }

    /// Decode the one-key object form. Anything else becomes an `Unknown` operator
    /// so malformed policy data denies instead of failing to load.
    pub fn from_json(value: Value) -> Self {
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Self::new(Operator::Unknown(format!("<{}>", json_kind(&other))), Operand::Literal(other));
            }
        };

        if map.len() != 1 {
            let name = map.keys().cloned().collect::<Vec<_>>().join("+");
            return Self::new(Operator::Unknown(name), Operand::Literal(Value::Object(map)));
        }

        match map.into_iter().next() {
            Some((name, expected)) => Self::new(Operator::parse(&name), Operand::from_json(expected)),
            None => Self::new(Operator::Unknown(String::new()), Operand::Literal(Value::Null)),
        }
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert(self.operator.as_str().to_string(), self.operand.to_json());
        Value::Object(map)
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Condition::from_json)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
