use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::models::{de, Permission};

/// Principal represents the authenticated actor with its flattened permissions
///
/// Permissions are kept without role lineage; only the union matters once the
/// snapshot is built.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    #[serde(deserialize_with = "de::string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "de::null_default")]
    pub email: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "de::null_default")]
    pub roles: HashSet<String>,
    #[serde(default, deserialize_with = "de::null_default")]
    pub is_superuser: bool,
    #[serde(default, deserialize_with = "de::null_default")]
    pub permissions: Vec<Permission>,
    /// Extra attributes exposed to condition templates under `user.*`
    #[serde(default, deserialize_with = "de::null_default", skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.permissions = permissions.into_iter().collect();
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn superuser(mut self) -> Self {
        self.is_superuser = true;
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Build the evaluation context that condition templates resolve against.
    ///
    /// Attributes the principal does not carry are left out rather than set to
    /// null, so a template pointing at them stays unresolved.
    pub fn context(&self) -> Value {
        let mut user = self.attributes.clone();
        user.insert("id".to_string(), Value::String(self.id.clone()));
        if !self.email.is_empty() {
            user.insert("email".to_string(), Value::String(self.email.clone()));
        }
        if let Some(ref department) = self.department {
            user.insert("department".to_string(), Value::String(department.clone()));
        }
        if let Some(ref location) = self.location {
            user.insert("location".to_string(), Value::String(location.clone()));
        }

        let mut roles: Vec<&String> = self.roles.iter().collect();
        roles.sort();
        user.insert(
            "roles".to_string(),
            Value::Array(roles.into_iter().map(|r| Value::String(r.clone())).collect()),
        );
        user.insert("isSuperuser".to_string(), Value::Bool(self.is_superuser));

        let mut ctx = Map::new();
        ctx.insert("user".to_string(), Value::Object(user));
        Value::Object(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn context_exposes_user_attributes() {
        let principal = Principal::new("u-1")
            .with_email("ada@example.com")
            .with_department("Ops")
            .with_roles(["dispatcher"])
            .with_attribute("region", "north");

        let ctx = principal.context();
        assert_eq!(ctx["user"]["id"], json!("u-1"));
        assert_eq!(ctx["user"]["department"], json!("Ops"));
        assert_eq!(ctx["user"]["region"], json!("north"));
        assert_eq!(ctx["user"]["roles"], json!(["dispatcher"]));
    }

    #[test]
    fn missing_attributes_are_omitted() {
        let ctx = Principal::new("u-2").context();
        assert!(ctx["user"].get("department").is_none());
        assert!(ctx["user"].get("location").is_none());
    }

    #[test]
    fn decodes_snapshot_json() {
        let principal: Principal = serde_json::from_value(json!({
            "id": "u-3",
            "email": "x@example.com",
            "department": "Fleet",
            "roles": ["manager", "manager"],
            "isSuperuser": false,
            "permissions": [{"entityType": "vehicles", "actions": ["read"], "fields": null, "conditions": null}]
        }))
        .unwrap();

        assert_eq!(principal.roles.len(), 1);
        assert!(principal.has_role("manager"));
        assert_eq!(principal.permissions.len(), 1);
        assert!(principal.location.is_none());
    }

    #[test]
    fn explicit_nulls_decode_as_empty() {
        let principal: Principal = serde_json::from_value(json!({
            "id": "u-4",
            "email": null,
            "department": null,
            "roles": null,
            "isSuperuser": null,
            "permissions": null,
            "attributes": null
        }))
        .unwrap();

        assert!(principal.email.is_empty());
        assert!(principal.roles.is_empty());
        assert!(!principal.is_superuser);
        assert!(principal.permissions.is_empty());
        assert!(principal.context()["user"].get("department").is_none());
    }

    #[test]
    fn numeric_id_is_kept_as_string() {
        let principal: Principal = serde_json::from_value(json!({"id": 42})).unwrap();
        assert_eq!(principal.id, "42");
        assert_eq!(principal.context()["user"]["id"], json!("42"));

        let rejected = serde_json::from_value::<Principal>(json!({"id": ["u-1"]}));
        assert!(rejected.is_err());
    }
}
