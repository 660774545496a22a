use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use super::conditions::evaluate_conditions;
use super::fields;
use super::predicate::{translate, Predicate};
use super::principal::Principal;
use super::{AuthzMode, SYSTEM_FIELDS};
use crate::errors::{AuthzError, AuthzResult};
use crate::models::{Permission, Record};

/// Per-request decision shell around one principal snapshot.
///
/// Construct it once per request; it never changes afterwards. When several
/// permissions match an (action, entity type) pair, every decision is the union
/// of what each one allows.
#[derive(Debug, Clone)]
pub struct PermissionChecker {
    principal: Principal,
    context: Value,
    all_access: Permission,
}

impl PermissionChecker {
    pub fn new(principal: Principal) -> Self {
        let context = principal.context();
        Self {
            principal,
            context,
            all_access: Permission::new("*", ["*"]),
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn context(&self) -> &Value {
        &self.context
    }

    pub fn is_superuser(&self) -> bool {
        self.principal.is_superuser
    }

    /// Permissions granting `action` on `entity_type`. A superuser gets a single
    /// synthetic permission with no field or record restriction.
    pub fn permissions_for(&self, action: &str, entity_type: &str) -> Vec<&Permission> {
        if self.is_superuser() {
            return vec![&self.all_access];
        }

        self.principal
            .permissions
            .iter()
            .filter(|p| p.grants(action, entity_type))
            .collect()
    }

    pub fn can(&self, action: &str, entity_type: &str) -> bool {
        if self.is_superuser() {
            tracing::debug!(
                principal_id = %self.principal.id,
                action = %action,
                entity_type = %entity_type,
                "superuser bypass"
            );
            return true;
        }

        let allowed = self
            .principal
            .permissions
            .iter()
            .any(|p| p.grants(action, entity_type));

        tracing::debug!(
            principal_id = %self.principal.id,
            action = %action,
            entity_type = %entity_type,
            allowed,
            "action check"
        );
        allowed
    }

    /// Entry gate applying `mode` to [`can`](Self::can).
    pub fn require(&self, action: &str, entity_type: &str, mode: AuthzMode) -> AuthzResult<()> {
        super::enforce(
            mode,
            self.can(action, entity_type),
            format_args!("{action} on {entity_type}"),
        )
    }

    // -------------------------------------------------------------------------
    // Field level
    // -------------------------------------------------------------------------

    pub fn can_access_field(&self, action: &str, entity_type: &str, field: &str) -> bool {
        self.permissions_for(action, entity_type)
            .iter()
            .any(|p| fields::can_access_field(p.fields.as_ref(), field))
    }

    /// Union of the accessible fields of every matching permission, in first-seen order.
    pub fn accessible_fields(
        &self,
        action: &str,
        entity_type: &str,
        all_fields: &[String],
    ) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut union = Vec::new();
        for permission in self.permissions_for(action, entity_type) {
            for field in fields::accessible_fields(permission.fields.as_ref(), all_fields) {
                if seen.insert(field.clone()) {
                    union.push(field);
                }
            }
        }
        union
    }

    /// Project `record` onto the fields this principal may see.
    ///
    /// With no matching permission the result is empty, identifier included.
    /// Otherwise `id`, `createdAt` and `updatedAt` are always kept.
    pub fn filter_fields(&self, action: &str, entity_type: &str, record: &Record) -> Record {
        let permissions = self.permissions_for(action, entity_type);
        if permissions.is_empty() {
            return Record::new();
        }

        record
            .iter()
            .filter(|(key, _)| {
                SYSTEM_FIELDS.contains(&key.as_str())
                    || permissions
                        .iter()
                        .any(|p| fields::can_access_field(p.fields.as_ref(), key))
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn filter_fields_all(&self, action: &str, entity_type: &str, records: &[Record]) -> Vec<Record> {
        records
            .iter()
            .map(|record| self.filter_fields(action, entity_type, record))
            .collect()
    }

    /// Storage-level field selection (`field -> true`).
    ///
    /// Only fields present in `all_fields` are selected. The selection is never
    /// empty: `id` is requested at minimum.
    pub fn field_selection(
        &self,
        action: &str,
        entity_type: &str,
        all_fields: &[String],
    ) -> BTreeMap<String, bool> {
        let mut selection: BTreeMap<String, bool> = self
            .accessible_fields(action, entity_type, all_fields)
            .into_iter()
            .filter(|field| all_fields.contains(field))
            .map(|field| (field, true))
            .collect();

        if selection.is_empty() {
            selection.insert("id".to_string(), true);
        }
        selection
    }

    /// Validate the field names of an incoming write payload.
    pub fn check_write_fields<'f, I>(&self, action: &str, entity_type: &str, fields: I) -> AuthzResult<()>
    where
        I: IntoIterator<Item = &'f str>,
    {
        let rejected: Vec<String> = fields
            .into_iter()
            .filter(|field| !self.can_access_field(action, entity_type, field))
            .map(str::to_string)
            .collect();

        if rejected.is_empty() {
            return Ok(());
        }

        tracing::debug!(
            principal_id = %self.principal.id,
            action = %action,
            entity_type = %entity_type,
            rejected = ?rejected,
            "write payload touches inaccessible fields"
        );
        Err(AuthzError::fields_not_writable(entity_type, rejected))
    }

    // -------------------------------------------------------------------------
    // Record level
    // -------------------------------------------------------------------------

    pub fn can_access_record(&self, action: &str, entity_type: &str, record: &Record) -> bool {
        if self.is_superuser() {
            return true;
        }

        let permissions = self.permissions_for(action, entity_type);
        if permissions.is_empty() {
            tracing::debug!(
                principal_id = %self.principal.id,
                action = %action,
                entity_type = %entity_type,
                "no matching permission for record"
            );
            return false;
        }

        self.grants_record(&permissions, record)
    }

    pub fn filter_records(&self, action: &str, entity_type: &str, records: Vec<Record>) -> Vec<Record> {
        if self.is_superuser() {
            return records;
        }

        let permissions = self.permissions_for(action, entity_type);
        if permissions.is_empty() {
            return Vec::new();
        }

        records
            .into_iter()
            .filter(|record| self.grants_record(&permissions, record))
            .collect()
    }

    fn grants_record(&self, permissions: &[&Permission], record: &Record) -> bool {
        permissions.iter().any(|p| {
            p.conditions.is_none() || evaluate_conditions(p.conditions.as_ref(), record, &self.context)
        })
    }

    /// Query predicate selecting the records [`can_access_record`](Self::can_access_record) accepts.
    pub fn query_predicate(&self, action: &str, entity_type: &str) -> Predicate {
        if self.is_superuser() {
            return Predicate::All;
        }

        let permissions = self.permissions_for(action, entity_type);
        if permissions.is_empty() {
            return Predicate::Nothing;
        }

        if permissions.iter().any(|p| p.is_unconditional()) {
            return Predicate::All;
        }

        Predicate::any_of(
            permissions
                .iter()
                .map(|p| translate(p.conditions.as_ref(), &self.context)),
        )
    }

    // -------------------------------------------------------------------------
    // Roles
    // -------------------------------------------------------------------------

    pub fn has_role(&self, role: &str) -> bool {
        self.is_superuser() || self.principal.has_role(role)
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        self.is_superuser() || roles.iter().any(|r| self.principal.has_role(r))
    }

    pub fn has_all_roles(&self, roles: &[&str]) -> bool {
        self.is_superuser() || roles.iter().all(|r| self.principal.has_role(r))
    }
}
