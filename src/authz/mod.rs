//! Authorization module - ABAC policy engine
//!
//! This module implements the attribute-based policy engine with support for:
//! - Action checks per entity type
//! - Field allow/deny lists with union semantics across permissions
//! - Record conditions templated against principal attributes
//! - Query predicates mirroring in-memory record checks
//! - Superuser bypass
//! - Configurable enforcement modes (off/advisory/strict)

mod checker;
pub mod conditions;
pub mod evaluator;
pub mod fields;
pub mod operator;
pub mod predicate;
mod principal;
pub mod template;

pub use checker::PermissionChecker;
pub use predicate::{FieldFilter, Predicate, NO_ACCESS_SENTINEL};
pub use principal::Principal;

use std::fmt::Display;
use std::sync::OnceLock;

use crate::errors::{AuthzError, AuthzResult};

/// Fields kept by field filtering whenever any permission matches.
pub const SYSTEM_FIELDS: &[&str] = &["id", "createdAt", "updatedAt"];

/// Combinator keys of the query predicate dialect. Conditions on fields with these
/// names never match, in memory or as a predicate.
pub const RESERVED_FIELDS: &[&str] = &["OR", "AND", "NOT"];

pub fn is_reserved_field(field: &str) -> bool {
    RESERVED_FIELDS.contains(&field)
}

/// Authorization enforcement mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthzMode {
    /// No permission checks (development mode)
    Off,
    /// Log denials but allow requests (testing mode)
    Advisory,
    /// Reject denied requests (production mode)
    Strict,
}

impl AuthzMode {
    pub fn parse(value: &str) -> AuthzResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "off" => Ok(AuthzMode::Off),
            "advisory" => Ok(AuthzMode::Advisory),
            "strict" => Ok(AuthzMode::Strict),
            other => Err(AuthzError::configuration(format!(
                "AUTHZ_MODE must be one of off, advisory, strict (got `{other}`)"
            ))),
        }
    }

    /// Read `AUTHZ_MODE` once. Unset or invalid values fall back to `Strict`.
    pub fn from_env() -> Self {
        static MODE: OnceLock<AuthzMode> = OnceLock::new();
        *MODE.get_or_init(|| match std::env::var("AUTHZ_MODE") {
            Ok(value) => AuthzMode::parse(&value).unwrap_or_else(|err| {
                tracing::warn!(error = %err, "falling back to strict authorization");
                AuthzMode::Strict
            }),
            Err(_) => AuthzMode::Strict,
        })
    }
}

/// Turn a decision into a gate result according to `mode`.
pub fn enforce(mode: AuthzMode, allowed: bool, what: impl Display) -> AuthzResult<()> {
    if allowed {
        return Ok(());
    }

    match mode {
        AuthzMode::Off => Ok(()),
        AuthzMode::Advisory => {
            tracing::warn!(denied = %what, "authorization denied (advisory mode, allowing)");
            Ok(())
        }
        AuthzMode::Strict => Err(AuthzError::forbidden(what.to_string())),
    }
}

/// Conventional action names
pub mod actions {
    pub const CREATE: &str = "create";
    pub const READ: &str = "read";
    pub const UPDATE: &str = "update";
    pub const DELETE: &str = "delete";
}
