pub mod authz;
pub mod errors;
pub mod models;
pub mod snapshot;

// Re-export commonly used items
pub use authz::{AuthzMode, PermissionChecker, Predicate, Principal};
pub use errors::{AuthzError, AuthzResult};
pub use models::{Condition, FieldPolicy, Operand, Operator, Permission, Record};
