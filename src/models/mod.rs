pub mod de;
pub mod permission;

pub use permission::{Condition, Conditions, FieldPolicy, Operand, Operator, Permission, Record};
