//! Request gates: bearer credentials and team permissions

pub mod rbac;
pub mod user_auth;

pub use rbac::require_permission;
pub use user_auth::{extract_bearer_token, RequireClaims};
