//! Role-based access control domain module
//!
//! Allow-list only: a role either holds a grant covering the requested
//! permission or it is denied.

mod permission;
mod policy;

pub use permission::{Permission, SEPARATOR, WILDCARD};
pub use policy::{PolicySource, RoleDefinition, RolePolicy};
