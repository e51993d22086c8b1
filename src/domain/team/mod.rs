//! Team domain module
//!
//! Teams group users; each user holds a role inside every team they belong to
//! and that role is what the RBAC engine evaluates.

mod entity;
mod repository;
mod validation;

pub use entity::{Member, MemberRole, Team};
pub use repository::TeamRepository;
pub use validation::{validate_team_name, TeamValidationError};

/// Maximum number of teams a single user may belong to
pub const MAX_TEAMS_PER_USER: usize = 5;

/// Error returned once a user already belongs to `max` teams
pub fn team_limit_error(max: usize) -> crate::domain::DomainError {
    crate::domain::DomainError::validation(format!("user already has {} teams", max))
}
