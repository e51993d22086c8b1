//! User repository trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;

use super::entity::User;
use crate::domain::id::UserId;
use crate::domain::team::Member;
use crate::domain::DomainError;

/// Repository trait for user storage
#[async_trait]
pub trait UserRepository: Send + Sync + Debug {
    /// Get a user by their ID
    async fn get(&self, id: &UserId) -> Result<Option<User>, DomainError>;

    /// Get a user by their email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;

    /// Resolve the owner of a one-time code that is still unexpired at `now`
    ///
    /// This is a single join of codes onto users; an expired or unknown code
    /// yields `None`.
    async fn get_by_valid_otp(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, DomainError>;

    /// Create a new user, failing with `Conflict` on a duplicate email or username
    async fn create(&self, user: User) -> Result<User, DomainError>;

    /// Replace an existing user, memberships included
    async fn update(&self, user: &User) -> Result<User, DomainError>;

    /// Append one membership as a single atomic step
    ///
    /// Fails with `Validation` once the user already holds `max` teams and with
    /// `Conflict` if the user is already a member of that team. Other
    /// memberships are left untouched, so concurrent calls never overwrite
    /// each other.
    async fn add_membership(
        &self,
        user_id: &UserId,
        member: Member,
        max: usize,
    ) -> Result<User, DomainError>;
}
