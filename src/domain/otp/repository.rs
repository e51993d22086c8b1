//! One-time code repository trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::entity::Otp;
use crate::domain::id::UserId;
use crate::domain::DomainError;

/// Repository for one-time codes
///
/// Lookup of a code's owner lives on `UserRepository::get_by_valid_otp` so
/// that stores can resolve it with a single join.
#[async_trait]
pub trait OtpRepository: Send + Sync + std::fmt::Debug {
    /// Persist a freshly issued code
    async fn create(&self, otp: Otp) -> Result<(), DomainError>;

    /// Delete every record carrying `code`, returning how many were removed
    async fn delete_by_code(&self, code: &str) -> Result<u64, DomainError>;

    /// Delete every code whose expiry is not after `now`
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, DomainError>;

    /// Delete every outstanding code issued to the user
    async fn delete_by_user(&self, user_id: &UserId) -> Result<u64, DomainError>;
}
