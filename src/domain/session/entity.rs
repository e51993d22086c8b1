//! Refresh session entity

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::id::{SessionId, UserId};

/// Lifetime of a freshly created or rotated session
pub const SESSION_LIFETIME_DAYS: i64 = 7;

/// Remaining lifetime below which a refresh rotates the session
pub const SESSION_ROTATION_THRESHOLD_DAYS: i64 = 3;

/// Length of the opaque session hash
pub const SESSION_HASH_LENGTH: usize = 64;

/// Long-lived refresh session identified by an opaque hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    user_id: UserId,
    hash: String,
    ip: String,
    user_agent: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a session that expires `SESSION_LIFETIME_DAYS` from now
    pub fn new(
        user_id: UserId,
        hash: impl Into<String>,
        ip: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: SessionId::generate(),
            user_id,
            hash: hash.into(),
            ip: ip.into(),
            user_agent: user_agent.into(),
            expires_at: now + Duration::days(SESSION_LIFETIME_DAYS),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a session from stored fields
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: SessionId,
        user_id: UserId,
        hash: String,
        ip: String,
        user_agent: String,
        expires_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            hash,
            ip,
            user_agent,
            expires_at,
            created_at,
            updated_at,
        }
    }

    /// Override the expiry
    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = expires_at;
        self
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// A session is valid only while its expiry is strictly in the future
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    /// Whether a refresh at `now` must rotate the hash
    pub fn needs_rotation_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::days(SESSION_ROTATION_THRESHOLD_DAYS) > self.expires_at
    }

    /// Swap in a new hash and push the expiry out by a full lifetime
    pub fn rotate(&mut self, hash: impl Into<String>, now: DateTime<Utc>) {
        self.hash = hash.into();
        self.expires_at = now + Duration::days(SESSION_LIFETIME_DAYS);
        self.updated_at = now;
    }
}
