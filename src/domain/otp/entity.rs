//! One-time code entity

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::id::{OtpId, UserId};

/// Number of digits in a generated code
pub const OTP_CODE_LENGTH: usize = 4;

/// Fixed code issued when running in development mode
pub const OTP_DEV_CODE: &str = "1234";

/// How long a code stays redeemable
pub const OTP_LIFETIME_MINUTES: i64 = 5;

/// Single-use numeric code bound to a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Otp {
    id: OtpId,
    user_id: UserId,
    code: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Otp {
    /// Create a code that expires `OTP_LIFETIME_MINUTES` from now
    pub fn new(user_id: UserId, code: impl Into<String>) -> Self {
        let now = Utc::now();

        Self {
            id: OtpId::generate(),
            user_id,
            code: code.into(),
            expires_at: now + Duration::minutes(OTP_LIFETIME_MINUTES),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn restore(
        id: OtpId,
        user_id: UserId,
        code: String,
        expires_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            code,
            expires_at,
            created_at,
            updated_at,
        }
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = expires_at;
        self
    }

    pub fn id(&self) -> &OtpId {
        &self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn code(&self) -> &str {
        &self.code
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

    /// A code matches only while its expiry is still in the future
    pub fn is_redeemable_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}
