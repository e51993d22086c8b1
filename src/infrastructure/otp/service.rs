//! One-time code issuance and consumption

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::{
    AuthError, DomainError, Otp, OtpRepository, User, UserRepository, OTP_CODE_LENGTH,
    OTP_DEV_CODE,
};
use crate::infrastructure::random;
use crate::infrastructure::tasks::BackgroundTasks;

/// Attempts at drawing an unused random code before giving up
const MAX_ISSUE_ATTEMPTS: usize = 5;

/// How codes are generated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpMode {
    /// Always the constant development code
    Development,
    /// Random decimal digits
    Random,
}

/// Issues codes at login and redeems them at verification
#[derive(Debug)]
pub struct OtpService {
    otps: Arc<dyn OtpRepository>,
    users: Arc<dyn UserRepository>,
    tasks: BackgroundTasks,
    mode: OtpMode,
}

impl OtpService {
    pub fn new(
        otps: Arc<dyn OtpRepository>,
        users: Arc<dyn UserRepository>,
        tasks: BackgroundTasks,
        mode: OtpMode,
    ) -> Self {
        Self {
            otps,
            users,
            tasks,
            mode,
        }
    }

    /// Persist a fresh code for the user
    ///
    /// Codes are unique in the store. Expired codes and the user's earlier
    /// code are cleared first. In development mode any outstanding constant
    /// code is cleared too; in random mode a collision draws again.
    pub async fn issue(&self, user: &User) -> Result<Otp, DomainError> {
        self.purge(user).await?;

        match self.mode {
            OtpMode::Development => {
                self.otps.delete_by_code(OTP_DEV_CODE).await?;
                let otp = Otp::new(*user.id(), OTP_DEV_CODE);
                self.otps.create(otp.clone()).await?;
                info!(user_id = %user.id(), "Issued development otp");
                Ok(otp)
            }
            OtpMode::Random => {
                for attempt in 1..=MAX_ISSUE_ATTEMPTS {
                    let otp = Otp::new(*user.id(), random::digits(OTP_CODE_LENGTH));
                    match self.otps.create(otp.clone()).await {
                        Ok(()) => {
                            info!(user_id = %user.id(), "Issued otp");
                            return Ok(otp);
                        }
                        Err(DomainError::Conflict { .. }) => {
                            debug!(attempt, "Otp code collision, drawing again");
                        }
                        Err(e) => return Err(e),
                    }
                }

                warn!(user_id = %user.id(), "Could not draw an unused otp code");
                Err(DomainError::conflict("No unused one-time code available"))
            }
        }
    }

    async fn purge(&self, user: &User) -> Result<(), DomainError> {
        let expired = self.otps.delete_expired(Utc::now()).await?;
        let replaced = self.otps.delete_by_user(user.id()).await?;

        if expired > 0 || replaced > 0 {
            debug!(user_id = %user.id(), expired, replaced, "Cleared stale otps");
        }
        Ok(())
    }

    /// Resolve the user owning a live code
    pub async fn consume(&self, code: &str) -> Result<User, DomainError> {
        self.users
            .get_by_valid_otp(code, Utc::now())
            .await?
            .ok_or_else(|| AuthError::InvalidCodeOrEmail.into())
    }

    /// Best-effort background deletion of a redeemed code
    pub fn delete_later(&self, code: &str) {
        let otps = self.otps.clone();
        let code = code.to_string();

        self.tasks.spawn("otp.delete", async move {
            otps.delete_by_code(&code).await.map(|_| ())
        });
    }
}
