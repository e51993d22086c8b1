//! Passwordless authentication flows
//!
//! Composes the OTP, session and credential services into login, verify,
//! refresh, session listing and logout. Every flow runs under the configured
//! deadline.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::domain::{AuthError, DomainError, Session, User, UserId, UserRepository};
use crate::infrastructure::auth::CredentialService;
use crate::infrastructure::otp::OtpService;
use crate::infrastructure::random;
use crate::infrastructure::session::SessionService;
use crate::infrastructure::tasks::with_deadline;

/// Acknowledgement returned by login whether or not the user existed
pub const LOGIN_ACK_MESSAGE: &str = "an otp has been sent to your email";

/// Prefix of generated usernames
const DEFAULT_USERNAME_PREFIX: &str = "user_";

/// Random suffix length of generated usernames
const DEFAULT_USERNAME_SUFFIX_LENGTH: usize = 6;

/// Request for starting a login
#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub avatar: Option<String>,
    pub username: Option<String>,
}

/// Request for redeeming a one-time code
#[derive(Debug, Clone)]
pub struct VerifyRequest {
    pub code: String,
    pub email: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginAck {
    pub message: String,
}

/// Result of a successful verify or refresh
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub user: User,
    pub session: Session,
    pub credential: String,
}

/// Authentication orchestrator
#[derive(Debug)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    otp: OtpService,
    sessions: SessionService,
    credentials: Arc<dyn CredentialService>,
    flow_timeout: Duration,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        otp: OtpService,
        sessions: SessionService,
        credentials: Arc<dyn CredentialService>,
        flow_timeout: Duration,
    ) -> Self {
        Self {
            users,
            otp,
            sessions,
            credentials,
            flow_timeout,
        }
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialService> {
        &self.credentials
    }

    /// Find or register the user by email and issue a one-time code
    pub async fn login(&self, request: LoginRequest) -> Result<LoginAck, DomainError> {
        with_deadline("auth.login", self.flow_timeout, self.login_inner(request)).await
    }

    async fn login_inner(&self, request: LoginRequest) -> Result<LoginAck, DomainError> {
        let user = match self.users.get_by_email(&request.email).await? {
            Some(user) if user.is_blocked() => {
                info!(user_id = %user.id(), "Login refused for blocked user");
                return Err(AuthError::UserBlocked.into());
            }
            Some(user) => user,
            None => self.register(request).await?,
        };

        self.otp.issue(&user).await?;

        Ok(LoginAck {
            message: LOGIN_ACK_MESSAGE.to_string(),
        })
    }

    async fn register(&self, request: LoginRequest) -> Result<User, DomainError> {
        let username = request
            .username
            .filter(|u| !u.is_empty())
            .unwrap_or_else(default_username);

        let user = User::new(request.email, username, request.avatar);
        user.validate()
            .map_err(|e| DomainError::validation(e.to_string()))?;

        let user = self.users.create(user).await?;
        info!(user_id = %user.id(), "User registered");
        Ok(user)
    }

    /// Redeem a code for a new session and credential
    pub async fn verify(&self, request: VerifyRequest) -> Result<AuthOutcome, DomainError> {
        with_deadline("auth.verify", self.flow_timeout, self.verify_inner(request)).await
    }

    async fn verify_inner(&self, request: VerifyRequest) -> Result<AuthOutcome, DomainError> {
        let user = self.otp.consume(&request.code).await?;

        if user.is_blocked() || user.email() != request.email {
            debug!(user_id = %user.id(), "Verify rejected for blocked user or email mismatch");
            return Err(AuthError::InvalidUserOrBlocked.into());
        }

        let session = self
            .sessions
            .create(
                user.id(),
                request.ip.as_deref(),
                request.user_agent.as_deref(),
            )
            .await?;

        let credential = self.mint(&user)?;
        self.otp.delete_later(&request.code);

        info!(user_id = %user.id(), session_id = %session.id(), "User verified");
        Ok(AuthOutcome {
            user,
            session,
            credential,
        })
    }

    /// Exchange a session hash for a fresh credential, rotating when due
    pub async fn refresh(&self, hash: &str) -> Result<AuthOutcome, DomainError> {
        with_deadline("auth.refresh", self.flow_timeout, self.refresh_inner(hash)).await
    }

    async fn refresh_inner(&self, hash: &str) -> Result<AuthOutcome, DomainError> {
        let session = self.sessions.get_by_hash(hash).await?;
        let now = Utc::now();

        if !session.is_valid_at(now) {
            debug!(session_id = %session.id(), "Refresh with expired session");
            return Err(AuthError::SessionExpired.into());
        }

        let user = self
            .users
            .get(session.user_id())
            .await?
            .ok_or(AuthError::InvalidUserOrBlocked)?;

        if user.is_blocked() {
            return Err(AuthError::UserBlocked.into());
        }

        let session = self.sessions.rotate_if_needed(session, now).await?;
        let credential = self.mint(&user)?;

        info!(user_id = %user.id(), session_id = %session.id(), "Session refreshed");
        Ok(AuthOutcome {
            user,
            session,
            credential,
        })
    }

    /// Every session of the user
    pub async fn sessions(&self, user_id: &UserId) -> Result<Vec<Session>, DomainError> {
        with_deadline(
            "auth.sessions",
            self.flow_timeout,
            self.sessions.list_by_user(user_id),
        )
        .await
    }

    /// Revoke the user's session carrying `hash`
    ///
    /// A hash matching none of the user's sessions is not an error.
    pub async fn logout(&self, user_id: &UserId, hash: &str) -> Result<(), DomainError> {
        with_deadline("auth.logout", self.flow_timeout, async {
            let sessions = self.sessions.list_by_user(user_id).await?;

            if sessions.is_empty() {
                return Err(DomainError::from(AuthError::NoSessionsFound));
            }

            match sessions.iter().find(|s| s.hash() == hash) {
                Some(session) => {
                    self.sessions.revoke(session.id()).await?;
                    info!(user_id = %user_id, session_id = %session.id(), "User logged out");
                }
                None => debug!(user_id = %user_id, "Logout hash matched no session"),
            }

            Ok(())
        })
        .await
    }

    fn mint(&self, user: &User) -> Result<String, DomainError> {
        self.credentials.issue(
            user.id(),
            user.email(),
            &user.team_claims(),
            self.credentials.default_ttl(),
        )
    }
}

fn default_username() -> String {
    format!(
        "{}{}",
        DEFAULT_USERNAME_PREFIX,
        random::alphanumeric(DEFAULT_USERNAME_SUFFIX_LENGTH)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Member, MemberRole, SessionRepository, Team, TeamRepository, OTP_DEV_CODE,
    };
    use crate::infrastructure::auth::{CredentialConfig, EncryptedCredentialService};
    use crate::infrastructure::identity::InMemoryIdentityStore;
    use crate::infrastructure::otp::OtpMode;
    use crate::infrastructure::session::RotationMode;
    use crate::infrastructure::tasks::BackgroundTasks;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    struct Harness {
        store: InMemoryIdentityStore,
        tasks: BackgroundTasks,
        service: AuthService,
    }

    fn harness_with(rotation: RotationMode, flow_timeout: Duration) -> Harness {
        let store = InMemoryIdentityStore::new();
        let tasks = BackgroundTasks::new();
        let credentials = EncryptedCredentialService::new(CredentialConfig::new(
            SECRET,
            "auth.local",
            chrono::Duration::minutes(5),
        ))
        .unwrap();

        let service = AuthService::new(
            Arc::new(store.clone()),
            OtpService::new(
                Arc::new(store.clone()),
                Arc::new(store.clone()),
                tasks.clone(),
                OtpMode::Development,
            ),
            SessionService::new(Arc::new(store.clone()), tasks.clone(), rotation),
            Arc::new(credentials),
            flow_timeout,
        );

        Harness {
            store,
            tasks,
            service,
        }
    }

    fn harness() -> Harness {
        harness_with(RotationMode::Background, Duration::from_secs(5))
    }

    fn login_request(email: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            avatar: None,
            username: None,
        }
    }

    fn verify_request(code: &str, email: &str) -> VerifyRequest {
        VerifyRequest {
            code: code.to_string(),
            email: email.to_string(),
            ip: Some("10.0.0.1".to_string()),
            user_agent: Some("tests".to_string()),
        }
    }

    fn auth_error(err: DomainError) -> AuthError {
        err.as_auth().cloned().expect("expected an auth error")
    }

    async fn login_and_verify(h: &Harness, email: &str) -> AuthOutcome {
        h.service.login(login_request(email)).await.unwrap();
        let outcome = h
            .service
            .verify(verify_request(OTP_DEV_CODE, email))
            .await
            .unwrap();
        h.tasks.settle().await;
        outcome
    }

    #[tokio::test]
    async fn test_dev_mode_login_and_verify() {
        let h = harness();

        let ack = h.service.login(login_request("a@x.com")).await.unwrap();
        assert_eq!(ack.message, LOGIN_ACK_MESSAGE);

        let outcome = h
            .service
            .verify(verify_request(OTP_DEV_CODE, "a@x.com"))
            .await
            .unwrap();

        assert_eq!(outcome.user.email(), "a@x.com");
        assert!(outcome.user.username().starts_with(DEFAULT_USERNAME_PREFIX));
        assert_eq!(outcome.session.ip(), "10.0.0.1");
        assert_eq!(outcome.session.user_agent(), "tests");

        let claims = h.service.credentials().verify(&outcome.credential).unwrap();
        assert_eq!(claims.sub, outcome.user.id().to_string());
        assert_eq!(claims.email, "a@x.com");
    }

    #[tokio::test]
    async fn test_login_ack_same_for_existing_user() {
        let h = harness();

        let first = h.service.login(login_request("a@x.com")).await.unwrap();
        let second = h.service.login(login_request("a@x.com")).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_login_invalid_email() {
        let h = harness();

        let err = h.service.login(login_request("not-an-email")).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_login_keeps_given_username() {
        let h = harness();
        h.service
            .login(LoginRequest {
                email: "a@x.com".to_string(),
                avatar: Some("https://img/a.png".to_string()),
                username: Some("alice".to_string()),
            })
            .await
            .unwrap();

        let user = h.store.get_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(user.username(), "alice");
        assert_eq!(user.avatar(), Some("https://img/a.png"));
    }

    #[tokio::test]
    async fn test_login_blocked_user() {
        let h = harness();
        h.service.login(login_request("a@x.com")).await.unwrap();

        let mut user = h.store.get_by_email("a@x.com").await.unwrap().unwrap();
        user.block();
        UserRepository::update(&h.store, &user).await.unwrap();

        let err = h.service.login(login_request("a@x.com")).await.unwrap_err();
        assert_eq!(auth_error(err), AuthError::UserBlocked);
    }

    #[tokio::test]
    async fn test_verify_wrong_code() {
        let h = harness();
        h.service.login(login_request("a@x.com")).await.unwrap();

        let err = h
            .service
            .verify(verify_request("0000", "a@x.com"))
            .await
            .unwrap_err();
        assert_eq!(auth_error(err), AuthError::InvalidCodeOrEmail);
    }

    #[tokio::test]
    async fn test_verify_email_mismatch() {
        let h = harness();
        h.service.login(login_request("a@x.com")).await.unwrap();

        let err = h
            .service
            .verify(verify_request(OTP_DEV_CODE, "b@x.com"))
            .await
            .unwrap_err();
        assert_eq!(auth_error(err), AuthError::InvalidUserOrBlocked);
    }

    #[tokio::test]
    async fn test_otp_single_use() {
        let h = harness();
        login_and_verify(&h, "a@x.com").await;

        let err = h
            .service
            .verify(verify_request(OTP_DEV_CODE, "a@x.com"))
            .await
            .unwrap_err();
        assert_eq!(auth_error(err), AuthError::InvalidCodeOrEmail);
        assert_eq!(h.store.otp_count().await, 0);
    }

    #[tokio::test]
    async fn test_credential_carries_team_claims() {
        let h = harness();
        h.service.login(login_request("a@x.com")).await.unwrap();

        let team = TeamRepository::create(&h.store, Team::new("core").unwrap())
            .await
            .unwrap();
        let mut user = h.store.get_by_email("a@x.com").await.unwrap().unwrap();
        user.add_membership(Member::new(team.clone(), MemberRole::Internal));
        UserRepository::update(&h.store, &user).await.unwrap();

        let outcome = h
            .service
            .verify(verify_request(OTP_DEV_CODE, "a@x.com"))
            .await
            .unwrap();
        let claims = h.service.credentials().verify(&outcome.credential).unwrap();
        assert_eq!(claims.role_in(team.id()), Some(MemberRole::Internal));
    }

    #[tokio::test]
    async fn test_refresh_fresh_session_not_rotated() {
        let h = harness();
        let outcome = login_and_verify(&h, "a@x.com").await;

        let refreshed = h.service.refresh(outcome.session.hash()).await.unwrap();
        assert_eq!(refreshed.session.hash(), outcome.session.hash());
        assert_eq!(refreshed.user.id(), outcome.user.id());
        assert!(h.service.credentials().verify(&refreshed.credential).is_ok());
    }

    async fn age_session(h: &Harness, session: &Session, remaining: chrono::Duration) -> Session {
        let aged = session.clone().with_expires_at(Utc::now() + remaining);
        SessionRepository::update(&h.store, &aged).await.unwrap();
        aged
    }

    #[tokio::test]
    async fn test_refresh_rotates_near_expiry() {
        let h = harness();
        let outcome = login_and_verify(&h, "a@x.com").await;
        let aged = age_session(&h, &outcome.session, chrono::Duration::days(1)).await;

        let refreshed = h.service.refresh(aged.hash()).await.unwrap();
        assert_ne!(refreshed.session.hash(), aged.hash());
        h.tasks.settle().await;

        assert!(matches!(
            h.service.refresh(aged.hash()).await,
            Err(DomainError::NotFound { .. })
        ));
        assert!(h.service.refresh(refreshed.session.hash()).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_rotates_inline() {
        let h = harness_with(RotationMode::Inline, Duration::from_secs(5));
        let outcome = login_and_verify(&h, "a@x.com").await;
        let aged = age_session(&h, &outcome.session, chrono::Duration::days(1)).await;

        let refreshed = h.service.refresh(aged.hash()).await.unwrap();

        // No settling needed: the write finished before refresh returned
        assert!(h.store.get_by_hash(refreshed.session.hash()).await.unwrap().is_some());
        assert!(h.store.get_by_hash(aged.hash()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh_expired_session() {
        let h = harness();
        let outcome = login_and_verify(&h, "a@x.com").await;
        let aged = age_session(&h, &outcome.session, -chrono::Duration::seconds(1)).await;

        let err = h.service.refresh(aged.hash()).await.unwrap_err();
        assert_eq!(auth_error(err), AuthError::SessionExpired);
    }

    #[tokio::test]
    async fn test_refresh_expired_session_of_blocked_user() {
        let h = harness();
        let outcome = login_and_verify(&h, "a@x.com").await;
        let aged = age_session(&h, &outcome.session, -chrono::Duration::seconds(1)).await;

        let mut user = outcome.user.clone();
        user.block();
        UserRepository::update(&h.store, &user).await.unwrap();

        let err = h.service.refresh(aged.hash()).await.unwrap_err();
        assert_eq!(auth_error(err), AuthError::SessionExpired);
    }

    #[tokio::test]
    async fn test_refresh_blocked_user() {
        let h = harness();
        let outcome = login_and_verify(&h, "a@x.com").await;

        let mut user = outcome.user.clone();
        user.block();
        UserRepository::update(&h.store, &user).await.unwrap();

        let err = h.service.refresh(outcome.session.hash()).await.unwrap_err();
        assert_eq!(auth_error(err), AuthError::UserBlocked);
    }

    #[tokio::test]
    async fn test_sessions_and_logout() {
        let h = harness();
        let first = login_and_verify(&h, "a@x.com").await;
        let second = login_and_verify(&h, "a@x.com").await;
        let user_id = *first.user.id();

        assert_eq!(h.service.sessions(&user_id).await.unwrap().len(), 2);

        h.service.logout(&user_id, "no-such-hash").await.unwrap();
        assert_eq!(h.service.sessions(&user_id).await.unwrap().len(), 2);

        h.service.logout(&user_id, first.session.hash()).await.unwrap();
        let remaining = h.service.sessions(&user_id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].hash(), second.session.hash());
        assert_eq!(h.store.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_logout_without_sessions() {
        let h = harness();

        let err = h
            .service
            .logout(&UserId::generate(), "anything")
            .await
            .unwrap_err();
        assert_eq!(auth_error(err), AuthError::NoSessionsFound);
    }

    /// Delegates to the store after a fixed delay on every email lookup
    #[derive(Debug)]
    struct SlowUsers {
        inner: InMemoryIdentityStore,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl UserRepository for SlowUsers {
        async fn get(&self, id: &UserId) -> Result<Option<User>, DomainError> {
            UserRepository::get(&self.inner, id).await
        }

        async fn get_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
            tokio::time::sleep(self.delay).await;
            self.inner.get_by_email(email).await
        }

        async fn get_by_valid_otp(
            &self,
            code: &str,
            now: chrono::DateTime<Utc>,
        ) -> Result<Option<User>, DomainError> {
            self.inner.get_by_valid_otp(code, now).await
        }

        async fn create(&self, user: User) -> Result<User, DomainError> {
            UserRepository::create(&self.inner, user).await
        }

        async fn update(&self, user: &User) -> Result<User, DomainError> {
            UserRepository::update(&self.inner, user).await
        }

        async fn add_membership(
            &self,
            user_id: &UserId,
            member: crate::domain::team::Member,
            max: usize,
        ) -> Result<User, DomainError> {
            UserRepository::add_membership(&self.inner, user_id, member, max).await
        }
    }

    #[tokio::test]
    async fn test_flow_timeout() {
        let h = harness();
        let service = AuthService::new(
            Arc::new(SlowUsers {
                inner: h.store.clone(),
                delay: Duration::from_millis(200),
            }),
            OtpService::new(
                Arc::new(h.store.clone()),
                Arc::new(h.store.clone()),
                h.tasks.clone(),
                OtpMode::Development,
            ),
            SessionService::new(
                Arc::new(h.store.clone()),
                h.tasks.clone(),
                RotationMode::Background,
            ),
            h.service.credentials().clone(),
            Duration::from_millis(20),
        );

        let err = service.login(login_request("a@x.com")).await.unwrap_err();
        assert!(matches!(err, DomainError::Timeout { .. }));
        assert!(h.store.get_by_email("a@x.com").await.unwrap().is_none());
    }
}
