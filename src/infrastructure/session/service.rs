//! Refresh session management

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::{DomainError, Session, SessionId, SessionRepository, UserId, SESSION_HASH_LENGTH};
use crate::infrastructure::random;
use crate::infrastructure::tasks::BackgroundTasks;

/// Client IP recorded when the caller supplies none
pub const DEFAULT_SESSION_IP: &str = "127.0.0.1";

/// User agent recorded when the caller supplies none
pub const DEFAULT_USER_AGENT: &str = "unknown";

/// When the durable write of a rotated session happens
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationMode {
    /// The new hash is returned at once; the store write runs as a tracked task
    #[default]
    Background,
    /// The store write completes before the new hash is returned
    Inline,
}

/// Creates, rotates, lists and revokes refresh sessions
#[derive(Debug)]
pub struct SessionService {
    sessions: Arc<dyn SessionRepository>,
    tasks: BackgroundTasks,
    rotation: RotationMode,
}

impl SessionService {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        tasks: BackgroundTasks,
        rotation: RotationMode,
    ) -> Self {
        Self {
            sessions,
            tasks,
            rotation,
        }
    }

    /// Open a new session for the user
    pub async fn create(
        &self,
        user_id: &UserId,
        ip: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<Session, DomainError> {
        let ip = ip.filter(|v| !v.is_empty()).unwrap_or(DEFAULT_SESSION_IP);
        let user_agent = user_agent
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_USER_AGENT);

        let session = Session::new(
            *user_id,
            random::alphanumeric(SESSION_HASH_LENGTH),
            ip,
            user_agent,
        );
        let session = self.sessions.create(session).await?;

        info!(user_id = %user_id, session_id = %session.id(), "Session created");
        Ok(session)
    }

    pub async fn get_by_hash(&self, hash: &str) -> Result<Session, DomainError> {
        self.sessions
            .get_by_hash(hash)
            .await?
            .ok_or_else(|| DomainError::not_found("Session not found"))
    }

    pub async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Session>, DomainError> {
        self.sessions.list_by_user(user_id).await
    }

    /// Delete a session; returns false if it was already gone
    pub async fn revoke(&self, id: &SessionId) -> Result<bool, DomainError> {
        let removed = self.sessions.delete(id).await?;
        info!(session_id = %id, removed, "Session revoked");
        Ok(removed)
    }

    /// Rotate the session if its remaining lifetime is under the threshold
    ///
    /// The returned session always carries the hash the client must use from
    /// now on. In background mode the store may briefly still hold the old one,
    /// and a failed write leaves the new hash unusable until the old record
    /// expires.
    pub async fn rotate_if_needed(
        &self,
        mut session: Session,
        now: DateTime<Utc>,
    ) -> Result<Session, DomainError> {
        if !session.needs_rotation_at(now) {
            debug!(session_id = %session.id(), "Session rotation not needed");
            return Ok(session);
        }

        session.rotate(random::alphanumeric(SESSION_HASH_LENGTH), now);

        match self.rotation {
            RotationMode::Inline => {
                self.sessions.update(&session).await?;
            }
            RotationMode::Background => {
                let sessions = self.sessions.clone();
                let rotated = session.clone();
                self.tasks.spawn("session.rotate", async move {
                    sessions.update(&rotated).await
                });
            }
        }

        info!(session_id = %session.id(), mode = ?self.rotation, "Session rotated");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::mock::MockSessionRepository;
    use crate::infrastructure::identity::InMemoryIdentityStore;
    use chrono::Duration;

    fn create_service(
        store: &InMemoryIdentityStore,
        tasks: &BackgroundTasks,
        rotation: RotationMode,
    ) -> SessionService {
        SessionService::new(Arc::new(store.clone()), tasks.clone(), rotation)
    }

    #[tokio::test]
    async fn test_create_defaults() {
        let store = InMemoryIdentityStore::new();
        let service = create_service(&store, &BackgroundTasks::new(), RotationMode::Background);
        let user_id = UserId::generate();

        let session = service.create(&user_id, None, Some("")).await.unwrap();
        assert_eq!(session.hash().len(), SESSION_HASH_LENGTH);
        assert_eq!(session.ip(), DEFAULT_SESSION_IP);
        assert_eq!(session.user_agent(), DEFAULT_USER_AGENT);
        assert!(session.is_valid_at(Utc::now()));

        let found = service.get_by_hash(session.hash()).await.unwrap();
        assert_eq!(found.id(), session.id());
    }

    #[tokio::test]
    async fn test_get_by_hash_missing() {
        let store = InMemoryIdentityStore::new();
        let service = create_service(&store, &BackgroundTasks::new(), RotationMode::Background);

        let err = service.get_by_hash("nope").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_rotation_boundary() {
        let store = InMemoryIdentityStore::new();
        let service = create_service(&store, &BackgroundTasks::new(), RotationMode::Inline);
        let now = Utc::now();

        let inside = Session::new(UserId::generate(), "a".repeat(64), "ip", "ua")
            .with_expires_at(now + Duration::days(3) - Duration::seconds(1));
        let outside = Session::new(UserId::generate(), "b".repeat(64), "ip", "ua")
            .with_expires_at(now + Duration::days(3) + Duration::seconds(1));
        SessionRepository::create(&store, inside.clone()).await.unwrap();
        SessionRepository::create(&store, outside.clone()).await.unwrap();

        let rotated = service.rotate_if_needed(inside.clone(), now).await.unwrap();
        assert_ne!(rotated.hash(), inside.hash());
        assert_eq!(rotated.expires_at(), now + Duration::days(7));

        let kept = service.rotate_if_needed(outside.clone(), now).await.unwrap();
        assert_eq!(kept.hash(), outside.hash());
        assert_eq!(kept.expires_at(), outside.expires_at());
    }

    #[tokio::test]
    async fn test_background_rotation_settles() {
        let store = InMemoryIdentityStore::new();
        let tasks = BackgroundTasks::new();
        let service = create_service(&store, &tasks, RotationMode::Background);
        let now = Utc::now();

        let session = Session::new(UserId::generate(), "a".repeat(64), "ip", "ua")
            .with_expires_at(now + Duration::days(1));
        SessionRepository::create(&store, session.clone()).await.unwrap();

        let rotated = service.rotate_if_needed(session.clone(), now).await.unwrap();
        tasks.settle().await;

        assert!(store.get_by_hash(session.hash()).await.unwrap().is_none());
        assert!(store.get_by_hash(rotated.hash()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_background_write_failure_is_swallowed() {
        let now = Utc::now();
        let session = Session::new(UserId::generate(), "a".repeat(64), "ip", "ua")
            .with_expires_at(now + Duration::days(1));
        let repo = MockSessionRepository::new()
            .with_session(session.clone())
            .with_update_error("write failed");

        let tasks = BackgroundTasks::new();
        let service = SessionService::new(Arc::new(repo), tasks.clone(), RotationMode::Background);

        let rotated = service.rotate_if_needed(session.clone(), now).await.unwrap();
        assert_ne!(rotated.hash(), session.hash());
        tasks.settle().await;

        // The old record is still the one stored
        assert!(service.get_by_hash(session.hash()).await.is_ok());
        assert!(service.get_by_hash(rotated.hash()).await.is_err());
    }

    #[tokio::test]
    async fn test_inline_write_failure_propagates() {
        let now = Utc::now();
        let session = Session::new(UserId::generate(), "a".repeat(64), "ip", "ua")
            .with_expires_at(now + Duration::days(1));
        let repo = MockSessionRepository::new()
            .with_session(session.clone())
            .with_update_error("write failed");

        let service =
            SessionService::new(Arc::new(repo), BackgroundTasks::new(), RotationMode::Inline);

        let err = service.rotate_if_needed(session, now).await.unwrap_err();
        assert!(matches!(err, DomainError::Storage { .. }));
    }

    #[tokio::test]
    async fn test_list_and_revoke() {
        let store = InMemoryIdentityStore::new();
        let service = create_service(&store, &BackgroundTasks::new(), RotationMode::Background);
        let user_id = UserId::generate();

        let first = service.create(&user_id, Some("1.1.1.1"), Some("a")).await.unwrap();
        service.create(&user_id, Some("2.2.2.2"), Some("b")).await.unwrap();
        service.create(&UserId::generate(), None, None).await.unwrap();

        assert_eq!(service.list_by_user(&user_id).await.unwrap().len(), 2);
        assert!(service.revoke(first.id()).await.unwrap());
        assert!(!service.revoke(first.id()).await.unwrap());
        assert_eq!(service.list_by_user(&user_id).await.unwrap().len(), 1);
        assert_eq!(store.session_count().await, 2);
    }
}
