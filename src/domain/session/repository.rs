//! Session repository trait

use async_trait::async_trait;

use super::entity::Session;
use crate::domain::id::{SessionId, UserId};
use crate::domain::DomainError;

/// Repository for refresh sessions
#[async_trait]
pub trait SessionRepository: Send + Sync + std::fmt::Debug {
    /// Persist a new session, failing with `Conflict` if the hash is taken
    async fn create(&self, session: Session) -> Result<Session, DomainError>;

    /// Look a session up by its opaque hash
    async fn get_by_hash(&self, hash: &str) -> Result<Option<Session>, DomainError>;

    /// All sessions owned by a user, in store-defined order
    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Session>, DomainError>;

    /// Replace the stored hash and expiry of an existing session
    async fn update(&self, session: &Session) -> Result<(), DomainError>;

    /// Delete a session by ID
    async fn delete(&self, id: &SessionId) -> Result<bool, DomainError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Session repository whose writes can be made to fail
    ///
    /// Reads always succeed so a flow can get far enough to schedule the
    /// failing write.
    #[derive(Debug, Default)]
    pub struct MockSessionRepository {
        sessions: Mutex<HashMap<SessionId, Session>>,
        update_error: Mutex<Option<String>>,
    }

    impl MockSessionRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_session(self, session: Session) -> Self {
            self.sessions
                .lock()
                .unwrap()
                .insert(*session.id(), session);
            self
        }

        pub fn with_update_error(self, error: impl Into<String>) -> Self {
            *self.update_error.lock().unwrap() = Some(error.into());
            self
        }
    }

    #[async_trait]
    impl SessionRepository for MockSessionRepository {
        async fn create(&self, session: Session) -> Result<Session, DomainError> {
            self.sessions
                .lock()
                .unwrap()
                .insert(*session.id(), session.clone());
            Ok(session)
        }

        async fn get_by_hash(&self, hash: &str) -> Result<Option<Session>, DomainError> {
            Ok(self
                .sessions
                .lock()
                .unwrap()
                .values()
                .find(|s| s.hash() == hash)
                .cloned())
        }

        async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Session>, DomainError> {
            Ok(self
                .sessions
                .lock()
                .unwrap()
                .values()
                .filter(|s| s.user_id() == user_id)
                .cloned()
                .collect())
        }

        async fn update(&self, session: &Session) -> Result<(), DomainError> {
            if let Some(err) = self.update_error.lock().unwrap().as_ref() {
                return Err(DomainError::storage(err.clone()));
            }
            self.sessions
                .lock()
                .unwrap()
                .insert(*session.id(), session.clone());
            Ok(())
        }

        async fn delete(&self, id: &SessionId) -> Result<bool, DomainError> {
            Ok(self.sessions.lock().unwrap().remove(id).is_some())
        }
    }
}
