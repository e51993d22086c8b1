//! In-memory identity store
//!
//! One shared state backs every repository trait so the OTP→User join and the
//! team→member propagation see a consistent view. Uniqueness rules mirror the
//! PostgreSQL unique indexes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::team::team_limit_error;
use crate::domain::{
    DomainError, Member, Otp, OtpId, OtpRepository, Session, SessionId, SessionRepository, Team,
    TeamId, TeamRepository, User, UserId, UserRepository,
};

#[derive(Debug, Default)]
struct IdentityState {
    users: HashMap<UserId, User>,
    teams: HashMap<TeamId, Team>,
    sessions: HashMap<SessionId, Session>,
    otps: HashMap<OtpId, Otp>,
}

impl IdentityState {
    fn user_conflict(&self, user: &User) -> Option<DomainError> {
        for other in self.users.values().filter(|u| u.id() != user.id()) {
            if other.email() == user.email() {
                return Some(DomainError::conflict(format!(
                    "Email '{}' already exists",
                    user.email()
                )));
            }
            if other.username() == user.username() {
                return Some(DomainError::conflict(format!(
                    "Username '{}' already exists",
                    user.username()
                )));
            }
        }
        None
    }

    fn team_name_taken(&self, name: &str, except: Option<&TeamId>) -> bool {
        self.teams
            .values()
            .any(|t| t.name() == name && Some(t.id()) != except)
    }
}

/// Shared in-memory implementation of every identity repository
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityStore {
    state: Arc<RwLock<IdentityState>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored one-time codes, expired ones included
    pub async fn otp_count(&self) -> usize {
        self.state.read().await.otps.len()
    }

    /// Number of stored sessions
    pub async fn session_count(&self) -> usize {
        self.state.read().await.sessions.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryIdentityStore {
    async fn get(&self, id: &UserId) -> Result<Option<User>, DomainError> {
        let state = self.state.read().await;
        Ok(state.users.get(id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email() == email).cloned())
    }

    async fn get_by_valid_otp(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, DomainError> {
        let state = self.state.read().await;

        let user = state
            .otps
            .values()
            .find(|otp| otp.code() == code && otp.is_redeemable_at(now))
            .and_then(|otp| state.users.get(otp.user_id()))
            .cloned();

        Ok(user)
    }

    async fn create(&self, user: User) -> Result<User, DomainError> {
        let mut state = self.state.write().await;

        if state.users.contains_key(user.id()) {
            return Err(DomainError::conflict(format!(
                "User with ID '{}' already exists",
                user.id()
            )));
        }
        if let Some(err) = state.user_conflict(&user) {
            return Err(err);
        }

        state.users.insert(*user.id(), user.clone());
        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<User, DomainError> {
        let mut state = self.state.write().await;

        if !state.users.contains_key(user.id()) {
            return Err(DomainError::not_found(format!("User '{}' not found", user.id())));
        }
        if let Some(err) = state.user_conflict(user) {
            return Err(err);
        }

        state.users.insert(*user.id(), user.clone());
        Ok(user.clone())
    }

    async fn add_membership(
        &self,
        user_id: &UserId,
        member: Member,
        max: usize,
    ) -> Result<User, DomainError> {
        let mut state = self.state.write().await;

        let user = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| DomainError::not_found(format!("User '{}' not found", user_id)))?;

        if user.has_team(member.team_id()) {
            return Err(DomainError::conflict(format!(
                "User '{}' is already a member of team '{}'",
                user_id,
                member.team_id()
            )));
        }
        if user.teams().len() >= max {
            return Err(team_limit_error(max));
        }

        user.add_membership(member);
        Ok(user.clone())
    }
}

#[async_trait]
impl TeamRepository for InMemoryIdentityStore {
    async fn get(&self, id: &TeamId) -> Result<Option<Team>, DomainError> {
        let state = self.state.read().await;
        Ok(state.teams.get(id).cloned())
    }

    async fn create(&self, team: Team) -> Result<Team, DomainError> {
        let mut state = self.state.write().await;

        if state.team_name_taken(team.name(), None) {
            return Err(DomainError::conflict(format!(
                "Team '{}' already exists",
                team.name()
            )));
        }

        state.teams.insert(*team.id(), team.clone());
        Ok(team)
    }

    async fn rename(&self, id: &TeamId, name: &str) -> Result<Team, DomainError> {
        let mut state = self.state.write().await;

        if state.team_name_taken(name, Some(id)) {
            return Err(DomainError::conflict(format!("Team '{}' already exists", name)));
        }

        let team = state
            .teams
            .get_mut(id)
            .ok_or_else(|| DomainError::not_found(format!("Team '{}' not found", id)))?;
        team.set_name(name)
            .map_err(|e| DomainError::validation(e.to_string()))?;
        let team = team.clone();

        for user in state.users.values_mut().filter(|u| u.has_team(id)) {
            user.sync_team(&team);
        }

        Ok(team)
    }

    async fn delete(&self, id: &TeamId) -> Result<bool, DomainError> {
        let mut state = self.state.write().await;

        if state.teams.remove(id).is_none() {
            return Ok(false);
        }

        for user in state.users.values_mut() {
            user.remove_team(id);
        }

        Ok(true)
    }
}

#[async_trait]
impl SessionRepository for InMemoryIdentityStore {
    async fn create(&self, session: Session) -> Result<Session, DomainError> {
        let mut state = self.state.write().await;

        if state.sessions.values().any(|s| s.hash() == session.hash()) {
            return Err(DomainError::conflict("Session hash already exists"));
        }

        state.sessions.insert(*session.id(), session.clone());
        Ok(session)
    }

    async fn get_by_hash(&self, hash: &str) -> Result<Option<Session>, DomainError> {
        let state = self.state.read().await;
        Ok(state.sessions.values().find(|s| s.hash() == hash).cloned())
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Session>, DomainError> {
        let state = self.state.read().await;

        let mut sessions: Vec<Session> = state
            .sessions
            .values()
            .filter(|s| s.user_id() == user_id)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.created_at());

        Ok(sessions)
    }

    async fn update(&self, session: &Session) -> Result<(), DomainError> {
        let mut state = self.state.write().await;

        if state
            .sessions
            .values()
            .any(|s| s.hash() == session.hash() && s.id() != session.id())
        {
            return Err(DomainError::conflict("Session hash already exists"));
        }

        match state.sessions.get_mut(session.id()) {
            Some(stored) => {
                *stored = session.clone();
                Ok(())
            }
            None => Err(DomainError::not_found(format!(
                "Session '{}' not found",
                session.id()
            ))),
        }
    }

    async fn delete(&self, id: &SessionId) -> Result<bool, DomainError> {
        let mut state = self.state.write().await;
        Ok(state.sessions.remove(id).is_some())
    }
}

#[async_trait]
impl OtpRepository for InMemoryIdentityStore {
    async fn create(&self, otp: Otp) -> Result<(), DomainError> {
        let mut state = self.state.write().await;

        if state.otps.values().any(|o| o.code() == otp.code()) {
            return Err(DomainError::conflict("One-time code already in use"));
        }

        state.otps.insert(*otp.id(), otp);
        Ok(())
    }

    async fn delete_by_code(&self, code: &str) -> Result<u64, DomainError> {
        let mut state = self.state.write().await;

        let before = state.otps.len();
        state.otps.retain(|_, otp| otp.code() != code);

        Ok((before - state.otps.len()) as u64)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, DomainError> {
        let mut state = self.state.write().await;

        let before = state.otps.len();
        state.otps.retain(|_, otp| otp.is_redeemable_at(now));

        Ok((before - state.otps.len()) as u64)
    }

    async fn delete_by_user(&self, user_id: &UserId) -> Result<u64, DomainError> {
        let mut state = self.state.write().await;

        let before = state.otps.len();
        state.otps.retain(|_, otp| otp.user_id() != user_id);

        Ok((before - state.otps.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MemberRole;
    use chrono::Duration;

    async fn seed_user(store: &InMemoryIdentityStore, email: &str, username: &str) -> User {
        UserRepository::create(store, User::new(email, username, None))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_user_uniqueness() {
        let store = InMemoryIdentityStore::new();
        seed_user(&store, "a@x.com", "alice").await;

        let dup_email = UserRepository::create(&store, User::new("a@x.com", "other", None)).await;
        assert!(matches!(dup_email, Err(DomainError::Conflict { .. })));

        let dup_name = UserRepository::create(&store, User::new("b@x.com", "alice", None)).await;
        assert!(matches!(dup_name, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let store = InMemoryIdentityStore::new();
        let user = User::new("a@x.com", "alice", None);

        let result = UserRepository::update(&store, &user).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_add_membership_limit_and_duplicate() {
        let store = InMemoryIdentityStore::new();
        let user = seed_user(&store, "a@x.com", "alice").await;

        let core = TeamRepository::create(&store, Team::new("core").unwrap())
            .await
            .unwrap();
        let ops = TeamRepository::create(&store, Team::new("ops").unwrap())
            .await
            .unwrap();

        let stored = store
            .add_membership(user.id(), Member::new(core.clone(), MemberRole::Owner), 1)
            .await
            .unwrap();
        assert!(stored.is_owner_of(core.id()));

        let dup = store
            .add_membership(user.id(), Member::new(core, MemberRole::Owner), 5)
            .await;
        assert!(matches!(dup, Err(DomainError::Conflict { .. })));

        let over = store
            .add_membership(user.id(), Member::new(ops.clone(), MemberRole::Owner), 1)
            .await;
        assert!(matches!(over, Err(DomainError::Validation { .. })));

        let missing = store
            .add_membership(&UserId::generate(), Member::new(ops, MemberRole::Owner), 5)
            .await;
        assert!(matches!(missing, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_get_by_valid_otp_join() {
        let store = InMemoryIdentityStore::new();
        let user = seed_user(&store, "a@x.com", "alice").await;
        let now = Utc::now();

        OtpRepository::create(&store, Otp::new(*user.id(), "4821")).await.unwrap();

        let found = store.get_by_valid_otp("4821", now).await.unwrap();
        assert_eq!(found.map(|u| *u.id()), Some(*user.id()));

        assert!(store.get_by_valid_otp("0000", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_otp_never_matches() {
        let store = InMemoryIdentityStore::new();
        let user = seed_user(&store, "a@x.com", "alice").await;
        let now = Utc::now();

        let otp = Otp::new(*user.id(), "4821").with_expires_at(now - Duration::seconds(1));
        OtpRepository::create(&store, otp).await.unwrap();

        assert!(store.get_by_valid_otp("4821", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_otp_at_expiry_instant_never_matches() {
        let store = InMemoryIdentityStore::new();
        let user = seed_user(&store, "a@x.com", "alice").await;
        let now = Utc::now();

        OtpRepository::create(&store, Otp::new(*user.id(), "4821").with_expires_at(now))
            .await
            .unwrap();

        assert!(store.get_by_valid_otp("4821", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_expired_and_by_user() {
        let store = InMemoryIdentityStore::new();
        let alice = seed_user(&store, "a@x.com", "alice").await;
        let bob = seed_user(&store, "b@x.com", "bob").await;
        let now = Utc::now();

        let stale = Otp::new(*bob.id(), "0001").with_expires_at(now);
        OtpRepository::create(&store, stale).await.unwrap();
        OtpRepository::create(&store, Otp::new(*bob.id(), "0002")).await.unwrap();
        OtpRepository::create(&store, Otp::new(*alice.id(), "0003")).await.unwrap();

        assert_eq!(store.delete_expired(now).await.unwrap(), 1);
        assert_eq!(store.delete_by_user(bob.id()).await.unwrap(), 1);
        assert_eq!(store.otp_count().await, 1);

        // The freed code can be issued again
        OtpRepository::create(&store, Otp::new(*alice.id(), "0001")).await.unwrap();
        assert!(store.get_by_valid_otp("0003", now).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_otp_code_unique_and_delete() {
        let store = InMemoryIdentityStore::new();
        let user = seed_user(&store, "a@x.com", "alice").await;

        OtpRepository::create(&store, Otp::new(*user.id(), "1111")).await.unwrap();
        let dup = OtpRepository::create(&store, Otp::new(*user.id(), "1111")).await;
        assert!(matches!(dup, Err(DomainError::Conflict { .. })));

        assert_eq!(store.delete_by_code("1111").await.unwrap(), 1);
        assert_eq!(store.delete_by_code("1111").await.unwrap(), 0);
        assert_eq!(store.otp_count().await, 0);
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let store = InMemoryIdentityStore::new();
        let user_id = UserId::generate();
        let session = Session::new(user_id, "a".repeat(64), "1.2.3.4", "ua");

        SessionRepository::create(&store, session.clone()).await.unwrap();
        let dup = SessionRepository::create(
            &store,
            Session::new(user_id, "a".repeat(64), "1.2.3.4", "ua"),
        )
        .await;
        assert!(matches!(dup, Err(DomainError::Conflict { .. })));

        let mut rotated = session.clone();
        rotated.rotate("b".repeat(64), Utc::now());
        SessionRepository::update(&store, &rotated).await.unwrap();

        assert!(store.get_by_hash(&"a".repeat(64)).await.unwrap().is_none());
        assert!(store.get_by_hash(&"b".repeat(64)).await.unwrap().is_some());

        assert_eq!(store.list_by_user(&user_id).await.unwrap().len(), 1);
        assert!(SessionRepository::delete(&store, session.id()).await.unwrap());
        assert!(store.list_by_user(&user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_team_rename_propagates_to_members() {
        let store = InMemoryIdentityStore::new();
        let mut user = seed_user(&store, "a@x.com", "alice").await;

        let team = TeamRepository::create(&store, Team::new("core").unwrap())
            .await
            .unwrap();
        user.add_membership(Member::new(team.clone(), MemberRole::Owner));
        UserRepository::update(&store, &user).await.unwrap();

        store.rename(team.id(), "platform").await.unwrap();

        let stored = UserRepository::get(&store, user.id()).await.unwrap().unwrap();
        assert_eq!(stored.teams()[0].team().name(), "platform");
        assert_eq!(stored.teams()[0].role(), MemberRole::Owner);
    }

    #[tokio::test]
    async fn test_team_name_unique() {
        let store = InMemoryIdentityStore::new();
        TeamRepository::create(&store, Team::new("core").unwrap()).await.unwrap();
        let other = TeamRepository::create(&store, Team::new("ops").unwrap()).await.unwrap();

        let dup = TeamRepository::create(&store, Team::new("core").unwrap()).await;
        assert!(matches!(dup, Err(DomainError::Conflict { .. })));

        let rename = store.rename(other.id(), "core").await;
        assert!(matches!(rename, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_team_delete_pulls_memberships() {
        let store = InMemoryIdentityStore::new();
        let mut user = seed_user(&store, "a@x.com", "alice").await;

        let team = TeamRepository::create(&store, Team::new("core").unwrap())
            .await
            .unwrap();
        user.add_membership(Member::new(team.clone(), MemberRole::Owner));
        UserRepository::update(&store, &user).await.unwrap();

        assert!(TeamRepository::delete(&store, team.id()).await.unwrap());
        assert!(!TeamRepository::delete(&store, team.id()).await.unwrap());

        let stored = UserRepository::get(&store, user.id()).await.unwrap().unwrap();
        assert!(stored.teams().is_empty());
    }
}
