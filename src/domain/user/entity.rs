//! User entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{validate_email, validate_username, UserValidationError};
use crate::domain::credential::TeamClaim;
use crate::domain::id::{TeamId, UserId};
use crate::domain::team::{Member, MemberRole, Team};

/// User entity for passwordless authentication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    email: String,
    username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar: Option<String>,
    blocked: bool,
    /// Memberships in join order
    teams: Vec<Member>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new, unblocked user without memberships
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        avatar: Option<String>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: UserId::generate(),
            email: email.into(),
            username: username.into(),
            avatar,
            blocked: false,
            teams: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a user from stored fields
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: UserId,
        email: String,
        username: String,
        avatar: Option<String>,
        blocked: bool,
        teams: Vec<Member>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            email,
            username,
            avatar,
            blocked,
            teams,
            created_at,
            updated_at,
        }
    }

    /// Check the email and username format rules
    pub fn validate(&self) -> Result<(), UserValidationError> {
        validate_username(&self.username)?;
        validate_email(&self.email)?;
        Ok(())
    }

    // Getters

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn avatar(&self) -> Option<&str> {
        self.avatar.as_deref()
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    pub fn teams(&self) -> &[Member] {
        &self.teams
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // Membership queries

    pub fn has_team(&self, team_id: &TeamId) -> bool {
        self.teams.iter().any(|m| m.team_id() == team_id)
    }

    pub fn is_owner_of(&self, team_id: &TeamId) -> bool {
        self.role_in(team_id).is_some_and(|role| role.is_owner())
    }

    pub fn role_in(&self, team_id: &TeamId) -> Option<MemberRole> {
        self.teams
            .iter()
            .find(|m| m.team_id() == team_id)
            .map(Member::role)
    }

    /// Every membership reduced to the `{team, role}` pair carried by credentials
    pub fn team_claims(&self) -> Vec<TeamClaim> {
        self.teams
            .iter()
            .map(|m| TeamClaim::new(*m.team_id(), m.role()))
            .collect()
    }

    // Mutators

    pub fn set_username(&mut self, username: impl Into<String>) {
        self.username = username.into();
        self.touch();
    }

    pub fn set_avatar(&mut self, avatar: Option<String>) {
        self.avatar = avatar;
        self.touch();
    }

    pub fn block(&mut self) {
        self.blocked = true;
        self.touch();
    }

    pub fn unblock(&mut self) {
        self.blocked = false;
        self.touch();
    }

    pub fn add_membership(&mut self, member: Member) {
        self.teams.push(member);
        self.touch();
    }

    /// Refresh the embedded copy of a renamed team
    pub fn sync_team(&mut self, team: &Team) {
        for member in &mut self.teams {
            member.sync_team(team);
        }
    }

    /// Drop the membership of a deleted team
    pub fn remove_team(&mut self, team_id: &TeamId) -> bool {
        let before = self.teams.len();
        self.teams.retain(|m| m.team_id() != team_id);
        before != self.teams.len()
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
