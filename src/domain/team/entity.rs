//! Team and membership entities

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{validate_team_name, TeamValidationError};
use crate::domain::id::TeamId;

/// Role of a user within a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    /// Creator of the team
    Owner,
    /// Member from inside the organization
    Internal,
    /// Guest collaborator
    External,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Internal => "internal",
            Self::External => "external",
        }
    }

    pub fn is_owner(&self) -> bool {
        matches!(self, Self::Owner)
    }
}

impl std::fmt::Display for MemberRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberRole {
    type Err = TeamValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Self::Owner),
            "internal" => Ok(Self::Internal),
            "external" => Ok(Self::External),
            other => Err(TeamValidationError::UnknownRole(other.to_string())),
        }
    }
}

/// Team entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    id: TeamId,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Team {
    /// Create a new team with a fresh identifier
    pub fn new(name: impl Into<String>) -> Result<Self, TeamValidationError> {
        let name = name.into();
        validate_team_name(&name)?;
        let now = Utc::now();

        Ok(Self {
            id: TeamId::generate(),
            name,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuild a team from stored fields
    pub fn restore(
        id: TeamId,
        name: impl Into<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &TeamId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Rename the team
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), TeamValidationError> {
        let name = name.into();
        validate_team_name(&name)?;
        self.name = name;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// A user's membership in a team.
///
/// Carries a denormalized copy of the team so that a user record alone is
/// enough to mint role claims. Stores must rewrite these copies whenever the
/// team is renamed or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    team: Team,
    role: MemberRole,
    joined_at: DateTime<Utc>,
}

impl Member {
    pub fn new(team: Team, role: MemberRole) -> Self {
        Self {
            team,
            role,
            joined_at: Utc::now(),
        }
    }

    pub fn restore(team: Team, role: MemberRole, joined_at: DateTime<Utc>) -> Self {
        Self {
            team,
            role,
            joined_at,
        }
    }

    pub fn team(&self) -> &Team {
        &self.team
    }

    pub fn team_id(&self) -> &TeamId {
        self.team.id()
    }

    pub fn role(&self) -> MemberRole {
        self.role
    }

    pub fn joined_at(&self) -> DateTime<Utc> {
        self.joined_at
    }

    /// Replace the embedded team copy after the source record changed
    pub fn sync_team(&mut self, team: &Team) {
        if self.team.id() == team.id() {
            self.team = team.clone();
        }
    }
}
