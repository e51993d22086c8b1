//! Team service for team management

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::domain::team::{team_limit_error, validate_team_name};
use crate::domain::{
    AuthError, DomainError, Member, MemberRole, Team, TeamId, TeamRepository, User, UserId,
    UserRepository, MAX_TEAMS_PER_USER,
};
use crate::infrastructure::tasks::with_deadline;

/// Request for creating a new team
#[derive(Debug, Clone)]
pub struct CreateTeamRequest {
    pub user_id: UserId,
    pub name: String,
}

/// Request for renaming a team
#[derive(Debug, Clone)]
pub struct RenameTeamRequest {
    pub user_id: UserId,
    pub team_id: TeamId,
    pub name: String,
}

/// Team service for managing teams and the creator's ownership
#[derive(Debug)]
pub struct TeamService {
    users: Arc<dyn UserRepository>,
    teams: Arc<dyn TeamRepository>,
    flow_timeout: Duration,
}

impl TeamService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        teams: Arc<dyn TeamRepository>,
        flow_timeout: Duration,
    ) -> Self {
        Self {
            users,
            teams,
            flow_timeout,
        }
    }

    /// Create a team owned by the requesting user
    pub async fn create(&self, request: CreateTeamRequest) -> Result<Team, DomainError> {
        with_deadline("team.create", self.flow_timeout, self.create_inner(request)).await
    }

    async fn create_inner(&self, request: CreateTeamRequest) -> Result<Team, DomainError> {
        info!(user_id = %request.user_id, name = %request.name, "Creating team");

        let user = self.active_user(&request.user_id).await?;

        if user.teams().len() >= MAX_TEAMS_PER_USER {
            return Err(team_limit_error(MAX_TEAMS_PER_USER));
        }

        let team = Team::new(request.name).map_err(|e| DomainError::validation(e.to_string()))?;
        let team = self.teams.create(team).await?;

        // The limit is enforced again atomically; the read above may be stale
        let owner = Member::new(team.clone(), MemberRole::Owner);
        if let Err(e) = self
            .users
            .add_membership(user.id(), owner, MAX_TEAMS_PER_USER)
            .await
        {
            warn!(team_id = %team.id(), error = %e, "Owner membership not saved, removing team");
            self.teams.delete(team.id()).await?;
            return Err(e);
        }

        info!(team_id = %team.id(), user_id = %user.id(), "Team created");
        Ok(team)
    }

    pub async fn get(&self, team_id: &TeamId) -> Result<Team, DomainError> {
        with_deadline("team.get", self.flow_timeout, async {
            self.teams
                .get(team_id)
                .await?
                .ok_or_else(|| DomainError::not_found(format!("Team '{}' not found", team_id)))
        })
        .await
    }

    /// Memberships of the user, each carrying its team copy and role
    pub async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Member>, DomainError> {
        with_deadline("team.list", self.flow_timeout, async {
            let user = self
                .users
                .get(user_id)
                .await?
                .ok_or_else(|| DomainError::not_found(format!("User '{}' not found", user_id)))?;
            Ok(user.teams().to_vec())
        })
        .await
    }

    /// Rename a team the user owns; every embedded copy follows
    pub async fn rename(&self, request: RenameTeamRequest) -> Result<Team, DomainError> {
        with_deadline("team.rename", self.flow_timeout, async {
            info!(user_id = %request.user_id, team_id = %request.team_id, "Renaming team");

            self.owner_policy(&request.user_id, &request.team_id).await?;
            validate_team_name(&request.name)
                .map_err(|e| DomainError::validation(e.to_string()))?;

            self.teams.rename(&request.team_id, &request.name).await
        })
        .await
    }

    /// Delete a team the user owns and pull it from every member
    pub async fn delete(&self, user_id: &UserId, team_id: &TeamId) -> Result<(), DomainError> {
        with_deadline("team.delete", self.flow_timeout, async {
            info!(user_id = %user_id, team_id = %team_id, "Deleting team");

            self.owner_policy(user_id, team_id).await?;

            if !self.teams.delete(team_id).await? {
                return Err(DomainError::not_found(format!("Team '{}' not found", team_id)));
            }
            Ok(())
        })
        .await
    }

    async fn active_user(&self, user_id: &UserId) -> Result<User, DomainError> {
        match self.users.get(user_id).await? {
            Some(user) if !user.is_blocked() => Ok(user),
            _ => Err(AuthError::UserBlocked.into()),
        }
    }

    async fn owner_policy(&self, user_id: &UserId, team_id: &TeamId) -> Result<User, DomainError> {
        let user = self.active_user(user_id).await?;

        if !user.is_owner_of(team_id) {
            return Err(DomainError::forbidden(
                "user does not have this team or not an owner",
            ));
        }

        Ok(user)
    }
}
