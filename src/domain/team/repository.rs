//! Team repository trait

use async_trait::async_trait;

use super::entity::Team;
use crate::domain::id::TeamId;
use crate::domain::DomainError;

/// Repository for managing teams
///
/// Implementations own the extended-reference synchronization: renaming or
/// deleting a team also rewrites every membership that embeds it.
#[async_trait]
pub trait TeamRepository: Send + Sync + std::fmt::Debug {
    /// Get a team by ID
    async fn get(&self, id: &TeamId) -> Result<Option<Team>, DomainError>;

    /// Create a new team, failing with `Conflict` on a duplicate name
    async fn create(&self, team: Team) -> Result<Team, DomainError>;

    /// Rename a team and propagate the new name into every membership
    async fn rename(&self, id: &TeamId, name: &str) -> Result<Team, DomainError>;

    /// Delete a team and remove every membership pointing at it
    async fn delete(&self, id: &TeamId) -> Result<bool, DomainError>;
}
