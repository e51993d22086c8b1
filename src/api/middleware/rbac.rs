//! Team-scoped permission gate

use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::{CredentialClaims, TeamId};

/// Allow the request only if the role claimed for `team_id` grants `permission`
pub fn require_permission(
    state: &AppState,
    claims: &CredentialClaims,
    team_id: &TeamId,
    permission: &str,
) -> Result<(), ApiError> {
    match claims.role_in(team_id) {
        Some(role) if state.rbac.has_role_permission(permission, role) => Ok(()),
        role => {
            debug!(team_id = %team_id, ?role, permission, "Permission denied");
            Err(ApiError::forbidden("Forbidden"))
        }
    }
}
