//! Shared services handed to every handler

use std::sync::Arc;

use crate::infrastructure::auth::CredentialService;
use crate::infrastructure::rbac::RbacPolicyEngine;
use crate::infrastructure::services::AuthService;
use crate::infrastructure::team::TeamService;

#[derive(Debug, Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub team_service: Arc<TeamService>,
    pub rbac: Arc<RbacPolicyEngine>,
}

impl AppState {
    pub fn new(auth_service: AuthService, team_service: TeamService, rbac: RbacPolicyEngine) -> Self {
        Self {
            auth_service: Arc::new(auth_service),
            team_service: Arc::new(team_service),
            rbac: Arc::new(rbac),
        }
    }

    /// Bearer credential verifier used by the request gate
    pub fn credentials(&self) -> &Arc<dyn CredentialService> {
        self.auth_service.credentials()
    }
}
