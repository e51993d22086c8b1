//! Team Gate
//!
//! Passwordless authentication and team-scoped access control:
//! - One-time codes delivered by email, redeemed for a refresh session
//! - Short-lived encrypted bearer credentials carrying team roles
//! - Rotating refresh sessions
//! - Wildcard RBAC over `domain::resource::action` permissions

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use self::config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use domain::DomainError;
use infrastructure::{
    auth::{CredentialConfig, EncryptedCredentialService},
    otp::{OtpMode, OtpService},
    rbac::{FilePolicySource, RbacPolicyEngine},
    services::AuthService,
    session::SessionService,
    storage::{IdentityRepositories, StorageFactory},
    tasks::BackgroundTasks,
    team::TeamService,
};
use tracing::{info, warn};

/// Create the application state from configuration
///
/// Returns the background task tracker alongside so the caller can drain it
/// on shutdown.
pub async fn create_app_state_with_config(
    config: &AppConfig,
) -> anyhow::Result<(AppState, BackgroundTasks)> {
    config.auth.validate()?;

    let storage = config.storage.to_storage_config()?;
    info!(backend = ?storage.storage_type(), "Storage backend");
    let repositories = StorageFactory::create(&storage).await?;

    let policy = FilePolicySource::new(&config.rbac.policy_file);
    let rbac = RbacPolicyEngine::load(&policy)?;
    info!(path = %policy.path().display(), roles = ?rbac.role_names(), "RBAC policy loaded");

    let tasks = BackgroundTasks::new();
    let state = build_app_state(config, repositories, rbac, tasks.clone())?;

    Ok((state, tasks))
}

/// Wire services over already-built repositories and policy
pub fn build_app_state(
    config: &AppConfig,
    repositories: IdentityRepositories,
    rbac: RbacPolicyEngine,
    tasks: BackgroundTasks,
) -> Result<AppState, DomainError> {
    let auth = &config.auth;

    let otp_mode = if auth.dev_mode {
        warn!("Development mode: every one-time code is the constant development code");
        OtpMode::Development
    } else {
        OtpMode::Random
    };

    let credentials = EncryptedCredentialService::new(CredentialConfig::new(
        auth.token_secret.clone(),
        auth.host.clone(),
        auth.credential_ttl(),
    ))?;

    let otp = OtpService::new(
        repositories.otps.clone(),
        repositories.users.clone(),
        tasks.clone(),
        otp_mode,
    );
    let sessions = SessionService::new(repositories.sessions.clone(), tasks, auth.rotation);

    let auth_service = AuthService::new(
        repositories.users.clone(),
        otp,
        sessions,
        Arc::new(credentials),
        auth.flow_timeout(),
    );
    let team_service = TeamService::new(
        repositories.users,
        repositories.teams,
        auth.flow_timeout(),
    );

    Ok(AppState::new(auth_service, team_service, rbac))
}
