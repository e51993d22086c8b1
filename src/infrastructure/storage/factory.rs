//! Storage factory for runtime backend selection

use std::sync::Arc;

use tracing::info;

use crate::domain::{DomainError, OtpRepository, SessionRepository, TeamRepository, UserRepository};
use crate::infrastructure::identity::{
    InMemoryIdentityStore, PostgresOtpRepository, PostgresSessionRepository,
    PostgresTeamRepository, PostgresUserRepository,
};

use super::migrations::run_identity_migrations;
use super::postgres::{connect_pool, PostgresConfig};

/// Supported storage types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageType {
    /// In-memory storage (for testing/development)
    InMemory,
    /// PostgreSQL storage
    Postgres,
}

impl StorageType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Some(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            _ => None,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone)]
pub enum StorageConfig {
    InMemory,
    Postgres(PostgresConfig),
}

impl StorageConfig {
    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::InMemory => StorageType::InMemory,
            Self::Postgres(_) => StorageType::Postgres,
        }
    }
}

/// Every identity repository, backed by one store
#[derive(Debug, Clone)]
pub struct IdentityRepositories {
    pub users: Arc<dyn UserRepository>,
    pub teams: Arc<dyn TeamRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub otps: Arc<dyn OtpRepository>,
}

impl IdentityRepositories {
    /// All four traits served by one shared in-memory state
    pub fn in_memory(store: InMemoryIdentityStore) -> Self {
        Self {
            users: Arc::new(store.clone()),
            teams: Arc::new(store.clone()),
            sessions: Arc::new(store.clone()),
            otps: Arc::new(store),
        }
    }
}

/// Factory for creating identity repositories
#[derive(Debug)]
pub struct StorageFactory;

impl StorageFactory {
    /// Build the repositories, running migrations first for PostgreSQL
    pub async fn create(config: &StorageConfig) -> Result<IdentityRepositories, DomainError> {
        match config {
            StorageConfig::InMemory => {
                info!("Using in-memory identity store");
                Ok(IdentityRepositories::in_memory(InMemoryIdentityStore::new()))
            }
            StorageConfig::Postgres(pg_config) => {
                let pool = connect_pool(pg_config).await?;
                run_identity_migrations(&pool).await?;
                info!("Using PostgreSQL identity store");

                Ok(IdentityRepositories {
                    users: Arc::new(PostgresUserRepository::new(pool.clone())),
                    teams: Arc::new(PostgresTeamRepository::new(pool.clone())),
                    sessions: Arc::new(PostgresSessionRepository::new(pool.clone())),
                    otps: Arc::new(PostgresOtpRepository::new(pool)),
                })
            }
        }
    }
}
