use serde::Deserialize;

use crate::domain::DomainError;
use crate::infrastructure::auth::MIN_SECRET_LENGTH;
use crate::infrastructure::session::RotationMode;
use crate::infrastructure::storage::{PostgresConfig, StorageConfig, StorageType};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    pub storage: StorageSettings,
    pub rbac: RbacConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

/// Credential, OTP and session settings
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared symmetric secret for bearer credentials
    pub token_secret: String,
    /// Issuer and audience written into every credential
    pub host: String,
    pub credential_ttl_secs: i64,
    /// Upper bound on a single orchestrator flow
    pub flow_timeout_secs: u64,
    /// Issue the constant development OTP instead of random codes
    pub dev_mode: bool,
    pub rotation: RotationMode,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// `memory` or `postgres`
    pub backend: String,
    pub database_url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RbacConfig {
    pub policy_file: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: String::new(),
            host: "localhost".to_string(),
            credential_ttl_secs: 300,
            flow_timeout_secs: 5,
            dev_mode: false,
            rotation: RotationMode::default(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_secret", &"<redacted>")
            .field("host", &self.host)
            .field("credential_ttl_secs", &self.credential_ttl_secs)
            .field("flow_timeout_secs", &self.flow_timeout_secs)
            .field("dev_mode", &self.dev_mode)
            .field("rotation", &self.rotation)
            .finish()
    }
}

impl AuthConfig {
    /// Reject settings the credential service cannot work with
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.token_secret.len() < MIN_SECRET_LENGTH {
            return Err(DomainError::configuration(format!(
                "auth.token_secret must be at least {} bytes",
                MIN_SECRET_LENGTH
            )));
        }
        if self.host.trim().is_empty() {
            return Err(DomainError::configuration("auth.host must not be empty"));
        }
        if self.credential_ttl_secs <= 0 {
            return Err(DomainError::configuration(
                "auth.credential_ttl_secs must be positive",
            ));
        }
        Ok(())
    }

    pub fn credential_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.credential_ttl_secs)
    }

    pub fn flow_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.flow_timeout_secs)
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            database_url: PostgresConfig::default().url,
            max_connections: 10,
        }
    }
}

impl StorageSettings {
    pub fn to_storage_config(&self) -> Result<StorageConfig, DomainError> {
        match StorageType::parse(&self.backend) {
            Some(StorageType::InMemory) => Ok(StorageConfig::InMemory),
            Some(StorageType::Postgres) => Ok(StorageConfig::Postgres(
                PostgresConfig::new(&self.database_url).with_max_connections(self.max_connections),
            )),
            None => Err(DomainError::configuration(format!(
                "unknown storage backend '{}'",
                self.backend
            ))),
        }
    }
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            policy_file: "config/roles.json".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
