//! Role to permission tables and where they come from

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Permissions granted to one role, in evaluation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl RoleDefinition {
    pub fn new<I, S>(name: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }
}

/// The full policy document: `{"roles": [{"name": ..., "permissions": [...]}]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePolicy {
    #[serde(default)]
    pub roles: Vec<RoleDefinition>,
}

impl RolePolicy {
    pub fn new(roles: Vec<RoleDefinition>) -> Self {
        Self { roles }
    }

    pub fn from_json(json: &str) -> Result<Self, DomainError> {
        serde_json::from_str(json)
            .map_err(|e| DomainError::configuration(format!("Invalid role policy: {}", e)))
    }
}

/// Source of the role policy (a file, static table, remote config, ...)
pub trait PolicySource: Send + Sync + std::fmt::Debug {
    fn load(&self) -> Result<RolePolicy, DomainError>;
}
