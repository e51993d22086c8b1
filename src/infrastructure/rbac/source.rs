//! Policy sources

use std::path::{Path, PathBuf};

use crate::domain::{DomainError, PolicySource, RolePolicy};

/// Reads the role table from a JSON file on every load
#[derive(Debug, Clone)]
pub struct FilePolicySource {
    path: PathBuf,
}

impl FilePolicySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PolicySource for FilePolicySource {
    fn load(&self) -> Result<RolePolicy, DomainError> {
        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            DomainError::configuration(format!(
                "Failed to read role policy '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        RolePolicy::from_json(&contents)
    }
}

/// Fixed in-process role table
#[derive(Debug, Clone, Default)]
pub struct StaticPolicySource {
    policy: RolePolicy,
}

impl StaticPolicySource {
    pub fn new(policy: RolePolicy) -> Self {
        Self { policy }
    }
}

impl PolicySource for StaticPolicySource {
    fn load(&self) -> Result<RolePolicy, DomainError> {
        Ok(self.policy.clone())
    }
}
