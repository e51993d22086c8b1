//! Wildcard permission matcher over a loaded role table

use std::collections::HashMap;
use tracing::{info, warn};

use crate::domain::{DomainError, MemberRole, Permission, PolicySource, RolePolicy};

/// Evaluates `domain::resource::action` requests against role grants
#[derive(Debug, Clone, Default)]
pub struct RbacPolicyEngine {
    roles: HashMap<String, Vec<Permission>>,
}

impl RbacPolicyEngine {
    /// Build the engine from a policy, skipping malformed grants
    ///
    /// When a role name appears twice the first definition wins.
    pub fn from_policy(policy: RolePolicy) -> Self {
        let mut roles: HashMap<String, Vec<Permission>> = HashMap::new();

        for role in policy.roles {
            if roles.contains_key(&role.name) {
                warn!(role = %role.name, "Duplicate role definition ignored");
                continue;
            }

            let mut grants = Vec::with_capacity(role.permissions.len());
            for raw in &role.permissions {
                match Permission::parse(raw) {
                    Some(permission) => grants.push(permission),
                    None => warn!(role = %role.name, permission = %raw, "Skipping malformed permission"),
                }
            }

            roles.insert(role.name, grants);
        }

        Self { roles }
    }

    /// Load and build from a policy source
    pub fn load(source: &dyn PolicySource) -> Result<Self, DomainError> {
        let engine = Self::from_policy(source.load()?);
        info!(roles = engine.roles.len(), "Role policy loaded");
        Ok(engine)
    }

    /// Whether `role` holds `requested`; first matching grant wins
    ///
    /// Unknown roles and requests without exactly three segments are denied.
    pub fn has_permission(&self, requested: &str, role: &str) -> bool {
        let Some(requested) = Permission::parse(requested) else {
            return false;
        };

        self.roles
            .get(role)
            .is_some_and(|grants| grants.iter().any(|grant| grant.grants(&requested)))
    }

    pub fn has_role_permission(&self, requested: &str, role: MemberRole) -> bool {
        self.has_permission(requested, role.as_str())
    }

    /// Parsed grants of a role in declaration order
    pub fn permissions(&self, role: &str) -> &[Permission] {
        self.roles.get(role).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn role_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.roles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RoleDefinition;

    fn create_engine() -> RbacPolicyEngine {
        RbacPolicyEngine::from_policy(RolePolicy::new(vec![
            RoleDefinition::new("owner", ["team::*::*"]),
            RoleDefinition::new("internal", ["team::read::*", "team::update::42"]),
            RoleDefinition::new("external", ["team::read::42"]),
            RoleDefinition::new("root", ["*::*::*"]),
            RoleDefinition::new("broken", ["team::delete", "team::delete::42::x", "team::delete::*"]),
        ]))
    }

    #[test]
    fn test_wildcard_grants() {
        let engine = create_engine();

        assert!(engine.has_permission("team::delete::42", "owner"));
        assert!(engine.has_permission("team::read::7", "internal"));
        assert!(engine.has_permission("team::update::42", "internal"));
        assert!(!engine.has_permission("team::update::7", "internal"));
        assert!(!engine.has_permission("team::delete::42", "internal"));
        assert!(engine.has_permission("team::read::42", "external"));
        assert!(!engine.has_permission("team::read::7", "external"));
    }

    #[test]
    fn test_domain_must_match_exactly() {
        let engine = create_engine();
        assert!(!engine.has_permission("team::delete::42", "root"));
        assert!(!engine.has_permission("billing::read::1", "owner"));
    }

    #[test]
    fn test_non_three_segment_request_denied() {
        let engine = create_engine();
        assert!(!engine.has_permission("team::delete", "owner"));
        assert!(!engine.has_permission("team::delete::42::x", "owner"));
        assert!(!engine.has_permission("", "owner"));
    }

    #[test]
    fn test_unknown_role_denied() {
        let engine = create_engine();
        assert!(!engine.has_permission("team::read::42", "guest"));
    }

    #[test]
    fn test_malformed_grants_skipped() {
        let engine = create_engine();
        assert_eq!(engine.permissions("broken").len(), 1);
        assert!(engine.has_permission("team::delete::42", "broken"));
    }

    #[test]
    fn test_member_role_lookup() {
        let engine = create_engine();
        assert!(engine.has_role_permission("team::delete::42", MemberRole::Owner));
        assert!(!engine.has_role_permission("team::delete::42", MemberRole::External));
    }

    #[test]
    fn test_first_definition_wins() {
        let engine = RbacPolicyEngine::from_policy(RolePolicy::new(vec![
            RoleDefinition::new("owner", ["team::read::*"]),
            RoleDefinition::new("owner", ["team::*::*"]),
        ]));
        assert!(!engine.has_permission("team::delete::1", "owner"));
        assert_eq!(engine.role_names(), vec!["owner"]);
    }
}
