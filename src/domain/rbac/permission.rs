//! `domain::resource::action` permission strings

use serde::{Deserialize, Serialize};

/// Segment separator
pub const SEPARATOR: &str = "::";

/// Wildcard accepted in the resource and action segments of a grant
pub const WILDCARD: &str = "*";

/// A parsed three-segment permission
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Permission {
    domain: String,
    resource: String,
    action: String,
}

impl Permission {
    /// Parse a permission, returning `None` unless it has exactly three segments
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split(SEPARATOR);
        let domain = parts.next()?;
        let resource = parts.next()?;
        let action = parts.next()?;

        if parts.next().is_some() {
            return None;
        }

        Some(Self {
            domain: domain.to_string(),
            resource: resource.to_string(),
            action: action.to_string(),
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// Whether this granted permission covers `requested`.
    ///
    /// The domain must match exactly; resource and action match exactly or
    /// through a `*` in the grant. A wildcard in the request has no special
    /// meaning.
    pub fn grants(&self, requested: &Permission) -> bool {
        self.domain == requested.domain
            && segment_matches(&self.resource, &requested.resource)
            && segment_matches(&self.action, &requested.action)
    }
}

fn segment_matches(granted: &str, requested: &str) -> bool {
    granted == requested || granted == WILDCARD
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            self.domain,
            self.resource,
            self.action,
            sep = SEPARATOR
        )
    }
}

impl TryFrom<String> for Permission {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("permission '{}' must have 3 segments", value))
    }
}

impl From<Permission> for String {
    fn from(permission: Permission) -> Self {
        permission.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(value: &str) -> Permission {
        Permission::parse(value).unwrap()
    }

    #[test]
    fn test_parse_three_segments() {
        let permission = p("team::delete::42");
        assert_eq!(permission.domain(), "team");
        assert_eq!(permission.resource(), "delete");
        assert_eq!(permission.action(), "42");
        assert_eq!(permission.to_string(), "team::delete::42");
    }

    #[test]
    fn test_parse_rejects_other_segment_counts() {
        assert!(Permission::parse("team::delete").is_none());
        assert!(Permission::parse("team").is_none());
        assert!(Permission::parse("team::delete::42::x").is_none());
        assert!(Permission::parse("").is_none());
    }

    #[test]
    fn test_grants_exact_and_wildcards() {
        let requested = p("team::delete::42");
        assert!(p("team::delete::42").grants(&requested));
        assert!(p("team::delete::*").grants(&requested));
        assert!(p("team::*::42").grants(&requested));
        assert!(p("team::*::*").grants(&requested));
    }

    #[test]
    fn test_domain_never_wildcards() {
        let requested = p("team::delete::42");
        assert!(!p("*::*::*").grants(&requested));
        assert!(!p("org::*::*").grants(&requested));
    }

    #[test]
    fn test_wildcard_in_request_is_literal() {
        let requested = p("team::delete::*");
        assert!(p("team::delete::*").grants(&requested));
        assert!(!p("team::delete::42").grants(&requested));
    }

    #[test]
    fn test_serde_round_trip_validates() {
        let json = serde_json::to_string(&p("team::read::*")).unwrap();
        assert_eq!(json, "\"team::read::*\"");
        assert!(serde_json::from_str::<Permission>("\"team::read\"").is_err());
    }
}
