//! Claim set embedded in an encrypted bearer credential

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::id::TeamId;
use crate::domain::team::MemberRole;

/// A user's role in one team, as carried by a credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamClaim {
    pub team_id: TeamId,
    pub role: MemberRole,
}

impl TeamClaim {
    pub fn new(team_id: TeamId, role: MemberRole) -> Self {
        Self { team_id, role }
    }
}

/// Full claim set of a bearer credential
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialClaims {
    /// Subject (user ID)
    #[serde(default)]
    pub sub: String,
    #[serde(default)]
    pub email: String,
    /// Random nonce making every token unique
    pub jti: String,
    pub iss: String,
    pub aud: String,
    pub iat: DateTime<Utc>,
    pub nbf: DateTime<Utc>,
    pub exp: DateTime<Utc>,
    #[serde(default)]
    pub teams: Vec<TeamClaim>,
}

impl CredentialClaims {
    /// Check if the credential has expired
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp < now
    }

    /// Get user ID from claims
    pub fn user_id(&self) -> &str {
        &self.sub
    }

    /// Role held in the given team, if the subject is a member
    pub fn role_in(&self, team_id: &TeamId) -> Option<MemberRole> {
        self.teams
            .iter()
            .find(|t| &t.team_id == team_id)
            .map(|t| t.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_claims(team: TeamId) -> CredentialClaims {
        let now = Utc::now();
        CredentialClaims {
            sub: "user".to_string(),
            email: "a@x.com".to_string(),
            jti: "nonce".to_string(),
            iss: "auth.local".to_string(),
            aud: "auth.local".to_string(),
            iat: now,
            nbf: now,
            exp: now + Duration::minutes(5),
            teams: vec![TeamClaim::new(team, MemberRole::Internal)],
        }
    }

    #[test]
    fn test_role_in() {
        let team = TeamId::generate();
        let claims = sample_claims(team);
        assert_eq!(claims.role_in(&team), Some(MemberRole::Internal));
        assert_eq!(claims.role_in(&TeamId::generate()), None);
    }

    #[test]
    fn test_is_expired_at() {
        let claims = sample_claims(TeamId::generate());
        assert!(!claims.is_expired_at(claims.iat));
        assert!(claims.is_expired_at(claims.exp + Duration::seconds(1)));
    }

    #[test]
    fn test_missing_subject_deserializes_empty() {
        let json = r#"{"jti":"n","iss":"h","aud":"h",
            "iat":"2026-01-01T00:00:00Z","nbf":"2026-01-01T00:00:00Z","exp":"2026-01-01T00:05:00Z"}"#;
        let claims: CredentialClaims = serde_json::from_str(json).unwrap();
        assert!(claims.sub.is_empty());
        assert!(claims.email.is_empty());
        assert!(claims.teams.is_empty());
    }
}
