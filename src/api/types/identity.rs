//! Response bodies for users, teams and sessions

use serde::Serialize;

use crate::domain::{Member, Session, Team, User};

#[derive(Debug, Clone, Serialize)]
pub struct MemberResponse {
    pub team_id: String,
    pub team_name: String,
    pub role: String,
    pub joined_at: String,
}

impl From<&Member> for MemberResponse {
    fn from(member: &Member) -> Self {
        Self {
            team_id: member.team_id().to_string(),
            team_name: member.team().name().to_string(),
            role: member.role().to_string(),
            joined_at: member.joined_at().to_rfc3339(),
        }
    }
}

/// User fields safe to expose
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub teams: Vec<MemberResponse>,
    pub created_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id().to_string(),
            email: user.email().to_string(),
            username: user.username().to_string(),
            avatar: user.avatar().map(String::from),
            teams: user.teams().iter().map(MemberResponse::from).collect(),
            created_at: user.created_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamResponse {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Team> for TeamResponse {
    fn from(team: &Team) -> Self {
        Self {
            id: team.id().to_string(),
            name: team.name().to_string(),
            created_at: team.created_at().to_rfc3339(),
            updated_at: team.updated_at().to_rfc3339(),
        }
    }
}

/// Session listing entry; the hash itself is never returned
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub ip: String,
    pub user_agent: String,
    pub expires_at: String,
    pub created_at: String,
    pub current: bool,
}

impl SessionResponse {
    pub fn new(session: &Session, current_hash: Option<&str>) -> Self {
        Self {
            id: session.id().to_string(),
            ip: session.ip().to_string(),
            user_agent: session.user_agent().to_string(),
            expires_at: session.expires_at().to_rfc3339(),
            created_at: session.created_at().to_rfc3339(),
            current: current_hash == Some(session.hash()),
        }
    }
}
