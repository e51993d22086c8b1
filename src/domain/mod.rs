//! Domain layer - entities, value objects, and repository traits

pub mod credential;
pub mod error;
pub mod id;
pub mod otp;
pub mod rbac;
pub mod session;
pub mod team;
pub mod user;

pub use credential::{CredentialClaims, TeamClaim};
pub use error::{AuthError, DomainError, ErrorKind};
pub use id::{OtpId, SessionId, TeamId, UserId};
pub use otp::{Otp, OtpRepository, OTP_CODE_LENGTH, OTP_DEV_CODE};
pub use rbac::{Permission, PolicySource, RoleDefinition, RolePolicy};
pub use session::{Session, SessionRepository, SESSION_HASH_LENGTH};
pub use team::{Member, MemberRole, Team, TeamRepository, MAX_TEAMS_PER_USER};
pub use user::{User, UserRepository};
