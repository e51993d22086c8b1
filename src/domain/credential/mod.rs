//! Bearer credential claim types
//!
//! Credentials are never stored; these types describe what an encrypted token
//! carries and what verification hands back.

mod claims;

pub use claims::{CredentialClaims, TeamClaim};
