//! Request and response types shared by the HTTP handlers

pub mod error;
pub mod identity;
pub mod json;

pub use error::{ApiError, ApiErrorResponse};
pub use identity::{MemberResponse, SessionResponse, TeamResponse, UserResponse};
pub use json::Json;
