//! Refresh session infrastructure

mod service;

pub use service::{RotationMode, SessionService, DEFAULT_SESSION_IP, DEFAULT_USER_AGENT};
