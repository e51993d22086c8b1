//! Infrastructure layer - store adapters and the services built on them

pub mod auth;
pub mod identity;
pub mod logging;
pub mod otp;
pub mod random;
pub mod rbac;
pub mod services;
pub mod session;
pub mod storage;
pub mod tasks;
pub mod team;
