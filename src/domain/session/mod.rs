//! Refresh session domain module

mod entity;
mod repository;

pub use entity::{
    Session, SESSION_HASH_LENGTH, SESSION_LIFETIME_DAYS, SESSION_ROTATION_THRESHOLD_DAYS,
};
pub use repository::SessionRepository;

#[cfg(test)]
pub use repository::mock;
