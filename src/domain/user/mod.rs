//! User domain module

mod entity;
mod repository;
mod validation;

pub use entity::User;
pub use repository::UserRepository;
pub use validation::{validate_email, validate_username, UserValidationError};
