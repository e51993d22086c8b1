//! Team validation

use thiserror::Error;

/// Errors that can occur during team validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TeamValidationError {
    #[error("Team name cannot be empty")]
    EmptyName,

    #[error("Team name cannot exceed {0} characters")]
    NameTooLong(usize),

    #[error("Team name cannot contain control characters")]
    ControlCharacter,

    #[error("Unknown member role: '{0}'")]
    UnknownRole(String),
}

const MAX_TEAM_NAME_LENGTH: usize = 64;

/// Validate a team name
pub fn validate_team_name(name: &str) -> Result<(), TeamValidationError> {
    if name.trim().is_empty() {
        return Err(TeamValidationError::EmptyName);
    }

    if name.chars().count() > MAX_TEAM_NAME_LENGTH {
        return Err(TeamValidationError::NameTooLong(MAX_TEAM_NAME_LENGTH));
    }

    if name.chars().any(char::is_control) {
        return Err(TeamValidationError::ControlCharacter);
    }

    Ok(())
}
