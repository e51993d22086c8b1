use thiserror::Error;

/// Coarse error categories exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Expired,
    Unauthorized,
    Conflict,
    Timeout,
    Internal,
}

/// Authentication failures with a deliberately coarse user-facing message
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid code or email")]
    InvalidCodeOrEmail,

    #[error("user is blocked")]
    UserBlocked,

    #[error("invalid user or blocked")]
    InvalidUserOrBlocked,

    #[error("session expired")]
    SessionExpired,

    #[error("no sessions found")]
    NoSessionsFound,

    #[error("token expired or invalid")]
    TokenExpired,

    #[error("invalid token claims")]
    InvalidIssuer,

    #[error("invalid token claims")]
    MalformedClaims,

    #[error("invalid token")]
    InvalidToken,
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SessionExpired | Self::TokenExpired => ErrorKind::Expired,
            Self::NoSessionsFound => ErrorKind::NotFound,
            Self::InvalidCodeOrEmail
            | Self::UserBlocked
            | Self::InvalidUserOrBlocked
            | Self::InvalidIssuer
            | Self::MalformedClaims
            | Self::InvalidToken => ErrorKind::Unauthorized,
        }
    }
}

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid ID format: {message}")]
    InvalidId { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Timeout: {message}")]
    Timeout { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invalid_id(message: impl Into<String>) -> Self {
        Self::InvalidId {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Map onto the coarse taxonomy used by callers
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Validation { .. } | Self::InvalidId { .. } => ErrorKind::Validation,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Forbidden { .. } => ErrorKind::Unauthorized,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Configuration { .. } | Self::Internal { .. } | Self::Storage { .. } => {
                ErrorKind::Internal
            }
            Self::Auth(err) => err.kind(),
        }
    }

    /// The wrapped authentication failure, if any
    pub fn as_auth(&self) -> Option<&AuthError> {
        match self {
            Self::Auth(err) => Some(err),
            _ => None,
        }
    }
}
