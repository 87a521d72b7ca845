//! Error types for identity and session operations
//!
//! This module defines the errors surfaced by the identity and session
//! collaborators consumed by the organization service and the HTTP guard.

use thiserror::Error;

/// Authentication error types.
///
/// These errors cover session lookup, identity resolution and backend
/// failures of the collaborators.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Session does not exist or has expired
    #[error("Session not found")]
    SessionNotFound,

    /// User identity does not exist
    #[error("User not found")]
    UserNotFound,

    /// Request carries no usable credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Storage backend failure (cache, database)
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// Check if this error should be logged at error level.
    ///
    /// Missing sessions and unknown users are expected and
    /// should not be logged as errors.
    pub fn is_server_error(&self) -> bool {
        matches!(self, AuthError::Backend(_) | AuthError::ConfigError(_))
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::SessionNotFound | AuthError::UserNotFound | AuthError::Unauthorized(_) => {
                401
            }
            AuthError::ConfigError(_) | AuthError::Backend(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::SessionNotFound => "session_not_found",
            AuthError::UserNotFound => "user_not_found",
            AuthError::Unauthorized(_) => "unauthorized",
            AuthError::ConfigError(_) => "config_error",
            AuthError::Backend(_) => "internal_error",
        }
    }
}
