//! Domain layer error definitions.

use thiserror::Error;

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// Username validation error
    #[error("Username cannot be empty")]
    UsernameEmpty,

    /// Username too long error
    #[error("Username cannot exceed {max} characters (got {actual})")]
    UsernameTooLong { max: usize, actual: usize },

    /// MessageText validation error (empty or whitespace only)
    #[error("message cannot be empty")]
    MessageTextEmpty,

    /// MessageText too long error
    #[error("message cannot exceed {max} characters (got {actual})")]
    MessageTextTooLong { max: usize, actual: usize },
}

/// Errors raised by a [`ChatMessageRepository`](super::ChatMessageRepository)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// The backing store rejected or failed the operation
    #[error("database error: {0}")]
    Database(String),

    /// A stored row could not be turned back into a domain value
    #[error("corrupted row: {0}")]
    Corrupted(String),
}

/// Errors raised by a [`CredentialVerifier`](super::CredentialVerifier)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Token is missing, malformed, badly signed, expired or carries bad claims
    #[error("invalid token")]
    InvalidToken,
}
