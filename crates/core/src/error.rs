//! Errors raised by domain constructors and parsers.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Rejected input. Storage and authorization failures have their own types
/// in `innkeep-infra` and `innkeep-auth`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A field is missing, too long or malformed; the message names the field.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A path or body identifier is not a UUID.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
