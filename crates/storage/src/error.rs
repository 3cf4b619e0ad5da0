//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Object does not exist
    #[display("object not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Access denied (permissions or credentials)
    #[display("permission denied: {_0}")]
    PermissionDenied(#[error(not(source))] String),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Network-related error (S3 connections, etc.)
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// Key contains invalid characters or escapes the bucket root
    #[display("invalid key: {_0:?}")]
    InvalidKey(#[error(not(source))] String),
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Network(_) | Self::BackendError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::NotFound("Images/1-a.png".to_string()).to_string(), "object not found: Images/1-a.png");
        assert_eq!(ErrorKind::InvalidKey("../x".to_string()).to_string(), "invalid key: \"../x\"");
    }

    #[test]
    fn retryable_kinds() {
        assert!(ErrorKind::Network("timeout".to_string()).is_retryable());
        assert!(!ErrorKind::NotFound("a".to_string()).is_retryable());
        assert!(!ErrorKind::InvalidKey("a".to_string()).is_retryable());
    }
}
