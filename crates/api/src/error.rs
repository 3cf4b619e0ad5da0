//! API Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// An API error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The request never got a usable HTTP response.
    #[display("network error")]
    Network,
    /// Credentials were missing, expired or rejected. Sign in again.
    #[display("not authorized")]
    Unauthorized,
    /// The API answered, but refused the operation.
    #[display("request rejected: {_0}")]
    Rejected(#[error(not(source))] String),
    /// The API answered with something we couldn't make sense of.
    #[display("invalid response: {_0}")]
    InvalidResponse(#[error(not(source))] String),
    /// No record exists with this identifier.
    #[display("record not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// The stored session could not be read or written.
    #[display("session storage error")]
    Session,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }
}
