//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Storage and API failures are raised
//! as frames beneath one of these kinds, so the underlying cause stays in the
//! tree.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("not signed in")]
    Unauthenticated,
    #[display("could not list files")]
    Listing,
    #[display("storage operation failed")]
    Storage,
    #[display("record API operation failed")]
    Api,
    #[display("issue with storage key generation from template")]
    Template,
    #[display("no file with id {_0:?}")]
    NotFound(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Storage and API failures may well be transient, but that is for the
    /// inner frames to say; nothing at this level is known to be.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
