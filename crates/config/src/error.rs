//! Configuration Error Types

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// An explicitly requested configuration file does not exist.
    #[display("configuration file not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// The file extension doesn't map to a supported format.
    #[display("unsupported configuration format: {_0}")]
    UnsupportedFormat(#[error(not(source))] String),
    /// The merged configuration could not be deserialized.
    #[display("could not parse configuration")]
    Parse,
    /// The configuration parsed, but a value is out of range.
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] String),
    /// No home directory, so no platform config or data directory either.
    #[display("could not determine the user's home directory")]
    NoHomeDirectory,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
