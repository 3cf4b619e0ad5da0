//! Command-line Error Types

use derive_more::{Display, Error};

/// A command error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for commands.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not access the stored session")]
    Session,
    #[display("not signed in, run `keepr login` first")]
    NotSignedIn,
    #[display("api.endpoint is not configured")]
    MissingEndpoint,
    #[display("could not set up the {_0} backend")]
    Backend(#[error(not(source))] &'static str),
    #[display("the {_0} backend is not compiled into this build")]
    Unsupported(#[error(not(source))] &'static str),
    #[display("could not sign in")]
    Login,
    #[display("could not read {_0}")]
    Read(#[error(not(source))] String),
    #[display("no file with id {_0:?}")]
    NotFound(#[error(not(source))] String),
    #[display("no download URL could be signed for {_0:?}")]
    NoUrl(#[error(not(source))] String),
    #[display("{_0} file(s) failed to upload")]
    Upload(#[error(not(source))] usize),
    #[display("operation failed")]
    Library,
    #[display("could not read from the terminal")]
    Terminal,
}
