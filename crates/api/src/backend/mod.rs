//! Record API trait and implementations.

mod graphql;
#[cfg(feature = "mock")]
mod mock;

pub use self::graphql::GraphQlBackend;
#[cfg(feature = "mock")]
pub use self::mock::{MockBackend, Operation};
use crate::error::Result;
use crate::models::{FileRecord, NewFileRecord, Page};
use async_trait::async_trait;

/// Unified interface for the file record API.
///
/// # Examples
///
/// ```
/// use keepr_api::{ApiBackend, FileRecord, error::Result};
///
/// async fn first_page(api: &dyn ApiBackend, owner: &str) -> Result<Vec<FileRecord>> {
///     Ok(api.list_files(Some(owner), None, None).await?.items)
/// }
/// ```
#[async_trait]
pub trait ApiBackend: Send + Sync {
    /// Name of the configured backend (used for logging only).
    fn name(&self) -> &str;

    /// Persist a new record, returning it with its assigned identifier.
    async fn create_file(&self, input: &NewFileRecord) -> Result<FileRecord>;

    /// Delete a record by identifier.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) or
    /// [`Rejected`](crate::error::ErrorKind::Rejected) if the record does
    /// not exist, depending on what the backend can tell.
    async fn delete_file(&self, id: &str) -> Result<()>;

    /// Fetch a single record by identifier.
    async fn get_file(&self, id: &str) -> Result<Option<FileRecord>>;

    /// Fetch one page of records, optionally restricted to `owner`.
    ///
    /// Pass the previous page's `next_token` to continue; a page with no
    /// token is the last one.
    async fn list_files(
        &self,
        owner: Option<&str>,
        limit: Option<u32>,
        next_token: Option<&str>,
    ) -> Result<Page<FileRecord>>;
}
