//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, which provides a unified
//! interface for object storage across different backends (local filesystem,
//! S3-compatible services, in-memory for tests).

mod local;
#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "s3")]
mod s3;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::{MockBackend, Operation};
#[cfg(feature = "s3")]
pub use self::s3::S3Backend;
use crate::error::Result;
use crate::models::ObjectInfo;
use crate::progress::ProgressFn;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

/// Bodies are written (and progress reported) in chunks of this size.
pub(crate) const CHUNK_SIZE: usize = 64 * 1024;

/// Unified interface for object storage.
///
/// All keys are relative to the storage root and must be validated using
/// [`validate_key`](crate::validate_key) before use. Implementations should
/// enforce this validation.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use keepr_storage::{StorageBackend, error::Result, ignore_progress};
///
/// async fn store_and_share(backend: &dyn StorageBackend, data: &[u8]) -> Result<String> {
///     let key = "Documents/1700000000000-notes.txt";
///     backend.put(key, data, Some("text/plain"), &ignore_progress).await?;
///     let url = backend.signed_url(key, Duration::from_secs(3600)).await?;
///     Ok(url.to_string())
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend (used for logging only).
    fn name(&self) -> &str;

    /// Store `data` under `key`, replacing any existing object.
    ///
    /// `progress` is called at least once before the first byte is written
    /// and once after the last, with intermediate reports as the backend
    /// allows.
    ///
    /// ```no_run
    /// # use keepr_storage::{StorageBackend, Progress, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let report = |p: Progress| println!("{:?}%", p.percent());
    /// backend.put("Images/1700000000000-cat.png", b"...", Some("image/png"), &report).await?;
    /// # Ok(())
    /// # }
    /// ```
    async fn put(&self, key: &str, data: &[u8], content_type: Option<&str>, progress: &ProgressFn<'_>) -> Result<()>;

    /// Produce a URL granting read access to `key` for `expires_in`.
    ///
    /// Existence of the object is **not** checked.
    async fn signed_url(&self, key: &str, expires_in: Duration) -> Result<Url>;

    /// Delete an object.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the backend
    /// can tell the object does not exist.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if an object exists.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Get object metadata without reading contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the object
    /// does not exist.
    async fn stat(&self, key: &str) -> Result<ObjectInfo>;
}
