//! Local filesystem storage backend.
//!
//! Objects are stored as files under a configured root directory and accessed
//! via `tokio::fs`. Handy for development and for running Keepr without a
//! cloud bucket.

use crate::backend::CHUNK_SIZE;
use crate::error::{ErrorKind, Result};
use crate::{ObjectInfo, Progress, StorageBackend, progress::ProgressFn, validate_key};
use async_trait::async_trait;
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::OffsetDateTime;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use url::Url;

/// Local filesystem storage backend.
///
/// # Examples
///
/// ```no_run
/// use keepr_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("local", "/var/lib/keepr").map_err(|e| format!("{e:?}"))?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    /// Root directory for stored objects
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, or exists but is not a
    /// directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidKey(root.display().to_string()));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidKey(root.display().to_string()));
            }
        } else {
            // Use non-async here; it'll only happen once on startup and it's
            // not worth the hassle of making the constructor async.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root.display().to_string()))?;
        }
        Ok(Self { name: name.into(), root })
    }

    /// Validates the key and joins it onto the root directory.
    fn absolute_path(&self, key: &str) -> Result<PathBuf> {
        let validated = validate_key(key)?;
        Ok(validated.split('/').fold(self.root.clone(), |path, segment| path.join(segment)))
    }

    fn map_io_error(e: std::io::Error, key: &str) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(key.to_string()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(key.to_string()),
            _ => ErrorKind::Io(e),
        }
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, key: &str, data: &[u8], _content_type: Option<&str>, progress: &ProgressFn<'_>) -> Result<()> {
        let abs_path = self.absolute_path(key)?;
        // Create parent directories if needed, to keep behaviour
        // consistent with S3-compatible storage.
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, key))?;
        }
        let total = data.len() as u64;
        let mut file = fs::File::create(&abs_path).await.map_err(|e| Self::map_io_error(e, key))?;
        progress(Progress::new(0, total));
        let mut transferred = 0;
        for chunk in data.chunks(CHUNK_SIZE) {
            file.write_all(chunk).await.map_err(|e| Self::map_io_error(e, key))?;
            transferred += chunk.len() as u64;
            progress(Progress::new(transferred, total));
        }
        file.flush().await.map_err(|e| Self::map_io_error(e, key))?;
        tracing::debug!(backend = self.name(), key, bytes = total, "Stored object");
        Ok(())
    }

    async fn signed_url(&self, key: &str, expires_in: Duration) -> Result<Url> {
        let abs_path = self.absolute_path(key)?;
        tracing::trace!(key, expires_in = expires_in.as_secs(), "Local URLs never expire");
        Url::from_file_path(&abs_path).map_err(|()| exn::Exn::from(ErrorKind::InvalidKey(key.to_string())))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let abs_path = self.absolute_path(key)?;
        Ok(fs::remove_file(&abs_path).await.map_err(|e| Self::map_io_error(e, key))?)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let abs_path = self.absolute_path(key)?;
        Ok(fs::try_exists(&abs_path).await.map_err(ErrorKind::Io)?)
    }

    async fn stat(&self, key: &str) -> Result<ObjectInfo> {
        let abs_path = self.absolute_path(key)?;
        let metadata = fs::metadata(&abs_path).await.map_err(|e| Self::map_io_error(e, key))?;
        if !metadata.is_file() {
            exn::bail!(ErrorKind::NotFound(key.to_string()));
        }
        let modified: OffsetDateTime = metadata.modified().map_err(ErrorKind::Io)?.into();
        Ok(ObjectInfo::new(validate_key(key)?, metadata.len(), modified))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ignore_progress;
    use std::sync::Mutex;

    #[test]
    fn test_new_requires_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalBackend::new("name", temp_dir.path()).is_ok());
        assert!(LocalBackend::new("name", "relative/path").is_err());
        assert!(LocalBackend::new("name", "./relative").is_err());
    }

    #[test]
    fn test_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        let expected = temp_dir.path().join("Documents").join("1-report.pdf");
        assert_eq!(backend.absolute_path("Documents/1-report.pdf").unwrap(), expected);
        // Key traversal is prevented
        assert!(backend.absolute_path("../etc/passwd").is_err());
    }

    #[tokio::test]
    async fn test_put_creates_directories() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        backend.put("Images/1-cat.png", b"meow", Some("image/png"), &ignore_progress).await.unwrap();
        assert!(backend.exists("Images/1-cat.png").await.unwrap());
        assert_eq!(std::fs::read(temp_dir.path().join("Images/1-cat.png")).unwrap(), b"meow");
    }

    #[tokio::test]
    async fn test_put_reports_progress() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        let data = vec![7u8; CHUNK_SIZE * 2 + 10];
        let reports = Mutex::new(Vec::new());
        let record = |p: Progress| reports.lock().unwrap().push(p.percent());
        backend.put("Others/1-blob", &data, None, &record).await.unwrap();
        let reports = reports.into_inner().unwrap();
        assert_eq!(reports.first(), Some(&Some(0)));
        assert_eq!(reports.last(), Some(&Some(100)));
        assert_eq!(reports.len(), 4);
    }

    #[tokio::test]
    async fn test_signed_url_is_file_url() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        let url = backend.signed_url("Documents/1-a.txt", Duration::from_secs(3600)).await.unwrap();
        assert_eq!(url.scheme(), "file");
        assert!(url.path().ends_with("/Documents/1-a.txt"));
    }

    #[tokio::test]
    async fn test_delete() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        backend.put("file.txt", b"data", None, &ignore_progress).await.unwrap();
        backend.delete("file.txt").await.unwrap();
        assert!(!backend.exists("file.txt").await.unwrap());
        // Deleting nonexistent object returns error
        let err = backend.delete("file.txt").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stat() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        backend.put("Code//main.rs", b"fn main() {}", None, &ignore_progress).await.unwrap();
        let info = backend.stat("Code/main.rs").await.unwrap();
        assert_eq!(info.key, "Code/main.rs");
        assert_eq!(info.size, 12);
        assert_eq!(info.content_type, None);
        let err = backend.stat("Code/missing.rs").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_key_security() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        assert!(backend.put("../escape", b"bad", None, &ignore_progress).await.is_err());
        assert!(backend.delete("a/../../file").await.is_err());
        assert!(backend.signed_url("../../etc/passwd", Duration::from_secs(1)).await.is_err());
    }
}
