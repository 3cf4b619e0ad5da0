//! In-memory storage backend for testing.

use crate::error::{ErrorKind, Result};
use crate::{ObjectInfo, Progress, StorageBackend, progress::ProgressFn, validate_key};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use url::Url;

/// Storage operations that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Put,
    SignedUrl,
    Delete,
}

struct MockObject {
    modified: OffsetDateTime,
    content_type: Option<String>,
    data: Vec<u8>,
}

/// In-memory storage backend for testing.
///
/// Objects are stored in a `HashMap` behind a [`RwLock`], so all trait methods
/// can operate on `&self` without external synchronisation. Individual
/// operations can be told to fail for any key containing a given substring,
/// which is how partial-failure scenarios are exercised.
///
/// # Examples
///
/// ```
/// use keepr_storage::backend::{MockBackend, Operation};
/// use keepr_storage::{StorageBackend, ignore_progress};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let backend = MockBackend::with_objects([("Images/1-cat.png", b"meow")]);
/// assert!(backend.exists("Images/1-cat.png").await.unwrap());
///
/// backend.fail(Operation::Put, "broken").await;
/// assert!(backend.put("Others/1-broken.bin", b"x", None, &ignore_progress).await.is_err());
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<HashMap<String, MockObject>>,
    failures: RwLock<Vec<(Operation, String)>>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with objects.
    ///
    /// Panics if any key fails validation. If test setup is wrong, then test
    /// should not pass.
    pub fn with_objects(objects: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        let now = OffsetDateTime::now_utc();
        for (key, data) in objects {
            let key = key.into();
            let Ok(validated) = validate_key(&key) else {
                // The panic here is DELIBERATE. MockBackend is intended to be
                // used in tests; panics are expected. There is no error result.
                panic!("MockBackend::with_objects: invalid key {key}");
            };
            map.insert(validated, MockObject { modified: now, content_type: None, data: data.into() });
        }
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(map),
            failures: RwLock::new(Vec::new()),
        }
    }

    /// Make `operation` fail for every key containing `pattern`.
    pub async fn fail(&self, operation: Operation, pattern: impl Into<String>) {
        self.failures.write().await.push((operation, pattern.into()));
    }

    /// Remove all injected failures.
    pub async fn heal(&self) {
        self.failures.write().await.clear();
    }

    /// Keys of all stored objects, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.storage.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Stored bytes for `key`, if present.
    pub async fn contents(&self, key: &str) -> Option<Vec<u8>> {
        self.storage.read().await.get(key).map(|object| object.data.clone())
    }

    async fn check(&self, operation: Operation, key: &str) -> Result<()> {
        let failures = self.failures.read().await;
        if failures.iter().any(|(op, pattern)| *op == operation && key.contains(pattern.as_str())) {
            exn::bail!(ErrorKind::BackendError(format!("injected {operation:?} failure for {key}")));
        }
        Ok(())
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let objects: [(&str, &str); 0] = [];
        Self::with_objects(objects)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, key: &str, data: &[u8], content_type: Option<&str>, progress: &ProgressFn<'_>) -> Result<()> {
        let key = validate_key(key)?;
        self.check(Operation::Put, &key).await?;
        let total = data.len() as u64;
        progress(Progress::new(0, total));
        let object = MockObject {
            modified: OffsetDateTime::now_utc(),
            content_type: content_type.map(str::to_string),
            data: data.to_vec(),
        };
        self.storage.write().await.insert(key, object);
        progress(Progress::new(total, total));
        Ok(())
    }

    async fn signed_url(&self, key: &str, expires_in: Duration) -> Result<Url> {
        let key = validate_key(key)?;
        self.check(Operation::SignedUrl, &key).await?;
        let mut url = Url::parse(&format!("mock://{}/", self.name))
            .map_err(|e| exn::Exn::from(ErrorKind::BackendError(e.to_string())))?;
        url.set_path(&format!("/{key}"));
        url.query_pairs_mut().append_pair("expires_in", &expires_in.as_secs().to_string());
        Ok(url)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let key = validate_key(key)?;
        self.check(Operation::Delete, &key).await?;
        self.storage.write().await.remove(&key).map(|_| ()).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key)))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let key = validate_key(key)?;
        Ok(self.storage.read().await.contains_key(&key))
    }

    async fn stat(&self, key: &str) -> Result<ObjectInfo> {
        let key = validate_key(key)?;
        let guard = self.storage.read().await;
        let object = guard.get(&key).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key.clone())))?;
        Ok(ObjectInfo::new(key.clone(), object.data.len() as u64, object.modified)
            .with_content_type(object.content_type.clone()))
    }
}
