//! In-memory record backend for testing.

use crate::backend::ApiBackend;
use crate::error::{ErrorKind, Result};
use crate::models::{FileRecord, NewFileRecord, Page};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// API operations that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Delete,
    List,
    Get,
}

/// In-memory record backend for testing.
///
/// Records are kept in insertion order. Failures are injected per operation
/// and matched by substring against the record name (create), identifier
/// (delete, get) or owner (list).
///
/// # Examples
///
/// ```
/// use keepr_api::backend::{MockBackend, Operation};
/// use keepr_api::ApiBackend;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let api = MockBackend::default();
/// api.fail(Operation::Delete, "file-").await;
/// assert!(api.delete_file("file-1").await.is_err());
/// # }
/// ```
pub struct MockBackend {
    name: String,
    records: RwLock<Vec<FileRecord>>,
    failures: RwLock<Vec<(Operation, String)>>,
    next_id: AtomicU64,
    page_size: Option<usize>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with records.
    pub fn with_records(records: impl IntoIterator<Item = FileRecord>) -> Self {
        let records: Vec<FileRecord> = records.into_iter().collect();
        Self {
            name: "mock".to_string(),
            next_id: AtomicU64::new(records.len() as u64 + 1),
            records: RwLock::new(records),
            failures: RwLock::new(Vec::new()),
            page_size: None,
        }
    }

    /// Split list results into pages of at most `size` records, ignoring any
    /// larger `limit` the caller asks for.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size.max(1));
        self
    }

    /// Make `operation` fail whenever its subject contains `pattern`.
    pub async fn fail(&self, operation: Operation, pattern: impl Into<String>) {
        self.failures.write().await.push((operation, pattern.into()));
    }

    /// Remove all injected failures.
    pub async fn heal(&self) {
        self.failures.write().await.clear();
    }

    /// Snapshot of every stored record.
    pub async fn records(&self) -> Vec<FileRecord> {
        self.records.read().await.clone()
    }

    async fn check(&self, operation: Operation, subject: &str) -> Result<()> {
        let failures = self.failures.read().await;
        if failures.iter().any(|(op, pattern)| *op == operation && subject.contains(pattern.as_str())) {
            exn::bail!(ErrorKind::Rejected(format!("injected {operation:?} failure for {subject}")));
        }
        Ok(())
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        Self::with_records([])
    }
}

#[async_trait]
impl ApiBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create_file(&self, input: &NewFileRecord) -> Result<FileRecord> {
        self.check(Operation::Create, &input.name).await?;
        let id = format!("file-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let record = input.clone().into_record(id);
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn delete_file(&self, id: &str) -> Result<()> {
        self.check(Operation::Delete, id).await?;
        let mut records = self.records.write().await;
        let Some(index) = records.iter().position(|record| record.id == id) else {
            exn::bail!(ErrorKind::NotFound(id.to_string()));
        };
        records.remove(index);
        Ok(())
    }

    async fn get_file(&self, id: &str) -> Result<Option<FileRecord>> {
        self.check(Operation::Get, id).await?;
        Ok(self.records.read().await.iter().find(|record| record.id == id).cloned())
    }

    async fn list_files(
        &self,
        owner: Option<&str>,
        limit: Option<u32>,
        next_token: Option<&str>,
    ) -> Result<Page<FileRecord>> {
        self.check(Operation::List, owner.unwrap_or_default()).await?;
        let start = match next_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| exn::Exn::from(ErrorKind::Rejected(format!("invalid nextToken {token:?}"))))?,
            None => 0,
        };
        let size = match (limit, self.page_size) {
            (Some(limit), Some(page)) => (limit as usize).min(page),
            (Some(limit), None) => limit as usize,
            (None, Some(page)) => page,
            (None, None) => usize::MAX,
        };
        let records = self.records.read().await;
        let matching: Vec<&FileRecord> =
            records.iter().filter(|record| owner.is_none_or(|owner| record.owner == owner)).collect();
        let items: Vec<FileRecord> = matching.iter().skip(start).take(size).map(|&record| record.clone()).collect();
        let end = start.saturating_add(items.len());
        let next_token = (end < matching.len()).then(|| end.to_string());
        Ok(Page { items, next_token })
    }
}
