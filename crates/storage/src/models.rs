//! Storage models.

use time::OffsetDateTime;

/// Object metadata returned by storage backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Normalized key relative to the bucket root
    pub key: String,
    /// Object size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: OffsetDateTime,
    /// Content type recorded at upload, if the backend keeps one
    pub content_type: Option<String>,
}
impl ObjectInfo {
    pub fn new(key: impl Into<String>, size: u64, modified: OffsetDateTime) -> Self {
        Self {
            key: key.into(),
            size,
            modified,
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<Option<String>>) -> Self {
        self.content_type = content_type.into();
        self
    }
}
