use crate::category::Category;
use crate::size::format_size;
use keepr_api::FileRecord;
use std::ops::Deref;
use url::Url;

/// A file as shown to the user: its stored record, the category it is filed
/// under, and a freshly signed download URL if one could be obtained.
///
/// Dereferences to the underlying [`FileRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    record: FileRecord,
    resolved: Category,
    signed_url: Option<Url>,
}
impl File {
    pub fn new(record: FileRecord, url: Option<Url>) -> Self {
        let resolved = Category::from_label(&record.category);
        Self { record, resolved, signed_url: url }
    }

    pub fn record(&self) -> &FileRecord {
        &self.record
    }

    pub fn category(&self) -> Category {
        self.resolved
    }

    /// Time-limited download URL; `None` if signing failed during refresh.
    pub fn url(&self) -> Option<&Url> {
        self.signed_url.as_ref()
    }

    pub fn display_size(&self) -> String {
        format_size(self.record.size)
    }
}
impl Deref for File {
    type Target = FileRecord;

    fn deref(&self) -> &Self::Target {
        &self.record
    }
}

/// A category together with how many files are currently in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Folder {
    pub category: Category,
    pub count: usize,
}
