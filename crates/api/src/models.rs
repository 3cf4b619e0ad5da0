//! File metadata records as the API stores them.
//!
//! Field names on the wire follow the GraphQL schema (`s3Key`, `uploadDate`,
//! `type`...), not Rust conventions.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A stored file's metadata record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// MIME type reported when the file was uploaded
    #[serde(rename = "type", default)]
    pub mime_type: Option<String>,
    /// Category label, as computed at upload time
    pub category: String,
    /// Key of the object in storage
    #[serde(rename = "s3Key")]
    pub storage_key: String,
    /// URL persisted at upload time. It has almost certainly expired by the
    /// time anyone reads it back; sign a fresh one instead.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub upload_date: OffsetDateTime,
    #[serde(default)]
    pub owner: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

/// Input for creating a [`FileRecord`]; the API assigns the identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFileRecord {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: Option<String>,
    pub category: String,
    #[serde(rename = "s3Key")]
    pub storage_key: String,
    pub url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub upload_date: OffsetDateTime,
    pub owner: String,
}
impl NewFileRecord {
    /// The record this input becomes once the API has assigned `id`.
    pub fn into_record(self, id: impl Into<String>) -> FileRecord {
        FileRecord {
            id: id.into(),
            name: self.name,
            size: self.size,
            mime_type: self.mime_type,
            category: self.category,
            storage_key: self.storage_key,
            url: self.url,
            upload_date: self.upload_date,
            owner: self.owner,
            created_at: None,
            updated_at: None,
        }
    }
}

/// One page of a list query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Opaque continuation token; `None` on the last page.
    #[serde(default)]
    pub next_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_record_from_schema_json() {
        let json = r#"{
            "id": "0b7e1c2a",
            "name": "report.PDF",
            "size": 1048576,
            "type": "application/pdf",
            "category": "Documents",
            "s3Key": "Documents/1700000000000-report.PDF",
            "url": null,
            "uploadDate": "2023-11-14T22:13:20.000Z",
            "owner": "alice",
            "createdAt": "2023-11-14T22:13:21.123Z",
            "updatedAt": "2023-11-14T22:13:21.123Z",
            "__typename": "File"
        }"#;
        let record: FileRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.mime_type.as_deref(), Some("application/pdf"));
        assert_eq!(record.storage_key, "Documents/1700000000000-report.PDF");
        assert_eq!(record.upload_date, datetime!(2023-11-14 22:13:20 UTC));
        assert!(record.url.is_none());
        assert!(record.created_at.is_some());
    }

    #[test]
    fn test_record_tolerates_missing_optional_fields() {
        let json = r#"{
            "id": "1", "name": "a", "size": 0, "category": "Others",
            "s3Key": "Others/1-a", "uploadDate": "2024-01-01T00:00:00Z"
        }"#;
        let record: FileRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.mime_type, None);
        assert_eq!(record.owner, "");
        assert_eq!(record.created_at, None);
    }

    #[test]
    fn test_new_record_uses_schema_names() {
        let input = NewFileRecord {
            name: "cat.png".into(),
            size: 3,
            mime_type: Some("image/png".into()),
            category: "Images".into(),
            storage_key: "Images/1-cat.png".into(),
            url: None,
            upload_date: datetime!(2024-01-01 00:00 UTC),
            owner: "alice".into(),
        };
        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(value["s3Key"], "Images/1-cat.png");
        assert_eq!(value["type"], "image/png");
        assert_eq!(value["uploadDate"], "2024-01-01T00:00:00Z");
        assert!(value.get("storageKey").is_none());
    }

    #[test]
    fn test_page_without_token() {
        let page: Page<u32> = serde_json::from_str(r#"{"items": [1, 2]}"#).unwrap();
        assert_eq!(page.items, vec![1, 2]);
        assert_eq!(page.next_token, None);
    }
}
