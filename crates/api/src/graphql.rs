//! GraphQL documents and response envelopes for the file schema.

use crate::error::{ErrorKind, Result};
use crate::models::{FileRecord, Page};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

pub(crate) const CREATE_FILE: &str = r#"
mutation CreateFile($input: CreateFileInput!) {
  createFile(input: $input) {
    id name size type category s3Key url uploadDate owner createdAt updatedAt
  }
}"#;

pub(crate) const DELETE_FILE: &str = r#"
mutation DeleteFile($input: DeleteFileInput!) {
  deleteFile(input: $input) { id }
}"#;

pub(crate) const GET_FILE: &str = r#"
query GetFile($id: ID!) {
  getFile(id: $id) {
    id name size type category s3Key url uploadDate owner createdAt updatedAt
  }
}"#;

pub(crate) const LIST_FILES: &str = r#"
query ListFiles($filter: ModelFileFilterInput, $limit: Int, $nextToken: String) {
  listFiles(filter: $filter, limit: $limit, nextToken: $nextToken) {
    items { id name size type category s3Key url uploadDate owner createdAt updatedAt }
    nextToken
  }
}"#;

/// Build the JSON body of a GraphQL request.
pub(crate) fn request(operation: &str, query: &str, variables: Value) -> Value {
    json!({
        "operationName": operation,
        "query": query,
        "variables": variables,
    })
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphQlError {
    message: String,
    #[serde(default)]
    error_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateFileData {
    pub create_file: FileRecord,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeleteFileData {
    pub delete_file: Option<Deleted>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Deleted {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GetFileData {
    pub get_file: Option<FileRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListFilesData {
    pub list_files: Page<FileRecord>,
}

/// Unwrap a GraphQL response body into its `data`.
///
/// Any entry in `errors` fails the whole operation, even when partial data
/// came back alongside it.
pub(crate) fn parse<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let envelope: Envelope<T> = serde_json::from_slice(body).map_err(|e| ErrorKind::InvalidResponse(e.to_string()))?;
    if !envelope.errors.is_empty() {
        if envelope.errors.iter().any(|e| e.error_type.as_deref().is_some_and(|t| t.contains("Unauthorized"))) {
            exn::bail!(ErrorKind::Unauthorized);
        }
        let messages: Vec<&str> = envelope.errors.iter().map(|e| e.message.as_str()).collect();
        exn::bail!(ErrorKind::Rejected(messages.join("; ")));
    }
    Ok(envelope.data.ok_or_else(|| ErrorKind::InvalidResponse("response has no data".to_string()))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let body = request("GetFile", GET_FILE, json!({ "id": "abc" }));
        assert_eq!(body["operationName"], "GetFile");
        assert_eq!(body["variables"]["id"], "abc");
        assert!(body["query"].as_str().unwrap().contains("getFile(id: $id)"));
    }

    #[test]
    fn test_parse_list() {
        let body = br#"{"data": {"listFiles": {"items": [], "nextToken": "tok"}}}"#;
        let data: ListFilesData = parse(body).unwrap();
        assert!(data.list_files.items.is_empty());
        assert_eq!(data.list_files.next_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_parse_errors_are_rejections() {
        let body = br#"{"data": null, "errors": [
            {"message": "The conditional request failed", "errorType": "DynamoDB:ConditionalCheckFailedException"},
            {"message": "second"}
        ]}"#;
        let err = parse::<DeleteFileData>(body).unwrap_err();
        match &*err {
            ErrorKind::Rejected(message) => assert_eq!(message, "The conditional request failed; second"),
            other => panic!("unexpected error kind: {other:?}"),
        }
    }

    #[test]
    fn test_parse_unauthorized() {
        let body = br#"{"errors": [{"message": "Not Authorized to access listFiles", "errorType": "Unauthorized"}]}"#;
        let err = parse::<ListFilesData>(body).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Unauthorized));
    }

    #[test]
    fn test_parse_garbage() {
        let err = parse::<ListFilesData>(b"<html>502 Bad Gateway</html>").unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidResponse(_)));
        let err = parse::<ListFilesData>(br#"{"data": null}"#).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidResponse(_)));
    }
}
