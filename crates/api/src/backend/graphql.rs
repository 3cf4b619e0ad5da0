//! GraphQL-over-HTTP record backend.
//!
//! Speaks the generated `File` model schema of a hosted GraphQL service
//! (AppSync-style): one POST per operation, authenticated with either an API
//! key or the signed-in user's token.

use crate::backend::ApiBackend;
use crate::error::{ErrorKind, Result};
use crate::graphql::{self, CreateFileData, DeleteFileData, GetFileData, ListFilesData};
use crate::identity::Credentials;
use crate::models::{FileRecord, NewFileRecord, Page};
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use url::Url;

const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Record backend talking to a GraphQL endpoint.
#[derive(Debug, Clone)]
pub struct GraphQlBackend {
    name: String,
    client: Client,
    endpoint: Url,
}

impl GraphQlBackend {
    /// Create a backend for `endpoint`, authenticating every request with
    /// `credentials`.
    pub fn new(name: impl Into<String>, endpoint: Url, credentials: &Credentials) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let (header, secret) = match credentials {
            Credentials::ApiKey { key } => (API_KEY_HEADER, key),
            // The hosted API expects the bare token, no `Bearer` scheme.
            Credentials::Token { token } => (AUTHORIZATION, token),
        };
        let mut value = HeaderValue::from_str(secret).or_raise(|| ErrorKind::Unauthorized)?;
        value.set_sensitive(true);
        headers.insert(header, value);
        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .or_raise(|| ErrorKind::Network)?;
        Ok(Self { name: name.into(), client, endpoint })
    }

    /// Send one GraphQL operation and decode its `data`.
    async fn execute<T: DeserializeOwned>(&self, operation: &str, query: &str, variables: Value) -> Result<T> {
        tracing::debug!(backend = self.name(), operation, "Sending GraphQL request");
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&graphql::request(operation, query, variables))
            .send()
            .await
            .or_raise(|| ErrorKind::Network)?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            exn::bail!(ErrorKind::Unauthorized);
        }
        let body = response.bytes().await.or_raise(|| ErrorKind::Network)?;
        if !status.is_success() {
            exn::bail!(ErrorKind::InvalidResponse(format!("HTTP {status}")));
        }
        graphql::parse(&body)
    }
}

#[async_trait]
impl ApiBackend for GraphQlBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create_file(&self, input: &NewFileRecord) -> Result<FileRecord> {
        let data: CreateFileData = self.execute("CreateFile", graphql::CREATE_FILE, json!({ "input": input })).await?;
        Ok(data.create_file)
    }

    async fn delete_file(&self, id: &str) -> Result<()> {
        let data: DeleteFileData =
            self.execute("DeleteFile", graphql::DELETE_FILE, json!({ "input": { "id": id } })).await?;
        match data.delete_file {
            Some(deleted) => {
                tracing::debug!(backend = self.name(), id = deleted.id, "Deleted record");
                Ok(())
            },
            None => exn::bail!(ErrorKind::NotFound(id.to_string())),
        }
    }

    async fn get_file(&self, id: &str) -> Result<Option<FileRecord>> {
        let data: GetFileData = self.execute("GetFile", graphql::GET_FILE, json!({ "id": id })).await?;
        Ok(data.get_file)
    }

    async fn list_files(
        &self,
        owner: Option<&str>,
        limit: Option<u32>,
        next_token: Option<&str>,
    ) -> Result<Page<FileRecord>> {
        let filter = owner.map(|owner| json!({ "owner": { "eq": owner } }));
        let variables = json!({ "filter": filter, "limit": limit, "nextToken": next_token });
        let data: ListFilesData = self.execute("ListFiles", graphql::LIST_FILES, variables).await?;
        Ok(data.list_files)
    }
}
