//! S3-compatible storage backend.
//!
//! This module provides a storage backend implementation for S3-compatible
//! services including AWS S3, Backblaze B2, Tigris (Fly.io), MinIO and others.
//!
//! # Credentials
//!
//! Credentials are provided explicitly via the configuration file (`key_id`
//! and `key_secret`).
//!
//! TODO: support `credentials: "profile:name"` in config to use AWS SDK
//! credential providers (`~/.aws/credentials`) instead of explicit keys.

use crate::backend::CHUNK_SIZE;
use crate::error::{Error, ErrorKind, Result};
use crate::{ObjectInfo, Progress, StorageBackend, progress::ProgressFn, validate_key};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig},
    error::DisplayErrorContext,
    presigning::PresigningConfig,
    primitives::{ByteStream, DateTime},
    types::{CompletedMultipartUpload, CompletedPart},
};
use exn::{OptionExt, ResultExt};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

/// Generous default for concurrent S3 requests.
const DEFAULT_CONCURRENT_REQUESTS: usize = 100;
/// Bodies larger than this are sent as a multipart upload.
const MULTIPART_THRESHOLD: usize = 8 * 1024 * 1024;
/// Size of each multipart part (S3 requires at least 5 MiB for all but the last).
const PART_SIZE: usize = 128 * CHUNK_SIZE;

/// S3-compatible storage backend.
///
/// Stores objects in an S3 bucket, optionally under a key prefix. All keys
/// are relative to the configured prefix (if any).
///
/// # Examples
///
/// ```no_run
/// use keepr_storage::backend::S3Backend;
///
/// # async fn example() {
/// let backend = S3Backend::new(
///     "my-storage",
///     "my-bucket",
///     Some("keepr/".to_string()),
///     "us-east-1",
///     None::<String>,
///     "access_key_id",
///     "secret_access_key",
/// ).await;
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct S3Backend {
    name: String,
    client: Client,
    bucket: String,
    prefix: Option<String>,
    /// Rate limiter for concurrent S3 requests.
    rate_limiter: Arc<Semaphore>,
}

impl S3Backend {
    /// Create a new S3 storage backend.
    ///
    /// # Arguments
    /// * `name` - A name for this backend (used in logging)
    /// * `bucket` - S3 bucket name
    /// * `prefix` - Optional key prefix (acts as virtual directory)
    /// * `region` - AWS region or provider-specific region (e.g., "us-west-004" for Backblaze)
    /// * `endpoint` - Custom endpoint URL for S3-compatible services
    /// * `key_id` - AWS/provider access key ID
    /// * `key_secret` - AWS/provider secret access key
    pub async fn new(
        name: impl Into<String>,
        bucket: impl Into<String>,
        prefix: Option<String>,
        region: impl Into<String>,
        endpoint: Option<impl Into<String>>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Result<Self> {
        let prefix = prefix.map(validate_key).transpose()?;
        let region = Region::new(region.into());
        let credentials = Credentials::new(key_id, key_secret, None, None, "keepr-config");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(region)
            // Configure retry policy with exponential backoff (1 initial + 3 retries)
            .retry_config(RetryConfig::standard().with_max_attempts(4))
            // Use path-style addressing for better compatibility with
            // S3-compatible services (Backblaze, MinIO, etc.)
            .force_path_style(true);
        // Set custom endpoint for non-AWS services
        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        Ok(Self {
            name: name.into(),
            client: Client::from_conf(config_builder.build()),
            bucket: bucket.into(),
            prefix,
            rate_limiter: Arc::new(Semaphore::new(DEFAULT_CONCURRENT_REQUESTS)),
        })
    }

    /// Construct the full S3 key from a relative key.
    fn full_key(&self, key: &str) -> Result<String> {
        Ok(join_prefix(self.prefix.as_deref(), &validate_key(key)?))
    }

    /// Acquire a rate limiter permit before making an S3 API call.
    async fn acquire_permit(&self) -> Result<OwnedSemaphorePermit> {
        // The semaphore is never closed, but don't panic over it.
        self.rate_limiter
            .clone()
            .acquire_owned()
            .await
            .or_raise(|| ErrorKind::BackendError("rate limiter closed".into()))
    }

    /// Convert AWS DateTime to OffsetDateTime.
    fn parse_datetime(dt: &DateTime) -> Result<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp_nanos(dt.as_nanos())
            .or_raise(|| ErrorKind::BackendError("S3 datetime out of range".to_string()))
    }

    async fn put_multipart(
        &self,
        full_key: &str,
        data: &[u8],
        content_type: Option<&str>,
        progress: &ProgressFn<'_>,
    ) -> Result<()> {
        let total = data.len() as u64;
        let upload = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(full_key)
            .set_content_type(content_type.map(str::to_string))
            .send()
            .await
            .map_err(network)?;
        let upload_id = upload.upload_id().ok_or_raise(|| ErrorKind::BackendError("missing upload id".into()))?;
        let mut parts = Vec::new();
        let mut transferred = 0;
        for (index, chunk) in data.chunks(PART_SIZE).enumerate() {
            let part_number = i32::try_from(index + 1).or_raise(|| ErrorKind::BackendError("too many parts".into()))?;
            let uploaded = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(full_key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(chunk.to_vec()))
                .send()
                .await;
            match uploaded {
                Ok(part) => parts.push(
                    CompletedPart::builder()
                        .set_e_tag(part.e_tag().map(str::to_string))
                        .part_number(part_number)
                        .build(),
                ),
                Err(e) => {
                    // Leave no orphaned parts behind; an abort failure is not
                    // worth masking the upload error over.
                    _ = self
                        .client
                        .abort_multipart_upload()
                        .bucket(&self.bucket)
                        .key(full_key)
                        .upload_id(upload_id)
                        .send()
                        .await;
                    return Err(network(e));
                },
            }
            transferred += chunk.len() as u64;
            progress(Progress::new(transferred, total));
        }
        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(full_key)
            .upload_id(upload_id)
            .multipart_upload(CompletedMultipartUpload::builder().set_parts(Some(parts)).build())
            .send()
            .await
            .map_err(network)?;
        Ok(())
    }
}

/// Prefix a (validated) key with the configured bucket prefix.
fn join_prefix(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), key),
        None => key.to_string(),
    }
}

fn network<E: std::error::Error>(err: E) -> Error {
    exn::Exn::from(ErrorKind::Network(DisplayErrorContext(err).to_string()))
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, key: &str, data: &[u8], content_type: Option<&str>, progress: &ProgressFn<'_>) -> Result<()> {
        let full_key = self.full_key(key)?;
        let _permit = self.acquire_permit().await?;
        let total = data.len() as u64;
        progress(Progress::new(0, total));
        if data.len() > MULTIPART_THRESHOLD {
            self.put_multipart(&full_key, data, content_type, progress).await?;
        } else {
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(&full_key)
                .set_content_type(content_type.map(str::to_string))
                .body(ByteStream::from(data.to_vec()))
                .send()
                .await
                .map_err(network)?;
            progress(Progress::new(total, total));
        }
        tracing::debug!(backend = self.name(), key = %full_key, bytes = total, "Stored object");
        Ok(())
    }

    async fn signed_url(&self, key: &str, expires_in: Duration) -> Result<Url> {
        let full_key = self.full_key(key)?;
        // Presigning is a local computation, no permit needed.
        let config = PresigningConfig::expires_in(expires_in)
            .or_raise(|| ErrorKind::BackendError(format!("invalid URL expiry: {}s", expires_in.as_secs())))?;
        let request =
            self.client.get_object().bucket(&self.bucket).key(&full_key).presigned(config).await.map_err(network)?;
        Url::parse(request.uri()).or_raise(|| ErrorKind::BackendError("presigned URL is not a valid URL".into()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let full_key = self.full_key(key)?;
        let _permit = self.acquire_permit().await?;
        // S3 deletes are idempotent: a missing key is not reported.
        self.client.delete_object().bucket(&self.bucket).key(&full_key).send().await.map_err(network)?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        match self.stat(key).await {
            Ok(_) => Ok(true),
            Err(e) if matches!(&*e, ErrorKind::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn stat(&self, key: &str) -> Result<ObjectInfo> {
        let full_key = self.full_key(key)?;
        let _permit = self.acquire_permit().await?;
        let head = match self.client.head_object().bucket(&self.bucket).key(&full_key).send().await {
            Ok(head) => head,
            Err(e) if e.as_service_error().is_some_and(|e| e.is_not_found()) => {
                exn::bail!(ErrorKind::NotFound(key.to_string()))
            },
            Err(e) => return Err(network(e)),
        };
        let modified = match head.last_modified() {
            Some(dt) => Self::parse_datetime(dt)?,
            None => OffsetDateTime::UNIX_EPOCH,
        };
        let size = head.content_length().and_then(|len| u64::try_from(len).ok()).unwrap_or(0);
        Ok(ObjectInfo::new(validate_key(key)?, size, modified)
            .with_content_type(head.content_type().map(str::to_string)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, "Documents/1-report.pdf", "Documents/1-report.pdf")]
    #[case(Some("keepr"), "Documents/1-report.pdf", "keepr/Documents/1-report.pdf")]
    #[case(Some("keepr/"), "Documents/1-report.pdf", "keepr/Documents/1-report.pdf")]
    fn test_join_prefix(#[case] prefix: Option<&str>, #[case] key: &str, #[case] expected: &str) {
        assert_eq!(join_prefix(prefix, key), expected);
    }

    #[test]
    fn test_part_size_meets_s3_minimum() {
        assert!(PART_SIZE >= 5 * 1024 * 1024);
        assert!(MULTIPART_THRESHOLD >= PART_SIZE);
    }

    #[tokio::test]
    async fn test_signed_url_is_presigned() {
        let backend = S3Backend::new(
            "test",
            "bucket",
            Some("keepr".to_string()),
            "us-east-1",
            Some("https://s3.example.com"),
            "AKIDEXAMPLE",
            "secret",
        )
        .await
        .unwrap();
        let url = backend.signed_url("Images/1-cat.png", Duration::from_secs(3600)).await.unwrap();
        assert_eq!(url.host_str(), Some("s3.example.com"));
        assert_eq!(url.path(), "/bucket/keepr/Images/1-cat.png");
        assert!(url.query_pairs().any(|(k, v)| k == "X-Amz-Expires" && v == "3600"));
    }
}
