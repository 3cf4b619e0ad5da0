//! Turning configuration and the stored session into live backends.

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use keepr_api::backend::GraphQlBackend;
use keepr_api::{ApiHandle, Credentials, SessionStore, StaticIdentity};
use keepr_config::{Config, StorageConfig};
use keepr_library::{DEFAULT_KEY_TEMPLATE, KeyGenerator, Library};
#[cfg(feature = "s3")]
use keepr_storage::backend::S3Backend;
use keepr_storage::BackendHandle;
use keepr_storage::backend::LocalBackend;
use std::path::Path;
use std::sync::Arc;

pub struct Context {
    pub config: Config,
    pub sessions: SessionStore,
}

impl Context {
    pub fn load(config: Option<&Path>) -> Result<Self> {
        let config = Config::load(config).or_raise(|| ErrorKind::Config)?;
        let sessions = SessionStore::new(keepr_config::session_path().or_raise(|| ErrorKind::Config)?);
        Ok(Self { config, sessions })
    }

    pub fn api(&self, credentials: &Credentials) -> Result<ApiHandle> {
        let endpoint = self.config.api.endpoint.clone().ok_or_raise(|| ErrorKind::MissingEndpoint)?;
        let backend: ApiHandle =
            Arc::new(GraphQlBackend::new("graphql", endpoint, credentials).or_raise(|| ErrorKind::Backend("graphql"))?);
        tracing::debug!(backend = backend.name(), "Record API ready");
        Ok(backend)
    }

    pub async fn storage(&self) -> Result<BackendHandle> {
        let backend: BackendHandle = match &self.config.storage {
            StorageConfig::Local { root } => {
                let root = std::path::absolute(root).or_raise(|| ErrorKind::Backend("local"))?;
                Arc::new(LocalBackend::new("local", root).or_raise(|| ErrorKind::Backend("local"))?)
            },
            #[cfg(feature = "s3")]
            StorageConfig::S3 { bucket, region, endpoint, prefix, key_id, key_secret } => Arc::new(
                S3Backend::new(
                    "s3",
                    bucket.clone(),
                    prefix.clone(),
                    region.clone(),
                    endpoint.clone(),
                    key_id.clone(),
                    key_secret.clone(),
                )
                .await
                .or_raise(|| ErrorKind::Backend("s3"))?,
            ),
            #[cfg(not(feature = "s3"))]
            StorageConfig::S3 { .. } => exn::bail!(ErrorKind::Unsupported("s3")),
        };
        tracing::debug!(backend = backend.name(), "Storage backend ready");
        Ok(backend)
    }

    fn keys(&self) -> Result<KeyGenerator> {
        let template = self.config.upload.key_template.as_deref().unwrap_or(DEFAULT_KEY_TEMPLATE);
        template.parse::<KeyGenerator>().or_raise(|| ErrorKind::Config)
    }

    /// Open the signed-in user's library, fetching their file list.
    pub async fn library(&self) -> Result<Library> {
        let identity = StaticIdentity::from_store(self.sessions.clone())
            .await
            .or_raise(|| ErrorKind::Session)?
            .ok_or_raise(|| ErrorKind::NotSignedIn)?;
        let credentials = identity.credentials().await.ok_or_raise(|| ErrorKind::NotSignedIn)?;
        let api = self.api(&credentials)?;
        let storage = self.storage().await?;
        Library::new(storage, api, Arc::new(identity), self.keys()?)
            .with_url_expiry(self.config.upload.url_expiry())
            .with_page_size(self.config.api.page_size)
            .open()
            .await
            .or_raise(|| ErrorKind::Library)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keepr_library::{Category, KeyInput};
    use tempfile::TempDir;
    use time::macros::datetime;

    fn context(key_template: Option<&str>) -> (TempDir, Context) {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.upload.key_template = key_template.map(str::to_string);
        let sessions = SessionStore::new(dir.path().join("session.json"));
        (dir, Context { config, sessions })
    }

    #[test]
    fn test_keys_default_template() {
        let (_dir, context) = context(None);
        let input = KeyInput::new("report.PDF", Category::Documents, "alice", datetime!(2024-03-01 12:00 UTC));
        let key = context.keys().unwrap().generate(&input).unwrap();
        assert!(key.starts_with("Documents/"));
        assert!(key.ends_with("-report.PDF"));
    }

    #[test]
    fn test_keys_configured_template() {
        let (_dir, context) = context(Some("{{ owner }}/{{ name }}"));
        let input = KeyInput::new("cat.png", Category::Images, "alice", datetime!(2024-03-01 12:00 UTC));
        assert_eq!(context.keys().unwrap().generate(&input).unwrap(), "alice/cat.png");
    }

    #[test]
    fn test_keys_invalid_template() {
        let (_dir, context) = context(Some("{{ category"));
        let Err(err) = context.keys() else { panic!("template should not compile") };
        assert!(matches!(&*err, ErrorKind::Config));
    }
}
