//! Who is signed in, and how to stop them being signed in.
//!
//! Session issuance belongs to the hosted identity provider; this module only
//! remembers the outcome. A [`Session`] holds the username and the
//! credentials the record API should be called with, and [`SessionStore`]
//! keeps one on disk between invocations.

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Credentials sent with every record API request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Credentials {
    /// Shared API key, sent as `x-api-key`.
    ApiKey { key: String },
    /// Token issued by the identity provider, sent as `Authorization`.
    Token { token: String },
}
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey { .. } => f.debug_struct("ApiKey").field("key", &"<redacted>").finish(),
            Self::Token { .. } => f.debug_struct("Token").field("token", &"<redacted>").finish(),
        }
    }
}

/// An authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub credentials: Credentials,
}
impl Session {
    pub fn new(username: impl Into<String>, credentials: Credentials) -> Self {
        Self { username: username.into(), credentials }
    }
}

/// The identity provider as the rest of the client sees it.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Username of the signed-in principal, if anyone is signed in.
    async fn username(&self) -> Option<String>;

    /// End the current session. Signing out twice is not an error.
    async fn sign_out(&self) -> Result<()>;
}

/// JSON file holding the current [`Session`].
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}
impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored session; `None` if nobody has signed in.
    pub async fn load(&self) -> Result<Option<Session>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).or_raise(|| ErrorKind::Session),
        };
        let session = serde_json::from_slice(&bytes).or_raise(|| ErrorKind::Session)?;
        Ok(Some(session))
    }

    /// Write `session`, replacing whatever was stored before.
    pub async fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Session)?;
        }
        let json = serde_json::to_vec_pretty(session).or_raise(|| ErrorKind::Session)?;
        tokio::fs::write(&self.path, json).await.or_raise(|| ErrorKind::Session)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            tokio::fs::set_permissions(&self.path, permissions).await.or_raise(|| ErrorKind::Session)?;
        }
        tracing::debug!(path = %self.path.display(), username = %session.username, "Saved session");
        Ok(())
    }

    /// Remove the stored session, if any.
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).or_raise(|| ErrorKind::Session),
        }
    }
}

/// Identity backed by a session held in memory, optionally mirrored to a
/// [`SessionStore`] so that signing out also forgets it on disk.
pub struct StaticIdentity {
    session: RwLock<Option<Session>>,
    store: Option<SessionStore>,
}
impl StaticIdentity {
    pub fn new(session: Session) -> Self {
        Self { session: RwLock::new(Some(session)), store: None }
    }

    /// Sign out through `store` as well as in memory.
    pub fn with_store(mut self, store: SessionStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Load the session persisted in `store`, if there is one.
    pub async fn from_store(store: SessionStore) -> Result<Option<Self>> {
        Ok(store.load().await?.map(|session| Self::new(session).with_store(store)))
    }

    /// Credentials of the current session, if still signed in.
    pub async fn credentials(&self) -> Option<Credentials> {
        self.session.read().await.as_ref().map(|session| session.credentials.clone())
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn username(&self) -> Option<String> {
        self.session.read().await.as_ref().map(|session| session.username.clone())
    }

    async fn sign_out(&self) -> Result<()> {
        let previous = self.session.write().await.take();
        if let Some(store) = &self.store {
            store.clear().await?;
        }
        if let Some(session) = previous {
            tracing::info!(username = %session.username, "Signed out");
        }
        Ok(())
    }
}
