//! Configuration for keepr.
//!
//! Values are layered with [figment], later layers overriding earlier ones:
//!
//! 1. Built-in defaults ([`Config::default`]).
//! 2. A configuration file: either the one passed explicitly, or every
//!    `keepr.{toml,yaml,yml,json}` found in the platform config directory.
//! 3. Environment variables prefixed `KEEPR_`, with `__` separating nested
//!    keys (`KEEPR_STORAGE__BUCKET=photos` sets `storage.bucket`).
//!
//! ```toml
//! [storage]
//! backend = "s3"
//! bucket = "keepr-files"
//! region = "eu-west-1"
//! prefix = "public"
//! key_id = "AKIA..."
//! # key_secret is best left to KEEPR_STORAGE__KEY_SECRET
//!
//! [api]
//! endpoint = "https://example.appsync-api.eu-west-1.amazonaws.com/graphql"
//!
//! [upload]
//! key_template = "{{ category }}/{{ date }}/{{ timestamp }}-{{ name|slug }}"
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use keepr_library::{SortKey, ViewMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Prefix of environment variables read as configuration.
pub const ENV_PREFIX: &str = "KEEPR_";
/// Longest URL expiry S3 will sign (seven days).
pub const MAX_URL_EXPIRY_SECS: u64 = 7 * 24 * 60 * 60;

const FILE_STEM: &str = "keepr";
const FILE_EXTENSIONS: [&str; 4] = ["toml", "yaml", "yml", "json"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub upload: UploadConfig,
    pub view: ViewConfig,
}

/// Where file contents live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    /// A directory on this machine. Relative roots resolve against the
    /// working directory.
    Local { root: PathBuf },
    /// An S3 (or S3-compatible) bucket.
    S3 {
        bucket: String,
        region: String,
        #[serde(default)]
        endpoint: Option<String>,
        #[serde(default)]
        prefix: Option<String>,
        key_id: String,
        key_secret: String,
    },
}
impl Default for StorageConfig {
    fn default() -> Self {
        let root = project_dirs()
            .map(|dirs| dirs.data_dir().join("objects"))
            .unwrap_or_else(|_| PathBuf::from(".keepr/objects"));
        Self::Local { root }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// GraphQL endpoint of the records API.
    pub endpoint: Option<Url>,
    /// Records requested per page while listing; the API decides when unset.
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Storage key template; see `keepr_library::KeyGenerator`.
    pub key_template: Option<String>,
    /// Lifetime of signed URLs, in seconds.
    pub url_expiry_secs: u64,
}
impl Default for UploadConfig {
    fn default() -> Self {
        Self { key_template: None, url_expiry_secs: 3600 }
    }
}
impl UploadConfig {
    pub fn url_expiry(&self) -> Duration {
        Duration::from_secs(self.url_expiry_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub mode: ViewMode,
    /// Sort applied to listings; API order when unset.
    pub sort: Option<SortKey>,
    pub descending: bool,
}

impl Config {
    /// Load configuration from `explicit` if given, otherwise from the
    /// platform config directory, then apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let files = match explicit {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::NotFound(path.display().to_string()));
                }
                vec![path.to_path_buf()]
            },
            None => default_files(),
        };
        Self::from_files(&files)
    }

    /// Load configuration from `files` (missing ones are skipped) plus
    /// environment overrides.
    pub fn from_files(files: &[PathBuf]) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        for file in files {
            figment = merge_file(figment, file)?;
        }
        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extract and validate configuration from an arbitrary figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_URL_EXPIRY_SECS).contains(&self.upload.url_expiry_secs) {
            exn::bail!(ErrorKind::Invalid(format!(
                "upload.url_expiry_secs must be between 1 and {MAX_URL_EXPIRY_SECS}"
            )));
        }
        if let StorageConfig::S3 { bucket, region, .. } = &self.storage {
            if bucket.trim().is_empty() {
                exn::bail!(ErrorKind::Invalid("storage.bucket must not be empty".to_string()));
            }
            if region.trim().is_empty() {
                exn::bail!(ErrorKind::Invalid("storage.region must not be empty".to_string()));
            }
        }
        if self.api.page_size == Some(0) {
            exn::bail!(ErrorKind::Invalid("api.page_size must be positive".to_string()));
        }
        Ok(())
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
    let figment = match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.display().to_string())),
    };
    tracing::debug!(path = %path.display(), "Merged configuration file");
    Ok(figment)
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", FILE_STEM).ok_or_raise(|| ErrorKind::NoHomeDirectory)
}

/// Candidate configuration files in the platform config directory.
fn default_files() -> Vec<PathBuf> {
    match project_dirs() {
        Ok(dirs) => FILE_EXTENSIONS
            .iter()
            .map(|ext| dirs.config_dir().join(format!("{FILE_STEM}.{ext}")))
            .filter(|path| path.is_file())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Where the signed-in session is remembered.
pub fn session_path() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().join("session.json"))
}
