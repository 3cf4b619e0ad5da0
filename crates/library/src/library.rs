//! The file list and everything that changes it.

use crate::category::Category;
use crate::error::{Error, ErrorKind, Result};
use crate::keys::{KeyGenerator, KeyInput};
use crate::models::{File, Folder};
use crate::view::{self, View};
use exn::ResultExt;
use futures::future::join_all;
use keepr_api::{ApiHandle, FileRecord, IdentityHandle, NewFileRecord};
use keepr_storage::error::ErrorKind as StorageErrorKind;
use keepr_storage::{BackendHandle, Progress};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::instrument;

/// How long signed download URLs stay valid unless configured otherwise.
pub const DEFAULT_URL_EXPIRY: Duration = Duration::from_secs(3600);

/// A local file waiting to be uploaded.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}
impl Upload {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self { name: name.into(), data: data.into(), content_type: None }
    }

    pub fn with_content_type(mut self, content_type: impl Into<Option<String>>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

/// Progress events emitted by [`Library::upload`].
///
/// For each file, in submission order: [`Started`](Self::Started) once, zero
/// or more [`Progress`](Self::Progress), then exactly one of
/// [`Uploaded`](Self::Uploaded) or [`Failed`](Self::Failed).
#[derive(Debug)]
pub enum UploadEvent<'a> {
    Started { name: &'a str, key: &'a str },
    /// Whole percent of the file's bytes sent to storage.
    Progress { name: &'a str, percent: u8 },
    Uploaded(&'a File),
    Failed { name: &'a str, error: &'a Error },
}

/// Outcome of a batch of uploads.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub uploaded: Vec<File>,
    pub failed: Vec<(String, Error)>,
}
impl UploadReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Asks the user whether a file should really be deleted.
pub trait Confirm {
    fn confirm(&self, file: &File) -> bool;
}
impl<F: Fn(&File) -> bool> Confirm for F {
    fn confirm(&self, file: &File) -> bool {
        self(file)
    }
}

/// Outcome of [`Library::delete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deletion {
    /// Removed from storage, the API and the local list.
    Deleted(File),
    /// The user declined; nothing was touched.
    Cancelled,
}

/// The signed-in user's files, and the backends they live in.
///
/// The in-memory list is replaced wholesale by every successful
/// [`refresh`](Self::refresh) and is otherwise only changed by a successful
/// [`delete`](Self::delete). Mutating operations take `&mut self`, so a
/// `Library` needs no locking of its own.
pub struct Library {
    storage: BackendHandle,
    api: ApiHandle,
    identity: IdentityHandle,
    keys: KeyGenerator,
    url_expiry: Duration,
    page_size: Option<u32>,
    files: Vec<File>,
}

impl Library {
    pub fn new(storage: BackendHandle, api: ApiHandle, identity: IdentityHandle, keys: KeyGenerator) -> Self {
        Self { storage, api, identity, keys, url_expiry: DEFAULT_URL_EXPIRY, page_size: None, files: Vec::new() }
    }

    pub fn with_url_expiry(mut self, expiry: Duration) -> Self {
        self.url_expiry = expiry;
        self
    }

    /// Ask the API for at most `size` records per page while listing.
    pub fn with_page_size(mut self, size: impl Into<Option<u32>>) -> Self {
        self.page_size = size.into();
        self
    }

    /// Perform the initial fetch.
    pub async fn open(mut self) -> Result<Self> {
        self.refresh().await?;
        Ok(self)
    }

    /// All files, in the order the API returned them.
    pub fn files(&self) -> &[File] {
        &self.files
    }

    pub fn view(&self, view: &View) -> Vec<&File> {
        view.apply(&self.files)
    }

    /// Non-empty categories with their file counts. The "all files" total is
    /// `files().len()`.
    pub fn folders(&self) -> Vec<Folder> {
        view::folders(&self.files)
    }

    /// Look up a file in the current list by its identifier.
    pub fn get(&self, id: &str) -> Option<&File> {
        self.files.iter().find(|file| file.id == id)
    }

    pub async fn username(&self) -> Option<String> {
        self.identity.username().await
    }

    /// End the session and forget every file it could see.
    pub async fn sign_out(&mut self) -> Result<()> {
        self.identity.sign_out().await.or_raise(|| ErrorKind::Unauthenticated)?;
        self.files.clear();
        Ok(())
    }

    async fn owner(&self) -> Result<String> {
        self.identity.username().await.ok_or_else(|| Error::from(ErrorKind::Unauthenticated))
    }

    /// Re-fetch every record the user owns and sign a download URL for each.
    ///
    /// URLs are signed concurrently. A file whose URL cannot be signed is kept
    /// without one. If listing fails, the current list is left as it was.
    #[instrument(skip_all)]
    pub async fn refresh(&mut self) -> Result<()> {
        let owner = self.owner().await?;
        let records = self.list_all(&owner).await?;
        let files = join_all(records.into_iter().map(|record| self.resolve(record))).await;
        tracing::info!(count = files.len(), "Refreshed file list");
        self.files = files;
        Ok(())
    }

    /// Follow `nextToken` until the API reports the last page.
    async fn list_all(&self, owner: &str) -> Result<Vec<FileRecord>> {
        let mut records = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self
                .api
                .list_files(Some(owner), self.page_size, token.as_deref())
                .await
                .or_raise(|| ErrorKind::Listing)?;
            records.extend(page.items);
            match page.next_token {
                Some(next) if token.as_ref() != Some(&next) => token = Some(next),
                Some(next) => {
                    tracing::warn!(token = %next, "API repeated a page token, stopping");
                    break;
                },
                None => break,
            }
        }
        Ok(records)
    }

    async fn resolve(&self, record: FileRecord) -> File {
        match self.storage.signed_url(&record.storage_key, self.url_expiry).await {
            Ok(url) => File::new(record, Some(url)),
            Err(error) => {
                tracing::warn!(name = %record.name, key = %record.storage_key, error = %error, "Could not sign URL");
                File::new(record, None)
            },
        }
    }

    /// Upload `uploads` one at a time, in order.
    ///
    /// Each file is written to storage, given a signed URL and recorded in the
    /// API, after which the list is refreshed. A failure at any step abandons
    /// that file only; later files are still attempted and earlier ones stay.
    #[instrument(skip_all)]
    pub async fn upload<F>(&mut self, uploads: impl IntoIterator<Item = Upload>, on_event: F) -> Result<UploadReport>
    where
        F: Fn(UploadEvent<'_>) + Send + Sync,
    {
        let owner = self.owner().await?;
        let mut report = UploadReport::default();
        for upload in uploads {
            match self.upload_one(&owner, &upload, &on_event).await {
                Ok(file) => {
                    tracing::info!(name = %file.name, key = %file.storage_key, "Uploaded file");
                    on_event(UploadEvent::Uploaded(&file));
                    if let Err(error) = self.refresh().await {
                        // The upload itself stands; show it until the next successful refresh.
                        tracing::warn!(error = %error, "Could not refresh after upload");
                        self.files.push(file.clone());
                    }
                    report.uploaded.push(file);
                },
                Err(error) => {
                    tracing::warn!(name = %upload.name, error = %error, "Upload failed");
                    on_event(UploadEvent::Failed { name: &upload.name, error: &error });
                    report.failed.push((upload.name, error));
                },
            }
        }
        Ok(report)
    }

    async fn upload_one<F>(&self, owner: &str, upload: &Upload, on_event: &F) -> Result<File>
    where
        F: Fn(UploadEvent<'_>) + Send + Sync,
    {
        let category = Category::classify(&upload.name);
        let now = OffsetDateTime::now_utc();
        let key = self.keys.generate(&KeyInput::new(&upload.name, category, owner, now))?;
        on_event(UploadEvent::Started { name: &upload.name, key: &key });

        let progress = |progress: Progress| {
            if let Some(percent) = progress.percent() {
                on_event(UploadEvent::Progress { name: &upload.name, percent });
            }
        };
        self.storage
            .put(&key, &upload.data, upload.content_type.as_deref(), &progress)
            .await
            .or_raise(|| ErrorKind::Storage)?;
        let url = self.storage.signed_url(&key, self.url_expiry).await.or_raise(|| ErrorKind::Storage)?;

        let input = NewFileRecord {
            name: upload.name.clone(),
            size: upload.data.len() as u64,
            mime_type: upload.content_type.clone(),
            category: category.to_string(),
            storage_key: key,
            url: Some(url.to_string()),
            upload_date: now,
            owner: owner.to_string(),
        };
        let record = self.api.create_file(&input).await.or_raise(|| ErrorKind::Api)?;
        Ok(File::new(record, Some(url)))
    }

    /// Delete the file with identifier `id`, once `confirm` agrees.
    ///
    /// The object is removed from storage first, then the record from the
    /// API, then the file from the local list. Nothing is rolled back: if the
    /// API step fails the object is already gone, and the file stays listed
    /// until the next refresh.
    #[instrument(skip(self, confirm))]
    pub async fn delete(&mut self, id: &str, confirm: impl Confirm) -> Result<Deletion> {
        let Some(file) = self.get(id).cloned() else {
            exn::bail!(ErrorKind::NotFound(id.to_string()));
        };
        if !confirm.confirm(&file) {
            tracing::debug!(name = %file.name, "Deletion cancelled");
            return Ok(Deletion::Cancelled);
        }

        match self.storage.delete(&file.storage_key).await {
            Ok(()) => {},
            Err(error) if matches!(&*error, StorageErrorKind::NotFound(_)) => {
                tracing::warn!(key = %file.storage_key, "Object already missing from storage");
            },
            Err(error) => return Err(error).or_raise(|| ErrorKind::Storage),
        }
        self.api.delete_file(&file.id).await.or_raise(|| ErrorKind::Api)?;

        self.files.retain(|candidate| candidate.id != file.id);
        tracing::info!(name = %file.name, key = %file.storage_key, "Deleted file");
        Ok(Deletion::Deleted(file))
    }
}
