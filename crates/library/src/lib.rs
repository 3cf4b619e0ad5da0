//! Everything keepr shows the user about their files, independent of how it
//! is shown.
//!
//! [`Library`] owns the in-memory file list. It fetches records from the
//! [API](keepr_api), signs download URLs through [storage](keepr_storage),
//! uploads and deletes files across both, and derives the category folders,
//! searches and sorted listings a front-end renders.

pub mod category;
pub mod error;
mod keys;
mod library;
mod models;
mod size;
pub mod view;

pub use crate::category::Category;
pub use crate::keys::{DEFAULT_KEY_TEMPLATE, KeyGenerator, KeyInput};
pub use crate::library::{
    Confirm, DEFAULT_URL_EXPIRY, Deletion, Library, Upload, UploadEvent, UploadReport,
};
pub use crate::models::{File, Folder};
pub use crate::size::format_size;
pub use crate::view::{SortKey, View, ViewMode};
