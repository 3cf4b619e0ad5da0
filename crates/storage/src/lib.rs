//! Object storage for Keepr.
//!
//! Every backend stores opaque bytes under a `/`-separated key, hands out
//! time-limited URLs for reading them back, and deletes them on request.
//! Durability and URL signing are the backend's problem, not ours.

pub mod backend;
pub mod error;
mod key;
mod models;
mod progress;

pub use crate::backend::StorageBackend;
pub use crate::key::validate as validate_key;
pub use crate::models::ObjectInfo;
pub use crate::progress::{Progress, ProgressFn, ignore_progress};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
