//! The structured half of Keepr's backend: file metadata records behind a
//! GraphQL API, and the identity of whoever is asking for them.
//!
//! Records are created after an object lands in storage and deleted after it
//! leaves; nothing in here ever updates one in place.

pub mod backend;
pub mod error;
mod graphql;
pub mod identity;
mod models;

pub use crate::backend::ApiBackend;
pub use crate::identity::{Credentials, IdentityProvider, Session, SessionStore, StaticIdentity};
pub use crate::models::{FileRecord, NewFileRecord, Page};
use std::sync::Arc;

pub type ApiHandle = Arc<dyn ApiBackend + Send + Sync>;
pub type IdentityHandle = Arc<dyn IdentityProvider + Send + Sync>;
