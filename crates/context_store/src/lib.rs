//! # Context Store
//!
//! Read-only access to a user's previously published posts. The content pipeline
//! uses these as advisory context when choosing tone and framing for new posts.
//!
//! Generated posts are never written back here.

mod datastore;

pub use datastore::postgres::PgContextStore;
pub use datastore::{ContextStore, NoContextStore};
