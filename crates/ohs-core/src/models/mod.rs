//! Data models for the OHS client

mod collection;
mod request;

pub use collection::{record_key, Collection};
pub use request::{CachedResponse, HttpMethod, MutationKind, PendingMutation};
