//! ohs-core - Core library for the OHS client
//!
//! This crate contains the local store, the authenticated API client, the
//! offline dispatcher and the sync reconciler shared by every OHS front end.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod offline;
pub mod services;
pub mod sync;
pub mod util;

#[cfg(test)]
mod test_support;

pub use api::{ApiClient, ApiError, ApiResponse, RequestOptions};
pub use error::{Error, Result};
pub use models::{Collection, HttpMethod, MutationKind, PendingMutation};
pub use offline::{ConnectivityMonitor, ConnectivityState};
pub use services::LocalStore;
pub use sync::{SyncOutcome, SyncReconciler, SyncReport, SyncWorker};
