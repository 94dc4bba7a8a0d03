//! Connectivity tracking and the offline fallback for failed requests.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;

use crate::api::{ApiError, ApiResponse};
use crate::models::{HttpMethod, MutationKind};
use crate::services::LocalStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectivityState {
    Online,
    Offline,
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Online => "online",
            Self::Offline => "offline",
        })
    }
}

/// Shared, observable online/offline flag.
///
/// Clones observe and update the same state; [`Self::subscribe`] yields a
/// receiver that wakes on every change.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    state: Arc<watch::Sender<ConnectivityState>>,
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(ConnectivityState::Online)
    }
}

impl ConnectivityMonitor {
    pub fn new(initial: ConnectivityState) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> ConnectivityState {
        *self.state.borrow()
    }

    pub fn is_offline(&self) -> bool {
        self.state() == ConnectivityState::Offline
    }

    /// Record a new state. Returns `true` when it differs from the previous one.
    pub fn set(&self, next: ConnectivityState) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            tracing::info!("Connectivity changed: now {}", next);
        }
        changed
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.state.subscribe()
    }
}

/// Decides what happens to a request that cannot reach the server.
///
/// State-changing verbs are appended to the sync queue; reads are answered
/// from the response cache.
#[derive(Clone)]
pub struct OfflineDispatcher {
    store: LocalStore,
}

impl OfflineDispatcher {
    pub const fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Route an unreachable request. `cause` is returned when a write could not be queued.
    pub async fn dispatch(
        &self,
        method: HttpMethod,
        endpoint: &str,
        data: Option<&Value>,
        url: &str,
        cause: ApiError,
    ) -> Result<ApiResponse, ApiError> {
        match method.mutation_kind() {
            Some(kind) => self.defer(kind, endpoint, data, url, cause).await,
            None => self.serve_cached(endpoint).await,
        }
    }

    async fn defer(
        &self,
        kind: MutationKind,
        endpoint: &str,
        data: Option<&Value>,
        url: &str,
        cause: ApiError,
    ) -> Result<ApiResponse, ApiError> {
        let data = data.filter(|_| kind.method().carries_body());
        match self.store.enqueue(kind, endpoint, data, url).await {
            Ok(entry) => {
                tracing::info!(
                    "Queued offline {} {} as sync entry {}",
                    kind,
                    endpoint,
                    entry.id
                );
                Ok(ApiResponse::Queued { id: entry.id })
            }
            Err(error) => {
                tracing::warn!(
                    "Failed to queue offline {} {}: {}",
                    kind,
                    endpoint,
                    error
                );
                Err(cause)
            }
        }
    }

    async fn serve_cached(&self, endpoint: &str) -> Result<ApiResponse, ApiError> {
        let cached = match self.store.cached_response(endpoint).await {
            Ok(cached) => cached,
            Err(error) => {
                tracing::warn!("Failed to read offline cache for {}: {}", endpoint, error);
                None
            }
        };

        match cached {
            Some(entry) => {
                tracing::debug!("Serving cached response for {}", endpoint);
                Ok(ApiResponse::Cached {
                    data: entry.data,
                    cached_at: entry.timestamp,
                })
            }
            None => Err(ApiError::CacheMiss {
                endpoint: endpoint.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn network_error() -> ApiError {
        ApiError::Network("connection refused".to_string())
    }

    #[test]
    fn monitor_reports_only_real_changes() {
        let monitor = ConnectivityMonitor::default();
        let mut changes = monitor.subscribe();

        assert!(!monitor.set(ConnectivityState::Online));
        assert!(!changes.has_changed().unwrap());

        assert!(monitor.set(ConnectivityState::Offline));
        assert!(monitor.clone().is_offline());
        assert!(changes.has_changed().unwrap());
        assert_eq!(*changes.borrow_and_update(), ConnectivityState::Offline);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn writes_are_queued_without_a_body_for_delete() {
        let store = LocalStore::in_memory();
        let dispatcher = OfflineDispatcher::new(store.clone());

        let queued = dispatcher
            .dispatch(
                HttpMethod::Delete,
                "/documents/3",
                Some(&json!({"ignored": true})),
                "http://localhost:5000/api/documents/3",
                network_error(),
            )
            .await
            .unwrap();

        let ApiResponse::Queued { id } = queued else {
            panic!("expected queued response, got {queued:?}");
        };
        let pending = store.pending_mutations().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);
        assert_eq!(pending[0].kind, MutationKind::Delete);
        assert_eq!(pending[0].data, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reads_are_served_from_cache_or_miss() {
        let store = LocalStore::in_memory();
        let dispatcher = OfflineDispatcher::new(store.clone());
        store
            .cache_response("/inspections", &json!([{"id": 1}]))
            .await
            .unwrap();

        let cached = dispatcher
            .dispatch(HttpMethod::Get, "/inspections", None, "u", network_error())
            .await
            .unwrap();
        assert_eq!(cached.payload(), Some(&json!([{"id": 1}])));

        let miss = dispatcher
            .dispatch(HttpMethod::Get, "/incidents", None, "u", network_error())
            .await;
        assert!(matches!(miss, Err(ApiError::CacheMiss { endpoint }) if endpoint == "/incidents"));
        assert_eq!(store.pending_count().await.unwrap(), 0);
    }
}
