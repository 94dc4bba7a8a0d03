//! Replays queued offline writes once the server is reachable again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::api::{ApiClient, ApiError, RequestOptions, Transport};
use crate::auth::SessionPersistence;
use crate::models::PendingMutation;
use crate::offline::{ConnectivityMonitor, ConnectivityState};
use crate::services::LocalStore;
use crate::{Error, Result};

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub replayed: usize,
    pub failed: usize,
    /// Queue length after the pass
    pub remaining: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed(SyncReport),
    /// Another pass was already running in this process; nothing was replayed
    AlreadyRunning,
}

/// Drains the sync queue in insertion order through the API client.
pub struct SyncReconciler<T, S> {
    client: ApiClient<T, S>,
    in_flight: Arc<AtomicBool>,
}

impl<T, S: Clone> Clone for SyncReconciler<T, S> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<T, S> SyncReconciler<T, S>
where
    T: Transport,
    S: SessionPersistence,
{
    pub fn new(client: ApiClient<T, S>) -> Self {
        Self {
            client,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    const fn store(&self) -> &LocalStore {
        self.client.store()
    }

    /// Replay every pending mutation once, oldest first.
    ///
    /// Successful entries are removed and mirrored into their collection.
    /// Failed entries are logged and kept for the next pass; the pass always
    /// continues with the next entry.
    pub async fn sync_offline_requests(&self) -> Result<SyncOutcome> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::debug!("Sync pass already running; skipping");
            return Ok(SyncOutcome::AlreadyRunning);
        };

        let pending = self.store().pending_mutations().await?;
        if pending.is_empty() {
            return Ok(SyncOutcome::Completed(SyncReport::default()));
        }
        tracing::info!("Replaying {} queued request(s)", pending.len());

        let mut report = SyncReport::default();
        for mutation in &pending {
            match self.replay(mutation).await {
                Ok(payload) => {
                    match self.store().remove_pending(mutation.id).await {
                        Ok(()) => {}
                        Err(Error::NotFound(_)) => tracing::warn!(
                            "Queued entry {} was already removed from the queue",
                            mutation.id
                        ),
                        Err(error) => return Err(error),
                    }
                    report.replayed += 1;
                    self.mirror(mutation, &payload).await;
                }
                Err(error) => {
                    report.failed += 1;
                    tracing::warn!(
                        "Failed to replay queued {} {} (entry {}): {}",
                        mutation.kind,
                        mutation.endpoint,
                        mutation.id,
                        error
                    );
                }
            }
        }

        report.remaining = self.store().pending_count().await?;
        tracing::info!(
            "Sync pass finished: {} replayed, {} failed, {} remaining",
            report.replayed,
            report.failed,
            report.remaining
        );
        Ok(SyncOutcome::Completed(report))
    }

    /// Number of queued mutations; `0` when the store cannot be read.
    pub async fn pending_sync_count(&self) -> usize {
        match self.store().pending_count().await {
            Ok(count) => count,
            Err(error) => {
                tracing::warn!("Failed to count pending sync entries: {}", error);
                0
            }
        }
    }

    async fn replay(&self, mutation: &PendingMutation) -> std::result::Result<Value, ApiError> {
        let response = self
            .client
            .request(
                mutation.kind.method(),
                &mutation.endpoint,
                mutation.data.clone(),
                RequestOptions::online_only(),
            )
            .await?;
        Ok(response.into_json())
    }

    async fn mirror(&self, mutation: &PendingMutation, payload: &Value) {
        if let Err(error) = self
            .store()
            .mirror(mutation.kind.method(), &mutation.endpoint, payload)
            .await
        {
            tracing::warn!(
                "Replayed {} {} but failed to update local records: {}",
                mutation.kind,
                mutation.endpoint,
                error
            );
        }
    }
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Background task that runs a sync pass whenever connectivity comes back.
///
/// The worker only reacts to monitor changes. Something else must drive
/// [`ApiClient::check_connectivity`] for an `Offline` monitor to recover.
pub struct SyncWorker {
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl SyncWorker {
    /// Start watching `monitor`. Every Offline → Online transition triggers one pass.
    pub fn spawn<T, S>(reconciler: SyncReconciler<T, S>, monitor: &ConnectivityMonitor) -> Self
    where
        T: Transport,
        S: SessionPersistence,
    {
        let shutdown = Arc::new(Notify::new());
        let stop = Arc::clone(&shutdown);
        let mut changes = monitor.subscribe();

        let handle = tokio::spawn(async move {
            tracing::debug!("Sync worker started");

            loop {
                tokio::select! {
                    () = stop.notified() => break,
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        // Notifications fire only on real changes, so Online here
                        // follows an Offline even when the watch coalesced it.
                        let restored = *changes.borrow_and_update() == ConnectivityState::Online;

                        if restored {
                            match reconciler.sync_offline_requests().await {
                                Ok(SyncOutcome::Completed(report)) => {
                                    tracing::debug!("Connectivity restored; sync report {:?}", report);
                                }
                                Ok(SyncOutcome::AlreadyRunning) => {}
                                Err(error) => tracing::warn!("Sync pass failed: {}", error),
                            }
                        }
                    }
                }
            }

            tracing::debug!("Sync worker stopped");
        });

        Self { shutdown, handle }
    }

    /// Stop the worker and wait for an in-progress pass to finish.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        if let Err(error) = self.handle.await {
            tracing::warn!("Sync worker ended abnormally: {}", error);
        }
    }
}
