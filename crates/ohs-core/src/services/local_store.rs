//! Shared local store used by the API client, the reconciler, and the CLI.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, OnceCell};

use crate::db::{
    Database, LibSqlQueueRepository, LibSqlRecordRepository, RecordRepository,
    ResponseCacheRepository, SyncQueueRepository,
};
use crate::models::{
    record_key, CachedResponse, Collection, HttpMethod, MutationKind, PendingMutation,
};
use crate::Result;

/// Thread-safe, lazily opened local store.
///
/// Cloning is cheap; all clones share one connection. The database file and
/// schema are created on the first operation, not at construction.
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<OnceCell<Mutex<Database>>>,
    db_path: Option<PathBuf>,
}

impl LocalStore {
    /// Store backed by a file at the given path.
    pub fn open_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db: Arc::new(OnceCell::new()),
            db_path: Some(db_path.into()),
        }
    }

    /// Store kept in memory (primarily for tests).
    pub fn in_memory() -> Self {
        Self {
            db: Arc::new(OnceCell::new()),
            db_path: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    async fn database(&self) -> Result<&Mutex<Database>> {
        self.db
            .get_or_try_init(|| async {
                let db = match self.db_path.clone() {
                    Some(path) => Self::open_file(path).await?,
                    None => Database::open_in_memory().await?,
                };
                Ok::<_, crate::Error>(Mutex::new(db))
            })
            .await
    }

    async fn open_file(db_path: PathBuf) -> Result<Database> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        match Database::open(&db_path).await {
            Ok(db) => Ok(db),
            Err(error) if Self::is_corrupted_db_error(&error) => {
                tracing::warn!(
                    "Local store at {} is unreadable: {}. Moving it aside and starting fresh.",
                    db_path.display(),
                    error
                );
                Self::quarantine_corrupted_db_files(&db_path)?;
                Database::open(&db_path).await
            }
            Err(error) => Err(error),
        }
    }

    fn is_corrupted_db_error(error: &crate::Error) -> bool {
        error
            .to_string()
            .to_ascii_lowercase()
            .contains("file is not a database")
    }

    fn quarantine_corrupted_db_files(db_path: &Path) -> Result<()> {
        let Some(base_name) = db_path.file_name().and_then(|name| name.to_str()) else {
            return Ok(());
        };

        if db_path.exists() {
            let timestamp = chrono::Utc::now().timestamp_millis();
            let backup_path = db_path.with_file_name(format!("{base_name}.corrupt-{timestamp}"));

            std::fs::rename(db_path, &backup_path)?;
            tracing::warn!(
                "Moved corrupted local store from {} to {}",
                db_path.display(),
                backup_path.display()
            );
        }

        let Some(parent) = db_path.parent() else {
            return Ok(());
        };
        let sidecar_prefix = format!("{base_name}-");

        for entry in std::fs::read_dir(if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        })? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if file_name.starts_with(&sidecar_prefix) {
                let path = entry.path();
                std::fs::remove_file(&path)?;
                tracing::warn!("Removed stale local store file {}", path.display());
            }
        }

        Ok(())
    }

    /// Insert or overwrite a record by its `id`.
    pub async fn put(&self, collection: Collection, item: &Value) -> Result<()> {
        let db = self.database().await?.lock().await;
        LibSqlRecordRepository::new(db.connection())
            .put(collection, item)
            .await
    }

    /// Fetch a record; `None` when absent.
    pub async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>> {
        let db = self.database().await?.lock().await;
        LibSqlRecordRepository::new(db.connection())
            .get(collection, id)
            .await
    }

    /// Every record in a collection.
    pub async fn get_all(&self, collection: Collection) -> Result<Vec<Value>> {
        let db = self.database().await?.lock().await;
        LibSqlRecordRepository::new(db.connection())
            .get_all(collection)
            .await
    }

    /// Remove a record; no-op when absent.
    pub async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        let db = self.database().await?.lock().await;
        LibSqlRecordRepository::new(db.connection())
            .delete(collection, id)
            .await
    }

    /// Append a pending mutation to the sync queue.
    pub async fn enqueue(
        &self,
        kind: MutationKind,
        endpoint: &str,
        data: Option<&Value>,
        url: &str,
    ) -> Result<PendingMutation> {
        let db = self.database().await?.lock().await;
        LibSqlQueueRepository::new(db.connection())
            .enqueue(kind, endpoint, data, url)
            .await
    }

    /// All pending mutations in replay order.
    pub async fn pending_mutations(&self) -> Result<Vec<PendingMutation>> {
        let db = self.database().await?.lock().await;
        LibSqlQueueRepository::new(db.connection()).list().await
    }

    /// Drop a pending mutation after it has been replayed.
    pub async fn remove_pending(&self, id: i64) -> Result<()> {
        let db = self.database().await?.lock().await;
        LibSqlQueueRepository::new(db.connection())
            .remove(id)
            .await
    }

    pub async fn pending_count(&self) -> Result<usize> {
        let db = self.database().await?.lock().await;
        LibSqlQueueRepository::new(db.connection()).count().await
    }

    /// Remember the latest successful read for an endpoint.
    pub async fn cache_response(&self, endpoint: &str, data: &Value) -> Result<()> {
        let db = self.database().await?.lock().await;
        LibSqlQueueRepository::new(db.connection())
            .store(endpoint, data)
            .await
    }

    pub async fn cached_response(&self, endpoint: &str) -> Result<Option<CachedResponse>> {
        let db = self.database().await?.lock().await;
        LibSqlQueueRepository::new(db.connection())
            .lookup(endpoint)
            .await
    }

    /// Reflect a successful remote response in the matching record collection.
    ///
    /// `DELETE /{collection}/{id}` removes the record. On `/{collection}` and
    /// `/{collection}/{id}`, object payloads with an `id` are upserted and array
    /// payloads upsert every element that has one. Deeper paths such as
    /// `/incidents/5/comments` only upsert an object whose `id` is the path id.
    /// Endpoints outside the known collections are ignored. Returns the number
    /// of records touched.
    pub async fn mirror(&self, method: HttpMethod, endpoint: &str, payload: &Value) -> Result<usize> {
        let Some((collection, id)) = Collection::from_endpoint(endpoint) else {
            return Ok(0);
        };
        let depth = path_depth(endpoint);

        if method == HttpMethod::Delete {
            // Only `/{collection}/{id}` deletes a record; nested resources do not
            return match id.filter(|_| depth == 2) {
                Some(id) => {
                    self.delete(collection, &id).await?;
                    Ok(1)
                }
                None => Ok(0),
            };
        }

        let items: Vec<&Value> = match payload {
            Value::Array(items) if depth <= 2 => items.iter().collect(),
            Value::Object(_) if depth <= 2 => vec![payload],
            Value::Object(_) if id.is_some() && record_key(payload) == id => {
                vec![payload]
            }
            _ => Vec::new(),
        };

        let db = self.database().await?.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        let mut touched = 0;
        for item in items.into_iter().filter(|item| record_key(item).is_some()) {
            repo.put(collection, item).await?;
            touched += 1;
        }
        Ok(touched)
    }
}

/// Number of non-empty path segments, ignoring any query or fragment.
fn path_depth(endpoint: &str) -> usize {
    endpoint
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .count()
}
