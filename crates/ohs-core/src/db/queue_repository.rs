//! Pending-mutation queue and response cache repositories

use crate::error::{Error, Result};
use crate::models::{CachedResponse, MutationKind, PendingMutation};
use crate::util::{iso_timestamp, parse_iso_timestamp};
use chrono::{DateTime, SubsecRound, Utc};
use libsql::{params, Connection, Row, Value as SqlValue};
use serde_json::Value;

/// Trait for the pending-mutation queue (async)
#[allow(async_fn_in_trait)]
pub trait SyncQueueRepository {
    /// Append a mutation; returns the stored entry with its assigned id
    async fn enqueue(
        &self,
        kind: MutationKind,
        endpoint: &str,
        data: Option<&Value>,
        url: &str,
    ) -> Result<PendingMutation>;

    /// Every queued mutation in ascending id order
    async fn list(&self) -> Result<Vec<PendingMutation>>;

    /// Remove a mutation by id; no-op when absent
    async fn remove(&self, id: i64) -> Result<()>;

    /// Number of queued mutations
    async fn count(&self) -> Result<usize>;
}

/// Trait for the endpoint-keyed response cache (async)
#[allow(async_fn_in_trait)]
pub trait ResponseCacheRepository {
    /// Store or overwrite the payload for an endpoint
    async fn store(&self, endpoint: &str, data: &Value) -> Result<()>;

    /// Look up the payload for an endpoint regardless of age
    async fn lookup(&self, endpoint: &str) -> Result<Option<CachedResponse>>;
}

/// libSQL implementation of the queue and cache repositories
pub struct LibSqlQueueRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlQueueRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_mutation(row: &Row) -> Result<PendingMutation> {
        let id: i64 = row.get(0)?;
        let method: String = row.get(1)?;
        let kind = method
            .parse::<MutationKind>()
            .map_err(|error| Error::Database(format!("sync_queue row {id}: {error}")))?;
        let data = match row.get_value(3)? {
            SqlValue::Text(raw) => Some(serde_json::from_str(&raw)?),
            _ => None,
        };
        let timestamp: String = row.get(4)?;

        Ok(PendingMutation {
            id,
            kind,
            endpoint: row.get(2)?,
            data,
            timestamp: parse_timestamp(&timestamp, "sync_queue.timestamp")?,
            url: row.get(5)?,
        })
    }
}

fn parse_timestamp(raw: &str, column: &str) -> Result<DateTime<Utc>> {
    parse_iso_timestamp(raw)
        .ok_or_else(|| Error::Database(format!("invalid timestamp in {column}: {raw}")))
}

impl SyncQueueRepository for LibSqlQueueRepository<'_> {
    async fn enqueue(
        &self,
        kind: MutationKind,
        endpoint: &str,
        data: Option<&Value>,
        url: &str,
    ) -> Result<PendingMutation> {
        // Stored with millisecond precision; the returned entry must match a re-read
        let timestamp = Utc::now().trunc_subsecs(3);
        let raw_data = match data {
            Some(value) => SqlValue::Text(serde_json::to_string(value)?),
            None => SqlValue::Null,
        };

        self.conn
            .execute(
                "INSERT INTO sync_queue (method, endpoint, data, timestamp, url) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![kind.as_str(), endpoint, raw_data, iso_timestamp(timestamp), url],
            )
            .await?;

        Ok(PendingMutation {
            id: self.conn.last_insert_rowid(),
            kind,
            endpoint: endpoint.to_string(),
            data: data.cloned(),
            timestamp,
            url: url.to_string(),
        })
    }

    async fn list(&self) -> Result<Vec<PendingMutation>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, method, endpoint, data, timestamp, url FROM sync_queue ORDER BY id ASC",
                (),
            )
            .await?;

        let mut mutations = Vec::new();
        while let Some(row) = rows.next().await? {
            mutations.push(Self::parse_mutation(&row)?);
        }
        Ok(mutations)
    }

    async fn remove(&self, id: i64) -> Result<()> {
        let removed = self
            .conn
            .execute("DELETE FROM sync_queue WHERE id = ?1", params![id])
            .await?;
        if removed == 0 {
            return Err(Error::NotFound(format!("sync_queue entry {id}")));
        }
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM sync_queue", ())
            .await?;
        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        usize::try_from(count).map_err(|error| Error::Database(error.to_string()))
    }
}

impl ResponseCacheRepository for LibSqlQueueRepository<'_> {
    async fn store(&self, endpoint: &str, data: &Value) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO offline_cache (endpoint, data, timestamp) VALUES (?1, ?2, ?3)",
                params![
                    endpoint,
                    serde_json::to_string(data)?,
                    iso_timestamp(Utc::now())
                ],
            )
            .await?;
        Ok(())
    }

    async fn lookup(&self, endpoint: &str) -> Result<Option<CachedResponse>> {
        let mut rows = self
            .conn
            .query(
                "SELECT data, timestamp FROM offline_cache WHERE endpoint = ?1",
                params![endpoint],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };
        let raw: String = row.get(0)?;
        let timestamp: String = row.get(1)?;
        Ok(Some(CachedResponse {
            endpoint: endpoint.to_string(),
            data: serde_json::from_str(&raw)?,
            timestamp: parse_timestamp(&timestamp, "offline_cache.timestamp")?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_enqueue_assigns_increasing_ids() {
        let db = setup().await;
        let repo = LibSqlQueueRepository::new(db.connection());

        let first = repo
            .enqueue(
                MutationKind::Post,
                "/incidents",
                Some(&json!({"title": "Fall"})),
                "http://localhost:5000/api/incidents",
            )
            .await
            .unwrap();
        let second = repo
            .enqueue(
                MutationKind::Delete,
                "/documents/3",
                None,
                "http://localhost:5000/api/documents/3",
            )
            .await
            .unwrap();

        assert!(second.id > first.id);
        assert_eq!(first.timestamp.timestamp_subsec_nanos() % 1_000_000, 0);
        let listed = repo.list().await.unwrap();
        assert_eq!(listed, vec![first, second]);
        assert_eq!(listed[1].data, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_ids_are_not_reused_after_remove() {
        let db = setup().await;
        let repo = LibSqlQueueRepository::new(db.connection());

        let first = repo
            .enqueue(MutationKind::Put, "/incidents/1", Some(&json!({})), "u")
            .await
            .unwrap();
        repo.remove(first.id).await.unwrap();
        assert!(matches!(
            repo.remove(first.id).await,
            Err(Error::NotFound(_))
        ));
        let second = repo
            .enqueue(MutationKind::Put, "/incidents/1", Some(&json!({})), "u")
            .await
            .unwrap();

        assert!(second.id > first.id);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cache_overwrites_per_endpoint() {
        let db = setup().await;
        let repo = LibSqlQueueRepository::new(db.connection());

        assert_eq!(repo.lookup("/incidents").await.unwrap(), None);

        repo.store("/incidents", &json!([{"id": 1}])).await.unwrap();
        repo.store("/incidents", &json!([{"id": 1}, {"id": 2}]))
            .await
            .unwrap();

        let cached = repo.lookup("/incidents").await.unwrap().unwrap();
        assert_eq!(cached.data, json!([{"id": 1}, {"id": 2}]));
        assert_eq!(cached.endpoint, "/incidents");
    }
}
