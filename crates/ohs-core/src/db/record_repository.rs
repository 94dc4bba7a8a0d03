//! Record collection repository

use crate::error::{Error, Result};
use crate::models::{record_key, Collection};
use crate::util::iso_timestamp;
use libsql::{params, Connection};
use serde_json::Value;

/// Trait for per-collection record storage (async)
#[allow(async_fn_in_trait)]
pub trait RecordRepository {
    /// Insert or overwrite an item by its `id` (last write wins)
    async fn put(&self, collection: Collection, item: &Value) -> Result<()>;

    /// Get an item by id; `None` when absent
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>>;

    /// All items of a collection in insertion order
    async fn get_all(&self, collection: Collection) -> Result<Vec<Value>>;

    /// Remove an item; no-op when absent
    async fn delete(&self, collection: Collection, id: &str) -> Result<()>;
}

/// libSQL implementation of `RecordRepository`
pub struct LibSqlRecordRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlRecordRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_item(raw: &str) -> Result<Value> {
        Ok(serde_json::from_str(raw)?)
    }
}

impl RecordRepository for LibSqlRecordRepository<'_> {
    async fn put(&self, collection: Collection, item: &Value) -> Result<()> {
        let id = record_key(item).ok_or_else(|| {
            Error::InvalidInput(format!("{collection} record is missing an `id` field"))
        })?;
        let data = serde_json::to_string(item)?;
        let updated_at = iso_timestamp(chrono::Utc::now());

        // Upsert keeps the original rowid so iteration order stays stable
        self.conn
            .execute(
                "INSERT INTO records (collection, id, data, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(collection, id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
                params![collection.as_str(), id, data, updated_at],
            )
            .await?;
        Ok(())
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>> {
        let mut rows = self
            .conn
            .query(
                "SELECT data FROM records WHERE collection = ?1 AND id = ?2",
                params![collection.as_str(), id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => {
                let raw: String = row.get(0)?;
                Ok(Some(Self::parse_item(&raw)?))
            }
            None => Ok(None),
        }
    }

    async fn get_all(&self, collection: Collection) -> Result<Vec<Value>> {
        let mut rows = self
            .conn
            .query(
                "SELECT data FROM records WHERE collection = ?1 ORDER BY rowid",
                params![collection.as_str()],
            )
            .await?;

        let mut items = Vec::new();
        while let Some(row) = rows.next().await? {
            let raw: String = row.get(0)?;
            items.push(Self::parse_item(&raw)?);
        }
        Ok(items)
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM records WHERE collection = ?1 AND id = ?2",
                params![collection.as_str(), id],
            )
            .await?;
        Ok(())
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
    async fn test_put_and_get() {
        let db = setup().await;
        let repo = LibSqlRecordRepository::new(db.connection());

        let incident = json!({"id": "inc-1", "title": "Fall from ladder"});
        repo.put(Collection::Incidents, &incident).await.unwrap();

        let loaded = repo.get(Collection::Incidents, "inc-1").await.unwrap();
        assert_eq!(loaded, Some(incident));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_put_overwrites_last_write_wins() {
        let db = setup().await;
        let repo = LibSqlRecordRepository::new(db.connection());

        repo.put(Collection::Documents, &json!({"id": 7, "rev": 1}))
            .await
            .unwrap();
        repo.put(Collection::Documents, &json!({"id": 7, "rev": 2}))
            .await
            .unwrap();

        let all = repo.get_all(Collection::Documents).await.unwrap();
        assert_eq!(all, vec![json!({"id": 7, "rev": 2})]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_collections_are_namespaced() {
        let db = setup().await;
        let repo = LibSqlRecordRepository::new(db.connection());

        repo.put(Collection::Incidents, &json!({"id": "1", "kind": "incident"}))
            .await
            .unwrap();
        repo.put(Collection::Inspections, &json!({"id": "1", "kind": "inspection"}))
            .await
            .unwrap();

        let incident = repo.get(Collection::Incidents, "1").await.unwrap().unwrap();
        assert_eq!(incident["kind"], "incident");
        assert_eq!(repo.get_all(Collection::Inspections).await.unwrap().len(), 1);
        assert!(repo
            .get_all(Collection::CorrectiveActions)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_missing_key_is_none_and_delete_is_noop() {
        let db = setup().await;
        let repo = LibSqlRecordRepository::new(db.connection());

        assert_eq!(repo.get(Collection::Incidents, "nope").await.unwrap(), None);
        repo.delete(Collection::Incidents, "nope").await.unwrap();

        repo.put(Collection::Incidents, &json!({"id": "a"}))
            .await
            .unwrap();
        repo.delete(Collection::Incidents, "a").await.unwrap();
        assert_eq!(repo.get(Collection::Incidents, "a").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_put_rejects_item_without_id() {
        let db = setup().await;
        let repo = LibSqlRecordRepository::new(db.connection());

        let result = repo
            .put(Collection::Incidents, &json!({"title": "no id"}))
            .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
