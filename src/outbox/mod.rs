//! # Persistent Outbox Store
//!
//! Durable, append-only queue of write operations captured while offline.
//! Entries survive a full process restart and are replayed in strict
//! enqueue order by the drain engine.
//!
//! ## Guarantees
//!
//! - **Atomic records**: each entry is a single `INSERT`; a crash between
//!   persistence steps cannot leave a partial record
//! - **Monotonic ids**: assigned by SQLite `AUTOINCREMENT`, never reused
//! - **Stable ordering**: `enqueued_at ASC, id ASC`, so two entries stored
//!   in the same millisecond keep their enqueue order
//! - **Delete-on-confirm**: an entry is removed only after its replay
//!   succeeds; entries are never mutated in place
//!
//! ## Usage
//!
//! ```rust,no_run
//! use marksync::outbox::OutboxStore;
//! use marksync::api::HttpMethod;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), marksync::error::ApiError> {
//! let outbox = OutboxStore::open("data/outbox.db".as_ref()).await?;
//! let id = outbox
//!     .enqueue("bookmarks/", HttpMethod::Post, &json!({"url": "https://example.com"}))
//!     .await?;
//! for entry in outbox.list_all_ordered().await? {
//!     // replay entry...
//!     outbox.remove(entry.id).await?;
//! }
//! # Ok(())
//! # }
//! ```

use crate::api::HttpMethod;
use crate::error::ApiError;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};

/// A pending write operation awaiting replay
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEntry {
    /// Store-assigned monotonic identifier
    pub id: i64,
    /// Logical endpoint path, already resolved to include the resource id
    pub resource_path: String,
    /// Transport verb to use on replay
    pub method: HttpMethod,
    /// Payload sent verbatim on replay; `Null` for deletes
    pub body: Value,
    /// Enqueue timestamp in milliseconds, used for ordering and diagnostics
    pub enqueued_at: i64,
}

/// SQLite-backed outbox
#[derive(Debug)]
pub struct OutboxStore {
    pool: SqlitePool,
}

impl OutboxStore {
    /// Open or create the outbox database at the given path
    ///
    /// Uses WAL mode so an enqueue from one window of the same origin does
    /// not block reads from another.
    pub async fn open(path: &Path) -> Result<Self, ApiError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ApiError::storage(format!("cannot create data dir: {}", e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Open the outbox in the platform data directory
    ///
    /// `data_dir` overrides the location; tests point it at a scratch dir.
    pub async fn open_default(data_dir: Option<&Path>) -> Result<Self, ApiError> {
        let path = Self::db_path(data_dir);
        Self::open(&path).await
    }

    fn db_path(data_dir: Option<&Path>) -> PathBuf {
        let mut path = data_dir
            .map(Path::to_path_buf)
            .or_else(dirs::data_dir)
            .unwrap_or_else(std::env::temp_dir);
        path.push("marksync");
        path.push("outbox.db");
        path
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS outbox (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                resource_path TEXT NOT NULL,
                method TEXT NOT NULL,
                body TEXT NOT NULL,
                enqueued_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Append a pending operation, assigning its id and timestamp
    ///
    /// The id and timestamp are assigned inside a single statement, so
    /// concurrent enqueues from the same caller cannot interleave out of
    /// order.
    pub async fn enqueue(
        &self,
        resource_path: &str,
        method: HttpMethod,
        body: &Value,
    ) -> Result<i64, ApiError> {
        let payload = serde_json::to_string(body)?;
        let enqueued_at = chrono::Utc::now().timestamp_millis();

        let result = sqlx::query(
            "INSERT INTO outbox (resource_path, method, body, enqueued_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(resource_path)
        .bind(method.as_str())
        .bind(&payload)
        .bind(enqueued_at)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        tracing::info!("queued {} {} as outbox entry {}", method, resource_path, id);
        Ok(id)
    }

    /// All pending entries in replay order
    pub async fn list_all_ordered(&self) -> Result<Vec<OutboxEntry>, ApiError> {
        let rows = sqlx::query(
            "SELECT id, resource_path, method, body, enqueued_at
             FROM outbox
             ORDER BY enqueued_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let method: String = row.try_get("method")?;
            let body: String = row.try_get("body")?;
            entries.push(OutboxEntry {
                id: row.try_get("id")?,
                resource_path: row.try_get("resource_path")?,
                method: method.parse()?,
                body: serde_json::from_str(&body)?,
                enqueued_at: row.try_get("enqueued_at")?,
            });
        }
        Ok(entries)
    }

    /// Remove an entry after its replay was confirmed
    pub async fn remove(&self, id: i64) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM outbox WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Number of pending entries
    pub async fn len(&self) -> Result<u64, ApiError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM outbox")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 as u64)
    }

    /// Whether the outbox holds no pending entries
    pub async fn is_empty(&self) -> Result<bool, ApiError> {
        Ok(self.len().await? == 0)
    }

    /// Drop all pending entries (tests and explicit reset only)
    pub async fn clear(&self) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM outbox").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the underlying pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn scratch_store() -> (tempfile::TempDir, OutboxStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = OutboxStore::open(&dir.path().join("outbox.db")).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_enqueue_and_list() {
        let (_dir, store) = scratch_store().await;

        let body = json!({"url": "https://example.com", "title": "Example"});
        let id = store
            .enqueue("bookmarks/", HttpMethod::Post, &body)
            .await
            .unwrap();

        let entries = store.list_all_ordered().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, id);
        assert_eq!(entries[0].resource_path, "bookmarks/");
        assert_eq!(entries[0].method, HttpMethod::Post);
        assert_eq!(entries[0].body, body);
    }

    #[tokio::test]
    async fn test_ordering_is_stable_within_one_millisecond() {
        let (_dir, store) = scratch_store().await;

        for i in 0..10 {
            store
                .enqueue("bookmarks/", HttpMethod::Post, &json!({"seq": i}))
                .await
                .unwrap();
        }

        let entries = store.list_all_ordered().await.unwrap();
        let sequence: Vec<i64> = entries.iter().map(|e| e.body["seq"].as_i64().unwrap()).collect();
        assert_eq!(sequence, (0..10).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn test_remove_deletes_only_target() {
        let (_dir, store) = scratch_store().await;

        let first = store
            .enqueue("bookmarks/1/", HttpMethod::Delete, &Value::Null)
            .await
            .unwrap();
        let second = store
            .enqueue("bookmarks/2/", HttpMethod::Delete, &Value::Null)
            .await
            .unwrap();

        store.remove(first).await.unwrap();

        let entries = store.list_all_ordered().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, second);
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outbox.db");

        {
            let store = OutboxStore::open(&path).await.unwrap();
            store
                .enqueue("tags/", HttpMethod::Post, &json!({"name": "rust"}))
                .await
                .unwrap();
            store.close().await;
        }

        let reopened = OutboxStore::open(&path).await.unwrap();
        let entries = reopened.list_all_ordered().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].body["name"], "rust");
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_remove() {
        let (_dir, store) = scratch_store().await;

        let first = store
            .enqueue("bookmarks/", HttpMethod::Post, &json!({}))
            .await
            .unwrap();
        store.remove(first).await.unwrap();
        let second = store
            .enqueue("bookmarks/", HttpMethod::Post, &json!({}))
            .await
            .unwrap();

        assert!(second > first);
    }
}
