//! # Local Storage Repository
//!
//! A string-keyed, string-valued table with the semantics of a browser's
//! local storage: last write wins, missing keys read as `None`.
//!
//! ## Prefix Scans
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  keys_with_prefix("cart_")                                             │
//! │                                                                         │
//! │   cart_guest   ✓                                                        │
//! │   cart_alice   ✓                                                        │
//! │   cartography  ✗   (no underscore after "cart")                         │
//! │   theme        ✗                                                        │
//! │                                                                         │
//! │  Matching uses substr() rather than LIKE so `_` and `%` in the         │
//! │  prefix are literal characters.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

/// A stored key with its value and last write time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Repository for the `local_storage` table.
#[derive(Debug, Clone)]
pub struct LocalStorageRepository {
    pool: SqlitePool,
}

impl LocalStorageRepository {
    /// Creates a new LocalStorageRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LocalStorageRepository { pool }
    }

    /// Reads the value stored under `key`.
    pub async fn get_item(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM local_storage WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(value)
    }

    /// Writes `value` under `key`, replacing any previous value.
    pub async fn set_item(&self, key: &str, value: &str) -> DbResult<()> {
        debug!(key = %key, bytes = value.len(), "Writing local storage item");

        sqlx::query(
            r#"
            INSERT INTO local_storage (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes `key`. Returns true if it existed.
    pub async fn remove_item(&self, key: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM local_storage WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists keys starting with `prefix`, sorted.
    pub async fn keys_with_prefix(&self, prefix: &str) -> DbResult<Vec<String>> {
        let keys: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT key FROM local_storage
            WHERE substr(key, 1, length(?1)) = ?1
            ORDER BY key
            "#,
        )
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?;

        Ok(keys)
    }

    /// Lists full entries whose key starts with `prefix`, sorted by key.
    pub async fn entries_with_prefix(&self, prefix: &str) -> DbResult<Vec<StoredEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT key, value, updated_at FROM local_storage
            WHERE substr(key, 1, length(?1)) = ?1
            ORDER BY key
            "#,
        )
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push(StoredEntry {
                key: row.try_get("key")?,
                value: row.try_get("value")?,
                updated_at: row.try_get("updated_at")?,
            });
        }

        Ok(entries)
    }

    /// Deletes every key starting with `prefix`. Returns the number removed.
    pub async fn remove_with_prefix(&self, prefix: &str) -> DbResult<u64> {
        let result =
            sqlx::query("DELETE FROM local_storage WHERE substr(key, 1, length(?1)) = ?1")
                .bind(prefix)
                .execute(&self.pool)
                .await?;

        debug!(prefix = %prefix, removed = result.rows_affected(), "Removed keys by prefix");

        Ok(result.rows_affected())
    }

    /// Total number of stored keys.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM local_storage")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};

    async fn repo() -> super::LocalStorageRepository {
        Database::new(DbConfig::in_memory())
            .await
            .unwrap()
            .local_storage()
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let repo = repo().await;
        assert_eq!(repo.get_item("cart_guest").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let repo = repo().await;
        repo.set_item("cart_guest", "one").await.unwrap();
        repo.set_item("cart_guest", "two").await.unwrap();

        assert_eq!(
            repo.get_item("cart_guest").await.unwrap().as_deref(),
            Some("two")
        );
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_remove_item() {
        let repo = repo().await;
        repo.set_item("cart_alice", "{}").await.unwrap();

        assert!(repo.remove_item("cart_alice").await.unwrap());
        assert!(!repo.remove_item("cart_alice").await.unwrap());
        assert_eq!(repo.get_item("cart_alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_prefix_is_literal() {
        let repo = repo().await;
        for key in ["cart_guest", "cart_alice", "cartography", "theme"] {
            repo.set_item(key, "x").await.unwrap();
        }

        assert_eq!(
            repo.keys_with_prefix("cart_").await.unwrap(),
            vec!["cart_alice".to_string(), "cart_guest".to_string()]
        );

        assert_eq!(repo.remove_with_prefix("cart_").await.unwrap(), 2);
        assert_eq!(repo.count().await.unwrap(), 2);
        assert!(repo.get_item("cartography").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_entries_with_prefix() {
        let repo = repo().await;
        repo.set_item("cart_bob", "payload").await.unwrap();

        let entries = repo.entries_with_prefix("cart_").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "cart_bob");
        assert_eq!(entries[0].value, "payload");
    }
}
