//! # Cart Storage
//!
//! The string key/value store carts are persisted to.
//!
//! ## Implementations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       CartStorage (trait)                               │
//! │        get / set / remove / keys_with_prefix / remove_with_prefix       │
//! │                               │                                         │
//! │             ┌─────────────────┴──────────────────┐                      │
//! │             ▼                                    ▼                      │
//! │  ┌──────────────────────┐           ┌───────────────────────────┐       │
//! │  │    MemoryStorage     │           │      SqliteStorage        │       │
//! │  │  BTreeMap in RwLock  │           │  LocalStorageRepository   │       │
//! │  │  tests, kiosk mode   │           │  survives restarts        │       │
//! │  └──────────────────────┘           └───────────────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use animart_core::persistence::CART_KEY_PREFIX;
use animart_core::{FreshnessWindow, PersistedCart};
use animart_db::{Database, DbConfig, LocalStorageRepository};

use crate::error::StoreResult;

/// Persistent string key/value storage.
#[async_trait]
pub trait CartStorage: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    async fn remove(&self, key: &str) -> StoreResult<()>;

    /// Keys starting with `prefix`, sorted.
    async fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Removes every key starting with `prefix`. Returns how many went.
    async fn remove_with_prefix(&self, prefix: &str) -> StoreResult<u64> {
        let keys = self.keys_with_prefix(prefix).await?;
        for key in &keys {
            self.remove(key).await?;
        }
        Ok(keys.len() as u64)
    }
}

// =============================================================================
// Memory Storage
// =============================================================================

/// In-process storage. Lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CartStorage for MemoryStorage {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .entries
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn remove_with_prefix(&self, prefix: &str) -> StoreResult<u64> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(prefix));
        Ok((before - entries.len()) as u64)
    }
}

// =============================================================================
// SQLite Storage
// =============================================================================

/// Storage backed by the `local_storage` table.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    repo: LocalStorageRepository,
}

impl SqliteStorage {
    pub fn new(db: &Database) -> Self {
        SqliteStorage {
            repo: db.local_storage(),
        }
    }

    /// Opens (creating if needed) the database file and runs migrations.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with(DbConfig::new(path.as_ref())).await
    }

    pub async fn open_with(config: DbConfig) -> StoreResult<Self> {
        let db = Database::new(config).await?;
        Ok(Self::new(&db))
    }
}

#[async_trait]
impl CartStorage for SqliteStorage {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.repo.get_item(key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        Ok(self.repo.set_item(key, value).await?)
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.repo.remove_item(key).await?;
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        Ok(self.repo.keys_with_prefix(prefix).await?)
    }

    async fn remove_with_prefix(&self, prefix: &str) -> StoreResult<u64> {
        Ok(self.repo.remove_with_prefix(prefix).await?)
    }
}

// =============================================================================
// Maintenance
// =============================================================================

/// Result of a [`purge_expired_carts`] sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub examined: usize,
    pub removed: usize,
}

/// Deletes every persisted cart that could no longer be restored: stale
/// ones and ones that don't parse.
pub async fn purge_expired_carts(
    storage: &dyn CartStorage,
    now: DateTime<Utc>,
    window: FreshnessWindow,
) -> StoreResult<PurgeReport> {
    let mut report = PurgeReport::default();

    for key in storage.keys_with_prefix(CART_KEY_PREFIX).await? {
        report.examined += 1;

        let Some(raw) = storage.get(&key).await? else {
            continue;
        };

        let expired = match PersistedCart::from_json(&raw) {
            Ok(saved) => !window.is_fresh(&saved, now),
            Err(e) => {
                warn!(key = %key, error = %e, "Purging unreadable cart");
                true
            }
        };

        if expired {
            debug!(key = %key, "Purging expired cart");
            storage.remove(&key).await?;
            report.removed += 1;
        }
    }

    info!(
        examined = report.examined,
        removed = report.removed,
        "Expired cart sweep complete"
    );

    Ok(report)
}
