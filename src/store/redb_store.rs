use crate::item::Bookmark;
use crate::ports::BookmarkStore;
use crate::store::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

const BOOKMARKS: TableDefinition<&str, &str> = TableDefinition::new("bookmarks");
const FLAGS: TableDefinition<&str, i64> = TableDefinition::new("flags");

fn db_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Database(e.to_string())
}

/// Durable [`BookmarkStore`] on a single redb file.
///
/// Bookmark rows are JSON keyed by item key; flags are epoch milliseconds.
/// Database work runs on the blocking pool so trait methods stay async.
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create the cache database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path).map_err(db_err)?;
        // Create both tables up front so a fresh database scans cleanly.
        let txn = db.begin_write().map_err(db_err)?;
        {
            txn.open_table(BOOKMARKS).map_err(db_err)?;
            txn.open_table(FLAGS).map_err(db_err)?;
        }
        txn.commit().map_err(db_err)?;
        Ok(Self { db: Arc::new(db) })
    }
}

#[async_trait]
impl BookmarkStore for RedbStore {
    async fn upsert_many(&self, items: &[Bookmark]) -> Result<(), StoreError> {
        if items.is_empty() {
            return Ok(());
        }
        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            let json = serde_json::to_string(item).map_err(|e| StoreError::Corrupt {
                key: item.key.clone(),
                reason: e.to_string(),
            })?;
            rows.push((item.key.clone(), json));
        }
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let txn = db.begin_write().map_err(db_err)?;
            {
                let mut table = txn.open_table(BOOKMARKS).map_err(db_err)?;
                for (key, json) in &rows {
                    table.insert(key.as_str(), json.as_str()).map_err(db_err)?;
                }
            }
            txn.commit().map_err(db_err)
        })
        .await
        .map_err(db_err)?
    }

    async fn delete_many(&self, keys: &[String]) -> Result<(), StoreError> {
        if keys.is_empty() {
            return Ok(());
        }
        let db = self.db.clone();
        let keys = keys.to_vec();
        tokio::task::spawn_blocking(move || {
            let txn = db.begin_write().map_err(db_err)?;
            {
                let mut table = txn.open_table(BOOKMARKS).map_err(db_err)?;
                for key in &keys {
                    table.remove(key.as_str()).map_err(db_err)?;
                }
            }
            txn.commit().map_err(db_err)
        })
        .await
        .map_err(db_err)?
    }

    async fn scan_all(&self) -> Result<Vec<Bookmark>, StoreError> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let txn = db.begin_read().map_err(db_err)?;
            let table = txn.open_table(BOOKMARKS).map_err(db_err)?;
            let mut items = Vec::new();
            for row in table.iter().map_err(db_err)? {
                let (key, value) = row.map_err(db_err)?;
                let item: Bookmark =
                    serde_json::from_str(value.value()).map_err(|e| StoreError::Corrupt {
                        key: key.value().to_string(),
                        reason: e.to_string(),
                    })?;
                items.push(item);
            }
            Ok(items)
        })
        .await
        .map_err(db_err)?
    }

    async fn get_flag(&self, name: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        let db = self.db.clone();
        let name = name.to_string();
        tokio::task::spawn_blocking(move || {
            let txn = db.begin_read().map_err(db_err)?;
            let table = txn.open_table(FLAGS).map_err(db_err)?;
            let Some(raw) = table.get(name.as_str()).map_err(db_err)? else {
                return Ok(None);
            };
            let millis = raw.value();
            match Utc.timestamp_millis_opt(millis).single() {
                Some(at) => Ok(Some(at)),
                None => Err(StoreError::Corrupt {
                    key: name.clone(),
                    reason: format!("timestamp out of range: {millis}"),
                }),
            }
        })
        .await
        .map_err(db_err)?
    }

    async fn set_flag(&self, name: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let db = self.db.clone();
        let name = name.to_string();
        let millis = at.timestamp_millis();
        tokio::task::spawn_blocking(move || {
            let txn = db.begin_write().map_err(db_err)?;
            {
                let mut table = txn.open_table(FLAGS).map_err(db_err)?;
                table.insert(name.as_str(), millis).map_err(db_err)?;
            }
            txn.commit().map_err(db_err)
        })
        .await
        .map_err(db_err)?
    }
}
