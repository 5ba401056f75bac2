//! In-memory [`BookmarkStore`] for tests and ephemeral embedders.

use crate::item::Bookmark;
use crate::ports::BookmarkStore;
use crate::store::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, Bookmark>>,
    flags: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookmarkStore for MemoryStore {
    async fn upsert_many(&self, items: &[Bookmark]) -> Result<(), StoreError> {
        let mut map = self.items.write().await;
        for item in items {
            map.insert(item.key.clone(), item.clone());
        }
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<(), StoreError> {
        let mut map = self.items.write().await;
        for key in keys {
            map.remove(key);
        }
        Ok(())
    }

    async fn scan_all(&self) -> Result<Vec<Bookmark>, StoreError> {
        Ok(self.items.read().await.values().cloned().collect())
    }

    async fn get_flag(&self, name: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.flags.read().await.get(name).copied())
    }

    async fn set_flag(&self, name: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.flags.write().await.insert(name.to_string(), at);
        Ok(())
    }
}
