//! Bounded in-memory mutation-event log.
//!
//! The passive observer pushes every mutation it intercepts; the engine
//! drains and acknowledges. The log is FIFO with a hard capacity: at
//! capacity the oldest entries fall off first. Losing an old event degrades
//! into "picked up by the next sync", never corruption, so dropping beats
//! unbounded growth.

use crate::ports::{MutationEvent, MutationLog};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

pub const DEFAULT_LOG_CAPACITY: usize = 256;

pub struct BoundedEventLog {
    entries: Mutex<VecDeque<MutationEvent>>,
    capacity: usize,
    changed: Notify,
}

impl BoundedEventLog {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            changed: Notify::new(),
        })
    }

    pub fn with_default_capacity() -> Arc<Self> {
        Self::new(DEFAULT_LOG_CAPACITY)
    }

    /// Observer side: append one event, dropping the oldest at capacity.
    pub async fn push(&self, event: MutationEvent) {
        let mut entries = self.entries.lock().await;
        while entries.len() >= self.capacity {
            if let Some(dropped) = entries.pop_front() {
                tracing::warn!(id = %dropped.id, "event log at capacity, dropping oldest");
            }
        }
        entries.push_back(event);
        drop(entries);
        self.changed.notify_one();
    }

    /// Wait until the observer pushes something. Embedders loop on this to
    /// pump [`crate::engine::SyncEngine::apply_incoming_events`].
    pub async fn changed(&self) {
        self.changed.notified().await;
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl MutationLog for BoundedEventLog {
    async fn read(&self) -> Vec<MutationEvent> {
        self.entries.lock().await.iter().cloned().collect()
    }

    async fn acknowledge(&self, ids: &[String]) {
        let mut entries = self.entries.lock().await;
        entries.retain(|event| !ids.contains(&event.id));
    }
}
