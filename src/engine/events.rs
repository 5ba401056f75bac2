//! Folding passively-observed mutations into the mirror.

use crate::engine::SyncEngine;
use crate::error::SyncError;
use crate::ports::MutationKind;
use std::collections::HashSet;
use std::sync::atomic::Ordering;

impl SyncEngine {
    /// Drain the mutation log and fold the observed changes in.
    ///
    /// Deletes that carry a usable key are applied directly: a delete is
    /// self-describing, no network round-trip needed. A batch of deletes
    /// where the observer recovered no identity at all falls back to an
    /// incremental refresh. Creates only prove that something new exists,
    /// so they always trigger an incremental refresh.
    ///
    /// Acknowledgment is per group: a failure in one group never blocks
    /// another group's acknowledgment, and events that were not applied
    /// stay pending for the next drain.
    ///
    /// Re-entrant calls are no-ops; the drain already running covers them.
    pub async fn apply_incoming_events(&self) -> Result<(), SyncError> {
        if self.events_flight.swap(true, Ordering::SeqCst) {
            tracing::debug!("event application already running, skipping");
            return Ok(());
        }
        let result = self.apply_events_inner().await;
        self.events_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn apply_events_inner(&self) -> Result<(), SyncError> {
        let events = self.log.read().await;
        if events.is_empty() {
            return Ok(());
        }
        tracing::info!(count = events.len(), "applying observed mutations");

        let mut delete_ids: Vec<String> = Vec::new();
        let mut delete_keys: HashSet<String> = HashSet::new();
        let mut create_ids: Vec<String> = Vec::new();

        for event in &events {
            match event.kind {
                MutationKind::Deleted => {
                    delete_ids.push(event.id.clone());
                    if !event.missing_key() {
                        delete_keys.insert(event.item_key.clone());
                    }
                }
                MutationKind::Created => create_ids.push(event.id.clone()),
            }
        }

        let mut first_err: Option<SyncError> = None;

        if !delete_keys.is_empty() {
            let keys: Vec<String> = delete_keys.into_iter().collect();
            match self.apply_observed_deletes(&keys).await {
                Ok(()) => self.log.acknowledge(&delete_ids).await,
                Err(e) => {
                    // Unacknowledged: the delete group retries next drain.
                    tracing::warn!(error = %e, "failed to apply observed deletes");
                    first_err = Some(e);
                }
            }
        } else if !delete_ids.is_empty() {
            // Every delete lacked identity; the best we can do is re-sync.
            self.fallback_refresh("deletes without identity").await;
            self.log.acknowledge(&delete_ids).await;
        }

        if !create_ids.is_empty() {
            // A create only proves existence; fetch to learn what it is.
            self.fallback_refresh("observed creates").await;
            self.log.acknowledge(&create_ids).await;
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Best-effort incremental refresh for events that cannot be applied
    /// directly. Its failures surface through the status channel; the
    /// triggering events are acknowledged either way, since replaying them
    /// later would just repeat the identical refresh.
    async fn fallback_refresh(&self, why: &str) {
        match self.refresh(false).await {
            Ok(()) => {}
            Err(e) if e.is_aborted() => tracing::debug!(why, "fallback refresh aborted"),
            Err(e) => tracing::warn!(why, error = %e, "fallback refresh failed"),
        }
    }
}
