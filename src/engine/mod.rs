//! The sync orchestrator.
//!
//! [`SyncEngine`] is the single owner of the mirrored bookmark set. Every
//! mutation funnels through its three entry points (`refresh`,
//! `apply_incoming_events`, `remove_item`), so the in-memory list, the
//! persistent cache, and the published status cannot disagree about who
//! writes what.

pub mod events;
pub mod status;

pub use status::SyncStatus;

use crate::config::EngineConfig;
use crate::error::SyncError;
use crate::item::{self, Bookmark};
use crate::ports::{BookmarkStore, CredentialProbe, MutationLog, RemoteSource};
use crate::queue::FetchQueue;
use crate::reconcile::{reconcile, PageSink, ReconcileOutcome};
use crate::store::{FLAG_LAST_FULL_RECONCILE, FLAG_LAST_SYNC};
use async_recursion::async_recursion;
use async_trait::async_trait;
use chrono::Utc;
use status::StatusCell;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tokio_stream::wrappers::WatchStream;

/// Orchestrates reconciliation between the remote collection and the local
/// cache. See the module docs for the ownership rules.
pub struct SyncEngine {
    remote: Arc<dyn RemoteSource>,
    store: Arc<dyn BookmarkStore>,
    log: Arc<dyn MutationLog>,
    credentials: Arc<dyn CredentialProbe>,
    config: EngineConfig,

    /// Current mirror, always sorted newest-first.
    items: RwLock<Vec<Bookmark>>,
    status: StatusCell,
    /// Single-flight guard: at most one sync attempt at a time.
    syncing: AtomicBool,
    /// Re-entrancy guard for event application.
    events_flight: AtomicBool,
    /// Fetch queue of the attempt currently in flight, if any.
    active_queue: Mutex<Option<Arc<FetchQueue>>>,
    /// Set on teardown; new refreshes abort immediately.
    shutdown: AtomicBool,
}

/// Clears the single-flight flag when the attempt scope ends.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SyncEngine {
    pub fn new(
        remote: Arc<dyn RemoteSource>,
        store: Arc<dyn BookmarkStore>,
        log: Arc<dyn MutationLog>,
        credentials: Arc<dyn CredentialProbe>,
        config: EngineConfig,
    ) -> Self {
        Self {
            remote,
            store,
            log,
            credentials,
            config,
            items: RwLock::new(Vec::new()),
            status: StatusCell::new(),
            syncing: AtomicBool::new(false),
            events_flight: AtomicBool::new(false),
            active_queue: Mutex::new(None),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Sorted snapshot of the current mirror.
    pub async fn items(&self) -> Vec<Bookmark> {
        self.items.read().await.clone()
    }

    pub async fn total(&self) -> usize {
        self.items.read().await.len()
    }

    pub fn status(&self) -> SyncStatus {
        self.status.get()
    }

    /// Watch every status transition.
    pub fn watch_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// Status transitions as a stream, for render loops.
    pub fn status_stream(&self) -> WatchStream<SyncStatus> {
        self.status.stream()
    }

    /// Populate the in-memory mirror from the persistent cache.
    ///
    /// Run once at cold start, before the first refresh, so cached items
    /// render while the network is still quiet. No status transition: the
    /// engine stays `Idle` until a refresh begins.
    pub async fn load_cache(&self) -> Result<usize, SyncError> {
        let mut cached = self.store.scan_all().await?;
        cached.sort_by(Bookmark::newest_first);
        let total = cached.len();
        *self.items.write().await = cached;
        tracing::info!(total, "loaded cached bookmarks");
        Ok(total)
    }

    /// Abort the in-flight sync attempt, if any. The attempt stops at its
    /// next fetch boundary and late pages are discarded.
    pub async fn abort_active(&self) {
        if let Some(queue) = self.active_queue.lock().await.take() {
            queue.abort();
        }
    }

    /// Tear the engine down: abort the active attempt and refuse new ones.
    pub async fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.abort_active().await;
    }

    /// Synchronize with the remote.
    ///
    /// Incremental mode stops at the first fully-known page; `full_reconcile`
    /// walks every remote page and purges entries that vanished remotely.
    /// Full runs are throttled: inside the configured window a full request
    /// silently downgrades to incremental, which bounds the exhaustive walk
    /// to once per window no matter how often callers ask.
    ///
    /// At most one refresh runs at a time. A call made while one is in
    /// flight returns `Ok` immediately without doing anything; it does not
    /// queue a second attempt.
    pub async fn refresh(&self, full_reconcile: bool) -> Result<(), SyncError> {
        self.refresh_inner(full_reconcile, true).await
    }

    #[async_recursion]
    async fn refresh_inner(&self, full_reconcile: bool, allow_reauth: bool) -> Result<(), SyncError> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(SyncError::Aborted);
        }
        if self.syncing.swap(true, Ordering::SeqCst) {
            tracing::debug!("refresh already in flight, coalescing");
            return Ok(());
        }

        let attempt = {
            let _flight = FlightGuard(&self.syncing);
            self.run_attempt(full_reconcile).await
        };

        match attempt {
            Ok(()) => Ok(()),
            Err(e) if e.is_aborted() => {
                // Superseded or torn down: no status transition, no retry.
                tracing::debug!("sync attempt aborted");
                Err(e)
            }
            Err(e) if e.is_auth_expired() && allow_reauth => {
                self.status.set(SyncStatus::reconnecting());
                if self.await_reauthentication().await {
                    tracing::info!("credentials renewed, retrying sync");
                    self.refresh_inner(full_reconcile, false).await
                } else {
                    self.status.set(SyncStatus::Error {
                        message: e.to_string(),
                    });
                    Err(e)
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "sync failed");
                self.status.set(SyncStatus::Error {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// One sync attempt: decide the mode, walk pages through a fresh fetch
    /// queue, purge stale entries, stamp flags, publish `Done`.
    async fn run_attempt(&self, full_requested: bool) -> Result<(), SyncError> {
        let full = self.effective_mode(full_requested).await?;

        let starting_total = self.total().await;
        self.status.set(SyncStatus::Syncing {
            total: starting_total,
        });

        let queue = FetchQueue::new(self.remote.clone());
        *self.active_queue.lock().await = Some(queue.clone());

        let walked = self.run_reconcile(&queue, full).await;

        {
            let mut active = self.active_queue.lock().await;
            if active.as_ref().map_or(false, |q| Arc::ptr_eq(q, &queue)) {
                *active = None;
            }
        }

        let outcome = walked?;
        if queue.is_aborted() {
            // The abort landed after the last page resolved; drop the
            // attempt without purging, stamping, or publishing.
            return Err(SyncError::Aborted);
        }

        if full && !outcome.stale_keys.is_empty() {
            self.store.delete_many(&outcome.stale_keys).await?;
            let mut items = self.items.write().await;
            items.retain(|b| !outcome.stale_keys.contains(&b.key));
            drop(items);
            tracing::info!(
                purged = outcome.stale_keys.len(),
                "purged remotely-deleted bookmarks"
            );
        }

        let now = Utc::now();
        self.store.set_flag(FLAG_LAST_SYNC, now).await?;
        if full {
            self.store.set_flag(FLAG_LAST_FULL_RECONCILE, now).await?;
        }

        let total = self.total().await;
        self.status.set(SyncStatus::Done { total });
        tracing::info!(
            new = outcome.new_items.len(),
            stale = outcome.stale_keys.len(),
            pages = outcome.pages_requested,
            total,
            full,
            "sync finished"
        );
        Ok(())
    }

    /// Full reconciliation costs one fetch per remote page, so inside the
    /// throttle window a full request quietly downgrades to incremental.
    async fn effective_mode(&self, full_requested: bool) -> Result<bool, SyncError> {
        if !full_requested {
            return Ok(false);
        }
        let window = self.config.full_reconcile_window();
        match self.store.get_flag(FLAG_LAST_FULL_RECONCILE).await? {
            Some(last) if Utc::now().signed_duration_since(last) < window => {
                tracing::debug!(%last, "full reconcile throttled, running incremental");
                Ok(false)
            }
            _ => Ok(true),
        }
    }

    async fn run_reconcile(
        &self,
        queue: &Arc<FetchQueue>,
        full: bool,
    ) -> Result<ReconcileOutcome, SyncError> {
        let known = self.known_keys().await;
        let mut sink = PersistSink {
            engine: self,
            queue,
        };
        reconcile(&known, queue.as_ref(), full, &mut sink).await
    }

    async fn known_keys(&self) -> HashSet<String> {
        self.items
            .read()
            .await
            .iter()
            .map(|b| b.key.clone())
            .collect()
    }

    /// Wait out a credential renewal: poll the probe on a fixed tick, up to
    /// the configured cap. True means credentials and the remote identity
    /// are back and a retry is worthwhile.
    async fn await_reauthentication(&self) -> bool {
        let interval = self.config.reauth_poll_interval();
        for attempt in 1..=self.config.reauth_max_attempts {
            tokio::time::sleep(interval).await;
            if self.shutdown.load(Ordering::SeqCst) {
                return false;
            }
            if self.credentials.is_renewing().await {
                tracing::debug!(attempt, "credential renewal still in progress");
                continue;
            }
            let status = self.credentials.check_status().await;
            if status.ready() {
                return true;
            }
            tracing::debug!(attempt, ?status, "credentials not ready yet");
        }
        tracing::warn!(
            attempts = self.config.reauth_max_attempts,
            "gave up waiting for credential renewal"
        );
        false
    }

    /// Optimistically remove one bookmark: local state and cache first,
    /// then the remote delete. A remote failure rolls the item back into
    /// its sorted slot and re-raises the error.
    pub async fn remove_item(&self, key: &str) -> Result<(), SyncError> {
        let removed = {
            let mut items = self.items.write().await;
            item::remove_by_key(&mut items, key)
        };

        let key_vec = [key.to_string()];
        if let Err(e) = self.store.delete_many(&key_vec).await {
            if let Some(item) = removed {
                let mut items = self.items.write().await;
                item::merge_sorted(&mut items, item);
            }
            return Err(e.into());
        }

        match self.remote.delete_item(key).await {
            Ok(()) => {
                let total = self.total().await;
                self.status.set(SyncStatus::Done { total });
                tracing::info!(key, total, "removed bookmark");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "remote delete failed, rolling back");
                if let Some(item) = removed {
                    {
                        let mut items = self.items.write().await;
                        item::merge_sorted(&mut items, item.clone());
                    }
                    if let Err(store_err) =
                        self.store.upsert_many(std::slice::from_ref(&item)).await
                    {
                        tracing::error!(key, error = %store_err, "rollback write failed");
                        return Err(store_err.into());
                    }
                }
                Err(e)
            }
        }
    }

    /// Apply deletes whose keys the observer recovered: targeted removals,
    /// no network round-trip.
    pub(crate) async fn apply_observed_deletes(&self, keys: &[String]) -> Result<(), SyncError> {
        self.store.delete_many(keys).await?;
        let total = {
            let mut items = self.items.write().await;
            items.retain(|b| !keys.contains(&b.key));
            items.len()
        };
        self.status.set(SyncStatus::Done { total });
        tracing::info!(removed = keys.len(), total, "applied observed deletes");
        Ok(())
    }
}

/// Persists each page and folds it into the mirror while the walk runs, so
/// an aborted sync still keeps everything merged up to the abort point.
struct PersistSink<'a> {
    engine: &'a SyncEngine,
    queue: &'a Arc<FetchQueue>,
}

#[async_trait]
impl PageSink for PersistSink<'_> {
    async fn on_page(&mut self, new_items: &[Bookmark]) -> Result<(), SyncError> {
        // A page that raced an abort is discarded, not merged.
        if self.queue.is_aborted() {
            return Err(SyncError::Aborted);
        }
        self.engine.store.upsert_many(new_items).await?;
        let total = {
            let mut items = self.engine.items.write().await;
            item::merge_sorted_all(&mut items, new_items.iter().cloned());
            items.len()
        };
        self.engine.status.set(SyncStatus::Syncing { total });
        Ok(())
    }
}
