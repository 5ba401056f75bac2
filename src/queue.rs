//! Cancellable fetch queue, one per sync attempt.

use crate::error::SyncError;
use crate::ports::{Page, PageFetcher, RemoteSource};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

/// Serializes the page fetches of a single sync attempt and lets the owner
/// abort the whole sequence.
///
/// Abort wins every race: a queue aborted mid-fetch returns
/// [`SyncError::Aborted`], and a page that resolves after the abort is
/// discarded rather than handed to the caller. Queues are created fresh per
/// attempt; an aborted queue stays aborted.
pub struct FetchQueue {
    remote: Arc<dyn RemoteSource>,
    /// One fetch in flight at a time; pages are strictly sequential.
    serial: Mutex<()>,
    aborted: AtomicBool,
    abort_notify: Notify,
}

impl FetchQueue {
    pub fn new(remote: Arc<dyn RemoteSource>) -> Arc<Self> {
        Arc::new(Self {
            remote,
            serial: Mutex::new(()),
            aborted: AtomicBool::new(false),
            abort_notify: Notify::new(),
        })
    }

    /// Stop the attempt: the current and all future fetches fail with
    /// [`SyncError::Aborted`].
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        self.abort_notify.notify_waiters();
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for FetchQueue {
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page, SyncError> {
        let _serial = self.serial.lock().await;

        // Register for the abort signal before checking the flag, so an
        // abort landing in between still wakes the select below.
        let aborted = self.abort_notify.notified();
        tokio::pin!(aborted);
        aborted.as_mut().enable();
        if self.is_aborted() {
            return Err(SyncError::Aborted);
        }

        let page = tokio::select! {
            _ = &mut aborted => return Err(SyncError::Aborted),
            page = self.remote.fetch_page(cursor) => page?,
        };

        // The fetch may have resolved in the same poll as the abort; a late
        // page from an aborted attempt is discarded, not returned.
        if self.is_aborted() {
            return Err(SyncError::Aborted);
        }
        Ok(page)
    }
}
