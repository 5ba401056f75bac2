//! Sync status machine and its broadcast surface.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Message the reauthentication loop publishes while it waits.
pub const RECONNECTING: &str = "reconnecting";

/// Where a sync attempt currently stands.
///
/// Lifecycle: `Idle` at cold start, `Syncing` once a refresh begins (the
/// total grows as pages merge), `Done` on success, `Error` on unrecoverable
/// failure. The distinguished `Error { message: "reconnecting" }` means the
/// reauthentication loop is active and the condition is transient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncStatus {
    Idle,
    Syncing { total: usize },
    Done { total: usize },
    Error { message: String },
}

impl SyncStatus {
    pub fn reconnecting() -> Self {
        SyncStatus::Error {
            message: RECONNECTING.to_string(),
        }
    }

    /// True while the engine waits out a credential renewal.
    pub fn is_reconnecting(&self) -> bool {
        matches!(self, SyncStatus::Error { message } if message == RECONNECTING)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SyncStatus::Error { .. })
    }
}

/// Publisher half, owned by the engine.
pub(crate) struct StatusCell {
    tx: watch::Sender<SyncStatus>,
}

impl StatusCell {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(SyncStatus::Idle);
        Self { tx }
    }

    pub(crate) fn set(&self, status: SyncStatus) {
        // send_replace publishes even with zero receivers.
        let prev = self.tx.send_replace(status.clone());
        if prev != status {
            tracing::debug!(?status, "status");
        }
    }

    pub(crate) fn get(&self) -> SyncStatus {
        self.tx.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.tx.subscribe()
    }

    pub(crate) fn stream(&self) -> WatchStream<SyncStatus> {
        WatchStream::new(self.tx.subscribe())
    }
}
