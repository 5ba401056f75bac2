//! Port traits for the engine's external collaborators.
//!
//! Everything the engine talks to is injected through one of these traits:
//! the paginated remote source, the passively-maintained mutation log, the
//! local cache, and the credential-renewal probe. The engine owns no I/O of
//! its own, which is what keeps the whole sync path testable with scripted
//! collaborators.

use crate::error::SyncError;
use crate::item::Bookmark;
use crate::store::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One page of remote results, newest first.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<Bookmark>,
    /// Opaque token for the next page. `None` on the last page.
    pub next_cursor: Option<String>,
}

/// What a passively-observed remote mutation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Created,
    Deleted,
}

/// A mutation observed on the remote, outside this engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationEvent {
    pub id: String,
    pub kind: MutationKind,
    /// Remote identity of the touched item. Empty when the observer could
    /// not recover it from the intercepted payload.
    pub item_key: String,
    pub observed_at: DateTime<Utc>,
    /// Where the observer saw it. Informational only.
    pub source: String,
}

impl MutationEvent {
    /// Observer-side constructor: fresh id, observation time of now.
    pub fn observed(
        kind: MutationKind,
        item_key: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            item_key: item_key.into(),
            observed_at: Utc::now(),
            source: source.into(),
        }
    }

    /// True when the observer failed to recover the item identity.
    pub fn missing_key(&self) -> bool {
        self.item_key.is_empty()
    }
}

/// Credential state reported by the renewal collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialStatus {
    pub has_credentials: bool,
    pub has_remote_identity: bool,
}

impl CredentialStatus {
    /// Both halves present, so a retry is worthwhile.
    pub fn ready(&self) -> bool {
        self.has_credentials && self.has_remote_identity
    }
}

/// Paginated read access to the remote collection.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one page. `None` asks for the newest page.
    ///
    /// Implementations must fail with [`SyncError::AuthExpired`] when the
    /// remote rejects credentials, and [`SyncError::Remote`] otherwise.
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page, SyncError>;
}

/// The full remote collaborator: paginated reads plus the delete call used
/// by optimistic removal.
#[async_trait]
pub trait RemoteSource: PageFetcher {
    async fn delete_item(&self, key: &str) -> Result<(), SyncError>;
}

/// The observer-maintained mutation log.
///
/// Bounded FIFO: the observer drops the oldest entries at capacity. The
/// engine only drains and acknowledges; it never writes.
#[async_trait]
pub trait MutationLog: Send + Sync {
    /// Every pending event, oldest first.
    async fn read(&self) -> Vec<MutationEvent>;
    /// Remove the given ids so they are never reprocessed.
    async fn acknowledge(&self, ids: &[String]);
}

/// Local persistent cache of the mirrored collection.
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    async fn upsert_many(&self, items: &[Bookmark]) -> Result<(), StoreError>;
    async fn delete_many(&self, keys: &[String]) -> Result<(), StoreError>;
    async fn scan_all(&self) -> Result<Vec<Bookmark>, StoreError>;
    /// Durable named timestamps, see [`crate::store::FLAG_LAST_SYNC`] and
    /// [`crate::store::FLAG_LAST_FULL_RECONCILE`].
    async fn get_flag(&self, name: &str) -> Result<Option<DateTime<Utc>>, StoreError>;
    async fn set_flag(&self, name: &str, at: DateTime<Utc>) -> Result<(), StoreError>;
}

/// Credential-renewal collaborator.
///
/// Renewal itself happens elsewhere (a hidden login flow); the engine only
/// polls for its completion.
#[async_trait]
pub trait CredentialProbe: Send + Sync {
    /// Whether a renewal round is still in progress.
    async fn is_renewing(&self) -> bool;
    async fn check_status(&self) -> CredentialStatus;
}
