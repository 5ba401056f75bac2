//! Shelfmark: a synchronization engine for a local bookmark mirror.
//!
//! Shelfmark keeps a persistent local cache consistent with a remote,
//! paginated bookmark collection that offers no push notifications. It
//! handles silently-expiring credentials, mutations observed passively on
//! the wire, optimistic local removal with rollback, and the bookkeeping
//! that decides when an exhaustive stale-detecting walk of the remote is
//! worth its cost.
//!
//! The core is I/O-free: the remote source, the local store, the mutation
//! observer, and credential renewal are all injected through the traits in
//! [`ports`]. [`engine::SyncEngine`] owns the mirrored state and is its
//! only writer; [`reconcile::reconcile`] is the pure page-walk algorithm
//! underneath it.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod eventlog;
pub mod item;
pub mod ports;
pub mod queue;
pub mod reconcile;
pub mod store;

pub use config::EngineConfig;
pub use engine::{SyncEngine, SyncStatus};
pub use error::SyncError;
pub use eventlog::BoundedEventLog;
pub use item::Bookmark;
pub use ports::{
    BookmarkStore, CredentialProbe, CredentialStatus, MutationEvent, MutationKind, MutationLog,
    Page, PageFetcher, RemoteSource,
};
pub use queue::FetchQueue;
pub use reconcile::{reconcile, DiscardPages, PageSink, ReconcileOutcome};
pub use store::{MemoryStore, RedbStore, StoreError};
