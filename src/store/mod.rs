//! Local cache adapters.
//!
//! The engine talks to storage through [`crate::ports::BookmarkStore`];
//! this module ships the two implementations an embedder needs: a durable
//! redb-backed cache and an in-memory store for tests and throwaway runs.

pub mod memory;
pub mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

/// Durable flag recording the end of the last successful sync.
pub const FLAG_LAST_SYNC: &str = "last_sync";
/// Durable flag recording when the last full reconciliation finished.
pub const FLAG_LAST_FULL_RECONCILE: &str = "last_full_reconcile";

/// Local cache failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("corrupt record for {key}: {reason}")]
    Corrupt { key: String, reason: String },
}
