//! Failure classes for sync attempts.

use crate::store::StoreError;

/// What went wrong with a sync attempt.
///
/// The engine is the sole classifier: the reconciler and the fetch queue
/// pass these through untouched, and the engine decides what each class
/// means for the published status.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The remote rejected our credentials. Recoverable through the
    /// reauthentication poll loop.
    #[error("remote rejected credentials")]
    AuthExpired,
    /// The attempt was superseded or torn down. Never user-visible.
    #[error("sync attempt aborted")]
    Aborted,
    /// Any other remote failure. Surfaced as-is; retry is manual.
    #[error("remote error: {0}")]
    Remote(String),
    /// Local cache failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SyncError {
    pub fn remote(msg: impl Into<String>) -> Self {
        SyncError::Remote(msg.into())
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(self, SyncError::AuthExpired)
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, SyncError::Aborted)
    }
}
