use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_full_reconcile_interval_ms() -> u64 {
    4 * 60 * 60 * 1000
}

fn default_reauth_poll_interval_ms() -> u64 {
    2_000
}

fn default_reauth_max_attempts() -> u32 {
    15
}

fn default_event_log_capacity() -> usize {
    256
}

/// Timing and retry parameters for [`crate::engine::SyncEngine`].
///
/// Every field has a serde default, so embedders can deserialize a partial
/// configuration (or `{}`) and get the stock behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum spacing between full reconciliations, in milliseconds.
    /// Full requests inside this window downgrade to incremental.
    #[serde(default = "default_full_reconcile_interval_ms")]
    pub full_reconcile_interval_ms: u64,
    /// Tick of the reauthentication poll loop, in milliseconds.
    #[serde(default = "default_reauth_poll_interval_ms")]
    pub reauth_poll_interval_ms: u64,
    /// Hard cap on reauthentication poll ticks before giving up.
    #[serde(default = "default_reauth_max_attempts")]
    pub reauth_max_attempts: u32,
    /// Capacity of the bounded mutation-event log.
    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            full_reconcile_interval_ms: default_full_reconcile_interval_ms(),
            reauth_poll_interval_ms: default_reauth_poll_interval_ms(),
            reauth_max_attempts: default_reauth_max_attempts(),
            event_log_capacity: default_event_log_capacity(),
        }
    }
}

impl EngineConfig {
    /// The full-reconciliation throttle window as a signed duration, for
    /// comparison against flag timestamps.
    pub fn full_reconcile_window(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.full_reconcile_interval_ms as i64)
    }

    pub fn reauth_poll_interval(&self) -> Duration {
        Duration::from_millis(self.reauth_poll_interval_ms)
    }
}
