//! Bookmark records and newest-first ordering helpers.
//!
//! The remote source stamps every item with an opaque `ordering_key`;
//! comparing those keys lexicographically descending yields newest-first
//! order, which is the only order the engine ever keeps. The helpers here
//! do ordered insertion so the in-memory list never needs a re-sort.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One saved bookmark.
///
/// `key` is the stable remote identity; exactly one record exists per key,
/// in memory and in the local cache alike. `ordering_key` is compared but
/// never parsed. Everything else the remote sends rides along in `payload`,
/// opaque to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub key: String,
    pub ordering_key: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Bookmark {
    pub fn new(key: impl Into<String>, ordering_key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ordering_key: ordering_key.into(),
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Newest-first comparison: descending by ordering key, with the item
    /// key as tiebreak so equal ordering keys still sort deterministically.
    pub fn newest_first(a: &Bookmark, b: &Bookmark) -> Ordering {
        b.ordering_key
            .cmp(&a.ordering_key)
            .then_with(|| b.key.cmp(&a.key))
    }
}

/// Insert `item` into a newest-first sorted list, keeping the order.
///
/// If the key is already present the existing record is replaced and
/// re-positioned, in case its ordering key changed.
pub fn merge_sorted(items: &mut Vec<Bookmark>, item: Bookmark) {
    if let Some(pos) = items.iter().position(|b| b.key == item.key) {
        items.remove(pos);
    }
    let at = items
        .binary_search_by(|probe| Bookmark::newest_first(probe, &item))
        .unwrap_or_else(|e| e);
    items.insert(at, item);
}

/// Merge a whole batch of items, preserving newest-first order throughout.
pub fn merge_sorted_all(items: &mut Vec<Bookmark>, batch: impl IntoIterator<Item = Bookmark>) {
    for item in batch {
        merge_sorted(items, item);
    }
}

/// Remove by key, returning the removed record for rollback bookkeeping.
pub fn remove_by_key(items: &mut Vec<Bookmark>, key: &str) -> Option<Bookmark> {
    items
        .iter()
        .position(|b| b.key == key)
        .map(|pos| items.remove(pos))
}
