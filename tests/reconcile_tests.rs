//! Integration tests for the page-walk reconciliation algorithm.

use async_trait::async_trait;
use shelfmark::reconcile::{reconcile, DiscardPages};
use shelfmark::{Bookmark, Page, PageFetcher, SyncError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Serves a fixed page script; the cursor is the page index.
struct ScriptedRemote {
    pages: Vec<Vec<Bookmark>>,
    fetches: AtomicUsize,
}

impl ScriptedRemote {
    fn new(script: &[&[&str]]) -> Self {
        let pages = script
            .iter()
            .map(|page| page.iter().map(|k| Bookmark::new(*k, *k)).collect())
            .collect();
        Self {
            pages,
            fetches: AtomicUsize::new(0),
        }
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for ScriptedRemote {
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page, SyncError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let idx: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
        let items = self.pages.get(idx).cloned().unwrap_or_default();
        let next_cursor = if idx + 1 < self.pages.len() {
            Some((idx + 1).to_string())
        } else {
            None
        };
        Ok(Page { items, next_cursor })
    }
}

/// Generates `total` items at `page_size` on the fly, newest first, with
/// zero-padded keys. Item index 0 is the newest.
struct GeneratedRemote {
    total: usize,
    page_size: usize,
    fetches: AtomicUsize,
}

impl GeneratedRemote {
    fn key(i: usize) -> String {
        format!("item-{i:05}")
    }

    fn ordering_key(&self, i: usize) -> String {
        format!("{:05}", self.total - i)
    }
}

#[async_trait]
impl PageFetcher for GeneratedRemote {
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page, SyncError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let start: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
        let end = (start + self.page_size).min(self.total);
        let items = (start..end)
            .map(|i| Bookmark::new(Self::key(i), self.ordering_key(i)))
            .collect();
        let next_cursor = if end < self.total {
            Some(end.to_string())
        } else {
            None
        };
        Ok(Page { items, next_cursor })
    }
}

fn known(keys: &[&str]) -> HashSet<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

fn new_keys(items: &[Bookmark]) -> Vec<&str> {
    items.iter().map(|b| b.key.as_str()).collect()
}

/// Local fully covers page one; the walk must stop there even though a
/// later page holds an unseen item.
#[tokio::test]
async fn test_incremental_no_changes_stops_at_page_one() {
    let remote = ScriptedRemote::new(&[&["1", "2"], &["3"]]);
    let outcome = reconcile(&known(&["1", "2"]), &remote, false, &mut DiscardPages)
        .await
        .unwrap();
    assert!(outcome.new_items.is_empty());
    assert_eq!(outcome.pages_requested, 1);
    assert_eq!(remote.fetches(), 1, "must not fetch past the known page");
}

/// Page one still contributes an unknown item, so the walk continues and
/// picks up everything behind it.
#[tokio::test]
async fn test_incremental_collects_new_items_in_page_order() {
    let remote = ScriptedRemote::new(&[&["2", "1"], &["3"]]);
    let outcome = reconcile(&known(&["1"]), &remote, false, &mut DiscardPages)
        .await
        .unwrap();
    assert_eq!(new_keys(&outcome.new_items), vec!["2", "3"]);
    assert_eq!(outcome.pages_requested, 2);
}

/// Full mode reports the key that appeared on no remote page.
#[tokio::test]
async fn test_full_reports_vanished_key_as_stale() {
    let remote = ScriptedRemote::new(&[&["1", "2"]]);
    let outcome = reconcile(&known(&["1", "2", "stale"]), &remote, true, &mut DiscardPages)
        .await
        .unwrap();
    assert!(outcome.new_items.is_empty());
    assert_eq!(outcome.stale_keys, vec!["stale"]);
}

/// Empty local set against an empty remote still costs one page fetch.
#[tokio::test]
async fn test_full_empty_both_sides() {
    let remote = ScriptedRemote::new(&[&[]]);
    let outcome = reconcile(&known(&[]), &remote, true, &mut DiscardPages)
        .await
        .unwrap();
    assert!(outcome.new_items.is_empty());
    assert!(outcome.stale_keys.is_empty());
    assert!(outcome.pages_requested >= 1);
}

/// Incremental mode never computes staleness, even when the remote is
/// missing known keys.
#[tokio::test]
async fn test_incremental_never_reports_stale() {
    let remote = ScriptedRemote::new(&[&["1"]]);
    let outcome = reconcile(&known(&["1", "gone"]), &remote, false, &mut DiscardPages)
        .await
        .unwrap();
    assert!(outcome.stale_keys.is_empty());
}

/// Empty remote in incremental mode: one fetch, nothing new, no staleness.
#[tokio::test]
async fn test_incremental_empty_remote() {
    let remote = ScriptedRemote::new(&[&[]]);
    let outcome = reconcile(&known(&["1", "2"]), &remote, false, &mut DiscardPages)
        .await
        .unwrap();
    assert!(outcome.new_items.is_empty());
    assert!(outcome.stale_keys.is_empty());
    assert_eq!(outcome.pages_requested, 1);
}

/// Empty remote in full mode: every known key is stale.
#[tokio::test]
async fn test_full_empty_remote_marks_everything_stale() {
    let remote = ScriptedRemote::new(&[&[]]);
    let outcome = reconcile(&known(&["1", "2"]), &remote, true, &mut DiscardPages)
        .await
        .unwrap();
    assert_eq!(outcome.stale_keys, vec!["1", "2"]);
}

/// Full mode walks every page exactly once even with perfect overlap.
#[tokio::test]
async fn test_full_visits_every_page_once() {
    let remote = ScriptedRemote::new(&[&["4", "3"], &["2"], &["1"]]);
    let outcome = reconcile(
        &known(&["4", "3", "2", "1"]),
        &remote,
        true,
        &mut DiscardPages,
    )
    .await
    .unwrap();
    assert!(outcome.new_items.is_empty());
    assert!(outcome.stale_keys.is_empty());
    assert_eq!(outcome.pages_requested, 3);
    assert_eq!(remote.fetches(), 3);
}

/// Back-to-back runs against an unchanged remote are both clean no-ops.
#[tokio::test]
async fn test_reconcile_twice_is_idempotent() {
    for full in [false, true] {
        let remote = ScriptedRemote::new(&[&["2", "1"]]);
        let local = known(&["2", "1"]);
        for _ in 0..2 {
            let outcome = reconcile(&local, &remote, full, &mut DiscardPages)
                .await
                .unwrap();
            assert!(outcome.new_items.is_empty(), "full={full}");
            assert!(outcome.stale_keys.is_empty(), "full={full}");
        }
    }
}

/// 10,000 remote items, the oldest 5,000 already known, pages of 100: full
/// mode walks all 100 pages and reports the newer 5,000 as new.
#[tokio::test]
async fn test_load_full_walks_all_hundred_pages() {
    let remote = GeneratedRemote {
        total: 10_000,
        page_size: 100,
        fetches: AtomicUsize::new(0),
    };
    let local: HashSet<String> = (5_000..10_000).map(GeneratedRemote::key).collect();
    let outcome = reconcile(&local, &remote, true, &mut DiscardPages)
        .await
        .unwrap();
    assert_eq!(outcome.pages_requested, 100);
    assert_eq!(remote.fetches.load(Ordering::SeqCst), 100);
    assert_eq!(outcome.new_items.len(), 5_000);
    assert!(outcome.stale_keys.is_empty());
}

/// Known keys interleaved on every page keep incremental mode walking: all
/// 100 pages fetched, 5,000 new.
#[tokio::test]
async fn test_load_incremental_interleaved_walks_everything() {
    let remote = GeneratedRemote {
        total: 10_000,
        page_size: 100,
        fetches: AtomicUsize::new(0),
    };
    let local: HashSet<String> = (0..10_000)
        .filter(|i| i % 2 == 1)
        .map(GeneratedRemote::key)
        .collect();
    let outcome = reconcile(&local, &remote, false, &mut DiscardPages)
        .await
        .unwrap();
    assert_eq!(outcome.pages_requested, 100);
    assert_eq!(outcome.new_items.len(), 5_000);
}

/// With the known half at the tail, incremental mode stops at the first
/// fully-known page: 51 fetches, not 100.
#[tokio::test]
async fn test_load_incremental_early_exits_at_first_known_page() {
    let remote = GeneratedRemote {
        total: 10_000,
        page_size: 100,
        fetches: AtomicUsize::new(0),
    };
    let local: HashSet<String> = (5_000..10_000).map(GeneratedRemote::key).collect();
    let outcome = reconcile(&local, &remote, false, &mut DiscardPages)
        .await
        .unwrap();
    assert_eq!(outcome.new_items.len(), 5_000);
    assert_eq!(outcome.pages_requested, 51);
    assert_eq!(remote.fetches.load(Ordering::SeqCst), 51);
}
