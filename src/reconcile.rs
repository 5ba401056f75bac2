//! Page-walk reconciliation between the local key set and the remote.
//!
//! Two modes share one loop:
//!
//! - **Incremental** trusts the remote's newest-first ordering: the first
//!   page containing zero unknown items proves every later page is already
//!   known, so the walk stops there. It never computes staleness.
//! - **Full** walks every remote page regardless of overlap and reports as
//!   stale every known key that appeared on no page. Callers throttle how
//!   often they ask for it; the cost is one fetch per remote page.
//!
//! The early exit leans on the remote returning strictly newest-first pages
//! with no backfill. An item slipped in behind a fully-known page stays
//! invisible until the next full reconciliation.

use crate::error::SyncError;
use crate::item::Bookmark;
use crate::ports::PageFetcher;
use async_trait::async_trait;
use std::collections::HashSet;

/// What one reconciliation pass found.
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    /// Previously unknown items, in remote (newest-first) page order.
    pub new_items: Vec<Bookmark>,
    /// Known keys absent from every remote page. Full mode only.
    pub stale_keys: Vec<String>,
    /// Pages fetched. Always at least 1.
    pub pages_requested: usize,
}

/// Receives each page's new items while the walk is still running, so the
/// caller can persist incrementally instead of buffering the whole sync.
#[async_trait]
pub trait PageSink: Send {
    async fn on_page(&mut self, new_items: &[Bookmark]) -> Result<(), SyncError>;
}

/// Sink for callers that only want the final outcome.
pub struct DiscardPages;

#[async_trait]
impl PageSink for DiscardPages {
    async fn on_page(&mut self, _new_items: &[Bookmark]) -> Result<(), SyncError> {
        Ok(())
    }
}

/// Walk remote pages and report which items are new and, in full mode,
/// which known keys have vanished remotely.
///
/// Fetch failures propagate untouched; classifying them is the caller's
/// job. `sink.on_page` runs before the next page is requested, and only for
/// pages that contributed at least one new item.
pub async fn reconcile<F, S>(
    known_keys: &HashSet<String>,
    fetcher: &F,
    full: bool,
    sink: &mut S,
) -> Result<ReconcileOutcome, SyncError>
where
    F: PageFetcher + ?Sized,
    S: PageSink + ?Sized,
{
    let mut seen = known_keys.clone();
    let mut remote_keys: HashSet<String> = HashSet::new();
    let mut collected: Vec<Bookmark> = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = fetcher.fetch_page(cursor.as_deref()).await?;
        pages += 1;

        if full {
            remote_keys.extend(page.items.iter().map(|item| item.key.clone()));
        }

        let page_new: Vec<Bookmark> = page
            .items
            .into_iter()
            .filter(|item| !seen.contains(&item.key))
            .collect();

        tracing::debug!(page = pages, new = page_new.len(), full, "fetched page");

        if page_new.is_empty() {
            // Newest-first ordering: a fully-known page means everything
            // behind it is known too.
            if !full {
                break;
            }
        } else {
            seen.extend(page_new.iter().map(|item| item.key.clone()));
            sink.on_page(&page_new).await?;
            collected.extend(page_new);
        }

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    let mut stale_keys: Vec<String> = if full {
        known_keys.difference(&remote_keys).cloned().collect()
    } else {
        Vec::new()
    };
    stale_keys.sort();

    Ok(ReconcileOutcome {
        new_items: collected,
        stale_keys,
        pages_requested: pages,
    })
}
