//! shelfmark-seed: Load bookmarks from a JSON export into a cache database
//!
//! Input is a JSON array of bookmark objects:
//!   [{"key": "b1", "ordering_key": "0042", "payload": {"title": "..."}}]
//!
//! Rows without a key, or that fail to parse, are skipped with a warning.
//! Useful for development and for rebuilding a cache from an export.

use clap::Parser;
use shelfmark::cli::SeedArgs;
use shelfmark::item::Bookmark;
use shelfmark::ports::BookmarkStore;
use shelfmark::store::RedbStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = SeedArgs::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let raw = std::fs::read_to_string(&args.input)?;
    let rows: Vec<serde_json::Value> = serde_json::from_str(&raw)?;

    let mut items = Vec::with_capacity(rows.len());
    let mut skipped = 0usize;
    for row in rows {
        match serde_json::from_value::<Bookmark>(row) {
            Ok(item) if !item.key.is_empty() => items.push(item),
            Ok(_) => {
                skipped += 1;
                tracing::warn!("skipping bookmark with empty key");
            }
            Err(e) => {
                skipped += 1;
                tracing::warn!(error = %e, "skipping malformed bookmark");
            }
        }
    }

    let store = RedbStore::open(&args.database)?;
    store.upsert_many(&items).await?;

    tracing::info!(
        loaded = items.len(),
        skipped,
        database = %args.database.display(),
        "seeded cache"
    );
    Ok(())
}
