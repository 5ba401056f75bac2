//! shelfmark-cache: Inspect a shelfmark cache database
//!
//! Usage:
//!   shelfmark-cache --database cache.redb list         # Newest first
//!   shelfmark-cache --database cache.redb list -n 10   # First 10 items
//!   shelfmark-cache --database cache.redb flags        # Sync timestamps
//!   shelfmark-cache --database cache.redb count
//!   shelfmark-cache --json ...                         # Machine-readable

use chrono::{DateTime, Utc};
use clap::Parser;
use shelfmark::cli::{CacheArgs, CacheCommand};
use shelfmark::item::Bookmark;
use shelfmark::ports::BookmarkStore;
use shelfmark::store::{RedbStore, FLAG_LAST_FULL_RECONCILE, FLAG_LAST_SYNC};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CacheArgs::parse();

    let store = match RedbStore::open(&args.database) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Failed to open {}: {}", args.database.display(), e);
            std::process::exit(1);
        }
    };

    match args.command {
        CacheCommand::List { limit } => {
            let mut items = store.scan_all().await?;
            items.sort_by(Bookmark::newest_first);
            if let Some(limit) = limit {
                items.truncate(limit);
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                for item in &items {
                    println!("{}  {}  {}", item.ordering_key, item.key, title_of(item));
                }
                println!("{} bookmarks", items.len());
            }
        }
        CacheCommand::Flags => {
            let last_sync = store.get_flag(FLAG_LAST_SYNC).await?;
            let last_full = store.get_flag(FLAG_LAST_FULL_RECONCILE).await?;
            if args.json {
                let output = serde_json::json!({
                    "last_sync": last_sync,
                    "last_full_reconcile": last_full,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("last_sync:            {}", format_flag(last_sync));
                println!("last_full_reconcile:  {}", format_flag(last_full));
            }
        }
        CacheCommand::Count => {
            let count = store.scan_all().await?.len();
            if args.json {
                println!("{}", serde_json::json!({ "count": count }));
            } else {
                println!("{}", count);
            }
        }
    }

    Ok(())
}

fn title_of(item: &Bookmark) -> &str {
    item.payload
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or("-")
}

fn format_flag(flag: Option<DateTime<Utc>>) -> String {
    flag.map(|at| at.to_rfc3339())
        .unwrap_or_else(|| "never".to_string())
}
