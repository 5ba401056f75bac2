use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Arguments for `shelfmark-cache`.
#[derive(Parser, Debug)]
#[command(name = "shelfmark-cache", about = "Inspect a shelfmark cache database")]
pub struct CacheArgs {
    /// Path to the cache database
    #[arg(long, env = "SHELFMARK_DB", default_value = "shelfmark.redb")]
    pub database: PathBuf,

    /// Emit JSON instead of human-readable text
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// List cached bookmarks, newest first
    List {
        /// Limit output to the first N items
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Show the durable sync flags
    Flags,
    /// Count cached bookmarks
    Count,
}

/// Arguments for `shelfmark-seed`.
#[derive(Parser, Debug)]
#[command(
    name = "shelfmark-seed",
    about = "Load bookmarks from a JSON export into a cache database"
)]
pub struct SeedArgs {
    /// Path to the cache database
    #[arg(long, env = "SHELFMARK_DB", default_value = "shelfmark.redb")]
    pub database: PathBuf,

    /// JSON file holding an array of bookmark objects
    pub input: PathBuf,
}
