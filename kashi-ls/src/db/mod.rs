//! Database access layer
//!
//! SQLite persistence for the slower cache tier and the user's local lyrics
//! library. TTL enforcement is the resolver's responsibility; these modules
//! are plain get/set/delete over the tables created by [`init`].

pub mod init;
pub mod local_lyrics;
pub mod lyrics_cache;
pub mod translation_cache;

use kashi_common::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;

pub use init::init;

/// Open (creating if missing) the service database
pub async fn open_pool(path: &Path) -> Result<Pool<Sqlite>> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// In-memory pool for tests
pub async fn open_memory_pool() -> Result<Pool<Sqlite>> {
    // A single connection keeps every query on the same in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    Ok(pool)
}
