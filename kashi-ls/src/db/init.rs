//! Database initialization

use kashi_common::Result;
use sqlx::{Pool, Sqlite};
use tracing::info;

/// Create the service tables if they do not exist yet
pub async fn init(pool: &Pool<Sqlite>) -> Result<()> {
    info!("Initializing lyrics service tables");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lyrics_cache (
            key TEXT PRIMARY KEY,
            document TEXT NOT NULL,
            version INTEGER NOT NULL,
            stored_at_ms INTEGER NOT NULL,
            song_duration_s INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS translation_cache (
            key TEXT PRIMARY KEY,
            document TEXT NOT NULL,
            original_version INTEGER NOT NULL,
            stored_at_ms INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS local_lyrics (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            artist TEXT NOT NULL,
            document TEXT NOT NULL,
            stored_at_ms INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_local_lyrics_song ON local_lyrics (title, artist)")
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_pool;

    #[tokio::test]
    async fn init_is_idempotent() {
        let pool = open_memory_pool().await.expect("pool");
        init(&pool).await.expect("first init");
        init(&pool).await.expect("second init");

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type='table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .expect("query");

        assert!(tables.contains(&"lyrics_cache".to_string()));
        assert!(tables.contains(&"translation_cache".to_string()));
        assert!(tables.contains(&"local_lyrics".to_string()));
    }
}
