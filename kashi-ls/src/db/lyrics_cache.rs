//! Persistent lyrics cache access
//!
//! Entries are written once per fresh resolution and read back until the
//! resolver decides they are older than the configured retention window.

use kashi_common::types::LyricsDocument;
use kashi_common::Result;
use sqlx::{Pool, Sqlite};
use tracing::warn;

/// One persisted resolution
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub document: LyricsDocument,
    pub version: u64,
    pub stored_at_ms: u64,
    pub song_duration_s: u64,
}

pub async fn get(db: &Pool<Sqlite>, key: &str) -> Result<Option<CacheEntry>> {
    let row = sqlx::query_as::<_, (String, i64, i64, i64)>(
        "SELECT document, version, stored_at_ms, song_duration_s FROM lyrics_cache WHERE key = ?",
    )
    .bind(key)
    .fetch_optional(db)
    .await?;

    let Some((document_json, version, stored_at_ms, song_duration_s)) = row else {
        return Ok(None);
    };

    let document: LyricsDocument = match serde_json::from_str(&document_json) {
        Ok(doc) => doc,
        Err(e) => {
            // Corrupt row: drop it and treat as a miss
            warn!(key = %key, error = %e, "Discarding unreadable lyrics cache entry");
            delete(db, key).await?;
            return Ok(None);
        }
    };

    Ok(Some(CacheEntry {
        key: key.to_string(),
        document,
        version: version as u64,
        stored_at_ms: stored_at_ms as u64,
        song_duration_s: song_duration_s as u64,
    }))
}

pub async fn set(db: &Pool<Sqlite>, entry: &CacheEntry) -> Result<()> {
    let document_json = serde_json::to_string(&entry.document)
        .map_err(|e| kashi_common::Error::Internal(format!("serialize lyrics document: {e}")))?;

    sqlx::query(
        r#"
        INSERT OR REPLACE INTO lyrics_cache (key, document, version, stored_at_ms, song_duration_s)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&entry.key)
    .bind(document_json)
    .bind(entry.version as i64)
    .bind(entry.stored_at_ms as i64)
    .bind(entry.song_duration_s as i64)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn delete(db: &Pool<Sqlite>, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM lyrics_cache WHERE key = ?")
        .bind(key)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn clear(db: &Pool<Sqlite>) -> Result<()> {
    sqlx::query("DELETE FROM lyrics_cache").execute(db).await?;
    Ok(())
}
