//! User-imported local lyrics library
//!
//! Documents added here are served by the `local` provider, matched by
//! exact title and artist.

use kashi_common::types::LyricsDocument;
use kashi_common::Result;
use sqlx::{Pool, Sqlite};
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct LocalEntry {
    pub id: Uuid,
    pub title: String,
    pub artist: String,
    pub document: LyricsDocument,
    pub stored_at_ms: u64,
}

pub async fn find_by_song(
    db: &Pool<Sqlite>,
    title: &str,
    artist: &str,
) -> Result<Option<LocalEntry>> {
    let row = sqlx::query_as::<_, (String, String, i64)>(
        "SELECT id, document, stored_at_ms FROM local_lyrics WHERE title = ? AND artist = ? LIMIT 1",
    )
    .bind(title)
    .bind(artist)
    .fetch_optional(db)
    .await?;

    let Some((id, document_json, stored_at_ms)) = row else {
        return Ok(None);
    };

    let id = Uuid::parse_str(&id)
        .map_err(|e| kashi_common::Error::Internal(format!("invalid local lyrics id: {e}")))?;

    let document: LyricsDocument = match serde_json::from_str(&document_json) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(%id, error = %e, "Discarding unreadable local lyrics entry");
            delete(db, id).await?;
            return Ok(None);
        }
    };

    Ok(Some(LocalEntry {
        id,
        title: title.to_string(),
        artist: artist.to_string(),
        document,
        stored_at_ms: stored_at_ms as u64,
    }))
}

pub async fn insert(db: &Pool<Sqlite>, entry: &LocalEntry) -> Result<()> {
    let document_json = serde_json::to_string(&entry.document)
        .map_err(|e| kashi_common::Error::Internal(format!("serialize local lyrics: {e}")))?;

    sqlx::query(
        r#"
        INSERT OR REPLACE INTO local_lyrics (id, title, artist, document, stored_at_ms)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.id.to_string())
    .bind(&entry.title)
    .bind(&entry.artist)
    .bind(document_json)
    .bind(entry.stored_at_ms as i64)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn delete(db: &Pool<Sqlite>, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM local_lyrics WHERE id = ?")
        .bind(id.to_string())
        .execute(db)
        .await?;
    Ok(())
}

/// List (id, title, artist) for every stored entry
pub async fn list(db: &Pool<Sqlite>) -> Result<Vec<(Uuid, String, String)>> {
    let rows = sqlx::query_as::<_, (String, String, String)>(
        "SELECT id, title, artist FROM local_lyrics ORDER BY title, artist",
    )
    .fetch_all(db)
    .await?;

    let mut out = Vec::with_capacity(rows.len());
    for (id, title, artist) in rows {
        let id = Uuid::parse_str(&id)
            .map_err(|e| kashi_common::Error::Internal(format!("invalid local lyrics id: {e}")))?;
        out.push((id, title, artist));
    }
    Ok(out)
}
