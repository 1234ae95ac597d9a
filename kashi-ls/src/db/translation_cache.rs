//! Persistent translation cache access
//!
//! Records are tagged with the version of the lyrics document they were
//! derived from; the translation resolver discards records whose tag no
//! longer matches.

use kashi_common::types::{LyricsDocument, TranslationRecord};
use kashi_common::Result;
use sqlx::{Pool, Sqlite};
use tracing::warn;

pub async fn get(db: &Pool<Sqlite>, key: &str) -> Result<Option<TranslationRecord>> {
    let row = sqlx::query_as::<_, (String, i64)>(
        "SELECT document, original_version FROM translation_cache WHERE key = ?",
    )
    .bind(key)
    .fetch_optional(db)
    .await?;

    let Some((document_json, original_version)) = row else {
        return Ok(None);
    };

    let document: LyricsDocument = match serde_json::from_str(&document_json) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(key = %key, error = %e, "Discarding unreadable translation cache entry");
            delete(db, key).await?;
            return Ok(None);
        }
    };

    Ok(Some(TranslationRecord {
        document,
        original_version: original_version as u64,
    }))
}

pub async fn set(
    db: &Pool<Sqlite>,
    key: &str,
    record: &TranslationRecord,
    stored_at_ms: u64,
) -> Result<()> {
    let document_json = serde_json::to_string(&record.document).map_err(|e| {
        kashi_common::Error::Internal(format!("serialize translated document: {e}"))
    })?;

    sqlx::query(
        r#"
        INSERT OR REPLACE INTO translation_cache (key, document, original_version, stored_at_ms)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(key)
    .bind(document_json)
    .bind(record.original_version as i64)
    .bind(stored_at_ms as i64)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn delete(db: &Pool<Sqlite>, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM translation_cache WHERE key = ?")
        .bind(key)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn clear(db: &Pool<Sqlite>) -> Result<()> {
    sqlx::query("DELETE FROM translation_cache")
        .execute(db)
        .await?;
    Ok(())
}
