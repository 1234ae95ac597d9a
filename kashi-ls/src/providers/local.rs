//! Local lyrics library provider
//!
//! Serves documents the user imported, matched by exact title and artist.

use kashi_common::types::{LyricsDocument, SongIdentity};
use kashi_common::Result;
use sqlx::{Pool, Sqlite};
use tracing::info;

use crate::db::local_lyrics;

pub struct LocalSource {
    db: Pool<Sqlite>,
}

impl LocalSource {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    pub async fn fetch(&self, song: &SongIdentity) -> Result<Option<LyricsDocument>> {
        let Some(entry) = local_lyrics::find_by_song(&self.db, &song.title, &song.artist).await?
        else {
            return Ok(None);
        };

        info!(title = %song.title, "Found local lyrics");
        Ok(Some(entry.document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init, open_memory_pool};
    use kashi_common::types::{DocumentMetadata, LyricLine, LyricsKind};
    use uuid::Uuid;

    #[tokio::test]
    async fn fetch_returns_imported_document() {
        let pool = open_memory_pool().await.expect("pool");
        init(&pool).await.expect("init");

        let document = LyricsDocument {
            kind: LyricsKind::Line,
            lines: vec![LyricLine {
                text: "imported".to_string(),
                start_time_ms: 0,
                end_time_ms: 1000,
                duration_ms: 1000,
                syllables: vec![],
                translated_text: None,
                romanized_text: None,
                embedded_translation: None,
                singer: None,
            }],
            metadata: DocumentMetadata::default(),
        };

        local_lyrics::insert(
            &pool,
            &local_lyrics::LocalEntry {
                id: Uuid::new_v4(),
                title: "T".to_string(),
                artist: "A".to_string(),
                document: document.clone(),
                stored_at_ms: 1,
            },
        )
        .await
        .expect("insert");

        let source = LocalSource::new(pool);
        let song = SongIdentity {
            title: "T".to_string(),
            artist: "A".to_string(),
            album: String::new(),
            duration_s: 100,
        };

        assert_eq!(source.fetch(&song).await.expect("fetch"), Some(document));

        let other = SongIdentity {
            title: "Other".to_string(),
            artist: "A".to_string(),
            album: String::new(),
            duration_s: 100,
        };
        assert!(source.fetch(&other).await.expect("fetch").is_none());
    }
}
