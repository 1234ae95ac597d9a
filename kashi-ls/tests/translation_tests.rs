//! Translation resolver integration tests
//!
//! Documents here carry embedded translations or prebuilt romanization for
//! every line, so no translation engine is ever dispatched.

use std::sync::Arc;

use kashi_common::config::{CacheStrategy, ProviderKind, Settings};
use kashi_common::types::{
    DocumentMetadata, EmbeddedTranslation, LyricLine, LyricsDocument, LyricsKind, SongIdentity,
    TranslationAction, VersionedLyrics,
};
use kashi_ls::db::{self, translation_cache};
use kashi_ls::state::ResolutionStore;
use kashi_ls::translate::TranslationResolver;
use sqlx::{Pool, Sqlite};

fn song() -> SongIdentity {
    SongIdentity {
        title: "Marea".to_string(),
        artist: "Costa".to_string(),
        album: "Olas".to_string(),
        duration_s: 180,
    }
}

/// Document whose every line ships an embedded Spanish translation
fn doc_with_embedded_es() -> LyricsDocument {
    let mk = |text: &str, es: &str, start: u64| LyricLine {
        text: text.to_string(),
        start_time_ms: start,
        end_time_ms: start + 3000,
        duration_ms: 3000,
        syllables: vec![],
        translated_text: None,
        romanized_text: None,
        embedded_translation: Some(EmbeddedTranslation {
            lang: "es-419".to_string(),
            text: es.to_string(),
        }),
        singer: None,
    };
    LyricsDocument {
        kind: LyricsKind::Line,
        lines: vec![mk("the tide", "la marea", 0), mk("the coast", "la costa", 3000)],
        metadata: DocumentMetadata::default(),
    }
}

fn settings() -> Settings {
    Settings {
        preferred_provider: ProviderKind::Local,
        provider_order: vec![ProviderKind::Local],
        cache_strategy: CacheStrategy::Conservative,
        ..Default::default()
    }
}

async fn fresh_pool() -> Pool<Sqlite> {
    let pool = db::open_memory_pool().await.expect("pool");
    db::init(&pool).await.expect("init");
    pool
}

#[tokio::test]
async fn embedded_translations_satisfy_matching_target() {
    let pool = fresh_pool().await;
    let store = Arc::new(ResolutionStore::new());
    let translator =
        TranslationResolver::new(Arc::clone(&store), pool, settings()).expect("translator");

    let source = VersionedLyrics {
        document: doc_with_embedded_es(),
        version: 1,
    };

    // "es" matches "es-419" on the primary subtag, case-insensitively
    let translated = translator
        .resolve(&song(), &source, TranslationAction::Translate, "es", false)
        .await
        .expect("translate");

    assert_eq!(
        translated.lines[0].translated_text.as_deref(),
        Some("la marea")
    );
    assert_eq!(
        translated.lines[1].translated_text.as_deref(),
        Some("la costa")
    );
}

#[tokio::test]
async fn version_bump_invalidates_cached_translation() {
    let pool = fresh_pool().await;
    let store = Arc::new(ResolutionStore::new());
    let translator = TranslationResolver::new(Arc::clone(&store), pool.clone(), settings())
        .expect("translator");

    let v1 = VersionedLyrics {
        document: doc_with_embedded_es(),
        version: 1,
    };
    translator
        .resolve(&song(), &v1, TranslationAction::Translate, "es", false)
        .await
        .expect("translate v1");

    let key = format!("{} - translate - es", song().cache_key());
    let record = translation_cache::get(&pool, &key)
        .await
        .expect("get")
        .expect("record");
    assert_eq!(record.original_version, 1);

    // The source document is re-resolved to version 2: the old record must
    // never be served again
    let mut v2 = VersionedLyrics {
        document: doc_with_embedded_es(),
        version: 2,
    };
    v2.document.lines[0].embedded_translation = Some(EmbeddedTranslation {
        lang: "es".to_string(),
        text: "la marea nueva".to_string(),
    });

    let translated = translator
        .resolve(&song(), &v2, TranslationAction::Translate, "es", false)
        .await
        .expect("translate v2");

    assert_eq!(
        translated.lines[0].translated_text.as_deref(),
        Some("la marea nueva")
    );

    let record = translation_cache::get(&pool, &key)
        .await
        .expect("get")
        .expect("record");
    assert_eq!(record.original_version, 2);
}

#[tokio::test]
async fn matching_version_is_served_from_cache() {
    let pool = fresh_pool().await;
    let store = Arc::new(ResolutionStore::new());
    let translator =
        TranslationResolver::new(Arc::clone(&store), pool, settings()).expect("translator");

    let source = VersionedLyrics {
        document: doc_with_embedded_es(),
        version: 7,
    };

    let first = translator
        .resolve(&song(), &source, TranslationAction::Translate, "es", false)
        .await
        .expect("first");
    let second = translator
        .resolve(&song(), &source, TranslationAction::Translate, "es", false)
        .await
        .expect("second");

    assert_eq!(first, second);
}

#[tokio::test]
async fn prebuilt_romanization_is_reused() {
    let pool = fresh_pool().await;
    let store = Arc::new(ResolutionStore::new());
    let translator =
        TranslationResolver::new(Arc::clone(&store), pool, settings()).expect("translator");

    let mut document = doc_with_embedded_es();
    document.lines[0].romanized_text = Some("already romanized".to_string());
    let source = VersionedLyrics {
        document: document.clone(),
        version: 3,
    };

    let romanized = translator
        .resolve(&song(), &source, TranslationAction::Romanize, "en", false)
        .await
        .expect("romanize");

    // The document is reused wholesale, no engine pass
    assert_eq!(romanized, document);
}

#[tokio::test]
async fn empty_source_document_is_rejected() {
    let pool = fresh_pool().await;
    let store = Arc::new(ResolutionStore::new());
    let translator =
        TranslationResolver::new(Arc::clone(&store), pool, settings()).expect("translator");

    let source = VersionedLyrics {
        document: LyricsDocument {
            kind: LyricsKind::Line,
            lines: vec![],
            metadata: DocumentMetadata::default(),
        },
        version: 1,
    };

    let result = translator
        .resolve(&song(), &source, TranslationAction::Translate, "es", false)
        .await;
    assert!(matches!(result, Err(kashi_common::Error::InvalidInput(_))));
}

#[tokio::test]
async fn target_language_override_wins() {
    let pool = fresh_pool().await;
    let store = Arc::new(ResolutionStore::new());
    let overridden = Settings {
        target_language_override: Some("es".to_string()),
        ..settings()
    };
    let translator =
        TranslationResolver::new(Arc::clone(&store), pool, overridden).expect("translator");

    let source = VersionedLyrics {
        document: doc_with_embedded_es(),
        version: 1,
    };

    // Caller asks for French, override redirects to Spanish, which the
    // embedded translations satisfy without an engine
    let translated = translator
        .resolve(&song(), &source, TranslationAction::Translate, "fr", false)
        .await
        .expect("translate");
    assert_eq!(
        translated.lines[0].translated_text.as_deref(),
        Some("la marea")
    );
}
