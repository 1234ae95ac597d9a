//! Translation / romanization resolver
//!
//! Derived documents are cached under a composite key and tagged with the
//! source document's version; a tag mismatch means the source was re-resolved
//! and the record is silently discarded and recomputed. Lines that already
//! carry a matching embedded translation (or any prebuilt romanization) are
//! never sent to an engine.

pub mod gemini;
pub mod google;

use std::sync::Arc;

use sqlx::{Pool, Sqlite};
use tracing::{debug, info};

use kashi_common::config::{Settings, TranslationEngine};
use kashi_common::events::LyricsEvent;
use kashi_common::time;
use kashi_common::types::{
    LyricsDocument, SongIdentity, TranslationAction, TranslationRecord, VersionedLyrics,
};
use kashi_common::{Error, Result};

use crate::db::translation_cache;
use crate::state::ResolutionStore;

use gemini::GeminiClient;
use google::GoogleClient;

/// Composite cache key for a derived document
fn translation_key(song: &SongIdentity, action: TranslationAction, target_lang: &str) -> String {
    format!("{} - {} - {}", song.cache_key(), action, target_lang)
}

/// Normalize a language code to its lowercased primary subtag
fn normalize_lang(lang: &str) -> String {
    lang.split('-').next().unwrap_or("").trim().to_lowercase()
}

pub struct TranslationResolver {
    store: Arc<ResolutionStore>,
    db: Pool<Sqlite>,
    settings: Settings,
    google: GoogleClient,
    gemini: Option<GeminiClient>,
}

impl TranslationResolver {
    pub fn new(store: Arc<ResolutionStore>, db: Pool<Sqlite>, settings: Settings) -> Result<Self> {
        let gemini = match &settings.gemini_api_key {
            Some(key) if !key.is_empty() => Some(GeminiClient::new(
                key.clone(),
                settings.gemini_model.clone(),
            )?),
            _ => None,
        };

        Ok(Self {
            store,
            db,
            settings,
            google: GoogleClient::new()?,
            gemini,
        })
    }

    /// Resolve a translated or romanized view of a document
    ///
    /// Cached results are served only while their version tag matches the
    /// source document's version.
    pub async fn resolve(
        &self,
        song: &SongIdentity,
        source: &VersionedLyrics,
        action: TranslationAction,
        target_lang: &str,
        force_reload: bool,
    ) -> Result<LyricsDocument> {
        if source.document.is_empty() {
            return Err(Error::InvalidInput(
                "cannot translate an empty document".to_string(),
            ));
        }

        let target_lang = self.settings.effective_target_language(target_lang);
        let key = translation_key(song, action, target_lang);

        if !force_reload {
            if let Some(record) = self.cached_lookup(&key, source.version).await? {
                debug!(key = %key, "Translation cache hit");
                return Ok(record.document);
            }
        }

        let document = match action {
            TranslationAction::Translate => {
                self.translate_document(&source.document, target_lang).await?
            }
            TranslationAction::Romanize => self.romanize_document(&source.document).await?,
        };

        let record = TranslationRecord {
            document: document.clone(),
            original_version: source.version,
        };
        self.store.put_translation(key.clone(), record.clone()).await;
        translation_cache::set(&self.db, &key, &record, time::now_ms()).await?;

        self.store.broadcast_event(LyricsEvent::TranslationReady {
            key: song.cache_key(),
            action,
            target_language: target_lang.to_string(),
            original_version: source.version,
            timestamp: time::now(),
        });

        info!(key = %key, version = source.version, "Translation resolved");
        Ok(document)
    }

    /// Version-checked lookup through both tiers; stale records are removed
    async fn cached_lookup(
        &self,
        key: &str,
        current_version: u64,
    ) -> Result<Option<TranslationRecord>> {
        if let Some(record) = self.store.get_translation(key).await {
            if record.is_valid_for(current_version) {
                return Ok(Some(record));
            }
        }

        if let Some(record) = translation_cache::get(&self.db, key).await? {
            if record.is_valid_for(current_version) {
                self.store.put_translation(key.to_string(), record.clone()).await;
                return Ok(Some(record));
            }
            debug!(key = %key, stored = record.original_version, current = current_version,
                   "Discarding stale translation record");
            translation_cache::delete(&self.db, key).await?;
        }

        Ok(None)
    }

    /// Translate only the lines lacking a matching embedded translation
    async fn translate_document(
        &self,
        document: &LyricsDocument,
        target_lang: &str,
    ) -> Result<LyricsDocument> {
        let target_base = normalize_lang(target_lang);

        let mut final_translations: Vec<Option<String>> = vec![None; document.lines.len()];
        let mut pending_texts: Vec<String> = Vec::new();
        let mut pending_indices: Vec<usize> = Vec::new();

        for (index, line) in document.lines.iter().enumerate() {
            match &line.embedded_translation {
                Some(embedded)
                    if !embedded.text.is_empty()
                        && normalize_lang(&embedded.lang) == target_base =>
                {
                    final_translations[index] = Some(embedded.text.clone());
                }
                _ => {
                    pending_texts.push(line.text.clone());
                    pending_indices.push(index);
                }
            }
        }

        if !pending_texts.is_empty() {
            debug!(
                pending = pending_texts.len(),
                embedded = document.lines.len() - pending_texts.len(),
                "Dispatching live translation"
            );
            let fetched = match self.settings.translation_provider {
                TranslationEngine::Gemini => match &self.gemini {
                    Some(client) => client.translate_batch(&pending_texts, target_lang).await?,
                    None => {
                        return Err(Error::Translation(
                            "gemini selected but no API key configured".to_string(),
                        ))
                    }
                },
                TranslationEngine::Google => {
                    self.google.translate_batch(&pending_texts, target_lang).await?
                }
            };

            for (text, index) in fetched.into_iter().zip(pending_indices) {
                final_translations[index] = Some(text);
            }
        }

        let mut translated = document.clone();
        for (line, translation) in translated.lines.iter_mut().zip(final_translations) {
            // Engines may return empty strings; fall back to the original
            line.translated_text = Some(match translation {
                Some(text) if !text.is_empty() => text,
                _ => line.text.clone(),
            });
        }

        Ok(translated)
    }

    /// Romanize the document, reusing any prebuilt romanization wholesale
    async fn romanize_document(&self, document: &LyricsDocument) -> Result<LyricsDocument> {
        if document.lines.iter().any(|l| l.has_prebuilt_romanization()) {
            info!("Using prebuilt romanization");
            return Ok(document.clone());
        }

        let mut romanized = document.clone();

        if document.is_word_synced() {
            for line in romanized.lines.iter_mut() {
                if line.syllables.is_empty() {
                    continue;
                }
                let texts: Vec<String> = line.syllables.iter().map(|s| s.text.clone()).collect();
                let results = self.romanize_texts(&texts).await?;
                for (syllable, text) in line.syllables.iter_mut().zip(results) {
                    // Trailing space keeps syllables readable when joined
                    syllable.romanized_text = Some(format!("{text} "));
                }
            }
        } else {
            let texts: Vec<String> = romanized.lines.iter().map(|l| l.text.clone()).collect();
            let results = self.romanize_texts(&texts).await?;
            for (line, text) in romanized.lines.iter_mut().zip(results) {
                line.romanized_text = Some(if text.is_empty() {
                    line.text.clone()
                } else {
                    text
                });
            }
        }

        Ok(romanized)
    }

    async fn romanize_texts(&self, texts: &[String]) -> Result<Vec<String>> {
        match self.settings.romanization_provider {
            TranslationEngine::Gemini => match &self.gemini {
                Some(client) => client.romanize_batch(texts).await,
                None => Err(Error::Translation(
                    "gemini selected but no API key configured".to_string(),
                )),
            },
            TranslationEngine::Google => self.google.romanize_texts(texts).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_key_includes_action_and_target() {
        let song = SongIdentity {
            title: "T".to_string(),
            artist: "A".to_string(),
            album: "L".to_string(),
            duration_s: 100,
        };
        assert_eq!(
            translation_key(&song, TranslationAction::Translate, "es"),
            "T - A - L - 100 - translate - es"
        );
        assert_eq!(
            translation_key(&song, TranslationAction::Romanize, "ja"),
            "T - A - L - 100 - romanize - ja"
        );
    }

    #[test]
    fn language_normalization_uses_primary_subtag() {
        assert_eq!(normalize_lang("en-US"), "en");
        assert_eq!(normalize_lang("PT-br"), "pt");
        assert_eq!(normalize_lang("ja"), "ja");
        assert_eq!(normalize_lang(""), "");
    }
}
