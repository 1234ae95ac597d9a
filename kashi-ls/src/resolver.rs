//! Lyrics resolution pipeline
//!
//! Orders the tiers: embedded fast path, memory cache, persistent cache
//! (TTL-checked), in-flight deduplication, then the provider chain. Cache
//! writes happen only after a resolution fully settles, so concurrent
//! readers never observe a partially written entry.

use std::sync::Arc;

use sqlx::{Pool, Sqlite};
use tracing::{debug, info, warn};

use kashi_common::config::Settings;
use kashi_common::events::LyricsEvent;
use kashi_common::time;
use kashi_common::types::{CaptionTrack, LyricsDocument, SongIdentity, VersionedLyrics};
use kashi_common::{Error, Result};

use crate::db::lyrics_cache;
use crate::providers::{FetchOptions, ProviderChain};
use crate::state::{InFlight, ResolutionStore};

/// One resolution request
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub song: SongIdentity,
    /// Skip both cache tiers and ask providers to bypass HTTP caches
    pub force_reload: bool,
    /// Document supplied by the playing platform itself, if any
    pub embedded: Option<LyricsDocument>,
    /// Caption track usable as a last-resort source
    pub caption_track: Option<CaptionTrack>,
}

impl ResolveRequest {
    pub fn new(song: SongIdentity) -> Self {
        Self {
            song,
            force_reload: false,
            embedded: None,
            caption_track: None,
        }
    }
}

/// Orchestrates cache lookup, dedup, the provider chain and cache writes
pub struct LyricsResolver {
    store: Arc<ResolutionStore>,
    db: Pool<Sqlite>,
    chain: ProviderChain,
    settings: Settings,
}

impl LyricsResolver {
    pub fn new(
        store: Arc<ResolutionStore>,
        db: Pool<Sqlite>,
        settings: Settings,
    ) -> Result<Self> {
        let chain = ProviderChain::from_settings(&settings, db.clone())?;
        Ok(Self {
            store,
            db,
            chain,
            settings,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Resolve lyrics for a song
    ///
    /// Guarantees at most one concurrent provider round trip per cache key;
    /// concurrent callers share the first caller's outcome.
    pub async fn resolve(&self, request: &ResolveRequest) -> Result<VersionedLyrics> {
        // Embedded fast path. With the bypass enabled, a non-word-synced
        // embedded document is kept aside while external sources are tried.
        let mut embedded_fallback: Option<VersionedLyrics> = None;
        if let Some(doc) = &request.embedded {
            if !doc.is_empty() {
                let versioned = VersionedLyrics {
                    document: doc.clone(),
                    version: time::now_ms(),
                };
                if !self.settings.embedded_bypass || doc.is_word_synced() {
                    debug!("Using embedded platform lyrics");
                    return Ok(versioned);
                }
                info!("Embedded bypass active, trying external providers first");
                embedded_fallback = Some(versioned);
            }
        }

        let key = request.song.cache_key();
        let mut result: Option<VersionedLyrics> = None;

        if !request.force_reload {
            if let Some(hit) = self.store.get_lyrics(&key).await {
                debug!(key = %key, "Memory cache hit");
                result = Some(hit);
            } else if let Some(hit) = self.persistent_lookup(&key).await? {
                self.store.put_lyrics(key.clone(), hit.clone()).await;
                result = Some(hit);
            }
        }

        if result.is_none() {
            match self.store.begin(&key) {
                InFlight::Waiting(mut rx) => {
                    debug!(key = %key, "Awaiting in-flight resolution");
                    match rx.recv().await {
                        Ok(Some(shared)) => result = Some(shared),
                        _ => {
                            if let Some(fallback) = embedded_fallback {
                                return Ok(fallback);
                            }
                            return Err(Error::NotFound(key));
                        }
                    }
                }
                InFlight::Claimed(claim) => {
                    match self.fetch_new(request, &key).await {
                        Ok(fresh) => {
                            claim.settle(Some(fresh.clone()));
                            result = Some(fresh);
                        }
                        Err(e) => {
                            claim.settle(None);
                            self.store.broadcast_event(LyricsEvent::LyricsNotFound {
                                key: key.clone(),
                                timestamp: time::now(),
                            });
                            if let Some(fallback) = embedded_fallback {
                                info!(key = %key, "No external lyrics, reverting to embedded document");
                                return Ok(fallback);
                            }
                            return Err(e);
                        }
                    }
                }
            }
        }

        let resolved = match result {
            Some(v) => v,
            None => return Err(Error::Internal(format!("resolution lost for {key}"))),
        };

        // The embedded document wins over an external one that is not
        // word-synced: it is the better source for fully synced display.
        if let Some(fallback) = embedded_fallback {
            if !resolved.document.is_word_synced() {
                info!(key = %key, "External lyrics not word-synced, reverting to embedded document");
                return Ok(fallback);
            }
        }

        Ok(resolved)
    }

    /// Persistent-tier lookup honoring the TTL
    ///
    /// Entries older than the strategy window are deleted and treated as
    /// absent.
    async fn persistent_lookup(&self, key: &str) -> Result<Option<VersionedLyrics>> {
        if !self.settings.cache_strategy.persists() {
            return Ok(None);
        }

        if let Some(entry) = lyrics_cache::get(&self.db, key).await? {
            let age_ms = time::now_ms().saturating_sub(entry.stored_at_ms);
            if age_ms < self.settings.cache_strategy.window_ms() {
                debug!(key = %key, age_ms, "Persistent cache hit");
                return Ok(Some(VersionedLyrics {
                    document: entry.document,
                    version: entry.version,
                }));
            }
            debug!(key = %key, age_ms, "Persistent cache entry expired");
            lyrics_cache::delete(&self.db, key).await?;
        }

        Ok(None)
    }

    /// Run the provider chain once and write the outcome through both tiers
    async fn fetch_new(&self, request: &ResolveRequest, key: &str) -> Result<VersionedLyrics> {
        self.store.note_provider_round_trip();

        let opts = FetchOptions {
            force_reload: request.force_reload,
            source_order: self.settings.source_order.clone(),
            no_store: !self.settings.cache_strategy.persists(),
        };

        let mut document: Option<LyricsDocument> = None;
        for kind in self.settings.chain_order() {
            match self.chain.fetch(kind, &request.song, &opts).await {
                Ok(Some(doc)) if !doc.is_empty() => {
                    info!(key = %key, provider = %kind, lines = doc.lines.len(), "Lyrics resolved");
                    document = Some(doc);
                    break;
                }
                Ok(_) => {
                    debug!(key = %key, provider = %kind, "Provider returned no lyrics");
                }
                Err(e) => {
                    // Single-provider failures are recovered by the chain
                    warn!(key = %key, provider = %kind, error = %e, "Provider failed");
                }
            }
        }

        if document.is_none() {
            if let Some(track) = &request.caption_track {
                match self.chain.fetch_captions(track).await {
                    Ok(Some(doc)) if !doc.is_empty() => {
                        info!(key = %key, "Falling back to platform captions");
                        document = Some(doc);
                    }
                    Ok(_) => {}
                    Err(e) => warn!(key = %key, error = %e, "Caption fallback failed"),
                }
            }
        }

        let Some(document) = document else {
            return Err(Error::NotFound(format!(
                "no provider returned lyrics for '{key}'"
            )));
        };

        let versioned = VersionedLyrics {
            document,
            version: time::now_ms(),
        };

        self.store.put_lyrics(key.to_string(), versioned.clone()).await;

        if self.settings.cache_strategy.persists() {
            lyrics_cache::set(
                &self.db,
                &lyrics_cache::CacheEntry {
                    key: key.to_string(),
                    document: versioned.document.clone(),
                    version: versioned.version,
                    stored_at_ms: time::now_ms(),
                    song_duration_s: request.song.duration_s,
                },
            )
            .await?;
        }

        self.store.broadcast_event(LyricsEvent::LyricsResolved {
            key: key.to_string(),
            version: versioned.version,
            kind: versioned.document.kind,
            line_count: versioned.document.lines.len(),
            timestamp: time::now(),
        });

        Ok(versioned)
    }

    /// Drop every cached resolution, memory and persistent
    pub async fn reset_caches(&self) -> Result<()> {
        self.store.reset().await;
        lyrics_cache::clear(&self.db).await?;
        crate::db::translation_cache::clear(&self.db).await?;
        self.store.broadcast_event(LyricsEvent::CacheReset {
            timestamp: time::now(),
        });
        info!("Lyrics caches cleared");
        Ok(())
    }
}
