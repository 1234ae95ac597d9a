//! Lyrics providers
//!
//! Each provider fetches a canonical [`LyricsDocument`] for a song identity.
//! `Ok(None)` means ordinary "not found"; errors are reserved for transport
//! failures and malformed payloads, and the resolver recovers from both by
//! moving on to the next provider in the chain.

pub mod captions;
pub mod kpoe;
pub mod local;
pub mod lrclib;

use kashi_common::config::{ProviderKind, Settings};
use kashi_common::types::{CaptionTrack, LyricsDocument, SongIdentity};
use kashi_common::Result;
use sqlx::{Pool, Sqlite};

pub use captions::CaptionClient;
pub use kpoe::KpoeClient;
pub use local::LocalSource;
pub use lrclib::LrclibClient;

/// Per-request fetch options forwarded to every provider
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Ask providers to bypass any intermediate HTTP caching
    pub force_reload: bool,
    /// Source ranking forwarded verbatim to KPoe-compatible servers
    pub source_order: String,
    /// True when the cache strategy disables persistence entirely
    pub no_store: bool,
}

/// The configured provider set
///
/// Chain ordering is decided by [`Settings::chain_order`]; this type only
/// dispatches one fetch to one provider. The caption client sits outside the
/// ordered chain and is consulted last, only when the request carries a
/// caption track.
pub struct ProviderChain {
    kpoe: KpoeClient,
    custom_kpoe: Option<KpoeClient>,
    lrclib: LrclibClient,
    local: LocalSource,
    captions: CaptionClient,
}

impl ProviderChain {
    pub fn from_settings(settings: &Settings, db: Pool<Sqlite>) -> Result<Self> {
        let custom_kpoe = match &settings.custom_provider_url {
            Some(url) if !url.is_empty() => Some(KpoeClient::with_base_url(url.clone())?),
            _ => None,
        };

        Ok(Self {
            kpoe: KpoeClient::new()?,
            custom_kpoe,
            lrclib: LrclibClient::new()?,
            local: LocalSource::new(db),
            captions: CaptionClient::new()?,
        })
    }

    /// Fetch from one provider. A configured-but-absent custom provider is
    /// skipped (treated as empty), never an error.
    pub async fn fetch(
        &self,
        kind: ProviderKind,
        song: &SongIdentity,
        opts: &FetchOptions,
    ) -> Result<Option<LyricsDocument>> {
        match kind {
            ProviderKind::Kpoe => self.kpoe.fetch(song, opts).await,
            ProviderKind::CustomKpoe => match &self.custom_kpoe {
                Some(client) => client.fetch(song, opts).await,
                None => Ok(None),
            },
            ProviderKind::Lrclib => self.lrclib.fetch(song, opts).await,
            ProviderKind::Local => self.local.fetch(song).await,
        }
    }

    /// Platform-caption fallback, tried after the chain is exhausted
    pub async fn fetch_captions(&self, track: &CaptionTrack) -> Result<Option<LyricsDocument>> {
        self.captions.fetch(track).await
    }
}
