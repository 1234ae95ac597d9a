//! KPoe-compatible lyrics server client
//!
//! The richest provider: returns word-synced documents with syllable timing,
//! singer tags, background vocals and optional embedded translations or
//! transliterations. The same client serves the built-in server list and a
//! user-configured self-hosted instance.

use kashi_common::types::{
    EmbeddedTranslation, LyricLine, LyricsDocument, LyricsKind, SongIdentity, Syllable,
};
use kashi_common::{Error, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use super::FetchOptions;

const KPOE_SERVERS: &[&str] = &["https://lyricsplus.prjktla.workers.dev"];
const USER_AGENT: &str = "kashi/0.1.0 (+https://github.com/kashi/kashi)";

/// Raw wire payload from a KPoe-compatible server
#[derive(Debug, Deserialize)]
struct KpoeResponse {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    lyrics: Vec<KpoeLine>,
}

#[derive(Debug, Deserialize)]
struct KpoeLine {
    /// Line start, absolute milliseconds
    #[serde(default)]
    time: f64,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    text: String,
    #[serde(default)]
    syllabus: Vec<KpoeSyllable>,
    #[serde(default)]
    element: Option<KpoeElement>,
    #[serde(default)]
    translation: Option<KpoeTranslation>,
    #[serde(default)]
    transliteration: Option<KpoeTransliteration>,
}

#[derive(Debug, Deserialize)]
struct KpoeSyllable {
    /// Syllable start, absolute milliseconds
    #[serde(default)]
    time: f64,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    text: String,
    #[serde(default, rename = "isBackground")]
    is_background: bool,
}

#[derive(Debug, Deserialize)]
struct KpoeElement {
    #[serde(default)]
    singer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KpoeTranslation {
    #[serde(default)]
    lang: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KpoeTransliteration {
    #[serde(default)]
    syllabus: Vec<KpoeSyllable>,
}

/// KPoe API client
pub struct KpoeClient {
    http: reqwest::Client,
    base_urls: Vec<String>,
}

impl KpoeClient {
    /// Client over the built-in server list
    pub fn new() -> Result<Self> {
        Self::with_servers(KPOE_SERVERS.iter().map(|s| s.to_string()).collect())
    }

    /// Client for a single self-hosted server
    pub fn with_base_url(url: String) -> Result<Self> {
        Self::with_servers(vec![url])
    }

    fn with_servers(base_urls: Vec<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Provider(format!("kpoe client: {e}")))?;
        Ok(Self { http, base_urls })
    }

    /// Try each configured server in order, returning the first hit
    pub async fn fetch(
        &self,
        song: &SongIdentity,
        opts: &FetchOptions,
    ) -> Result<Option<LyricsDocument>> {
        for base in &self.base_urls {
            match self.fetch_from_server(base, song, opts).await {
                Ok(Some(doc)) => return Ok(Some(doc)),
                Ok(None) => continue,
                Err(e) => {
                    // A dead mirror must not mask the others
                    warn!(server = %base, error = %e, "KPoe server failed");
                    continue;
                }
            }
        }
        Ok(None)
    }

    async fn fetch_from_server(
        &self,
        base: &str,
        song: &SongIdentity,
        opts: &FetchOptions,
    ) -> Result<Option<LyricsDocument>> {
        let base = base.trim_end_matches('/');
        let url = format!("{base}/v2/lyrics/get");

        let duration = song.duration_s.to_string();
        let mut query: Vec<(&str, &str)> = vec![
            ("title", song.title.as_str()),
            ("artist", song.artist.as_str()),
            ("duration", duration.as_str()),
        ];
        if !song.album.is_empty() {
            query.push(("album", song.album.as_str()));
        }
        if !opts.source_order.is_empty() {
            query.push(("source", opts.source_order.as_str()));
        }
        if opts.force_reload {
            query.push(("forceReload", "true"));
        }

        let mut request = self.http.get(&url).query(&query);
        if opts.force_reload || opts.no_store {
            request = request.header(reqwest::header::CACHE_CONTROL, "no-store");
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Provider(format!("kpoe: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            warn!(server = %base, status = %status, "KPoe request failed");
            return Ok(None);
        }

        let payload: KpoeResponse = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(format!("kpoe payload: {e}")))?;

        Ok(map_response(payload))
    }
}

/// Map a raw payload to the canonical document
fn map_response(payload: KpoeResponse) -> Option<LyricsDocument> {
    if payload.lyrics.is_empty() {
        return None;
    }

    let word_kind = payload
        .kind
        .as_deref()
        .map(|k| k.eq_ignore_ascii_case("word"))
        .unwrap_or(false)
        || payload.lyrics.iter().any(|l| !l.syllabus.is_empty());

    let lines = payload
        .lyrics
        .into_iter()
        .map(|line| {
            let start_time_ms = line.time.max(0.0) as u64;
            let duration_ms = line.duration.max(0.0) as u64;

            // Prefer the transliterated syllable track when it lines up
            let romanized: Option<Vec<String>> = line.transliteration.and_then(|t| {
                (t.syllabus.len() == line.syllabus.len() && !t.syllabus.is_empty())
                    .then(|| t.syllabus.into_iter().map(|s| s.text).collect())
            });

            let syllables = line
                .syllabus
                .iter()
                .enumerate()
                .map(|(i, syl)| {
                    let abs_start = syl.time.max(0.0) as u64;
                    Syllable {
                        text: syl.text.clone(),
                        start_offset_ms: abs_start.saturating_sub(start_time_ms),
                        duration_ms: syl.duration.max(0.0) as u64,
                        is_background: syl.is_background,
                        romanized_text: romanized.as_ref().map(|r| r[i].clone()),
                    }
                })
                .collect::<Vec<_>>();

            let text = if line.text.is_empty() && !syllables.is_empty() {
                syllables.iter().map(|s| s.text.as_str()).collect()
            } else {
                line.text
            };

            LyricLine {
                text,
                start_time_ms,
                end_time_ms: start_time_ms + duration_ms,
                duration_ms,
                syllables,
                translated_text: None,
                romanized_text: None,
                embedded_translation: line.translation.and_then(|t| match (t.lang, t.text) {
                    (Some(lang), Some(text)) if !text.is_empty() => {
                        Some(EmbeddedTranslation { lang, text })
                    }
                    _ => None,
                }),
                singer: line.element.and_then(|e| e.singer),
            }
        })
        .collect();

    Some(LyricsDocument {
        kind: if word_kind {
            LyricsKind::Word
        } else {
            LyricsKind::Line
        },
        lines,
        metadata: kashi_common::types::DocumentMetadata {
            source: Some("kpoe".to_string()),
            ..Default::default()
        },
    })
}
