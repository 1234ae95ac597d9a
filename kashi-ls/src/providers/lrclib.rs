//! LRCLIB client
//!
//! Returns line-synced documents only. The `syncedLyrics` field carries
//! `[mm:ss.xx]`-stamped lines; a line's end time is the next line's start
//! (or start + 5 s for the last line).

use kashi_common::types::{DocumentMetadata, LyricLine, LyricsDocument, LyricsKind, SongIdentity};
use kashi_common::{Error, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use super::FetchOptions;

const LRCLIB_BASE_URL: &str = "https://lrclib.net/api";
const USER_AGENT: &str = "kashi/0.1.0 (+https://github.com/kashi/kashi)";
const LAST_LINE_EXTENT_MS: u64 = 5000;

#[derive(Debug, Deserialize)]
struct LrclibResponse {
    #[serde(default, rename = "syncedLyrics")]
    synced_lyrics: Option<String>,
}

/// LRCLIB API client
pub struct LrclibClient {
    http: reqwest::Client,
}

impl LrclibClient {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Provider(format!("lrclib client: {e}")))?;
        Ok(Self { http })
    }

    pub async fn fetch(
        &self,
        song: &SongIdentity,
        opts: &FetchOptions,
    ) -> Result<Option<LyricsDocument>> {
        let url = format!("{LRCLIB_BASE_URL}/get");

        let mut query: Vec<(&str, &str)> = vec![
            ("artist_name", song.artist.as_str()),
            ("track_name", song.title.as_str()),
        ];
        if !song.album.is_empty() {
            query.push(("album_name", song.album.as_str()));
        }

        let mut request = self.http.get(&url).query(&query);
        if opts.force_reload || opts.no_store {
            request = request.header(reqwest::header::CACHE_CONTROL, "no-store");
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Provider(format!("lrclib: {e}")))?;

        if !response.status().is_success() {
            // LRCLIB answers 404 for unknown songs
            return Ok(None);
        }

        let payload: LrclibResponse = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(format!("lrclib payload: {e}")))?;

        let Some(synced) = payload.synced_lyrics.filter(|s| !s.is_empty()) else {
            return Ok(None);
        };

        Ok(parse_synced_lyrics(&synced))
    }
}

/// Parse `[mm:ss.xx] text` stamped lines into a line-synced document
fn parse_synced_lyrics(synced: &str) -> Option<LyricsDocument> {
    let mut stamped: Vec<(u64, String)> = Vec::new();

    for raw in synced.lines() {
        let Some((stamp, text)) = split_timestamp(raw) else {
            warn!(line = %raw, "Skipping unstamped LRC line");
            continue;
        };
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        stamped.push((stamp, text.to_string()));
    }

    if stamped.is_empty() {
        return None;
    }

    let lines = stamped
        .iter()
        .enumerate()
        .map(|(i, (start, text))| {
            let end = stamped
                .get(i + 1)
                .map(|(next_start, _)| *next_start)
                .unwrap_or(start + LAST_LINE_EXTENT_MS);
            LyricLine {
                text: text.clone(),
                start_time_ms: *start,
                end_time_ms: end,
                duration_ms: end.saturating_sub(*start),
                syllables: vec![],
                translated_text: None,
                romanized_text: None,
                embedded_translation: None,
                singer: None,
            }
        })
        .collect();

    Some(LyricsDocument {
        kind: LyricsKind::Line,
        lines,
        metadata: DocumentMetadata {
            source: Some("lrclib".to_string()),
            ..Default::default()
        },
    })
}

/// Split one `[mm:ss.xx] text` line into (milliseconds, text)
fn split_timestamp(raw: &str) -> Option<(u64, String)> {
    let raw = raw.trim_start();
    let rest = raw.strip_prefix('[')?;
    let close = rest.find(']')?;
    let (stamp, text) = rest.split_at(close);
    let text = &text[1..];

    let (minutes, seconds) = stamp.split_once(':')?;
    let minutes: u64 = minutes.parse().ok()?;
    let seconds: f64 = seconds.parse().ok()?;
    if !(0.0..60.0).contains(&seconds) {
        return None;
    }

    let ms = minutes * 60_000 + (seconds * 1000.0).round() as u64;
    Some((ms, text.to_string()))
}
