//! Platform caption fallback
//!
//! When every lyrics provider comes back empty and the request carries a
//! caption track for the playing video, its timed caption events are mapped
//! to a line-synced document as a last resort.

use kashi_common::types::{CaptionTrack, DocumentMetadata, LyricLine, LyricsDocument, LyricsKind};
use kashi_common::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = "kashi/0.1.0 (+https://github.com/kashi/kashi)";

/// Timed caption payload (`fmt=json3` event stream)
#[derive(Debug, Deserialize)]
struct CaptionResponse {
    #[serde(default)]
    events: Vec<CaptionEvent>,
}

#[derive(Debug, Deserialize)]
struct CaptionEvent {
    #[serde(default, rename = "tStartMs")]
    start_ms: u64,
    #[serde(default, rename = "dDurationMs")]
    duration_ms: u64,
    #[serde(default)]
    segs: Vec<CaptionSegment>,
}

#[derive(Debug, Deserialize)]
struct CaptionSegment {
    #[serde(default)]
    utf8: String,
}

pub struct CaptionClient {
    http: reqwest::Client,
}

impl CaptionClient {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Provider(format!("caption client: {e}")))?;
        Ok(Self { http })
    }

    pub async fn fetch(&self, track: &CaptionTrack) -> Result<Option<LyricsDocument>> {
        let mut url = format!("{}&fmt=json3", track.base_url);
        if let Some(lang) = &track.language {
            url.push_str("&tlang=");
            url.push_str(lang);
        }

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("captions: {e}")))?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let payload: CaptionResponse = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(format!("caption payload: {e}")))?;

        Ok(map_events(payload))
    }
}

fn map_events(payload: CaptionResponse) -> Option<LyricsDocument> {
    let lines: Vec<LyricLine> = payload
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs.iter().map(|s| s.utf8.as_str()).collect();
            let text = text.trim().to_string();
            if text.is_empty() {
                return None;
            }
            Some(LyricLine {
                text,
                start_time_ms: event.start_ms,
                end_time_ms: event.start_ms + event.duration_ms,
                duration_ms: event.duration_ms,
                syllables: vec![],
                translated_text: None,
                romanized_text: None,
                embedded_translation: None,
                singer: None,
            })
        })
        .collect();

    if lines.is_empty() {
        return None;
    }

    Some(LyricsDocument {
        kind: LyricsKind::Line,
        lines,
        metadata: DocumentMetadata {
            source: Some("captions".to_string()),
            ..Default::default()
        },
    })
}
