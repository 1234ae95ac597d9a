//! Event types for the Kashi event system
//!
//! Broadcast over `tokio::sync::broadcast` and streamed to clients as SSE.

use crate::types::{LyricsKind, TranslationAction};
use serde::{Deserialize, Serialize};

/// Kashi event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LyricsEvent {
    /// A lyrics document was resolved (fresh or from cache)
    LyricsResolved {
        key: String,
        version: u64,
        kind: LyricsKind,
        line_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Every provider in the chain came back empty
    LyricsNotFound {
        key: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A translation or romanization finished for a document version
    TranslationReady {
        key: String,
        action: TranslationAction,
        target_language: String,
        original_version: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Memory and persistent caches were cleared
    CacheReset {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The primary line changed during playback
    ActiveLineChanged {
        line_id: String,
        index: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The consumer clicked a line; playback should seek to this time
    SeekRequested {
        time_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Scroll arbitration flipped between user and programmatic control
    ScrollModeChanged {
        user_controlled: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl LyricsEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            LyricsEvent::LyricsResolved { .. } => "LyricsResolved",
            LyricsEvent::LyricsNotFound { .. } => "LyricsNotFound",
            LyricsEvent::TranslationReady { .. } => "TranslationReady",
            LyricsEvent::CacheReset { .. } => "CacheReset",
            LyricsEvent::ActiveLineChanged { .. } => "ActiveLineChanged",
            LyricsEvent::SeekRequested { .. } => "SeekRequested",
            LyricsEvent::ScrollModeChanged { .. } => "ScrollModeChanged",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time;

    #[test]
    fn event_type_strings() {
        let event = LyricsEvent::CacheReset {
            timestamp: time::now(),
        };
        assert_eq!(event.event_type(), "CacheReset");

        let event = LyricsEvent::SeekRequested {
            time_ms: 42_000,
            timestamp: time::now(),
        };
        assert_eq!(event.event_type(), "SeekRequested");
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = LyricsEvent::LyricsResolved {
            key: "a - b - c - 1".to_string(),
            version: 1_700_000_000_000,
            kind: LyricsKind::Word,
            line_count: 12,
            timestamp: time::now(),
        };

        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains("\"type\":\"LyricsResolved\""));
        assert!(json.contains("\"line_count\":12"));

        let back: LyricsEvent = serde_json::from_str(&json).expect("deserialize");
        match back {
            LyricsEvent::LyricsResolved { key, version, .. } => {
                assert_eq!(key, "a - b - c - 1");
                assert_eq!(version, 1_700_000_000_000);
            }
            other => panic!("wrong event type deserialized: {other:?}"),
        }
    }
}
