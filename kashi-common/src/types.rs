//! Canonical lyrics data model
//!
//! Everything downstream of the format parsers speaks this vocabulary: a
//! `LyricsDocument` is an ordered sequence of timed lines, optionally carrying
//! word-level syllables, and a `VersionedLyrics` pairs a document with the
//! resolution stamp that invalidates dependent translations.

use serde::{Deserialize, Serialize};

/// Identity of a song as reported by the playing platform
///
/// Immutable for the duration of a playback session. Equal identities must
/// derive equal cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongIdentity {
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Track duration in whole seconds
    pub duration_s: u64,
}

impl SongIdentity {
    /// Derive the cache key joining all identity fields
    ///
    /// This string is the sole join key across the memory cache, the
    /// persistent cache and the in-flight registry. No normalization is
    /// applied; callers must pass identity fields verbatim everywhere.
    pub fn cache_key(&self) -> String {
        format!(
            "{} - {} - {} - {}",
            self.title, self.artist, self.album, self.duration_s
        )
    }
}

/// Synchronization granularity of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum LyricsKind {
    /// Line-level timing only
    Line,
    /// Word-level timing: every line carries zero or more syllables
    Word,
}

/// One timed syllable within a line
///
/// Offsets are absolute milliseconds on the playback clock, same timebase as
/// the owning line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Syllable {
    pub text: String,
    pub start_offset_ms: u64,
    pub duration_ms: u64,
    #[serde(default)]
    pub is_background: bool,
    #[serde(default)]
    pub romanized_text: Option<String>,
}

impl Syllable {
    pub fn end_offset_ms(&self) -> u64 {
        self.start_offset_ms + self.duration_ms
    }
}

/// Translation shipped inside a provider payload, tagged with its language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedTranslation {
    pub lang: String,
    pub text: String,
}

/// One timed lyric line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricLine {
    pub text: String,
    pub start_time_ms: u64,
    pub end_time_ms: u64,
    pub duration_ms: u64,
    #[serde(default)]
    pub syllables: Vec<Syllable>,
    /// Result of a translation pass, merged back in document order
    #[serde(default)]
    pub translated_text: Option<String>,
    /// Result of a romanization pass (line-level)
    #[serde(default)]
    pub romanized_text: Option<String>,
    /// Translation embedded in the source payload, if any
    #[serde(default)]
    pub embedded_translation: Option<EmbeddedTranslation>,
    /// Singer tag from the source (used for left/right styling downstream)
    #[serde(default)]
    pub singer: Option<String>,
}

impl LyricLine {
    /// True when any syllable (or the line itself) carries a prebuilt
    /// romanization
    pub fn has_prebuilt_romanization(&self) -> bool {
        self.romanized_text.is_some() || self.syllables.iter().any(|s| s.romanized_text.is_some())
    }
}

/// Free-form metadata carried alongside a document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    /// Which provider/source produced this document
    #[serde(default)]
    pub source: Option<String>,
}

/// A resolved lyrics document
///
/// Invariant: `lines` is sorted non-decreasing by `start_time_ms`. The
/// parsers own that ordering; consumers do not repair it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricsDocument {
    pub kind: LyricsKind,
    pub lines: Vec<LyricLine>,
    #[serde(default)]
    pub metadata: DocumentMetadata,
}

impl LyricsDocument {
    /// An empty document is treated as "no lyrics" everywhere
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn is_word_synced(&self) -> bool {
        self.kind == LyricsKind::Word
    }
}

/// A lyrics document stamped with its resolution version
///
/// The version is assigned when the document is freshly resolved from a
/// provider (epoch milliseconds at that instant) and never changes on cache
/// hits. Dependent translation records are valid only while their
/// `original_version` matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedLyrics {
    pub document: LyricsDocument,
    pub version: u64,
}

/// A translated or romanized document tied to the source it was derived from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub document: LyricsDocument,
    /// Version of the `VersionedLyrics` this record was computed from
    pub original_version: u64,
}

impl TranslationRecord {
    /// A record is only servable while the source document version matches
    pub fn is_valid_for(&self, current_version: u64) -> bool {
        self.original_version == current_version
    }
}

/// Which derivation the translation resolver should perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationAction {
    Translate,
    Romanize,
}

impl std::fmt::Display for TranslationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslationAction::Translate => write!(f, "translate"),
            TranslationAction::Romanize => write!(f, "romanize"),
        }
    }
}

/// Platform caption track usable as a last-resort lyrics source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionTrack {
    /// Caption endpoint for the currently playing video
    pub base_url: String,
    #[serde(default)]
    pub language: Option<String>,
}
