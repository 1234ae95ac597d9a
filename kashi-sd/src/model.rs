//! Render model
//!
//! Read-only projection of a resolved document into a flat, time-sorted line
//! array with absolute syllable bounds. Rebuilt whenever the document or
//! display mode changes, never mutated in place (the optional retiming pass
//! in [`crate::retime`] operates on a fresh copy).

use kashi_common::types::{LyricsKind, VersionedLyrics};
use serde::Serialize;
use tracing::warn;

/// Which text variant the display wants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    Original,
    Translated,
    Romanized,
}

/// One syllable with absolute millisecond bounds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSyllable {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub is_background: bool,
}

/// One displayable line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderLine {
    pub id: String,
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub syllables: Vec<RenderSyllable>,
}

impl RenderLine {
    pub fn contains(&self, time_ms: i64) -> bool {
        time_ms >= self.start_ms as i64 && time_ms < self.end_ms as i64
    }
}

/// Flat projection of one document version
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderModel {
    pub kind: LyricsKind,
    /// Version of the source document this model was built from
    pub version: u64,
    lines: Vec<RenderLine>,
}

impl RenderModel {
    /// Flatten a versioned document for display
    ///
    /// Line order is preserved from the source. A document violating the
    /// sorted-by-start invariant is an upstream parser bug; it is reported
    /// but not repaired here.
    pub fn build(source: &VersionedLyrics, mode: DisplayMode) -> Self {
        let lines: Vec<RenderLine> = source
            .document
            .lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let text = match mode {
                    DisplayMode::Original => line.text.clone(),
                    DisplayMode::Translated => line
                        .translated_text
                        .clone()
                        .unwrap_or_else(|| line.text.clone()),
                    DisplayMode::Romanized => line
                        .romanized_text
                        .clone()
                        .unwrap_or_else(|| line.text.clone()),
                };

                let syllables = line
                    .syllables
                    .iter()
                    .map(|syl| {
                        let start_ms = line.start_time_ms + syl.start_offset_ms;
                        let text = match mode {
                            DisplayMode::Romanized => syl
                                .romanized_text
                                .clone()
                                .unwrap_or_else(|| syl.text.clone()),
                            _ => syl.text.clone(),
                        };
                        RenderSyllable {
                            text,
                            start_ms,
                            end_ms: start_ms + syl.duration_ms,
                            is_background: syl.is_background,
                        }
                    })
                    .collect();

                RenderLine {
                    id: format!("line-{i}"),
                    text,
                    start_ms: line.start_time_ms,
                    end_ms: line.end_time_ms,
                    syllables,
                }
            })
            .collect();

        if lines.windows(2).any(|w| w[0].start_ms > w[1].start_ms) {
            warn!(version = source.version, "Render model source is not sorted by start time");
        }

        Self {
            kind: source.document.kind,
            version: source.version,
            lines,
        }
    }

    pub fn lines(&self) -> &[RenderLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Model with retimed line ends (see [`crate::retime`])
    pub fn with_lines(&self, lines: Vec<RenderLine>) -> Self {
        Self {
            kind: self.kind,
            version: self.version,
            lines,
        }
    }
}
