//! Highlight diff engine
//!
//! Computes the active-line set for a time sample, diffs it against the
//! previous frame, and steps syllables through
//! idle → pre-highlight → highlight → finished. The cross-syllable
//! pre-highlight lead-in is a timing estimate from text width and syllable
//! duration, recomputed whenever font metrics change; the exact formula is a
//! tunable, not a contract.

use std::collections::BTreeSet;
use std::collections::HashSet;

use serde::Serialize;

use crate::model::{RenderLine, RenderSyllable};

/// How far the active window extends around the primary line
pub const WINDOW_BEHIND: usize = 1;
pub const WINDOW_AHEAD: usize = 2;

/// Fraction of the font size the wipe gradient spans
const GRADIENT_FONT_FRACTION: f32 = 0.375;

/// Syllable highlight lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyllableState {
    Idle,
    /// Lead-in on the next syllable of the word being wiped
    PreHighlight,
    Highlight,
    Finished,
}

/// Line-level enter/exit transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TransitionKind {
    /// Begin highlighting this line
    Enter,
    /// Reset this line's highlight state
    Exit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineTransition {
    pub index: usize,
    pub id: String,
    pub kind: TransitionKind,
}

/// Supplies text metrics for the pre-highlight physics
///
/// The display owns real font measurement; the engine only needs widths.
/// Implementations must be cheap, this is called on state transitions.
pub trait TextMeasure {
    fn text_width_px(&self, text: &str) -> f32;
    fn font_size_px(&self) -> f32;
}

/// Fixed-advance estimate, usable when no renderer metrics exist yet
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMeasure {
    pub char_width_px: f32,
    pub font_size: f32,
}

impl Default for MonospaceMeasure {
    fn default() -> Self {
        Self {
            char_width_px: 9.6,
            font_size: 16.0,
        }
    }
}

impl TextMeasure for MonospaceMeasure {
    fn text_width_px(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.char_width_px
    }

    fn font_size_px(&self) -> f32 {
        self.font_size
    }
}

/// Pre-highlight lead-in timing for one syllable
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreHighlightTiming {
    /// Offset from the syllable's start until the lead-in begins
    pub delay_ms: f32,
    /// Lead-in duration
    pub duration_ms: f32,
}

/// Wipe-speed estimate: the highlight travels `text_width_px` over the
/// syllable duration, and the lead-in covers the trailing gradient span
pub fn pre_highlight_timing(
    text_width_px: f32,
    font_size_px: f32,
    duration_ms: u64,
) -> PreHighlightTiming {
    if text_width_px <= 0.1 || duration_ms == 0 {
        return PreHighlightTiming {
            delay_ms: 0.0,
            duration_ms: 0.0,
        };
    }

    let velocity_px_per_ms = text_width_px / duration_ms as f32;
    let gradient_distance_px = GRADIENT_FONT_FRACTION * font_size_px;
    let gradient_duration_ms = gradient_distance_px / velocity_px_per_ms;

    PreHighlightTiming {
        delay_ms: duration_ms as f32 - gradient_duration_ms,
        duration_ms: gradient_duration_ms,
    }
}

/// Indices of lines active at `now_ms`, restricted to the window around the
/// primary line and to lines currently visible
///
/// A line is active while `now` is within its bounds shifted back by the
/// highlight lookahead. The result is ordered by start time.
pub fn active_window(
    lines: &[RenderLine],
    primary: usize,
    now_ms: i64,
    highlight_lookahead_ms: i64,
    visible: &HashSet<String>,
) -> Vec<usize> {
    if lines.is_empty() {
        return vec![];
    }

    let start = primary.saturating_sub(WINDOW_BEHIND);
    let end = (primary + WINDOW_AHEAD).min(lines.len() - 1);

    let mut active: Vec<usize> = (start..=end)
        .filter(|&i| {
            let line = &lines[i];
            visible.contains(&line.id)
                && now_ms >= line.start_ms as i64 - highlight_lookahead_ms
                && now_ms <= line.end_ms as i64 - highlight_lookahead_ms
        })
        .collect();

    active.sort_by_key(|&i| lines[i].start_ms);
    active
}

/// Diff the new active set against the previous frame's
///
/// Exits come first so a consumer resets leaving lines before starting the
/// entering ones.
pub fn diff_active(
    lines: &[RenderLine],
    previous: &BTreeSet<usize>,
    next: &[usize],
) -> Vec<LineTransition> {
    let next_set: BTreeSet<usize> = next.iter().copied().collect();
    let mut transitions = Vec::new();

    for &index in previous.iter() {
        if !next_set.contains(&index) {
            if let Some(line) = lines.get(index) {
                transitions.push(LineTransition {
                    index,
                    id: line.id.clone(),
                    kind: TransitionKind::Exit,
                });
            }
        }
    }

    for &index in next {
        if !previous.contains(&index) {
            transitions.push(LineTransition {
                index,
                id: lines[index].id.clone(),
                kind: TransitionKind::Enter,
            });
        }
    }

    transitions
}

fn base_state(syllable: &RenderSyllable, now_ms: i64) -> SyllableState {
    let start = syllable.start_ms as i64;
    let end = syllable.end_ms as i64;
    if now_ms >= start && now_ms <= end {
        SyllableState::Highlight
    } else if now_ms > end {
        SyllableState::Finished
    } else {
        SyllableState::Idle
    }
}

/// True when two adjacent syllables belong to the same word
///
/// Word boundaries are carried as trailing whitespace on syllable text.
fn same_word(prev: &RenderSyllable, next: &RenderSyllable) -> bool {
    !prev.text.ends_with(char::is_whitespace) && prev.is_background == next.is_background
}

/// Per-syllable states for one line at `now_ms`
///
/// While a syllable is highlighted, the next syllable of the same word is
/// promoted to pre-highlight once the wipe physics say its lead-in should
/// begin. A backward jump demotes everything naturally since states are
/// recomputed from the clock.
pub fn syllable_states(
    line: &RenderLine,
    now_ms: i64,
    measure: &dyn TextMeasure,
) -> Vec<SyllableState> {
    let syllables = &line.syllables;
    let mut states: Vec<SyllableState> =
        syllables.iter().map(|s| base_state(s, now_ms)).collect();

    for i in 0..syllables.len().saturating_sub(1) {
        if states[i] != SyllableState::Highlight
            || states[i + 1] != SyllableState::Idle
            || !same_word(&syllables[i], &syllables[i + 1])
        {
            continue;
        }

        let timing = pre_highlight_timing(
            measure.text_width_px(&syllables[i].text),
            measure.font_size_px(),
            syllables[i].end_ms.saturating_sub(syllables[i].start_ms),
        );
        if now_ms >= syllables[i].start_ms as i64 + timing.delay_ms as i64 {
            states[i + 1] = SyllableState::PreHighlight;
        }
    }

    states
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syllable(text: &str, start_ms: u64, end_ms: u64) -> RenderSyllable {
        RenderSyllable {
            text: text.to_string(),
            start_ms,
            end_ms,
            is_background: false,
        }
    }

    fn line(id: usize, start_ms: u64, end_ms: u64) -> RenderLine {
        RenderLine {
            id: format!("line-{id}"),
            text: String::new(),
            start_ms,
            end_ms,
            syllables: vec![],
        }
    }

    fn visible_all(lines: &[RenderLine]) -> HashSet<String> {
        lines.iter().map(|l| l.id.clone()).collect()
    }

    #[test]
    fn window_is_bounded_around_primary() {
        let lines: Vec<RenderLine> =
            (0..6).map(|i| line(i, i as u64 * 1000, 20_000)).collect();
        let visible = visible_all(&lines);

        // All six lines contain t=5000; only primary-1..=primary+2 qualify
        let active = active_window(&lines, 3, 5000, 0, &visible);
        assert_eq!(active, vec![2, 3, 4, 5]);
    }

    #[test]
    fn invisible_lines_are_never_active() {
        let lines = vec![line(0, 0, 10_000), line(1, 0, 10_000)];
        let mut visible = HashSet::new();
        visible.insert("line-1".to_string());

        let active = active_window(&lines, 0, 5000, 0, &visible);
        assert_eq!(active, vec![1]);
    }

    #[test]
    fn lookahead_shifts_activation_early() {
        let lines = vec![line(0, 1000, 2000)];
        let visible = visible_all(&lines);

        // 190ms lookahead: active from 810 through 1810
        assert!(active_window(&lines, 0, 809, 190, &visible).is_empty());
        assert_eq!(active_window(&lines, 0, 810, 190, &visible), vec![0]);
        assert_eq!(active_window(&lines, 0, 1810, 190, &visible), vec![0]);
        assert!(active_window(&lines, 0, 1811, 190, &visible).is_empty());
    }

    #[test]
    fn diff_emits_exits_before_enters() {
        let lines = vec![line(0, 0, 1000), line(1, 0, 1000), line(2, 0, 1000)];
        let previous: BTreeSet<usize> = [0, 1].into_iter().collect();

        let transitions = diff_active(&lines, &previous, &[1, 2]);
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0].index, 0);
        assert_eq!(transitions[0].kind, TransitionKind::Exit);
        assert_eq!(transitions[1].index, 2);
        assert_eq!(transitions[1].kind, TransitionKind::Enter);
    }

    #[test]
    fn diff_of_identical_sets_is_empty() {
        let lines = vec![line(0, 0, 1000), line(1, 0, 1000)];
        let previous: BTreeSet<usize> = [0, 1].into_iter().collect();
        assert!(diff_active(&lines, &previous, &[0, 1]).is_empty());
    }

    #[test]
    fn syllable_state_boundaries() {
        let syl = syllable("la", 1000, 1400);
        assert_eq!(base_state(&syl, 999), SyllableState::Idle);
        assert_eq!(base_state(&syl, 1000), SyllableState::Highlight);
        assert_eq!(base_state(&syl, 1400), SyllableState::Highlight);
        assert_eq!(base_state(&syl, 1401), SyllableState::Finished);
    }

    #[test]
    fn physics_timing_from_width_and_duration() {
        // 100px over 1000ms: 0.1 px/ms; gradient 0.375 * 16 = 6px -> 60ms
        let timing = pre_highlight_timing(100.0, 16.0, 1000);
        assert!((timing.duration_ms - 60.0).abs() < 0.001);
        assert!((timing.delay_ms - 940.0).abs() < 0.001);

        // Degenerate inputs collapse to zero
        let zero = pre_highlight_timing(0.0, 16.0, 1000);
        assert_eq!(zero.delay_ms, 0.0);
        let zero = pre_highlight_timing(100.0, 16.0, 0);
        assert_eq!(zero.duration_ms, 0.0);
    }

    #[test]
    fn next_syllable_in_word_pre_highlights_near_wipe_end() {
        // "syl" and "lable" form one word; 10 chars/sec wipe
        let mut l = line(0, 0, 2000);
        l.syllables = vec![syllable("syl", 0, 1000), syllable("lable ", 1000, 2000)];

        let measure = MonospaceMeasure {
            char_width_px: 10.0,
            font_size: 16.0,
        };
        // Gradient: 6px at 0.03 px/ms -> 200ms, so the lead-in begins at 800
        let states = syllable_states(&l, 700, &measure);
        assert_eq!(states, vec![SyllableState::Highlight, SyllableState::Idle]);

        let states = syllable_states(&l, 850, &measure);
        assert_eq!(
            states,
            vec![SyllableState::Highlight, SyllableState::PreHighlight]
        );
    }

    #[test]
    fn word_boundary_blocks_pre_highlight() {
        // Trailing space on the first syllable ends the word
        let mut l = line(0, 0, 2000);
        l.syllables = vec![syllable("word ", 0, 1000), syllable("next", 1000, 2000)];

        let measure = MonospaceMeasure::default();
        let states = syllable_states(&l, 999, &measure);
        assert_eq!(states[1], SyllableState::Idle);
    }

    #[test]
    fn backward_jump_resets_states() {
        let mut l = line(0, 0, 2000);
        l.syllables = vec![syllable("a", 0, 1000), syllable("b", 1000, 2000)];
        let measure = MonospaceMeasure::default();

        let states = syllable_states(&l, 1900, &measure);
        assert_eq!(states[0], SyllableState::Finished);

        // Seek back before everything
        let states = syllable_states(&l, -100, &measure);
        assert_eq!(states, vec![SyllableState::Idle, SyllableState::Idle]);
    }
}
