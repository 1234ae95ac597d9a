//! Active window locator
//!
//! Finds the line a (lookahead-adjusted) time sample falls in. The hint
//! check makes monotonically advancing playback O(1); seeks fall back to a
//! binary search. Overlapping authoring is absorbed by electing the earliest
//! of a run of overlapping active lines as primary.

use crate::model::RenderLine;

/// Slack beyond a line's end before a located line is treated as a miss
pub const END_SANITY_SLACK_MS: i64 = 10;

/// Grace window for the backward overlap scan
pub const OVERLAP_GRACE_MS: i64 = 50;

/// Index of the line containing `time_ms`
///
/// Checks `hint` and `hint + 1` first, then binary-searches. When no line
/// contains the time, returns the last line whose start is at or before it,
/// or `None` when the time precedes every line.
pub fn line_index_at(lines: &[RenderLine], time_ms: i64, hint: usize) -> Option<usize> {
    if lines.is_empty() {
        return None;
    }

    // Sequential fast path
    if hint < lines.len() {
        if lines[hint].contains(time_ms) {
            return Some(hint);
        }
        if hint + 1 < lines.len() && lines[hint + 1].contains(time_ms) {
            return Some(hint + 1);
        }
    }

    // Binary search
    let mut low: i64 = 0;
    let mut high: i64 = lines.len() as i64 - 1;
    let mut result: Option<usize> = None;

    while low <= high {
        let mid = ((low + high) / 2) as usize;
        let line = &lines[mid];

        if line.contains(time_ms) {
            return Some(mid);
        } else if time_ms < line.start_ms as i64 {
            high = mid as i64 - 1;
        } else {
            low = mid as i64 + 1;
            result = Some(mid);
        }
    }

    result
}

/// Elect the primary line for a predicted time
///
/// Applies the end-time sanity check, scans backward over overlapping lines
/// so the earliest active one wins, and clamps misses to the model: before
/// the first line the primary is line 0, otherwise the last known index.
pub fn primary_line_index(
    lines: &[RenderLine],
    predicted_ms: i64,
    hint: usize,
) -> Option<usize> {
    if lines.is_empty() {
        return None;
    }

    let mut primary = line_index_at(lines, predicted_ms, hint);

    if let Some(idx) = primary {
        // Jumped far past the located line's end: treat as a miss
        if predicted_ms > lines[idx].end_ms as i64 + END_SANITY_SLACK_MS {
            primary = None;
        }
    }

    match primary {
        Some(found) => {
            let mut idx = found;
            while idx > 0 {
                let prev = &lines[idx - 1];
                let prev_active = predicted_ms >= prev.start_ms as i64
                    && predicted_ms <= prev.end_ms as i64 + OVERLAP_GRACE_MS;
                if prev_active {
                    idx -= 1;
                } else {
                    break;
                }
            }
            Some(idx)
        }
        None => {
            if predicted_ms < lines[0].start_ms as i64 {
                Some(0)
            } else {
                Some(hint.min(lines.len() - 1))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: usize, start_ms: u64, end_ms: u64) -> RenderLine {
        RenderLine {
            id: format!("line-{id}"),
            text: format!("line {id}"),
            start_ms,
            end_ms,
            syllables: vec![],
        }
    }

    /// Three contiguous 5-second lines
    fn model() -> Vec<RenderLine> {
        vec![
            line(0, 0, 5000),
            line(1, 5000, 10_000),
            line(2, 10_000, 15_000),
        ]
    }

    #[test]
    fn lookahead_adjusted_time_selects_next_line() {
        // Sample at 5200 with a 300ms lookahead evaluates 5500
        assert_eq!(line_index_at(&model(), 5500, 0), Some(1));
    }

    #[test]
    fn hint_fast_path_hits_current_line() {
        assert_eq!(line_index_at(&model(), 14_999, 2), Some(2));
    }

    #[test]
    fn time_before_all_lines_is_none() {
        assert_eq!(line_index_at(&model(), -100, 0), None);
    }

    #[test]
    fn hint_fast_path_hits_successor() {
        assert_eq!(line_index_at(&model(), 5100, 0), Some(1));
    }

    #[test]
    fn stale_hint_falls_back_to_binary_search() {
        assert_eq!(line_index_at(&model(), 12_000, 0), Some(2));
        assert_eq!(line_index_at(&model(), 500, 2), Some(0));
    }

    #[test]
    fn gap_resolves_to_last_started_line() {
        let lines = vec![line(0, 0, 1000), line(1, 5000, 6000)];
        // 3000 is in the gap: last line whose start <= time
        assert_eq!(line_index_at(&lines, 3000, 0), Some(0));
        // Past the end of everything
        assert_eq!(line_index_at(&lines, 9000, 0), Some(1));
    }

    #[test]
    fn primary_respects_sanity_check() {
        // 15_299 is beyond the last line's end + slack, so the located line
        // is discarded and the hint is kept
        assert_eq!(primary_line_index(&model(), 15_299, 2), Some(2));
    }

    #[test]
    fn primary_clamps_before_first_line() {
        assert_eq!(primary_line_index(&model(), -100, 0), Some(0));
    }

    #[test]
    fn primary_elects_earliest_overlapping_line() {
        let lines = vec![
            line(0, 0, 6000),
            line(1, 4000, 9000),
            line(2, 8000, 12_000),
        ];
        // 5000 is inside both line 0 and line 1; the earliest wins
        assert_eq!(primary_line_index(&lines, 5000, 1), Some(0));
        // 8500 overlaps lines 1 and 2
        assert_eq!(primary_line_index(&lines, 8500, 2), Some(1));
    }

    #[test]
    fn overlap_scan_honors_grace_window() {
        let lines = vec![line(0, 0, 5000), line(1, 5020, 9000)];
        // 5040 is within line 1 and line 0 ended 40ms ago, inside the grace
        assert_eq!(primary_line_index(&lines, 5040, 1), Some(0));
        // 5100 is past the grace window
        assert_eq!(primary_line_index(&lines, 5100, 1), Some(1));
    }

    #[test]
    fn empty_model_locates_nothing() {
        assert_eq!(line_index_at(&[], 1000, 0), None);
        assert_eq!(primary_line_index(&[], 1000, 0), None);
    }
}
