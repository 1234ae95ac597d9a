//! Optional retiming post-processor
//!
//! Empirically tuned cleanup of overlapping and gapped line timings,
//! applied between model build and display when the consumer opts in. Two
//! passes: a precursor pass that collapses three-line overlap windows, then
//! a backward pass that merges remaining overlaps and extends lines into
//! trailing gaps.

use crate::model::RenderLine;

/// Overlap below this is kept as authored
const OVERLAP_MERGE_THRESHOLD_MS: u64 = 100;
/// Longest gap extension granted to a line
const MAX_GAP_EXTENSION_MS: u64 = 1300;

/// Produce retimed copies of the lines
///
/// Start times are never touched; only end times move.
pub fn retime_lines(original: &[RenderLine]) -> Vec<RenderLine> {
    let mut lines: Vec<RenderLine> = original.to_vec();
    if lines.len() < 2 {
        return lines;
    }

    let original_ends: Vec<u64> = original.iter().map(|l| l.end_ms).collect();
    let mut handled = vec![false; lines.len()];

    // Precursor pass: A overlaps B, B overlaps C, but A ends before C
    // starts. A is trimmed to C's start so only two lines overlap at once.
    for i in 0..lines.len().saturating_sub(2) {
        let a_end = original_ends[i];
        let b_start = lines[i + 1].start_ms;
        let b_end = original_ends[i + 1];
        let c_start = lines[i + 2].start_ms;

        let a_overlaps_b = b_start < a_end;
        let b_overlaps_c = c_start < b_end;
        let a_clear_of_c = c_start >= a_end;
        if a_overlaps_b && b_overlaps_c && a_clear_of_c {
            lines[i].end_ms = c_start;
            handled[i] = true;
        }
    }

    // Backward pass: merge meaningful overlaps into the successor's end and
    // extend lines into trailing gaps, capped.
    for i in (0..lines.len() - 1).rev() {
        if handled[i] {
            continue;
        }

        let next_start = lines[i + 1].start_ms;
        let next_end = lines[i + 1].end_ms;
        let current_end = original_ends[i];

        if next_start < current_end {
            let overlap = current_end - next_start;
            if overlap >= OVERLAP_MERGE_THRESHOLD_MS {
                lines[i].end_ms = next_end;
            } else {
                lines[i].end_ms = current_end;
            }
        } else {
            let gap = next_start - current_end;
            if gap > 0 {
                lines[i].end_ms = current_end + gap.min(MAX_GAP_EXTENSION_MS);
            }
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: usize, start_ms: u64, end_ms: u64) -> RenderLine {
        RenderLine {
            id: format!("line-{id}"),
            text: String::new(),
            start_ms,
            end_ms,
            syllables: vec![],
        }
    }

    #[test]
    fn short_input_is_untouched() {
        let lines = vec![line(0, 0, 1000)];
        assert_eq!(retime_lines(&lines), lines);
    }

    #[test]
    fn three_line_overlap_window_trims_first_line() {
        // A [0,5000) overlaps B [4000,9000), B overlaps C [8000,12000),
        // A ends before C starts
        let lines = vec![
            line(0, 0, 5000),
            line(1, 4000, 9000),
            line(2, 8000, 12_000),
        ];
        let retimed = retime_lines(&lines);
        assert_eq!(retimed[0].end_ms, 8000);
    }

    #[test]
    fn meaningful_overlap_adopts_successor_end() {
        let lines = vec![line(0, 0, 5000), line(1, 4000, 9000)];
        let retimed = retime_lines(&lines);
        // 1000ms overlap >= threshold: A rides along to B's end
        assert_eq!(retimed[0].end_ms, 9000);
    }

    #[test]
    fn negligible_overlap_is_kept_as_authored() {
        let lines = vec![line(0, 0, 5050), line(1, 5000, 9000)];
        let retimed = retime_lines(&lines);
        assert_eq!(retimed[0].end_ms, 5050);
    }

    #[test]
    fn gap_extension_is_capped() {
        let lines = vec![
            line(0, 0, 1000),
            line(1, 1500, 2000),
            line(2, 10_000, 11_000),
        ];
        let retimed = retime_lines(&lines);
        // 500ms gap is fully absorbed
        assert_eq!(retimed[0].end_ms, 1500);
        // 8s gap is capped at the maximum extension
        assert_eq!(retimed[1].end_ms, 2000 + MAX_GAP_EXTENSION_MS);
    }

    #[test]
    fn start_times_never_move() {
        let lines = vec![line(0, 0, 5000), line(1, 4000, 9000), line(2, 8000, 12_000)];
        let retimed = retime_lines(&lines);
        for (before, after) in lines.iter().zip(&retimed) {
            assert_eq!(before.start_ms, after.start_ms);
        }
    }
}
