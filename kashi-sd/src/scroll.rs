//! Scroll synchronizer
//!
//! Turns a primary-line change into a staggered scroll command, arbitrated
//! against user-driven scrolling. Timers are modeled as deadlines on the
//! sample clock so the synchronizer never owns a thread; the frame tick
//! advances everything.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::model::RenderLine;

/// Base duration of one scroll animation
pub const SCROLL_ANIMATION_MS: u64 = 400;
/// Extra delay per line at/after the reference line
pub const STAGGER_DELAY_MS: u64 = 30;
/// Settle slack added after the longest per-line animation
pub const ANIMATION_SETTLE_SLACK_MS: u64 = 50;
/// Lines included behind/ahead of the reference in the stagger window
pub const STAGGER_LOOK_BEHIND: usize = 5;
pub const STAGGER_LOOK_AHEAD: usize = 20;
/// User inactivity before programmatic scrolling resumes
pub const USER_SCROLL_IDLE_MS: u64 = 5000;

/// How the consumer should move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScrollMode {
    /// Eased animation with per-line stagger
    Animate,
    /// Immediate jump, all delays collapsed
    Jump,
}

/// Per-line animation delay
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineDelay {
    pub index: usize,
    pub id: String,
    pub delay_ms: u64,
}

/// One scroll instruction for the consumer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrollCommand {
    pub target_index: usize,
    pub mode: ScrollMode,
    pub delays: Vec<LineDelay>,
}

/// Scroll arbitration state
///
/// At most one superseding target is pending: targets arriving mid-animation
/// replace the pending slot and apply when the animation timer elapses,
/// never interrupting the animation in flight.
#[derive(Debug, Default)]
pub struct ScrollSynchronizer {
    current_target: Option<usize>,
    animating_until_ms: Option<i64>,
    pending_target: Option<usize>,
    user_controlled: bool,
    user_idle_deadline_ms: Option<i64>,
}

impl ScrollSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_user_controlled(&self) -> bool {
        self.user_controlled
    }

    pub fn current_target(&self) -> Option<usize> {
        self.current_target
    }

    /// Flag a user interaction; restarts the idle timer
    pub fn notice_user_scroll(&mut self, now_ms: i64) {
        self.user_controlled = true;
        self.user_idle_deadline_ms = Some(now_ms + USER_SCROLL_IDLE_MS as i64);
    }

    /// Request a scroll to `target`
    ///
    /// Suppressed while the user controls the viewport (unless forced). A
    /// force collapses every delay and interrupts any pending animation.
    pub fn request_scroll(
        &mut self,
        lines: &[RenderLine],
        target: usize,
        force: bool,
        now_ms: i64,
        visible: &HashSet<String>,
    ) -> Option<ScrollCommand> {
        if target >= lines.len() {
            return None;
        }

        if self.user_controlled && !force {
            debug!(target, "Scroll suppressed by user control");
            return None;
        }

        if force {
            self.user_controlled = false;
            self.user_idle_deadline_ms = None;
            self.animating_until_ms = None;
            self.pending_target = None;
            self.current_target = Some(target);
            return Some(ScrollCommand {
                target_index: target,
                mode: ScrollMode::Jump,
                delays: vec![],
            });
        }

        if let Some(deadline) = self.animating_until_ms {
            if now_ms < deadline {
                // Queue the newest target only
                self.pending_target = Some(target);
                return None;
            }
            self.animating_until_ms = None;
        }

        Some(self.start_animation(lines, target, now_ms, visible))
    }

    /// Advance timers; may emit a deferred or reverting scroll
    pub fn tick(
        &mut self,
        lines: &[RenderLine],
        now_ms: i64,
        visible: &HashSet<String>,
    ) -> Option<ScrollCommand> {
        if self.user_controlled {
            if let Some(deadline) = self.user_idle_deadline_ms {
                if now_ms >= deadline {
                    // Idle long enough: control reverts automatically
                    self.user_controlled = false;
                    self.user_idle_deadline_ms = None;
                    debug!("User scroll idle, reverting to auto-scroll");
                    if let Some(target) = self.current_target {
                        return self.request_scroll(lines, target, true, now_ms, visible);
                    }
                }
            }
            return None;
        }

        if let Some(deadline) = self.animating_until_ms {
            if now_ms >= deadline {
                self.animating_until_ms = None;
                if let Some(target) = self.pending_target.take() {
                    return Some(self.start_animation(lines, target, now_ms, visible));
                }
            }
        }

        None
    }

    /// Clear every timer and target
    pub fn teardown(&mut self) {
        *self = Self::default();
    }

    fn start_animation(
        &mut self,
        lines: &[RenderLine],
        target: usize,
        now_ms: i64,
        visible: &HashSet<String>,
    ) -> ScrollCommand {
        let start = target.saturating_sub(STAGGER_LOOK_BEHIND);
        let end = (target + STAGGER_LOOK_AHEAD).min(lines.len().saturating_sub(1));

        let mut delays = Vec::new();
        let mut counter: u64 = 0;
        let mut max_delay: u64 = 0;

        for index in start..=end {
            let line = &lines[index];
            if !visible.contains(&line.id) {
                continue;
            }
            let delay_ms = if index >= target {
                let d = counter * STAGGER_DELAY_MS;
                counter += 1;
                d
            } else {
                0
            };
            max_delay = max_delay.max(delay_ms);
            delays.push(LineDelay {
                index,
                id: line.id.clone(),
                delay_ms,
            });
        }

        let total = SCROLL_ANIMATION_MS + max_delay + ANIMATION_SETTLE_SLACK_MS;
        self.animating_until_ms = Some(now_ms + total as i64);
        self.current_target = Some(target);

        ScrollCommand {
            target_index: target,
            mode: ScrollMode::Animate,
            delays,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(n: usize) -> Vec<RenderLine> {
        (0..n)
            .map(|i| RenderLine {
                id: format!("line-{i}"),
                text: String::new(),
                start_ms: i as u64 * 1000,
                end_ms: i as u64 * 1000 + 1000,
                syllables: vec![],
            })
            .collect()
    }

    fn all_visible(lines: &[RenderLine]) -> HashSet<String> {
        lines.iter().map(|l| l.id.clone()).collect()
    }

    #[test]
    fn stagger_increases_after_reference_line() {
        let lines = lines(10);
        let visible = all_visible(&lines);
        let mut sync = ScrollSynchronizer::new();

        let command = sync
            .request_scroll(&lines, 4, false, 0, &visible)
            .expect("command");
        assert_eq!(command.mode, ScrollMode::Animate);
        assert_eq!(command.target_index, 4);

        for delay in &command.delays {
            if delay.index < 4 {
                assert_eq!(delay.delay_ms, 0, "lines behind the target move at once");
            }
        }
        let after: Vec<u64> = command
            .delays
            .iter()
            .filter(|d| d.index >= 4)
            .map(|d| d.delay_ms)
            .collect();
        assert_eq!(after, vec![0, 30, 60, 90, 120, 150]);
    }

    #[test]
    fn force_collapses_delays_to_jump() {
        let lines = lines(10);
        let visible = all_visible(&lines);
        let mut sync = ScrollSynchronizer::new();

        let command = sync
            .request_scroll(&lines, 7, true, 0, &visible)
            .expect("command");
        assert_eq!(command.mode, ScrollMode::Jump);
        assert!(command.delays.is_empty());
    }

    #[test]
    fn mid_animation_target_is_queued_not_interrupting() {
        let lines = lines(10);
        let visible = all_visible(&lines);
        let mut sync = ScrollSynchronizer::new();

        assert!(sync.request_scroll(&lines, 2, false, 0, &visible).is_some());

        // Animation runs 400 + max stagger + 50; a new target inside that
        // window is deferred
        assert!(sync.request_scroll(&lines, 3, false, 100, &visible).is_none());
        assert!(sync.tick(&lines, 200, &visible).is_none());

        // A later target supersedes the queued one
        assert!(sync.request_scroll(&lines, 4, false, 300, &visible).is_none());

        // Once the timer elapses the single pending target applies
        let command = sync.tick(&lines, 1000, &visible).expect("deferred");
        assert_eq!(command.target_index, 4);
        assert_eq!(command.mode, ScrollMode::Animate);
    }

    #[test]
    fn user_scroll_suppresses_until_idle_elapses() {
        let lines = lines(10);
        let visible = all_visible(&lines);
        let mut sync = ScrollSynchronizer::new();

        sync.request_scroll(&lines, 1, false, 0, &visible);
        sync.notice_user_scroll(1000);
        assert!(sync.is_user_controlled());

        // Programmatic scrolls are suppressed
        assert!(sync.request_scroll(&lines, 2, false, 1500, &visible).is_none());

        // A new interaction restarts the idle window
        sync.notice_user_scroll(3000);
        assert!(sync.tick(&lines, 7500, &visible).is_none());

        // 5s after the last interaction, control reverts and the display
        // snaps back to the current target
        let command = sync.tick(&lines, 8000, &visible).expect("revert");
        assert_eq!(command.target_index, 1);
        assert_eq!(command.mode, ScrollMode::Jump);
        assert!(!sync.is_user_controlled());
    }

    #[test]
    fn force_overrides_user_control() {
        let lines = lines(10);
        let visible = all_visible(&lines);
        let mut sync = ScrollSynchronizer::new();

        sync.notice_user_scroll(0);
        let command = sync
            .request_scroll(&lines, 5, true, 100, &visible)
            .expect("forced");
        assert_eq!(command.mode, ScrollMode::Jump);
        assert!(!sync.is_user_controlled());
    }

    #[test]
    fn invisible_lines_are_skipped_in_stagger() {
        let lines = lines(6);
        let mut visible = all_visible(&lines);
        visible.remove("line-3");

        let mut sync = ScrollSynchronizer::new();
        let command = sync
            .request_scroll(&lines, 2, false, 0, &visible)
            .expect("command");

        assert!(command.delays.iter().all(|d| d.index != 3));
        // The counter does not advance for skipped lines
        let after: Vec<u64> = command
            .delays
            .iter()
            .filter(|d| d.index >= 2)
            .map(|d| d.delay_ms)
            .collect();
        assert_eq!(after, vec![0, 30, 60]);
    }

    #[test]
    fn teardown_clears_timers() {
        let lines = lines(4);
        let visible = all_visible(&lines);
        let mut sync = ScrollSynchronizer::new();

        sync.request_scroll(&lines, 1, false, 0, &visible);
        sync.notice_user_scroll(10);
        sync.teardown();

        assert!(!sync.is_user_controlled());
        assert_eq!(sync.current_target(), None);
        // No deferred work fires after teardown
        assert!(sync.tick(&lines, 100_000, &visible).is_none());
    }
}
