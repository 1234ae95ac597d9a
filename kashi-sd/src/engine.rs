//! Playback synchronizer
//!
//! Owns the SyncState: the primary index, the active set and the scroll
//! arbitration. All mutation happens in `tick` or in the explicit
//! user-scroll/seek entry points, on one logical thread. A missing render
//! model degrades every tick to a no-op frame; this path runs per display
//! refresh and must never throw.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::highlight::{
    self, LineTransition, SyllableState, TextMeasure,
};
use crate::locate;
use crate::model::RenderModel;
use crate::scroll::{ScrollCommand, ScrollSynchronizer};

/// Timing knobs for the sync loop
#[derive(Debug, Clone, Copy)]
pub struct SyncConfig {
    /// Added to the clock when locating the scroll target
    pub scroll_lookahead_ms: i64,
    /// Added (as an early shift) when deciding line highlight activation
    pub highlight_lookahead_ms: i64,
    /// Sample-to-sample jump treated as a seek
    pub seek_threshold_ms: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            scroll_lookahead_ms: 300,
            highlight_lookahead_ms: 190,
            seek_threshold_ms: 1000,
        }
    }
}

/// Syllable states for one active line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSyllables {
    pub index: usize,
    pub states: Vec<SyllableState>,
}

/// Everything one time sample changed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameUpdate {
    pub primary_index: Option<usize>,
    pub primary_changed: bool,
    /// Detected seek (forces search restart and scroll jump)
    pub seeked: bool,
    pub transitions: Vec<LineTransition>,
    pub syllables: Vec<LineSyllables>,
    pub scroll: Option<ScrollCommand>,
}

/// The per-frame state machine driving highlight and scroll
pub struct Synchronizer<M: TextMeasure> {
    config: SyncConfig,
    measure: M,
    model: Option<RenderModel>,
    primary_index: Option<usize>,
    active: BTreeSet<usize>,
    last_time_ms: Option<i64>,
    scroll: ScrollSynchronizer,
}

impl<M: TextMeasure> Synchronizer<M> {
    pub fn new(config: SyncConfig, measure: M) -> Self {
        Self {
            config,
            measure,
            model: None,
            primary_index: None,
            active: BTreeSet::new(),
            last_time_ms: None,
            scroll: ScrollSynchronizer::new(),
        }
    }

    /// Swap the render model (new song, display-mode change); resets state
    pub fn set_model(&mut self, model: Option<RenderModel>) {
        self.model = model;
        self.primary_index = None;
        self.active.clear();
        self.last_time_ms = None;
        self.scroll.teardown();
    }

    /// Replace the text metrics (font change); pre-highlight timing follows
    pub fn set_measure(&mut self, measure: M) {
        self.measure = measure;
    }

    pub fn model(&self) -> Option<&RenderModel> {
        self.model.as_ref()
    }

    pub fn is_user_scrolling(&self) -> bool {
        self.scroll.is_user_controlled()
    }

    /// Flag a user scroll interaction at the given sample clock
    pub fn notice_user_scroll(&mut self, now_ms: u64) {
        self.scroll.notice_user_scroll(now_ms as i64);
    }

    /// Line click: the seek time the consumer should request, slightly
    /// before the line start so its first syllable is not clipped
    pub fn seek_time_for_line(&self, index: usize) -> Option<u64> {
        let model = self.model.as_ref()?;
        let line = model.lines().get(index)?;
        Some(line.start_ms.saturating_sub(50))
    }

    /// Stop timers; the synchronizer is inert until a new model arrives
    pub fn teardown(&mut self) {
        self.scroll.teardown();
        self.last_time_ms = None;
    }

    /// Process one time sample
    ///
    /// `visible` carries the ids of lines currently in the viewport, as
    /// reported by the display's visibility observer.
    pub fn tick(&mut self, now_ms: u64, visible: &HashSet<String>) -> FrameUpdate {
        let Some(model) = &self.model else {
            // No lyrics resolved yet: degrade to a no-op frame
            return FrameUpdate::default();
        };
        if model.is_empty() {
            return FrameUpdate::default();
        }
        let lines = model.lines();

        let now = now_ms as i64;
        let seeked = self
            .last_time_ms
            .map(|last| (now - last).abs() > self.config.seek_threshold_ms)
            .unwrap_or(false);
        self.last_time_ms = Some(now);

        // A seek invalidates the hint: restart the search from the top
        let hint = if seeked {
            0
        } else {
            self.primary_index.unwrap_or(0)
        };

        let predicted = now + self.config.scroll_lookahead_ms;
        let primary = locate::primary_line_index(lines, predicted, hint);

        let primary_changed = primary != self.primary_index;
        self.primary_index = primary;

        // Highlight diff over the window around the primary line
        let (transitions, syllables) = match primary {
            Some(primary) => {
                let active = highlight::active_window(
                    lines,
                    primary,
                    now,
                    self.config.highlight_lookahead_ms,
                    visible,
                );
                let transitions = highlight::diff_active(lines, &self.active, &active);
                self.active = active.iter().copied().collect();

                let syllables = active
                    .iter()
                    .map(|&index| LineSyllables {
                        index,
                        states: highlight::syllable_states(&lines[index], now, &self.measure),
                    })
                    .collect();

                (transitions, syllables)
            }
            None => (vec![], vec![]),
        };

        // Scroll: deferred/reverting work first, then the new target. The
        // comparison is against the last line actually scrolled to, so a
        // target suppressed during user control is retried once control
        // reverts.
        let mut scroll = self.scroll.tick(lines, now, visible);
        if scroll.is_none() {
            if let Some(primary) = primary {
                if seeked || self.scroll.current_target() != Some(primary) {
                    scroll = self.scroll.request_scroll(lines, primary, seeked, now, visible);
                }
            }
        }

        FrameUpdate {
            primary_index: primary,
            primary_changed,
            seeked,
            transitions,
            syllables,
            scroll,
        }
    }
}
