//! Frame scheduler
//!
//! The sync loop wants a callback at roughly display-refresh cadence,
//! started and stopped with display visibility. Browser hosts map this to
//! their animation-frame facility; everywhere else a fixed-interval tokio
//! timer is equivalent.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// Nominal display refresh period (~60 Hz)
pub const DISPLAY_REFRESH_PERIOD: Duration = Duration::from_millis(16);

/// Registers a periodic callback at display cadence
pub trait FrameScheduler {
    /// Start ticking; an already-running scheduler restarts
    fn start(&mut self, callback: Box<dyn FnMut() + Send>);
    /// Stop ticking; idempotent
    fn stop(&mut self);
    fn is_running(&self) -> bool;
}

/// Fixed-interval scheduler on the tokio runtime
pub struct IntervalScheduler {
    period: Duration,
    handle: Option<JoinHandle<()>>,
}

impl IntervalScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            handle: None,
        }
    }

    pub fn at_display_rate() -> Self {
        Self::new(DISPLAY_REFRESH_PERIOD)
    }
}

impl FrameScheduler for IntervalScheduler {
    fn start(&mut self, mut callback: Box<dyn FnMut() + Send>) {
        self.stop();
        let period = self.period;
        debug!(?period, "Starting frame scheduler");
        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // A stalled consumer should not be hammered with catch-up ticks
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                callback();
            }
        }));
    }

    fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Frame scheduler stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }
}

impl Drop for IntervalScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn ticks_while_running_and_stops_cleanly() {
        let counter = Arc::new(AtomicU64::new(0));
        let mut scheduler = IntervalScheduler::new(Duration::from_millis(5));

        let ticks = Arc::clone(&counter);
        scheduler.start(Box::new(move || {
            ticks.fetch_add(1, Ordering::Relaxed);
        }));
        assert!(scheduler.is_running());

        tokio::time::sleep(Duration::from_millis(60)).await;
        let seen = counter.load(Ordering::Relaxed);
        assert!(seen > 2, "expected several ticks, saw {seen}");

        scheduler.stop();
        assert!(!scheduler.is_running());
        tokio::time::sleep(Duration::from_millis(30)).await;
        let after_stop = counter.load(Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(counter.load(Ordering::Relaxed), after_stop);
    }

    #[tokio::test]
    async fn restart_replaces_previous_loop() {
        let first = Arc::new(AtomicU64::new(0));
        let second = Arc::new(AtomicU64::new(0));
        let mut scheduler = IntervalScheduler::new(Duration::from_millis(5));

        let a = Arc::clone(&first);
        scheduler.start(Box::new(move || {
            a.fetch_add(1, Ordering::Relaxed);
        }));
        tokio::time::sleep(Duration::from_millis(20)).await;

        let b = Arc::clone(&second);
        scheduler.start(Box::new(move || {
            b.fetch_add(1, Ordering::Relaxed);
        }));
        let first_at_restart = first.load(Ordering::Relaxed);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(first.load(Ordering::Relaxed), first_at_restart);
        assert!(second.load(Ordering::Relaxed) > 0);
    }
}
