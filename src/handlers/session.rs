use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::settings::SettingsStore;

/// In-memory state of one handler for the lifetime of an automation session.
#[derive(Debug)]
pub struct HandlerSession {
    interval: Duration,
    daily_limit: u64,
    skip_sponsored: bool,
    scroll_in_progress: AtomicBool,
    scrolled: AtomicU64,
    last_advance: Mutex<Option<Instant>>,
    baseline: Mutex<WatchedBaseline>,
}

/// Today's watched count when the run started, and the session's scroll
/// count at that moment.
#[derive(Debug, Clone, Copy, Default)]
struct WatchedBaseline {
    watched: u64,
    scrolled: u64,
}

impl HandlerSession {
    pub fn new(interval: Duration, daily_limit: u64, skip_sponsored: bool) -> Self {
        Self {
            interval,
            daily_limit,
            skip_sponsored,
            scroll_in_progress: AtomicBool::new(false),
            scrolled: AtomicU64::new(0),
            last_advance: Mutex::new(None),
            baseline: Mutex::new(WatchedBaseline::default()),
        }
    }

    pub fn from_settings(settings: &SettingsStore) -> Self {
        Self::new(
            settings.scroll_interval(),
            settings.daily_limit(),
            settings.skip_sponsored(),
        )
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn daily_limit(&self) -> u64 {
        self.daily_limit
    }

    pub fn skip_sponsored(&self) -> bool {
        self.skip_sponsored
    }

    /// Items scrolled by this handler since the session started.
    pub fn scrolled_count(&self) -> u64 {
        self.scrolled.load(Ordering::SeqCst)
    }

    pub fn is_scroll_in_progress(&self) -> bool {
        self.scroll_in_progress.load(Ordering::SeqCst)
    }

    /// Claims the re-entrancy guard; `None` while another scroll is in flight.
    pub fn try_begin_scroll(&self) -> Option<ScrollGuard<'_>> {
        self.scroll_in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| ScrollGuard {
                flag: &self.scroll_in_progress,
            })
    }

    /// Anchors the limit count at the start of a run.
    pub(crate) fn mark_baseline(&self, watched: u64) {
        *self.lock_baseline() = WatchedBaseline {
            watched,
            scrolled: self.scrolled_count(),
        };
    }

    /// Today's watched count as far as this handler can tell: the stored
    /// value, or the baseline plus scrolls made since, whichever is higher.
    /// Keeps the limit enforced when stats reads fail.
    pub fn effective_watched(&self, stored: u64) -> u64 {
        let baseline = *self.lock_baseline();
        let since = self.scrolled_count().saturating_sub(baseline.scrolled);
        stored.max(baseline.watched + since)
    }

    pub(crate) fn note_scrolled(&self) -> u64 {
        self.scrolled.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Starts the time-spent clock for the first item.
    pub(crate) fn mark_feed_entered(&self) {
        *self.last_advance() = Some(Instant::now());
    }

    /// Time since the previous advance (or since the feed was entered), and
    /// restarts the clock.
    pub(crate) fn take_time_spent(&self) -> Duration {
        let now = Instant::now();
        let previous = self.last_advance().replace(now);
        previous
            .map(|at| now.saturating_duration_since(at))
            .unwrap_or_default()
    }

    pub(crate) fn release(&self) {
        self.scroll_in_progress.store(false, Ordering::SeqCst);
        *self.last_advance() = None;
    }

    fn lock_baseline(&self) -> std::sync::MutexGuard<'_, WatchedBaseline> {
        self.baseline.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn last_advance(&self) -> std::sync::MutexGuard<'_, Option<Instant>> {
        self.last_advance
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Held for the duration of one scroll; clears the guard on drop.
#[derive(Debug)]
pub struct ScrollGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for ScrollGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Per-iteration verdict on the visible item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollDecision {
    pub is_sponsored: bool,
    pub should_skip_immediately: bool,
    pub remaining_quota: u64,
}

impl ScrollDecision {
    pub fn evaluate(is_sponsored: bool, skip_sponsored: bool, daily_limit: u64, watched: u64) -> Self {
        Self {
            is_sponsored,
            should_skip_immediately: is_sponsored && skip_sponsored,
            remaining_quota: daily_limit.saturating_sub(watched),
        }
    }

    pub fn limit_reached(&self) -> bool {
        self.remaining_quota == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_watched_counts_session_scrolls() {
        let session = HandlerSession::new(Duration::from_secs(5), 10, false);
        assert_eq!(session.effective_watched(0), 0);

        session.note_scrolled();
        session.mark_baseline(4);
        assert_eq!(session.effective_watched(0), 4);

        session.note_scrolled();
        session.note_scrolled();
        // Stored read failed and came back empty.
        assert_eq!(session.effective_watched(0), 6);
        // A fresher stored value wins.
        assert_eq!(session.effective_watched(9), 9);
    }

    #[test]
    fn test_guard_is_exclusive_and_released_on_drop() {
        let session = HandlerSession::new(Duration::from_secs(5), 10, false);
        let guard = session.try_begin_scroll().unwrap();
        assert!(session.is_scroll_in_progress());
        assert!(session.try_begin_scroll().is_none());
        drop(guard);
        assert!(!session.is_scroll_in_progress());
        assert!(session.try_begin_scroll().is_some());
    }

    #[test]
    fn test_decision() {
        let decision = ScrollDecision::evaluate(true, true, 10, 4);
        assert!(decision.should_skip_immediately);
        assert_eq!(decision.remaining_quota, 6);

        let decision = ScrollDecision::evaluate(true, false, 10, 12);
        assert!(decision.is_sponsored);
        assert!(!decision.should_skip_immediately);
        assert!(decision.limit_reached());
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_spent_clock() {
        let session = HandlerSession::new(Duration::from_secs(5), 10, false);
        assert_eq!(session.take_time_spent(), Duration::ZERO);

        session.mark_feed_entered();
        tokio::time::advance(Duration::from_secs(7)).await;
        assert_eq!(session.take_time_spent(), Duration::from_secs(7));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(session.take_time_spent(), Duration::from_secs(2));
    }
}
