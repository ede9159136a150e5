use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::session::{HandlerSession, ScrollDecision};
use super::{
    wait, AdvanceStyle, FeedPlatform, HandlerError, HandlerState, AD_SKIP_FOLLOW_UP,
    BUSY_BACKOFF, DAILY_LIMIT_NOTICE, ERROR_BACKOFF, ROOT_NULL_BACKOFF, SCROLL_FOLLOW_UP,
    SETTLE_ATTEMPTS, SETTLE_STEP,
};
use crate::accessibility::query::dump_hierarchy;
use crate::accessibility::{AccessibilityHost, NodeRef};
use crate::gesture::{GestureDispatcher, SwipeDirection, SWIPE_DURATION};
use crate::platform::Platform;
use crate::stats::{ScrollAttribution, StatsRepository};
use crate::utils::debug_dumps_enabled;
use crate::{log_debug, log_info, log_warn};

const ENABLE_LOGS: bool = true;

const DUMP_DEPTH: usize = 30;

/// Collaborators a handler run needs.
#[derive(Clone)]
pub struct HandlerContext {
    pub host: Arc<dyn AccessibilityHost>,
    pub stats: StatsRepository,
    /// Scope of the whole automation session; cancelled to stop every handler.
    pub cancel: CancellationToken,
    pub dispatcher: GestureDispatcher,
}

impl HandlerContext {
    pub fn new(
        host: Arc<dyn AccessibilityHost>,
        stats: StatsRepository,
        cancel: CancellationToken,
    ) -> Self {
        let dispatcher = GestureDispatcher::new(host.clone(), cancel.clone());
        Self {
            host,
            stats,
            cancel,
            dispatcher,
        }
    }
}

/// Result of one polling iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Scrolled { ad_skipped: bool },
    Backoff(Duration),
    LimitReached,
}

/// How a handler run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    LimitReached,
    Stopped,
    Aborted(HandlerError),
}

/// Drives one platform's feed through
/// `AwaitingForeground -> Navigating -> Polling -> LimitReached | Stopped`.
pub struct PlatformHandler {
    feed: Box<dyn FeedPlatform>,
    session: HandlerSession,
    state: Mutex<HandlerState>,
}

impl PlatformHandler {
    pub fn new(feed: Box<dyn FeedPlatform>, session: HandlerSession) -> Self {
        Self {
            feed,
            session,
            state: Mutex::new(HandlerState::AwaitingForeground),
        }
    }

    pub fn platform(&self) -> Platform {
        self.feed.platform()
    }

    pub fn session(&self) -> &HandlerSession {
        &self.session
    }

    pub fn state(&self) -> HandlerState {
        *self.lock_state()
    }

    /// Claims the handler for a run. Only a handler waiting for its app to
    /// come to the foreground can start; every other state makes this a no-op.
    pub fn begin_run(&self) -> bool {
        let mut state = self.lock_state();
        if *state != HandlerState::AwaitingForeground {
            return false;
        }
        *state = HandlerState::Navigating;
        true
    }

    /// Stops the handler for good and clears in-flight state.
    pub fn stop(&self) {
        self.set_state(HandlerState::Stopped);
        self.session.release();
    }

    /// Navigates to the feed and polls it until the limit is reached, the
    /// session is cancelled, or navigation fails. Expects [`begin_run`] to
    /// have succeeded.
    ///
    /// [`begin_run`]: PlatformHandler::begin_run
    pub async fn run(self: Arc<Self>, ctx: HandlerContext) -> RunOutcome {
        let platform = self.platform();
        log_info!("{platform} handler starting");

        match self.navigate(&ctx).await {
            Ok(()) => {}
            Err(HandlerError::Cancelled) => return self.finish_stopped(),
            Err(err) => {
                log_warn!("{platform} navigation aborted: {err}");
                ctx.host
                    .show_notice(&format!("Couldn't reach {}", platform.display_name()));
                self.set_state_unless_terminal(HandlerState::AwaitingForeground);
                return RunOutcome::Aborted(err);
            }
        }

        if !self.set_state_unless_terminal(HandlerState::Polling) {
            return self.finish_stopped();
        }
        self.session.mark_feed_entered();
        let watched = ctx.stats.today_record().await.watched(platform);
        self.session.mark_baseline(watched);
        log_info!("{platform} feed reached with {watched} watched today, polling");

        loop {
            if ctx.cancel.is_cancelled() {
                return self.finish_stopped();
            }

            let delay = match self.poll_once(&ctx).await {
                Ok(Step::Scrolled { ad_skipped: true }) => AD_SKIP_FOLLOW_UP,
                Ok(Step::Scrolled { ad_skipped: false }) => SCROLL_FOLLOW_UP,
                Ok(Step::Backoff(delay)) => delay,
                Ok(Step::LimitReached) => {
                    self.on_limit_reached(&ctx);
                    return RunOutcome::LimitReached;
                }
                Err(HandlerError::Cancelled) => return self.finish_stopped(),
                Err(err) => {
                    log_warn!("{platform} iteration failed: {err}");
                    ERROR_BACKOFF
                }
            };

            if wait(&ctx.cancel, delay).await.is_err() {
                return self.finish_stopped();
            }
        }
    }

    /// One iteration of the polling loop.
    pub async fn poll_once(&self, ctx: &HandlerContext) -> Result<Step, HandlerError> {
        let platform = self.platform();

        let Some(root) = ctx.host.root_in_active_window() else {
            log_debug!("{platform}: no active window root");
            return Ok(Step::Backoff(ROOT_NULL_BACKOFF));
        };

        let Some(_guard) = self.session.try_begin_scroll() else {
            log_debug!("{platform}: scroll already in flight");
            return Ok(Step::Backoff(BUSY_BACKOFF));
        };

        let stored = ctx.stats.today_record().await.watched(platform);
        let watched = self.session.effective_watched(stored);
        let limit = self.session.daily_limit();
        if watched >= limit {
            log_info!("{platform}: daily limit {limit} already reached ({watched})");
            return Ok(Step::LimitReached);
        }

        let decision = ScrollDecision::evaluate(
            self.feed.is_sponsored(&root),
            self.session.skip_sponsored(),
            limit,
            watched,
        );

        let root = if decision.should_skip_immediately {
            log_info!("{platform}: sponsored item, skipping");
            root
        } else {
            self.feed
                .pace(ctx.host.as_ref(), self.session.interval(), &ctx.cancel)
                .await?;
            // The tree has moved on while we waited.
            match ctx.host.root_in_active_window() {
                Some(root) => root,
                None => return Ok(Step::Backoff(ROOT_NULL_BACKOFF)),
            }
        };

        let signature = self.feed.item_signature(&root);
        self.advance(&root, &ctx.dispatcher).await?;

        let time_spent = self
            .feed
            .tracks_time_spent()
            .then(|| self.session.take_time_spent());
        ctx.stats
            .record_scroll(
                platform,
                ScrollAttribution {
                    ad_skipped: decision.should_skip_immediately,
                    interval: self.session.interval(),
                    time_spent,
                },
            )
            .await;
        let scrolled = self.session.note_scrolled();
        log_debug!("{platform}: scrolled {scrolled} this session");

        // Attributed already, so a stop while settling loses no count.
        self.wait_for_settle(ctx, signature).await?;

        if watched + 1 >= limit {
            return Ok(Step::LimitReached);
        }

        Ok(Step::Scrolled {
            ad_skipped: decision.should_skip_immediately,
        })
    }

    async fn navigate(&self, ctx: &HandlerContext) -> Result<(), HandlerError> {
        let platform = self.platform();
        let timing = self.feed.timing();

        wait(&ctx.cancel, timing.startup_delay).await?;
        self.wait_for_window(ctx).await?;

        let mut entered = false;
        for attempt in 1..=timing.entry_attempts {
            if let Some(root) = ctx.host.root_in_active_window() {
                if self.feed.find_feed(&root).is_some() {
                    log_info!("{platform}: already on the feed");
                    return Ok(());
                }
                if let Some(entry) = self.feed.find_entry_point(&root) {
                    if ctx.dispatcher.perform_click(&entry) {
                        log_info!("{platform}: entry point clicked on attempt {attempt}");
                        entered = true;
                        break;
                    }
                }
            }
            log_debug!("{platform}: entry point attempt {attempt} failed");
            wait(&ctx.cancel, timing.entry_retry_delay).await?;
        }

        if !entered {
            return Err(HandlerError::EntryPointNotFound {
                platform,
                attempts: timing.entry_attempts,
            });
        }

        wait(&ctx.cancel, timing.feed_load_delay).await?;

        if debug_dumps_enabled() {
            let root = ctx.host.root_in_active_window();
            log_debug!(
                "{platform} hierarchy after navigation:\n{}",
                dump_hierarchy(root.as_ref(), DUMP_DEPTH)
            );
        }
        Ok(())
    }

    async fn wait_for_window(&self, ctx: &HandlerContext) -> Result<(), HandlerError> {
        let platform = self.platform();
        let timing = self.feed.timing();

        for attempt in 1..=timing.root_attempts {
            let ready = ctx
                .host
                .root_in_active_window()
                .map(|root| {
                    !timing.require_package
                        || root.package_name().as_deref() == Some(platform.package_name())
                })
                .unwrap_or(false);
            if ready {
                return Ok(());
            }
            log_debug!("{platform}: window not ready (attempt {attempt})");
            wait(&ctx.cancel, timing.root_retry_delay).await?;
        }

        Err(HandlerError::WindowUnavailable { platform })
    }

    async fn advance(
        &self,
        root: &NodeRef,
        dispatcher: &GestureDispatcher,
    ) -> Result<(), HandlerError> {
        let feed = self
            .feed
            .find_feed(root)
            .ok_or_else(|| HandlerError::ScrollFailed("feed container not found".into()))?;

        let advanced = match self.feed.advance_style() {
            AdvanceStyle::ScrollForward(inset) => {
                dispatcher.scroll_forward_or_swipe(&feed, inset).await
            }
            AdvanceStyle::Swipe(inset) => match feed.bounds() {
                Some(bounds) => dispatcher
                    .perform_swipe(bounds, SwipeDirection::Up, inset, SWIPE_DURATION)
                    .await
                    .is_completed(),
                None => false,
            },
        };

        if !advanced {
            return Err(HandlerError::ScrollFailed(
                "feed did not accept the scroll".into(),
            ));
        }
        Ok(())
    }

    /// Polls until the visible item's signature differs from `before`.
    /// Best effort: gives up quietly after [`SETTLE_ATTEMPTS`].
    async fn wait_for_settle(
        &self,
        ctx: &HandlerContext,
        before: Option<String>,
    ) -> Result<bool, HandlerError> {
        let Some(before) = before else {
            return Ok(false);
        };

        for attempt in 1..=SETTLE_ATTEMPTS {
            wait(&ctx.cancel, SETTLE_STEP * attempt).await?;
            let current = ctx
                .host
                .root_in_active_window()
                .and_then(|root| self.feed.item_signature(&root));
            if current.is_some_and(|signature| signature != before) {
                return Ok(true);
            }
        }

        log_debug!("{}: feed signature unchanged after scroll", self.platform());
        Ok(false)
    }

    fn on_limit_reached(&self, ctx: &HandlerContext) {
        log_info!("{}: daily limit reached", self.platform());
        self.set_state(HandlerState::LimitReached);
        self.session.release();
        ctx.host.show_notice(DAILY_LIMIT_NOTICE);
        ctx.host.open_home_screen();
        ctx.host.disable_service();
        ctx.cancel.cancel();
    }

    fn finish_stopped(&self) -> RunOutcome {
        log_info!("{} handler stopped", self.platform());
        self.stop();
        RunOutcome::Stopped
    }

    fn set_state(&self, next: HandlerState) {
        *self.lock_state() = next;
    }

    /// Moves to `next` unless the handler already finished. Returns whether
    /// the transition happened.
    fn set_state_unless_terminal(&self, next: HandlerState) -> bool {
        let mut state = self.lock_state();
        if state.is_terminal() {
            return false;
        }
        *state = next;
        true
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, HandlerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
