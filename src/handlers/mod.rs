//! Per-platform feed handlers.
//!
//! Every platform runs the same state machine (see [`PlatformHandler`]); what
//! differs is how the entry point, the feed container and the current item
//! are recognised, which lives behind [`FeedPlatform`].

pub mod instagram;
pub mod linkedin;
mod runner;
mod session;
pub mod snapchat;
pub mod youtube;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::accessibility::query::find_first;
use crate::accessibility::{AccessibilityHost, NodeRef};
use crate::classifier;
use crate::gesture::SwipeInset;
use crate::platform::Platform;

pub use runner::{HandlerContext, PlatformHandler, RunOutcome, Step};
pub use session::{HandlerSession, ScrollDecision, ScrollGuard};

/// Wait after the active window root comes back empty.
pub const ROOT_NULL_BACKOFF: Duration = Duration::from_secs(1);
/// Wait when another iteration already has a scroll in flight.
pub const BUSY_BACKOFF: Duration = Duration::from_millis(500);
/// Wait after an iteration failed.
pub const ERROR_BACKOFF: Duration = Duration::from_secs(1);
/// Pause after a sponsored item was skipped.
pub const AD_SKIP_FOLLOW_UP: Duration = Duration::from_millis(500);
/// Pause after a regular scroll.
pub const SCROLL_FOLLOW_UP: Duration = Duration::from_millis(500);
/// Feed-advanced confirmation polls; the n-th poll waits `n * SETTLE_STEP`.
pub const SETTLE_ATTEMPTS: u32 = 5;
pub const SETTLE_STEP: Duration = Duration::from_millis(200);

pub const DAILY_LIMIT_NOTICE: &str = "Daily limit reached!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandlerState {
    AwaitingForeground,
    Navigating,
    Polling,
    LimitReached,
    Stopped,
}

impl HandlerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, HandlerState::LimitReached | HandlerState::Stopped)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, HandlerState::Navigating | HandlerState::Polling)
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum HandlerError {
    #[error("{platform} entry point not found after {attempts} attempts")]
    EntryPointNotFound { platform: Platform, attempts: u32 },
    #[error("{platform} window never became available")]
    WindowUnavailable { platform: Platform },
    #[error("scroll failed: {0}")]
    ScrollFailed(String),
    #[error("handler cancelled")]
    Cancelled,
}

/// Delays and retry bounds for reaching the short-video surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationTiming {
    /// Grace period after the app comes to the foreground.
    pub startup_delay: Duration,
    pub root_attempts: u32,
    pub root_retry_delay: Duration,
    /// The active root must belong to the platform's package.
    pub require_package: bool,
    pub entry_attempts: u32,
    pub entry_retry_delay: Duration,
    /// Wait after clicking the entry point for the feed to render.
    pub feed_load_delay: Duration,
}

impl Default for NavigationTiming {
    fn default() -> Self {
        Self {
            startup_delay: Duration::ZERO,
            root_attempts: 3,
            root_retry_delay: Duration::from_secs(1),
            require_package: false,
            entry_attempts: 3,
            entry_retry_delay: Duration::from_secs(1),
            feed_load_delay: Duration::from_secs(2),
        }
    }
}

/// How a feed container is moved to the next item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdvanceStyle {
    /// Direct scroll-forward action, swiping when the node refuses it.
    ScrollForward(SwipeInset),
    Swipe(SwipeInset),
}

/// Platform-specific knowledge of one target app's UI.
#[async_trait]
pub trait FeedPlatform: Send + Sync {
    fn platform(&self) -> Platform;

    fn timing(&self) -> NavigationTiming {
        NavigationTiming::default()
    }

    /// The tab or button that opens the short-video surface.
    fn find_entry_point(&self, root: &NodeRef) -> Option<NodeRef>;

    /// The scrollable container holding the feed.
    fn find_feed(&self, root: &NodeRef) -> Option<NodeRef>;

    fn advance_style(&self) -> AdvanceStyle;

    fn is_sponsored(&self, root: &NodeRef) -> bool {
        classifier::is_sponsored(self.platform(), root)
    }

    /// Identifies the visible item; a change means the feed has moved.
    fn item_signature(&self, root: &NodeRef) -> Option<String> {
        self.find_feed(root)
            .and_then(|feed| first_description_below(&feed))
    }

    /// Whether time spent per item is attributed.
    fn tracks_time_spent(&self) -> bool {
        false
    }

    /// Waits out the pacing interval before a regular scroll.
    async fn pace(
        &self,
        _host: &dyn AccessibilityHost,
        interval: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), HandlerError> {
        wait(cancel, interval).await
    }
}

/// UI knowledge for `platform`.
pub fn feed_for(platform: Platform) -> Box<dyn FeedPlatform> {
    match platform {
        Platform::Instagram => Box::new(instagram::InstagramReels),
        Platform::YouTube => Box::new(youtube::YouTubeShorts),
        Platform::LinkedIn => Box::new(linkedin::LinkedInVideos),
        Platform::Snapchat => Box::new(snapchat::SnapchatSpotlight),
    }
}

/// Sleeps for `duration` unless `cancel` fires first.
pub async fn wait(cancel: &CancellationToken, duration: Duration) -> Result<(), HandlerError> {
    if cancel.is_cancelled() {
        return Err(HandlerError::Cancelled);
    }
    if duration.is_zero() {
        return Ok(());
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => Ok(()),
        _ = cancel.cancelled() => Err(HandlerError::Cancelled),
    }
}

/// First non-empty content description strictly inside `container`.
fn first_description_below(container: &NodeRef) -> Option<String> {
    let container_ptr = Arc::as_ptr(container) as *const ();
    find_first(Some(container), |node| {
        Arc::as_ptr(node) as *const () != container_ptr
            && node
                .content_description()
                .map(|description| !description.trim().is_empty())
                .unwrap_or(false)
    })
    .and_then(|node| node.content_description())
}
