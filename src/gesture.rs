//! Gesture and action dispatch against the active window.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::accessibility::{AccessibilityHost, Bounds, GestureOutcome, NodeAction, NodeRef};
use crate::{log_debug, log_warn};

const ENABLE_LOGS: bool = true;

/// Duration of a synthesized feed swipe.
pub const SWIPE_DURATION: Duration = Duration::from_millis(300);

/// Distance kept from the target's edges when using a fixed inset.
pub const EDGE_INSET_PX: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Straight single-stroke path gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwipeGesture {
    pub start: Point,
    pub end: Point,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwipeDirection {
    /// Finger moves bottom to top: the feed advances to the next item.
    Up,
    Down,
}

/// Where the stroke starts and ends relative to the target's edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SwipeInset {
    Pixels(i32),
    /// Fraction of the target's height, e.g. `0.25` swipes between 75% and 25%.
    Fraction(f32),
}

impl SwipeGesture {
    /// Vertical stroke through the horizontal center of `bounds`.
    ///
    /// Returns `None` when the bounds are empty. A pixel inset too large for
    /// the target falls back to a quarter of its height.
    pub fn vertical(
        bounds: Bounds,
        direction: SwipeDirection,
        inset: SwipeInset,
        duration: Duration,
    ) -> Option<Self> {
        if bounds.is_empty() {
            return None;
        }

        let height = bounds.height() as f32;
        let inset_px = match inset {
            SwipeInset::Pixels(px) if (px as f32) * 2.0 < height => px as f32,
            SwipeInset::Pixels(_) => height * 0.25,
            SwipeInset::Fraction(fraction) => height * fraction.clamp(0.0, 0.49),
        };

        let x = bounds.center_x() as f32;
        let near_bottom = bounds.bottom as f32 - inset_px;
        let near_top = bounds.top as f32 + inset_px;
        let (start_y, end_y) = match direction {
            SwipeDirection::Up => (near_bottom, near_top),
            SwipeDirection::Down => (near_top, near_bottom),
        };

        Some(Self {
            start: Point { x, y: start_y },
            end: Point { x, y: end_y },
            duration,
        })
    }
}

/// Issues clicks, direct scroll actions and swipes; every wait is cancellable.
#[derive(Clone)]
pub struct GestureDispatcher {
    host: Arc<dyn AccessibilityHost>,
    cancel: CancellationToken,
}

impl GestureDispatcher {
    pub fn new(host: Arc<dyn AccessibilityHost>, cancel: CancellationToken) -> Self {
        Self { host, cancel }
    }

    pub fn perform_click(&self, node: &NodeRef) -> bool {
        let clicked = node.perform_action(NodeAction::Click);
        log_debug!("click on {:?} -> {clicked}", node.view_id());
        clicked
    }

    pub fn perform_scroll_forward(&self, node: &NodeRef) -> bool {
        let scrolled = node.perform_action(NodeAction::ScrollForward);
        log_debug!("scroll-forward on {:?} -> {scrolled}", node.class_name());
        scrolled
    }

    /// Swipes across `bounds` and waits for the OS to finish the stroke.
    pub async fn perform_swipe(
        &self,
        bounds: Bounds,
        direction: SwipeDirection,
        inset: SwipeInset,
        duration: Duration,
    ) -> GestureOutcome {
        let Some(gesture) = SwipeGesture::vertical(bounds, direction, inset, duration) else {
            log_warn!("refusing to swipe across empty bounds {bounds:?}");
            return GestureOutcome::Cancelled;
        };

        tokio::select! {
            outcome = self.host.dispatch_gesture(gesture) => outcome,
            _ = self.cancel.cancelled() => {
                log_debug!("swipe abandoned: session cancelled");
                GestureOutcome::Cancelled
            }
        }
    }

    /// Advances `node` with its own scroll-forward action when it has one,
    /// otherwise with an upward swipe across its bounds.
    pub async fn scroll_forward_or_swipe(&self, node: &NodeRef, inset: SwipeInset) -> bool {
        if self.perform_scroll_forward(node) {
            return true;
        }

        match node.bounds() {
            Some(bounds) => self
                .perform_swipe(bounds, SwipeDirection::Up, inset, SWIPE_DURATION)
                .await
                .is_completed(),
            None => false,
        }
    }
}
