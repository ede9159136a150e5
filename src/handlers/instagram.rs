//! Instagram Reels.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{wait, AdvanceStyle, FeedPlatform, HandlerError};
use crate::accessibility::query::{
    find_all, find_by_class_name, find_by_view_id, find_direct_child, find_first,
};
use crate::accessibility::{AccessibilityHost, NodeRef};
use crate::gesture::{SwipeInset, EDGE_INSET_PX};
use crate::log_debug;
use crate::platform::Platform;

const ENABLE_LOGS: bool = true;

const REELS_TAB: &str = "clips_tab";
const REELS_PAGER: &str = "clips_viewer_view_pager";
const VIDEO_CONTAINER: &str = "clips_video_container";
const RECYCLER_CLASS: &str = "androidx.recyclerview.widget.RecyclerView";

/// How long before the scroll the upcoming reel is inspected.
pub const PRE_ANALYSIS_LEAD: Duration = Duration::from_secs(2);
/// Extra wait when the upcoming reel has not loaded yet.
pub const NOT_READY_EXTENSION: Duration = Duration::from_millis(500);

pub struct InstagramReels;

impl InstagramReels {
    /// The reel after the visible one is laid out and labelled.
    fn next_reel_ready(root: &NodeRef) -> bool {
        let container_id = Platform::Instagram.view_id(VIDEO_CONTAINER);
        find_all(Some(root), |node| node.has_view_id(&container_id))
            .get(1)
            .map(|next| {
                next.is_visible()
                    && next.is_enabled()
                    && next
                        .content_description()
                        .map(|description| !description.is_empty())
                        .unwrap_or(false)
            })
            .unwrap_or(false)
    }
}

#[async_trait]
impl FeedPlatform for InstagramReels {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    fn find_entry_point(&self, root: &NodeRef) -> Option<NodeRef> {
        let tab_id = Platform::Instagram.view_id(REELS_TAB);
        find_first(Some(root), |node| {
            node.has_class("android.widget.FrameLayout")
                && node.has_view_id(&tab_id)
                && node.description_contains("Reels")
                && node.is_actionable()
        })
    }

    /// The recycler inside the reels pager.
    fn find_feed(&self, root: &NodeRef) -> Option<NodeRef> {
        let pager = find_by_view_id(Some(root), &Platform::Instagram.view_id(REELS_PAGER), None)?;
        find_direct_child(&pager, |node| node.has_class(RECYCLER_CLASS))
            .or_else(|| find_by_class_name(Some(&pager), RECYCLER_CLASS))
    }

    fn advance_style(&self) -> AdvanceStyle {
        AdvanceStyle::ScrollForward(SwipeInset::Pixels(EDGE_INSET_PX))
    }

    fn item_signature(&self, root: &NodeRef) -> Option<String> {
        find_by_view_id(Some(root), &Platform::Instagram.view_id(VIDEO_CONTAINER), None)
            .and_then(|container| container.content_description())
    }

    /// Splits the interval so the upcoming reel is checked shortly before
    /// the scroll, stretching the wait a little if it is still loading.
    async fn pace(
        &self,
        host: &dyn AccessibilityHost,
        interval: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), HandlerError> {
        let lead = PRE_ANALYSIS_LEAD.min(interval);
        wait(cancel, interval - lead).await?;

        let ready = host
            .root_in_active_window()
            .map(|root| Self::next_reel_ready(&root))
            .unwrap_or(false);
        if !ready {
            log_debug!("next reel not loaded yet, extending wait");
        }

        let remaining = if ready { lead } else { lead + NOT_READY_EXTENSION };
        wait(cancel, remaining).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessibility::{MemoryHost, MemoryNode};

    fn container(description: &str) -> std::sync::Arc<MemoryNode> {
        MemoryNode::new("android.widget.FrameLayout")
            .with_id("com.instagram.android:id/clips_video_container")
            .with_description(description)
    }

    fn reels_screen(next: Option<std::sync::Arc<MemoryNode>>) -> NodeRef {
        let mut recycler = MemoryNode::new(RECYCLER_CLASS).with_child(container("Reel by ada"));
        if let Some(next) = next {
            recycler = recycler.with_child(next);
        }
        MemoryNode::new("android.widget.FrameLayout")
            .with_child(
                MemoryNode::new("androidx.viewpager.widget.ViewPager")
                    .with_id("com.instagram.android:id/clips_viewer_view_pager")
                    .with_child(recycler),
            )
            .with_child(
                MemoryNode::new("android.widget.FrameLayout")
                    .with_id("com.instagram.android:id/clips_tab")
                    .with_description("Reels")
                    .clickable(),
            )
            .into_ref()
    }

    #[test]
    fn test_locates_entry_feed_and_signature() {
        let root = reels_screen(None);
        let platform = InstagramReels;
        assert!(platform.find_entry_point(&root).is_some());
        assert!(platform.find_feed(&root).unwrap().has_class(RECYCLER_CLASS));
        assert_eq!(platform.item_signature(&root).as_deref(), Some("Reel by ada"));
    }

    #[test]
    fn test_entry_point_requires_clickable_tab() {
        let root = MemoryNode::new("android.widget.FrameLayout")
            .with_child(
                MemoryNode::new("android.widget.FrameLayout")
                    .with_id("com.instagram.android:id/clips_tab")
                    .with_description("Reels"),
            )
            .into_ref();
        assert!(InstagramReels.find_entry_point(&root).is_none());
    }

    #[test]
    fn test_next_reel_readiness() {
        assert!(!InstagramReels::next_reel_ready(&reels_screen(None)));
        assert!(!InstagramReels::next_reel_ready(&reels_screen(Some(container("")))));
        assert!(InstagramReels::next_reel_ready(&reels_screen(Some(container("Reel by bo")))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pace_extends_when_next_reel_missing() {
        let host = MemoryHost::with_root(reels_screen(None));
        let started = tokio::time::Instant::now();
        InstagramReels
            .pace(&host, Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(5_500));
        assert!(elapsed < Duration::from_millis(5_600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pace_is_exact_when_next_reel_ready() {
        let host = MemoryHost::with_root(reels_screen(Some(container("Reel by bo"))));
        let started = tokio::time::Instant::now();
        InstagramReels
            .pace(&host, Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(5));
        assert!(elapsed < Duration::from_millis(5_100));
    }
}
