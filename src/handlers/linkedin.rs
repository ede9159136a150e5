//! LinkedIn video feed.

use async_trait::async_trait;

use super::{AdvanceStyle, FeedPlatform};
use crate::accessibility::query::{find_by_class_name, find_by_view_id, find_first};
use crate::accessibility::NodeRef;
use crate::gesture::{SwipeInset, EDGE_INSET_PX};
use crate::platform::Platform;

const VIDEO_TAB: &str = "tab_video";
const VIDEO_PAGER: &str = "viewPager2";
const PAGER_CLASS: &str = "androidx.viewpager.widget.ViewPager";

pub struct LinkedInVideos;

#[async_trait]
impl FeedPlatform for LinkedInVideos {
    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    fn find_entry_point(&self, root: &NodeRef) -> Option<NodeRef> {
        let tab_id = Platform::LinkedIn.view_id(VIDEO_TAB);
        find_first(Some(root), |node| {
            node.has_view_id(&tab_id)
                && node.description_contains("Video")
                && node.is_clickable()
                && node.is_enabled()
        })
        .or_else(|| {
            find_first(Some(root), |node| {
                node.class_name()
                    .map(|class| class.contains("Tab"))
                    .unwrap_or(false)
                    && node.description_contains("Video")
                    && node.is_actionable()
            })
        })
    }

    /// The pager has no scroll action, so it is swiped.
    fn find_feed(&self, root: &NodeRef) -> Option<NodeRef> {
        find_by_view_id(Some(root), &Platform::LinkedIn.view_id(VIDEO_PAGER), None)
            .or_else(|| find_by_class_name(Some(root), PAGER_CLASS))
    }

    fn advance_style(&self) -> AdvanceStyle {
        AdvanceStyle::Swipe(SwipeInset::Pixels(EDGE_INSET_PX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessibility::MemoryNode;

    #[test]
    fn test_entry_point_by_id() {
        let root = MemoryNode::new("android.widget.FrameLayout")
            .with_child(
                MemoryNode::new("android.widget.LinearLayout")
                    .with_id("com.linkedin.android:id/tab_video")
                    .with_description("Video, tab 2 of 5")
                    .clickable(),
            )
            .into_ref();
        assert!(LinkedInVideos.find_entry_point(&root).is_some());
    }

    #[test]
    fn test_entry_point_fallback_by_tab_class() {
        let root = MemoryNode::new("android.widget.FrameLayout")
            .with_child(
                MemoryNode::new("com.google.android.material.tabs.TabLayout$TabView")
                    .with_description("Video")
                    .clickable(),
            )
            .into_ref();
        assert!(LinkedInVideos.find_entry_point(&root).is_some());

        let hidden = MemoryNode::new("android.widget.FrameLayout")
            .with_child(
                MemoryNode::new("com.google.android.material.tabs.TabLayout$TabView")
                    .with_description("Video")
                    .clickable()
                    .hidden(),
            )
            .into_ref();
        assert!(LinkedInVideos.find_entry_point(&hidden).is_none());
    }

    #[test]
    fn test_feed_by_class_when_id_missing() {
        let root = MemoryNode::new("android.widget.FrameLayout")
            .with_child(MemoryNode::new(PAGER_CLASS))
            .into_ref();
        assert!(LinkedInVideos.find_feed(&root).is_some());
        assert_eq!(
            LinkedInVideos.advance_style(),
            AdvanceStyle::Swipe(SwipeInset::Pixels(100))
        );
    }
}
