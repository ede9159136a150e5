//! Snapchat Spotlight.

use std::time::Duration;

use async_trait::async_trait;

use super::{AdvanceStyle, FeedPlatform, NavigationTiming};
use crate::accessibility::query::{find_by_view_id, find_first};
use crate::accessibility::NodeRef;
use crate::gesture::SwipeInset;
use crate::platform::Platform;

const SPOTLIGHT_ICON: &str = "ngs_spotlight_icon_container";
const SPOTLIGHT_CONTAINER: &str = "spotlight_container";

pub struct SnapchatSpotlight;

#[async_trait]
impl FeedPlatform for SnapchatSpotlight {
    fn platform(&self) -> Platform {
        Platform::Snapchat
    }

    /// Snapchat is slow to hand over its window after launch.
    fn timing(&self) -> NavigationTiming {
        NavigationTiming {
            startup_delay: Duration::from_secs(3),
            root_attempts: 10,
            root_retry_delay: Duration::from_millis(1_500),
            require_package: true,
            ..NavigationTiming::default()
        }
    }

    fn find_entry_point(&self, root: &NodeRef) -> Option<NodeRef> {
        let icon_id = Platform::Snapchat.view_id(SPOTLIGHT_ICON);
        find_first(Some(root), |node| {
            node.has_class("android.view.ViewGroup")
                && node.has_view_id(&icon_id)
                && node.is_actionable()
        })
    }

    fn find_feed(&self, root: &NodeRef) -> Option<NodeRef> {
        find_by_view_id(Some(root), &Platform::Snapchat.view_id(SPOTLIGHT_CONTAINER), None)
    }

    fn advance_style(&self) -> AdvanceStyle {
        AdvanceStyle::Swipe(SwipeInset::Fraction(0.25))
    }

    fn tracks_time_spent(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessibility::MemoryNode;

    #[test]
    fn test_spotlight_icon_and_container() {
        let root = MemoryNode::new("android.widget.FrameLayout")
            .with_package("com.snapchat.android")
            .with_child(
                MemoryNode::new("android.view.ViewGroup")
                    .with_id("com.snapchat.android:id/ngs_spotlight_icon_container")
                    .clickable(),
            )
            .with_child(
                MemoryNode::new("android.widget.FrameLayout")
                    .with_id("com.snapchat.android:id/spotlight_container"),
            )
            .into_ref();

        let platform = SnapchatSpotlight;
        assert!(platform.find_entry_point(&root).is_some());
        assert!(platform.find_feed(&root).is_some());
        assert!(platform.timing().require_package);
        assert!(platform.tracks_time_spent());
    }
}
