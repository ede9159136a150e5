//! YouTube Shorts.

use std::time::Duration;

use async_trait::async_trait;

use super::{AdvanceStyle, FeedPlatform, NavigationTiming};
use crate::accessibility::query::{find_by_view_id, find_first};
use crate::accessibility::NodeRef;
use crate::gesture::{SwipeInset, EDGE_INSET_PX};
use crate::platform::Platform;

const SHORTS_FEED: &str = "reel_recycler";

pub struct YouTubeShorts;

#[async_trait]
impl FeedPlatform for YouTubeShorts {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    fn timing(&self) -> NavigationTiming {
        NavigationTiming {
            startup_delay: Duration::from_secs(2),
            root_attempts: 5,
            ..NavigationTiming::default()
        }
    }

    fn find_entry_point(&self, root: &NodeRef) -> Option<NodeRef> {
        find_first(Some(root), |node| {
            node.has_class("android.widget.Button")
                && node.description_contains("Shorts")
                && node.is_clickable()
                && node.is_enabled()
        })
    }

    fn find_feed(&self, root: &NodeRef) -> Option<NodeRef> {
        find_by_view_id(Some(root), &Platform::YouTube.view_id(SHORTS_FEED), None)
    }

    fn advance_style(&self) -> AdvanceStyle {
        AdvanceStyle::ScrollForward(SwipeInset::Pixels(EDGE_INSET_PX))
    }
}
