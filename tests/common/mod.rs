#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use autoscroll::accessibility::{Bounds, MemoryNode, NodeAction, NodeRef};
use autoscroll::handlers::{feed_for, HandlerContext, HandlerSession, PlatformHandler};
use autoscroll::stats::{MemoryStatsStore, PlatformDelta, StatsRepository, StatsStore};
use autoscroll::{AccessibilityHost, Platform};
use chrono::NaiveDate;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 10, 21).unwrap()
}

pub fn screen() -> Bounds {
    Bounds::new(0, 0, 1080, 2000)
}

/// A reels screen whose recycler advances through `items` on scroll-forward.
pub struct ReelsFeed {
    pub root: NodeRef,
    pub container: Arc<MemoryNode>,
    scroll_times: Arc<Mutex<Vec<Instant>>>,
}

impl ReelsFeed {
    pub fn new(items: &[&str]) -> Self {
        let items: Vec<String> = items.iter().map(|item| item.to_string()).collect();
        let container = MemoryNode::new("android.widget.FrameLayout")
            .with_id("com.instagram.android:id/clips_video_container")
            .with_description(&items[0]);
        let scroll_times = Arc::new(Mutex::new(Vec::new()));
        let position = Arc::new(AtomicUsize::new(0));

        let recycler = {
            let container = container.clone();
            let scroll_times = scroll_times.clone();
            MemoryNode::new("androidx.recyclerview.widget.RecyclerView")
                .with_bounds(screen())
                .with_child(container.clone())
                .on_action(move |action| {
                    if action != NodeAction::ScrollForward {
                        return false;
                    }
                    let next = position.fetch_add(1, Ordering::SeqCst) + 1;
                    container.set_description(Some(&items[next % items.len()]));
                    scroll_times.lock().unwrap().push(Instant::now());
                    true
                })
        };

        let root = MemoryNode::new("android.widget.FrameLayout")
            .with_package("com.instagram.android")
            .with_child(
                MemoryNode::new("androidx.viewpager.widget.ViewPager")
                    .with_id("com.instagram.android:id/clips_viewer_view_pager")
                    .with_child(recycler),
            )
            .into_ref();

        Self {
            root,
            container,
            scroll_times,
        }
    }

    pub fn scroll_count(&self) -> usize {
        self.scroll_times.lock().unwrap().len()
    }

    pub fn scroll_times(&self) -> Vec<Instant> {
        self.scroll_times.lock().unwrap().clone()
    }
}

pub fn memory_stats() -> (Arc<MemoryStatsStore>, StatsRepository) {
    let store = Arc::new(MemoryStatsStore::new());
    let stats = StatsRepository::with_clock(store.clone(), today);
    (store, stats)
}

pub async fn seed_watched(store: &MemoryStatsStore, platform: Platform, watched: u64) {
    store
        .increment_platform_stats(
            today(),
            platform,
            PlatformDelta {
                watched,
                ..PlatformDelta::default()
            },
        )
        .await
        .unwrap();
}

pub fn handler(platform: Platform, interval_secs: u64, limit: u64, skip: bool) -> Arc<PlatformHandler> {
    Arc::new(PlatformHandler::new(
        feed_for(platform),
        HandlerSession::new(Duration::from_secs(interval_secs), limit, skip),
    ))
}

pub fn context(host: Arc<dyn AccessibilityHost>, stats: StatsRepository) -> HandlerContext {
    HandlerContext::new(host, stats, CancellationToken::new())
}
