mod common;

use std::sync::Arc;

use autoscroll::accessibility::{MemoryHost, MemoryNode};
use autoscroll::handlers::DAILY_LIMIT_NOTICE;
use autoscroll::{
    AccessibilityEvent, AutomationService, AutomationSettings, EventType, HandlerState, Platform,
    SessionSlot, SettingsStore,
};
use common::{memory_stats, seed_watched, ReelsFeed};
use pretty_assertions::assert_eq;

fn foreground(platform: Platform) -> AccessibilityEvent {
    AccessibilityEvent::new(platform.package_name(), EventType::WindowStateChanged)
}

fn service_with(host: Arc<MemoryHost>, settings: AutomationSettings) -> Arc<AutomationService> {
    let (_store, stats) = memory_stats();
    Arc::new(AutomationService::new(
        host,
        stats,
        Arc::new(SettingsStore::in_memory(settings)),
    ))
}

fn idle_service() -> Arc<AutomationService> {
    let root = MemoryNode::new("android.widget.FrameLayout").into_ref();
    service_with(
        Arc::new(MemoryHost::with_root(root)),
        AutomationSettings::default(),
    )
}

#[tokio::test(start_paused = true)]
async fn routes_only_selected_platform_foreground_events() {
    let service = idle_service();
    service.start(Platform::YouTube).unwrap();

    assert!(!service.on_event(&foreground(Platform::Instagram)));
    assert!(!service.on_event(&AccessibilityEvent::new(
        Platform::YouTube.package_name(),
        EventType::WindowContentChanged,
    )));
    assert!(!service.on_event(&AccessibilityEvent::new(
        "com.android.launcher",
        EventType::WindowStateChanged,
    )));

    assert!(service.on_event(&foreground(Platform::YouTube)));
    // Already navigating.
    assert!(!service.on_event(&foreground(Platform::YouTube)));

    let youtube = service.handler(Platform::YouTube).unwrap();
    assert_eq!(youtube.state(), HandlerState::Navigating);
    assert_eq!(
        service.handler(Platform::Instagram).unwrap().state(),
        HandlerState::AwaitingForeground
    );

    service.stop().await;
    assert_eq!(youtube.state(), HandlerState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn stop_is_idempotent_and_final() {
    let service = idle_service();
    service.start(Platform::LinkedIn).unwrap();
    assert!(service.is_running());

    service.stop().await;
    service.stop().await;

    assert!(!service.is_running());
    assert!(!service.on_event(&foreground(Platform::LinkedIn)));
    assert!(service.start(Platform::LinkedIn).is_err());
    for platform in Platform::ALL {
        assert_eq!(
            service.handler(platform).unwrap().state(),
            HandlerState::Stopped
        );
    }
}

#[tokio::test(start_paused = true)]
async fn stop_before_start_is_harmless() {
    let service = idle_service();
    service.stop().await;
    assert!(!service.is_running());
    assert_eq!(service.selected_platform(), None);
}

#[tokio::test(start_paused = true)]
async fn reaching_the_limit_ends_the_session() {
    let feed = ReelsFeed::new(&["Reel 1", "Reel 2"]);
    let host = Arc::new(MemoryHost::with_root(feed.root.clone()));
    let (store, stats) = memory_stats();
    seed_watched(&store, Platform::Instagram, 5).await;
    let settings = AutomationSettings {
        daily_limit: 5,
        ..AutomationSettings::default()
    };
    let service = Arc::new(AutomationService::new(
        host.clone(),
        stats,
        Arc::new(SettingsStore::in_memory(settings)),
    ));

    service.start(Platform::Instagram).unwrap();
    assert!(service.on_event(&foreground(Platform::Instagram)));
    service.finished().await;

    assert!(!service.is_running());
    assert_eq!(feed.scroll_count(), 0);
    assert_eq!(
        service.handler(Platform::Instagram).unwrap().state(),
        HandlerState::LimitReached
    );
    assert_eq!(host.notices(), vec![DAILY_LIMIT_NOTICE.to_string()]);
    assert!(host.is_disabled());
}

#[tokio::test(start_paused = true)]
async fn slot_replaces_and_clears_sessions() {
    let slot = SessionSlot::new();
    assert!(slot.current().is_none());

    let first = idle_service();
    first.start(Platform::Instagram).unwrap();
    slot.install(first.clone()).await;
    assert!(Arc::ptr_eq(&slot.current().unwrap(), &first));

    let second = idle_service();
    second.start(Platform::Snapchat).unwrap();
    slot.install(second.clone()).await;
    assert!(!first.is_running());
    assert!(Arc::ptr_eq(&slot.current().unwrap(), &second));

    second.stop().await;
    assert!(slot.current().is_none());

    assert!(slot.clear().is_some());
    assert!(slot.clear().is_none());
    slot.stop_current().await;
}

#[tokio::test]
async fn launch_opens_storage_and_installs_session() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = MemoryNode::new("android.widget.FrameLayout").into_ref();
    let host = Arc::new(MemoryHost::with_root(root));

    let service = autoscroll::launch(host, dir.path(), Platform::YouTube)
        .await
        .unwrap();

    assert_eq!(service.selected_platform(), Some(Platform::YouTube));
    assert!(dir.path().join("autoscroll.sqlite3").exists());
    let saved = SettingsStore::new(dir.path().join("settings.json")).unwrap();
    assert_eq!(saved.selected_platform(), Some(Platform::YouTube));
    assert_eq!(service.stats().all_records().await.len(), 1);

    let current = SessionSlot::global().current().unwrap();
    assert!(Arc::ptr_eq(&current, &service));
    SessionSlot::global().stop_current().await;
    assert!(!service.is_running());
}
