//! Accessibility-driven auto-scroll engine for short-video feeds.
//!
//! The host app embeds this crate behind its accessibility service: it
//! implements [`AccessibilityHost`] over the OS tree, builds an
//! [`AutomationService`], installs it in [`SessionSlot::global`] and forwards
//! every accessibility event to [`AutomationService::on_event`].

pub mod accessibility;
pub mod classifier;
pub mod db;
pub mod gesture;
pub mod handlers;
pub mod platform;
pub mod service;
pub mod settings;
pub mod stats;
pub mod utils;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

pub use accessibility::{AccessibilityEvent, AccessibilityHost, AccessibilityNode, EventType, NodeRef};
pub use db::Database;
pub use handlers::{HandlerState, PlatformHandler};
pub use platform::Platform;
pub use service::{AutomationService, SessionSlot};
pub use settings::{AutomationSettings, SettingsStore};
pub use stats::{StatsRepository, StatsStore};

const STATS_DB_FILE: &str = "autoscroll.sqlite3";
const SETTINGS_FILE: &str = "settings.json";

/// Installs the `env_logger` backend (Info unless `RUST_LOG` says otherwise).
/// Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
}

/// Opens the stats database and settings under `data_dir`, creates a session
/// for `platform` and makes it the process-wide current one.
pub async fn launch(
    host: Arc<dyn AccessibilityHost>,
    data_dir: &Path,
    platform: Platform,
) -> Result<Arc<AutomationService>> {
    init_logging();
    log::info!("autoscroll starting up for {platform}");

    let db = Database::new(data_dir.join(STATS_DB_FILE))?;
    let stats = StatsRepository::new(Arc::new(db));
    stats.ensure_today_record().await;

    let settings = Arc::new(SettingsStore::new(data_dir.join(SETTINGS_FILE))?);
    settings.set_selected_platform(Some(platform))?;

    let service = Arc::new(AutomationService::new(host, stats, settings));
    service.start(platform)?;
    SessionSlot::global().install(service.clone()).await;
    Ok(service)
}
