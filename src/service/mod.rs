//! Automation session: event routing and handler lifecycle.

mod slot;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{bail, Result};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::accessibility::{AccessibilityEvent, AccessibilityHost};
use crate::handlers::{feed_for, HandlerContext, HandlerSession, PlatformHandler, RunOutcome};
use crate::platform::Platform;
use crate::settings::SettingsStore;
use crate::stats::StatsRepository;
use crate::{log_debug, log_info};

pub use slot::SessionSlot;

const ENABLE_LOGS: bool = true;

/// One automation session: owns a handler per platform and the task scope
/// their runs live in. Cancelling the scope stops every run cooperatively.
pub struct AutomationService {
    host: Arc<dyn AccessibilityHost>,
    stats: StatsRepository,
    settings: Arc<SettingsStore>,
    handlers: HashMap<Platform, Arc<PlatformHandler>>,
    selected: RwLock<Option<Platform>>,
    scope: CancellationToken,
    tracker: TaskTracker,
}

impl AutomationService {
    /// Handler sessions are built from the settings as they are now.
    pub fn new(
        host: Arc<dyn AccessibilityHost>,
        stats: StatsRepository,
        settings: Arc<SettingsStore>,
    ) -> Self {
        let handlers = Platform::ALL
            .into_iter()
            .map(|platform| {
                let handler = PlatformHandler::new(
                    feed_for(platform),
                    HandlerSession::from_settings(&settings),
                );
                (platform, Arc::new(handler))
            })
            .collect();

        Self {
            host,
            stats,
            settings,
            handlers,
            selected: RwLock::new(None),
            scope: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Begins automating `platform`; its foreground events start handler runs.
    pub fn start(&self, platform: Platform) -> Result<()> {
        if !self.is_running() {
            bail!("automation session already stopped");
        }
        *self.selected.write().unwrap_or_else(PoisonError::into_inner) = Some(platform);
        log_info!(
            "automation started for {platform} (interval {}s, limit {}, skip sponsored {})",
            self.settings.scroll_interval_secs(),
            self.settings.daily_limit(),
            self.settings.skip_sponsored()
        );
        Ok(())
    }

    /// Starts the selected platform's handler when `event` brings its app to
    /// the foreground. Returns whether a run was spawned. Must be called from
    /// within a tokio runtime.
    ///
    /// Only the platform passed to [`start`](Self::start) is routed; the
    /// other supported apps coming to the foreground are ignored, so a
    /// session never drives a feed the user did not pick.
    pub fn on_event(&self, event: &AccessibilityEvent) -> bool {
        if !self.is_running() || !event.is_foreground_change() {
            return false;
        }

        let Some(platform) = event
            .package_name
            .as_deref()
            .and_then(Platform::from_package)
        else {
            return false;
        };

        if self.selected_platform() != Some(platform) {
            log_debug!("ignoring {platform} event: not the selected platform");
            return false;
        }

        let Some(handler) = self.handlers.get(&platform) else {
            return false;
        };

        if !handler.begin_run() {
            log_debug!("{platform} handler already active ({:?})", handler.state());
            return false;
        }

        let ctx = HandlerContext::new(self.host.clone(), self.stats.clone(), self.scope.clone());
        let handler = handler.clone();
        self.tracker.spawn(async move {
            let outcome = handler.run(ctx).await;
            if let RunOutcome::Aborted(err) = &outcome {
                log_info!("{platform} run ended early: {err}");
            }
            outcome
        });
        true
    }

    pub fn handler(&self, platform: Platform) -> Option<Arc<PlatformHandler>> {
        self.handlers.get(&platform).cloned()
    }

    pub fn selected_platform(&self) -> Option<Platform> {
        *self.selected.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn stats(&self) -> &StatsRepository {
        &self.stats
    }

    /// False once stopped, including when a handler hit the daily limit.
    pub fn is_running(&self) -> bool {
        !self.scope.is_cancelled()
    }

    /// Resolves once the session has been cancelled and every run has ended.
    pub async fn finished(&self) {
        self.scope.cancelled().await;
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Cancels every run and waits for them to wind down. Safe to call
    /// repeatedly or on a session that never started.
    pub async fn stop(&self) {
        if self.is_running() {
            log_info!("stopping automation session");
        }
        self.scope.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        for handler in self.handlers.values() {
            if !handler.state().is_terminal() {
                handler.stop();
            }
        }
    }
}
