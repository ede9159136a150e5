use std::sync::{Arc, PoisonError, RwLock};

use super::AutomationService;

/// Holder for "the" running automation session.
///
/// The process has one ([`SessionSlot::global`]), but slots are plain values
/// so tests can build isolated ones.
pub struct SessionSlot {
    current: RwLock<Option<Arc<AutomationService>>>,
}

impl SessionSlot {
    pub const fn new() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    pub fn global() -> &'static SessionSlot {
        static GLOBAL: SessionSlot = SessionSlot::new();
        &GLOBAL
    }

    /// Makes `service` current, stopping whatever session it replaces.
    pub async fn install(&self, service: Arc<AutomationService>) {
        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(service);
        if let Some(previous) = previous {
            previous.stop().await;
        }
    }

    /// The current session, if it is still running.
    pub fn current(&self) -> Option<Arc<AutomationService>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|service| service.is_running())
            .cloned()
    }

    pub fn clear(&self) -> Option<Arc<AutomationService>> {
        self.current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub async fn stop_current(&self) {
        if let Some(service) = self.clear() {
            service.stop().await;
        }
    }
}

impl Default for SessionSlot {
    fn default() -> Self {
        Self::new()
    }
}
