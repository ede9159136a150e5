use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::node::NodeRef;
use crate::gesture::SwipeGesture;

/// Accessibility event kinds the engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    WindowStateChanged,
    WindowContentChanged,
    ViewScrolled,
    Other(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessibilityEvent {
    pub package_name: Option<String>,
    pub event_type: EventType,
}

impl AccessibilityEvent {
    pub fn new(package_name: impl Into<String>, event_type: EventType) -> Self {
        Self {
            package_name: Some(package_name.into()),
            event_type,
        }
    }

    pub fn is_foreground_change(&self) -> bool {
        self.event_type == EventType::WindowStateChanged
    }
}

/// How a dispatched gesture ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GestureOutcome {
    Completed,
    Cancelled,
}

impl GestureOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, GestureOutcome::Completed)
    }
}

/// The OS side of the automation service.
#[async_trait]
pub trait AccessibilityHost: Send + Sync {
    /// Root of the currently active window; `None` while the window is in flux.
    fn root_in_active_window(&self) -> Option<NodeRef>;

    /// Dispatches a path gesture and resolves once the OS reports completion
    /// or cancellation.
    async fn dispatch_gesture(&self, gesture: SwipeGesture) -> GestureOutcome;

    /// Short, non-blocking user notice.
    fn show_notice(&self, message: &str);

    /// Brings this app's own home screen to the front.
    fn open_home_screen(&self);

    /// Turns the accessibility service off.
    fn disable_service(&self);
}
