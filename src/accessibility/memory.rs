//! In-memory accessibility tree and host.
//!
//! Lets the search, classification and handler logic run against a synthetic
//! hierarchy: tests script roots, mutate descriptions to simulate a feed
//! advancing, and inspect which actions and gestures were dispatched.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;

use super::host::{AccessibilityHost, GestureOutcome};
use super::node::{AccessibilityNode, Bounds, NodeAction, NodeRef};
use crate::gesture::SwipeGesture;

type ActionHandler = Box<dyn Fn(NodeAction) -> bool + Send + Sync>;
type GestureHandler = Box<dyn Fn(&SwipeGesture) -> GestureOutcome + Send + Sync>;

#[derive(Debug, Clone, Default)]
struct Attributes {
    class_name: Option<String>,
    description: Option<String>,
    text: Option<String>,
    view_id: Option<String>,
    package_name: Option<String>,
    clickable: bool,
    visible: bool,
    enabled: bool,
    bounds: Option<Bounds>,
}

pub struct MemoryNode {
    attrs: RwLock<Attributes>,
    children: RwLock<Vec<Option<NodeRef>>>,
    stale: AtomicBool,
    actions: Mutex<Vec<NodeAction>>,
    on_action: Mutex<Option<ActionHandler>>,
}

impl MemoryNode {
    /// Visible, enabled, non-clickable node of the given class.
    pub fn new(class_name: &str) -> Arc<Self> {
        Arc::new(Self {
            attrs: RwLock::new(Attributes {
                class_name: Some(class_name.to_string()),
                visible: true,
                enabled: true,
                ..Attributes::default()
            }),
            children: RwLock::new(Vec::new()),
            stale: AtomicBool::new(false),
            actions: Mutex::new(Vec::new()),
            on_action: Mutex::new(None),
        })
    }

    pub fn with_id(self: Arc<Self>, view_id: &str) -> Arc<Self> {
        self.update(|attrs| attrs.view_id = Some(view_id.to_string()));
        self
    }

    pub fn with_description(self: Arc<Self>, description: &str) -> Arc<Self> {
        self.set_description(Some(description));
        self
    }

    pub fn with_text(self: Arc<Self>, text: &str) -> Arc<Self> {
        self.update(|attrs| attrs.text = Some(text.to_string()));
        self
    }

    pub fn with_package(self: Arc<Self>, package_name: &str) -> Arc<Self> {
        self.update(|attrs| attrs.package_name = Some(package_name.to_string()));
        self
    }

    pub fn with_bounds(self: Arc<Self>, bounds: Bounds) -> Arc<Self> {
        self.update(|attrs| attrs.bounds = Some(bounds));
        self
    }

    pub fn clickable(self: Arc<Self>) -> Arc<Self> {
        self.update(|attrs| attrs.clickable = true);
        self
    }

    pub fn hidden(self: Arc<Self>) -> Arc<Self> {
        self.update(|attrs| attrs.visible = false);
        self
    }

    pub fn disabled(self: Arc<Self>) -> Arc<Self> {
        self.update(|attrs| attrs.enabled = false);
        self
    }

    pub fn with_child(self: Arc<Self>, child: Arc<MemoryNode>) -> Arc<Self> {
        write(&self.children).push(Some(child as NodeRef));
        self
    }

    /// Appends a child slot that resolves to nothing, like a recycled child.
    pub fn with_missing_child(self: Arc<Self>) -> Arc<Self> {
        write(&self.children).push(None);
        self
    }

    pub fn on_action<F>(self: Arc<Self>, handler: F) -> Arc<Self>
    where
        F: Fn(NodeAction) -> bool + Send + Sync + 'static,
    {
        *lock(&self.on_action) = Some(Box::new(handler));
        self
    }

    pub fn into_ref(self: Arc<Self>) -> NodeRef {
        self
    }

    pub fn set_description(&self, description: Option<&str>) {
        self.update(|attrs| attrs.description = description.map(str::to_string));
    }

    pub fn set_text(&self, text: Option<&str>) {
        self.update(|attrs| attrs.text = text.map(str::to_string));
    }

    pub fn replace_children(&self, children: Vec<Arc<MemoryNode>>) {
        *write(&self.children) = children
            .into_iter()
            .map(|child| Some(child as NodeRef))
            .collect();
    }

    /// From now on the node behaves like one the OS has recycled.
    pub fn mark_stale(&self) {
        self.stale.store(true, Ordering::SeqCst);
    }

    pub fn actions(&self) -> Vec<NodeAction> {
        lock(&self.actions).clone()
    }

    fn update(&self, apply: impl FnOnce(&mut Attributes)) {
        apply(&mut *write(&self.attrs));
    }

    fn live_attrs(&self) -> Option<Attributes> {
        if self.stale.load(Ordering::SeqCst) {
            None
        } else {
            Some(read(&self.attrs).clone())
        }
    }
}

impl AccessibilityNode for MemoryNode {
    fn class_name(&self) -> Option<String> {
        self.live_attrs()?.class_name
    }

    fn content_description(&self) -> Option<String> {
        self.live_attrs()?.description
    }

    fn text(&self) -> Option<String> {
        self.live_attrs()?.text
    }

    fn view_id(&self) -> Option<String> {
        self.live_attrs()?.view_id
    }

    fn package_name(&self) -> Option<String> {
        self.live_attrs()?.package_name
    }

    fn is_clickable(&self) -> bool {
        self.live_attrs().map(|attrs| attrs.clickable).unwrap_or(false)
    }

    fn is_visible(&self) -> bool {
        self.live_attrs().map(|attrs| attrs.visible).unwrap_or(false)
    }

    fn is_enabled(&self) -> bool {
        self.live_attrs().map(|attrs| attrs.enabled).unwrap_or(false)
    }

    fn bounds(&self) -> Option<Bounds> {
        self.live_attrs()?.bounds
    }

    fn child_count(&self) -> usize {
        if self.stale.load(Ordering::SeqCst) {
            return 0;
        }
        read(&self.children).len()
    }

    fn child(&self, index: usize) -> Option<NodeRef> {
        if self.stale.load(Ordering::SeqCst) {
            return None;
        }
        read(&self.children).get(index).cloned().flatten()
    }

    fn perform_action(&self, action: NodeAction) -> bool {
        let Some(attrs) = self.live_attrs() else {
            return false;
        };
        lock(&self.actions).push(action);

        if let Some(handler) = lock(&self.on_action).as_ref() {
            return handler(action);
        }

        match action {
            NodeAction::Click => attrs.clickable && attrs.enabled,
            NodeAction::ScrollForward => attrs.enabled,
        }
    }
}

/// Scriptable stand-in for the OS accessibility service.
pub struct MemoryHost {
    root: RwLock<Option<NodeRef>>,
    scripted_roots: Mutex<VecDeque<Option<NodeRef>>>,
    root_queries: AtomicUsize,
    gestures: Mutex<Vec<SwipeGesture>>,
    gesture_handler: Mutex<Option<GestureHandler>>,
    notices: Mutex<Vec<String>>,
    home_opened: AtomicUsize,
    disabled: AtomicBool,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            root: RwLock::new(None),
            scripted_roots: Mutex::new(VecDeque::new()),
            root_queries: AtomicUsize::new(0),
            gestures: Mutex::new(Vec::new()),
            gesture_handler: Mutex::new(None),
            notices: Mutex::new(Vec::new()),
            home_opened: AtomicUsize::new(0),
            disabled: AtomicBool::new(false),
        }
    }

    pub fn with_root(root: NodeRef) -> Self {
        let host = Self::new();
        host.set_root(Some(root));
        host
    }

    pub fn set_root(&self, root: Option<NodeRef>) {
        *write(&self.root) = root;
    }

    /// Roots handed out, one per query, before falling back to the steady root.
    pub fn queue_roots(&self, roots: impl IntoIterator<Item = Option<NodeRef>>) {
        lock(&self.scripted_roots).extend(roots);
    }

    pub fn on_gesture<F>(&self, handler: F)
    where
        F: Fn(&SwipeGesture) -> GestureOutcome + Send + Sync + 'static,
    {
        *lock(&self.gesture_handler) = Some(Box::new(handler));
    }

    pub fn root_queries(&self) -> usize {
        self.root_queries.load(Ordering::SeqCst)
    }

    pub fn gestures(&self) -> Vec<SwipeGesture> {
        lock(&self.gestures).clone()
    }

    pub fn notices(&self) -> Vec<String> {
        lock(&self.notices).clone()
    }

    pub fn home_opened(&self) -> usize {
        self.home_opened.load(Ordering::SeqCst)
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }

    fn record_gesture(&self, gesture: &SwipeGesture) -> GestureOutcome {
        lock(&self.gestures).push(gesture.clone());
        lock(&self.gesture_handler)
            .as_ref()
            .map(|handler| handler(gesture))
            .unwrap_or(GestureOutcome::Completed)
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccessibilityHost for MemoryHost {
    fn root_in_active_window(&self) -> Option<NodeRef> {
        self.root_queries.fetch_add(1, Ordering::SeqCst);
        if let Some(scripted) = lock(&self.scripted_roots).pop_front() {
            return scripted;
        }
        read(&self.root).clone()
    }

    async fn dispatch_gesture(&self, gesture: SwipeGesture) -> GestureOutcome {
        let outcome = self.record_gesture(&gesture);
        tokio::time::sleep(gesture.duration).await;
        outcome
    }

    fn show_notice(&self, message: &str) {
        lock(&self.notices).push(message.to_string());
    }

    fn open_home_screen(&self) {
        self.home_opened.fetch_add(1, Ordering::SeqCst);
    }

    fn disable_service(&self) {
        self.disabled.store(true, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_node_reports_nothing() {
        let node = MemoryNode::new("android.widget.Button")
            .with_description("Shorts")
            .clickable();
        assert!(node.is_actionable());
        node.mark_stale();
        assert_eq!(node.content_description(), None);
        assert!(!node.is_actionable());
        assert!(!node.perform_action(NodeAction::Click));
    }

    #[test]
    fn test_action_handler_and_log() {
        let node = MemoryNode::new("androidx.recyclerview.widget.RecyclerView")
            .on_action(|action| action == NodeAction::ScrollForward);
        assert!(node.perform_action(NodeAction::ScrollForward));
        assert!(!node.perform_action(NodeAction::Click));
        assert_eq!(node.actions(), vec![NodeAction::ScrollForward, NodeAction::Click]);
    }

    #[test]
    fn test_scripted_roots_served_first() {
        let root = MemoryNode::new("android.widget.FrameLayout").into_ref();
        let host = MemoryHost::with_root(root);
        host.queue_roots([None, None]);
        assert!(host.root_in_active_window().is_none());
        assert!(host.root_in_active_window().is_none());
        assert!(host.root_in_active_window().is_some());
        assert_eq!(host.root_queries(), 3);
    }
}
