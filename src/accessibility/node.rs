use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Shared handle to a node snapshot.
pub type NodeRef = Arc<dyn AccessibilityNode>;

/// Actions a node can be asked to perform directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeAction {
    Click,
    ScrollForward,
}

/// Screen rectangle in pixels, `right`/`bottom` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn center_x(&self) -> i32 {
        self.left + self.width() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }
}

/// Narrow view of one element in the foreground app's accessibility tree.
///
/// Every accessor may observe a node the OS has already recycled: attributes
/// then come back as `None`/`false` and children as absent. Callers treat that
/// as "not there right now", never as an error.
pub trait AccessibilityNode: Send + Sync {
    fn class_name(&self) -> Option<String>;
    fn content_description(&self) -> Option<String>;
    fn text(&self) -> Option<String>;
    fn view_id(&self) -> Option<String>;
    fn package_name(&self) -> Option<String>;
    fn is_clickable(&self) -> bool;
    fn is_visible(&self) -> bool;
    fn is_enabled(&self) -> bool;
    fn bounds(&self) -> Option<Bounds>;
    fn child_count(&self) -> usize;
    fn child(&self, index: usize) -> Option<NodeRef>;
    fn perform_action(&self, action: NodeAction) -> bool;

    /// Clickable, visible and enabled.
    fn is_actionable(&self) -> bool {
        self.is_clickable() && self.is_visible() && self.is_enabled()
    }

    fn has_class(&self, class_name: &str) -> bool {
        self.class_name().as_deref() == Some(class_name)
    }

    fn has_view_id(&self, view_id: &str) -> bool {
        self.view_id().as_deref() == Some(view_id)
    }

    fn description_contains(&self, needle: &str) -> bool {
        self.content_description()
            .map(|description| contains_ignore_case(&description, needle))
            .unwrap_or(false)
    }
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_geometry() {
        let bounds = Bounds::new(0, 100, 1080, 2100);
        assert_eq!(bounds.width(), 1080);
        assert_eq!(bounds.height(), 2000);
        assert_eq!(bounds.center_x(), 540);
        assert!(!bounds.is_empty());
        assert!(Bounds::new(10, 10, 10, 50).is_empty());
    }

    #[test]
    fn test_contains_ignore_case() {
        assert!(contains_ignore_case("Sponsored · Nike", "sponsored"));
        assert!(!contains_ignore_case("Reels", "video"));
    }
}
