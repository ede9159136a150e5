//! Read-only searches over an accessibility tree.
//!
//! All searches walk the tree in pre-order with an explicit work-list, so a
//! pathological hierarchy cannot blow the stack. A `None` root or an absent
//! child simply means that subtree is not there.

use std::fmt::Write as _;

use super::node::{contains_ignore_case, NodeRef};

/// Nodes deeper than this are not visited.
pub const MAX_DEPTH: usize = 128;

/// Upper bound on nodes visited by a single search.
pub const MAX_VISITED: usize = 20_000;

/// First node (pre-order) satisfying `predicate`.
pub fn find_first<P>(root: Option<&NodeRef>, mut predicate: P) -> Option<NodeRef>
where
    P: FnMut(&NodeRef) -> bool,
{
    let mut found = None;
    walk(root, |node, _depth| {
        if predicate(node) {
            found = Some(node.clone());
            Walk::Stop
        } else {
            Walk::Continue
        }
    });
    found
}

/// Every node satisfying `predicate`, in pre-order.
pub fn find_all<P>(root: Option<&NodeRef>, mut predicate: P) -> Vec<NodeRef>
where
    P: FnMut(&NodeRef) -> bool,
{
    let mut matches = Vec::new();
    walk(root, |node, _depth| {
        if predicate(node) {
            matches.push(node.clone());
        }
        Walk::Continue
    });
    matches
}

/// Node with the given view id, optionally also requiring its text to contain
/// `text_filter`.
pub fn find_by_view_id(
    root: Option<&NodeRef>,
    view_id: &str,
    text_filter: Option<&str>,
) -> Option<NodeRef> {
    find_first(root, |node| {
        node.has_view_id(view_id)
            && text_filter.map_or(true, |filter| {
                node.text()
                    .map(|text| text.contains(filter))
                    .unwrap_or(false)
            })
    })
}

/// All nodes whose content description contains `needle`, ignoring case.
pub fn find_all_with_description(root: Option<&NodeRef>, needle: &str) -> Vec<NodeRef> {
    find_all(root, |node| node.description_contains(needle))
}

pub fn find_by_class_name(root: Option<&NodeRef>, class_name: &str) -> Option<NodeRef> {
    find_first(root, |node| node.has_class(class_name))
}

/// First node whose text or content description contains `needle`, ignoring case.
pub fn find_by_text_or_description(root: Option<&NodeRef>, needle: &str) -> Option<NodeRef> {
    find_first(root, |node| {
        node.text()
            .map(|text| contains_ignore_case(&text, needle))
            .unwrap_or(false)
            || node.description_contains(needle)
    })
}

/// First immediate child of `node` satisfying `predicate`.
pub fn find_direct_child<P>(node: &NodeRef, mut predicate: P) -> Option<NodeRef>
where
    P: FnMut(&NodeRef) -> bool,
{
    (0..node.child_count())
        .filter_map(|index| node.child(index))
        .find(|child| predicate(child))
}

/// Indented dump of the hierarchy for debug logging.
pub fn dump_hierarchy(root: Option<&NodeRef>, max_depth: usize) -> String {
    let mut out = String::new();
    walk(root, |node, depth| {
        if depth > max_depth {
            return Walk::SkipChildren;
        }
        let prefix = "  ".repeat(depth);
        let _ = writeln!(
            out,
            "{prefix}{} text={:?} desc={:?} id={:?} clickable={} visible={} enabled={}",
            node.class_name().unwrap_or_else(|| "?".into()),
            node.text(),
            node.content_description(),
            node.view_id(),
            node.is_clickable(),
            node.is_visible(),
            node.is_enabled(),
        );
        Walk::Continue
    });
    out
}

enum Walk {
    Continue,
    SkipChildren,
    Stop,
}

fn walk<F>(root: Option<&NodeRef>, mut visit: F)
where
    F: FnMut(&NodeRef, usize) -> Walk,
{
    let Some(root) = root else {
        return;
    };

    let mut stack: Vec<(NodeRef, usize)> = vec![(root.clone(), 0)];
    let mut visited = 0usize;

    while let Some((node, depth)) = stack.pop() {
        visited += 1;
        if visited > MAX_VISITED {
            log::warn!("tree walk aborted after {MAX_VISITED} nodes");
            return;
        }

        match visit(&node, depth) {
            Walk::Stop => return,
            Walk::SkipChildren => continue,
            Walk::Continue => {}
        }

        if depth + 1 > MAX_DEPTH {
            continue;
        }

        // Reverse push keeps left-to-right pre-order.
        for index in (0..node.child_count()).rev() {
            if let Some(child) = node.child(index) {
                stack.push((child, depth + 1));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessibility::memory::MemoryNode;

    fn sample_tree() -> NodeRef {
        MemoryNode::new("android.widget.FrameLayout")
            .with_child(
                MemoryNode::new("android.widget.LinearLayout")
                    .with_id("app:id/first")
                    .with_description("first Sponsored")
                    .with_child(MemoryNode::new("android.widget.TextView").with_text("deep")),
            )
            .with_missing_child()
            .with_child(
                MemoryNode::new("android.widget.TextView")
                    .with_id("app:id/first")
                    .with_text("second"),
            )
            .into_ref()
    }

    #[test]
    fn test_find_first_none_root() {
        assert!(find_first(None, |_| true).is_none());
    }

    #[test]
    fn test_find_first_no_match() {
        let root = sample_tree();
        assert!(find_first(Some(&root), |_| false).is_none());
    }

    #[test]
    fn test_find_first_is_pre_order() {
        let root = sample_tree();
        let node = find_by_view_id(Some(&root), "app:id/first", None).unwrap();
        assert_eq!(node.class_name().as_deref(), Some("android.widget.LinearLayout"));

        let text_node = find_by_class_name(Some(&root), "android.widget.TextView").unwrap();
        assert_eq!(text_node.text().as_deref(), Some("deep"));
    }

    #[test]
    fn test_find_by_view_id_text_filter() {
        let root = sample_tree();
        let node = find_by_view_id(Some(&root), "app:id/first", Some("second")).unwrap();
        assert_eq!(node.text().as_deref(), Some("second"));
        assert!(find_by_view_id(Some(&root), "app:id/first", Some("third")).is_none());
    }

    #[test]
    fn test_find_all_with_description_ignores_case() {
        let root = sample_tree();
        assert_eq!(find_all_with_description(Some(&root), "SPONSORED").len(), 1);
        assert!(find_all_with_description(Some(&root), "promoted").is_empty());
    }

    #[test]
    fn test_stale_node_is_skipped() {
        let stale = MemoryNode::new("android.widget.Button").with_description("Shorts");
        let root = MemoryNode::new("android.widget.FrameLayout")
            .with_child(stale.clone())
            .into_ref();
        stale.mark_stale();
        assert!(find_first(Some(&root), |node| node.description_contains("Shorts")).is_none());
    }

    #[test]
    fn test_deep_tree_does_not_overflow() {
        let mut node = MemoryNode::new("leaf").with_id("app:id/leaf");
        for _ in 0..(MAX_DEPTH * 2) {
            node = MemoryNode::new("wrapper").with_child(node);
        }
        let root = node.into_ref();
        // Beyond MAX_DEPTH: not found, but no stack overflow.
        assert!(find_by_view_id(Some(&root), "app:id/leaf", None).is_none());
    }

    #[test]
    fn test_find_direct_child() {
        let root = sample_tree();
        let child = find_direct_child(&root, |node| node.has_class("android.widget.TextView"));
        assert_eq!(child.unwrap().text().as_deref(), Some("second"));
    }

    #[test]
    fn test_dump_hierarchy_lists_nodes() {
        let root = sample_tree();
        let dump = dump_hierarchy(Some(&root), 10);
        assert!(dump.contains("android.widget.LinearLayout"));
        assert!(dump.contains("  android.widget.TextView"));
    }
}
