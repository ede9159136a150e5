//! Sponsored-content classification.
//!
//! Every rule here leans toward "not sponsored": a missing container, a stale
//! node or an ambiguous marker is never reported as an ad, because a false
//! positive skips a real item immediately.

use crate::accessibility::node::contains_ignore_case;
use crate::accessibility::query::{find_by_view_id, find_first};
use crate::accessibility::NodeRef;
use crate::platform::Platform;

pub const SPONSORED_MARKER: &str = "Sponsored";
pub const PROMOTED_MARKER: &str = "Promoted";
pub const AD_MARKER: &str = "Ad";

const INSTAGRAM_VIDEO_CONTAINER: &str = "clips_video_container";
const SNAPCHAT_SPOTLIGHT_CONTAINER: &str = "spotlight_container";

/// Whether the item currently shown under `root` is an advertisement.
pub fn is_sponsored(platform: Platform, root: &NodeRef) -> bool {
    match platform {
        Platform::Instagram => instagram_sponsored(root),
        Platform::YouTube => youtube_sponsored(root),
        Platform::LinkedIn => has_feed_marker(root),
        Platform::Snapchat => snapchat_sponsored(root),
    }
}

fn instagram_sponsored(root: &NodeRef) -> bool {
    let container_id = Platform::Instagram.view_id(INSTAGRAM_VIDEO_CONTAINER);
    let labelled = find_by_view_id(Some(root), &container_id, None)
        .and_then(|container| container.content_description())
        .map(|description| description.starts_with(SPONSORED_MARKER))
        .unwrap_or(false);

    labelled || find_first(Some(root), |node| node.description_contains(SPONSORED_MARKER)).is_some()
}

fn youtube_sponsored(root: &NodeRef) -> bool {
    // Ad cards carry a rating ("4.5 stars") next to the "Ad" badge.
    let rated_ad_card = find_first(Some(root), |node| {
        node.has_class("android.view.ViewGroup")
            && node
                .content_description()
                .map(|description| {
                    contains_ignore_case(&description, "stars")
                        && contains_word_ignore_case(&description, AD_MARKER)
                })
                .unwrap_or(false)
    });
    if rated_ad_card.is_some() {
        return true;
    }

    // Promoted shorts keep a clickable action menu that is laid out off-screen.
    let hidden_action_menu = find_first(Some(root), |node| {
        node.has_class("android.widget.ImageView")
            && node.content_description().as_deref() == Some("Action menu")
            && node.is_clickable()
            && !node.is_visible()
            && node.is_enabled()
    });
    if hidden_action_menu.is_some() {
        return true;
    }

    find_first(Some(root), |node| node.description_contains(SPONSORED_MARKER)).is_some()
}

fn snapchat_sponsored(root: &NodeRef) -> bool {
    let container_id = Platform::Snapchat.view_id(SNAPCHAT_SPOTLIGHT_CONTAINER);
    match find_by_view_id(Some(root), &container_id, None) {
        Some(container) => has_feed_marker(&container),
        None => has_feed_marker(root),
    }
}

/// "Promoted" or "Sponsored" anywhere, or "Ad" as a standalone word, on the
/// text or description of any node in the subtree.
fn has_feed_marker(root: &NodeRef) -> bool {
    find_first(Some(root), |node| {
        [node.text(), node.content_description()]
            .into_iter()
            .flatten()
            .any(|value| is_marker_label(&value))
    })
    .is_some()
}

fn is_marker_label(value: &str) -> bool {
    contains_ignore_case(value, PROMOTED_MARKER)
        || contains_ignore_case(value, SPONSORED_MARKER)
        || contains_word_ignore_case(value, AD_MARKER)
}

/// `word` surrounded by non-alphanumeric characters or the string's ends.
fn contains_word_ignore_case(haystack: &str, word: &str) -> bool {
    let word = word.to_lowercase();
    haystack
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| token == word)
}
