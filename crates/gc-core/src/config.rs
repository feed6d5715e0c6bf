//! Site-specific constants: where the extension runs, what it looks for, and
//! how long it waits.
//!
//! The class names are the site's generated atomic CSS classes. They change
//! without notice; every lookup built on them degrades to a no-op when they do.

use std::time::Duration;

use crate::dom::Selector;

/// Origin the content script is injected into.
pub const SITE_ORIGIN: &str = "https://www.instagram.com";

/// Storage key holding the settings record.
pub const SETTINGS_KEY: &str = "settings";

/// Storage area the settings live in.
pub const SETTINGS_AREA: &str = "local";

/// Relative link to the following-only feed.
pub const FOLLOWING_PATH: &str = "/?variant=following";

/// Absolute URL of the following-only feed.
pub const FOLLOWING_URL: &str = "https://www.instagram.com/?variant=following";

/// Query parameter that selects the following-only feed.
pub const FEED_VARIANT_PARAM: (&str, &str) = ("variant", "following");

/// Name of the port a content script holds open to detect extension reloads.
pub const CONTEXT_PORT: &str = "gramcontrol-content";

/// Delay before reopening a port the background dropped.
pub const CONTEXT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on how long a bounded-wait observer stays connected.
pub const BOUNDED_WAIT: Duration = Duration::from_secs(10);

/// Number of `div` ancestors between a sidebar icon and its whole nav entry.
pub const NAV_ENTRY_DIV_DEPTH: usize = 6;

/// Ancestor steps from the popup comment list to the block holding the
/// "more comments" affordance.
pub const POPUP_DROPDOWN_DEPTH: usize = 5;

/// Ancestor steps from the popup comment list to the whole comment block.
pub const POPUP_BLOCK_DEPTH: usize = 3;

/// Ancestor steps from a `<title>Comment</title>` to its button.
pub const COMMENT_ICON_DEPTH: usize = 3;

pub mod selectors {
    use super::Selector;

    pub const EXPLORE_ICON: Selector = Selector::tag("svg").with_attribute("aria-label", "Explore");

    pub const REELS_ICON: Selector = Selector::tag("svg").with_attribute("aria-label", "Reels");

    pub const FEED_SUGGESTIONS: Selector =
        Selector::tag("div").with_classes(&["x1dr59a3", "x13vifvy", "x7vhb2i", "x6bx242"]);

    pub const PROFILE_HEADER: Selector = Selector::tag("header").with_classes(&[
        "xrvj5dj", "xl463y0", "x1ec4g5p", "xdj266r", "xwy3nlu", "xh8yej3",
    ]);

    pub const STATIC_COMMENTS_CLASSES: &[&str] = &["x78zum5", "xdt5ytf", "x1iyjqo2"];

    pub const STATIC_COMMENTS: Selector = Selector::tag("div").with_classes(STATIC_COMMENTS_CLASSES);

    pub const POPUP_COMMENT_LIST: Selector = Selector::tag("ul").with_classes(&["_a9ym"]);

    pub const HOME_LINK: Selector = Selector::tag("a").with_attribute("href", "/");

    pub const TITLE: Selector = Selector::tag("title");

    pub const SPAN: Selector = Selector::tag("span");

    // Looser forms used to decide whether newly added nodes are worth a rescan.

    pub const FEED_SUGGESTIONS_HINT: Selector = Selector::classes(&["x1dr59a3", "x13vifvy"]);

    pub const PROFILE_HEADER_HINT: Selector = Selector::classes(&["xrvj5dj", "xl463y0"]);

    pub const POPUP_COMMENT_LIST_HINT: Selector = Selector::classes(&["_a9ym"]);
}
