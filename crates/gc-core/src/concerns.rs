//! The scan-and-act routines, one per thing the extension hides.
//!
//! Each routine looks at the document as it is right now, acts on whatever
//! matches, and reports what it saw. None of them fail: a missing element is
//! a no-op, and a removal the page refuses is logged and skipped.

use crate::config::selectors::{
    EXPLORE_ICON, FEED_SUGGESTIONS, FEED_SUGGESTIONS_HINT, HOME_LINK, POPUP_COMMENT_LIST,
    POPUP_COMMENT_LIST_HINT, PROFILE_HEADER, PROFILE_HEADER_HINT, REELS_ICON, SPAN,
    STATIC_COMMENTS, STATIC_COMMENTS_CLASSES, TITLE,
};
use crate::config::{
    COMMENT_ICON_DEPTH, FOLLOWING_PATH, FOLLOWING_URL, NAV_ENTRY_DIV_DEPTH, POPUP_BLOCK_DEPTH,
    POPUP_DROPDOWN_DEPTH,
};
use crate::dom::{ascend, AncestorFilter, Dom, Selector};
use crate::host::Location;
use crate::settings::Flag;

/// What a single scan saw and did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// The target structure was present.
    pub found: bool,
    /// Elements removed or rewritten.
    pub changed: usize,
}

impl ScanOutcome {
    pub fn merge(self, other: ScanOutcome) -> ScanOutcome {
        ScanOutcome {
            found: self.found || other.found,
            changed: self.changed + other.changed,
        }
    }
}

fn remove_logged<D: Dom + ?Sized>(dom: &D, node: &D::Node, what: &str) -> bool {
    match dom.remove(node) {
        Ok(()) => {
            log::debug!("Removed {what}");
            true
        }
        Err(e) => {
            log::warn!("Failed to remove {what}: {e}");
            false
        }
    }
}

// =============================================================================
// Concern Table
// =============================================================================

/// One independently triggered removal routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Concern {
    ExploreLink,
    ReelsLink,
    FeedSuggestions,
    HomeRedirect,
    ProfileSuggestions,
    Comments,
}

impl Concern {
    pub const ALL: [Concern; 6] = [
        Concern::ExploreLink,
        Concern::ReelsLink,
        Concern::FeedSuggestions,
        Concern::HomeRedirect,
        Concern::ProfileSuggestions,
        Concern::Comments,
    ];

    /// The setting that switches this concern on.
    pub fn flag(self) -> Flag {
        match self {
            Concern::ExploreLink => Flag::ExplorePage,
            Concern::ReelsLink => Flag::ReelsPage,
            Concern::FeedSuggestions | Concern::HomeRedirect => Flag::Recommendations,
            Concern::ProfileSuggestions => Flag::SuggestedFriends,
            Concern::Comments => Flag::Comments,
        }
    }

    /// Selectors that, when an added node or one of its descendants matches,
    /// mean this concern has new work.
    pub fn triggers(self) -> &'static [Selector] {
        match self {
            Concern::ExploreLink => &[EXPLORE_ICON],
            Concern::ReelsLink => &[REELS_ICON],
            Concern::FeedSuggestions => &[FEED_SUGGESTIONS_HINT],
            Concern::HomeRedirect => &[HOME_LINK],
            Concern::ProfileSuggestions => &[PROFILE_HEADER_HINT],
            Concern::Comments => &[POPUP_COMMENT_LIST_HINT, STATIC_COMMENTS, TITLE],
        }
    }

    pub fn is_triggered_by<D: Dom + ?Sized>(self, dom: &D, node: &D::Node) -> bool {
        self.triggers().iter().any(|selector| dom.contains_match(node, selector))
    }
}

// =============================================================================
// Navigation Links
// =============================================================================

/// Remove the sidebar entry whose icon matches `icon`: the sixth `div`
/// above the icon. Shallower markup is left alone.
pub fn remove_nav_link<D: Dom + ?Sized>(dom: &D, icon: &Selector) -> ScanOutcome {
    let Some(icon_node) = dom.query_first(icon) else {
        return ScanOutcome::default();
    };

    match ascend(dom, &icon_node, NAV_ENTRY_DIV_DEPTH, AncestorFilter::Tag("div")) {
        Some(entry) => ScanOutcome {
            found: true,
            changed: remove_logged(dom, &entry, &format!("nav entry for {icon}")) as usize,
        },
        None => {
            log::trace!("Nav icon {icon} has fewer than {NAV_ENTRY_DIV_DEPTH} div ancestors");
            ScanOutcome::default()
        }
    }
}

pub fn remove_explore_link<D: Dom + ?Sized>(dom: &D) -> ScanOutcome {
    remove_nav_link(dom, &EXPLORE_ICON)
}

pub fn remove_reels_link<D: Dom + ?Sized>(dom: &D) -> ScanOutcome {
    remove_nav_link(dom, &REELS_ICON)
}

// =============================================================================
// Recommendations
// =============================================================================

/// Strip the suggested posts out of each main-feed container: within the
/// container's first child, drop the third then the second child.
pub fn remove_feed_suggestions<D: Dom + ?Sized>(dom: &D) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();

    for container in dom.query_all(&FEED_SUGGESTIONS) {
        let Some(first) = dom.children(&container).into_iter().next() else {
            continue;
        };
        let items = dom.children(&first);
        if items.len() < 3 {
            continue;
        }

        outcome.found = true;
        // Highest index first so the lower one still refers to the same element.
        for index in [2, 1] {
            if remove_logged(dom, &items[index], "feed suggestion") {
                outcome.changed += 1;
            }
        }
    }

    outcome
}

/// Per-page record of home links already rewritten.
///
/// A `Vec` with linear lookup: host element handles such as
/// `web_sys::Element` are `PartialEq` but not `Hash`. The set only holds the
/// handful of home links a page renders.
#[derive(Debug, Clone)]
pub struct ProcessedLinks<N> {
    links: Vec<N>,
}

impl<N: PartialEq> ProcessedLinks<N> {
    pub fn new() -> Self {
        Self { links: Vec::new() }
    }

    pub fn contains(&self, node: &N) -> bool {
        self.links.contains(node)
    }

    /// Returns `false` if the link was already recorded.
    pub fn insert(&mut self, node: N) -> bool {
        if self.contains(&node) {
            return false;
        }
        self.links.push(node);
        true
    }

    pub fn clear(&mut self) {
        self.links.clear();
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl<N: PartialEq> Default for ProcessedLinks<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Point every `<a href="/">` at the following feed, once per element.
pub fn redirect_home_links<D: Dom + ?Sized>(
    dom: &D,
    processed: &mut ProcessedLinks<D::Node>,
) -> ScanOutcome {
    let links = dom.query_all(&HOME_LINK);
    let mut outcome = ScanOutcome {
        found: !links.is_empty(),
        changed: 0,
    };

    for link in links {
        if !processed.insert(link.clone()) {
            continue;
        }

        let rewritten = dom
            .set_attribute(&link, "href", FOLLOWING_PATH)
            .and_then(|()| dom.redirect_clicks(&link, FOLLOWING_URL));
        match rewritten {
            Ok(()) => outcome.changed += 1,
            Err(e) => log::warn!("Failed to redirect home link: {e}"),
        }
    }

    outcome
}

// =============================================================================
// Suggested Friends
// =============================================================================

/// On profile pages, drop the fourth sibling block next to the profile
/// header, which holds the suggested accounts.
pub fn remove_profile_suggestions<D: Dom + ?Sized>(dom: &D) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();

    for header in dom.query_all(&PROFILE_HEADER) {
        let Some(parent) = dom.parent(&header) else {
            continue;
        };
        let siblings = dom.children(&parent);
        if siblings.len() < 4 {
            continue;
        }

        outcome.found = true;
        if remove_logged(dom, &siblings[3], "profile suggestions") {
            outcome.changed += 1;
        }
    }

    outcome
}

// =============================================================================
// Comments
// =============================================================================

/// Remove the comment column on a directly opened post page. The container
/// must carry exactly the expected classes, no more.
pub fn remove_static_comments<D: Dom + ?Sized>(dom: &D) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();

    for container in dom.query_all(&STATIC_COMMENTS) {
        let classes = dom.class_list(&container);
        let exact = classes.len() == STATIC_COMMENTS_CLASSES.len()
            && STATIC_COMMENTS_CLASSES
                .iter()
                .all(|expected| classes.iter().any(|c| c == expected));
        if !exact {
            continue;
        }

        outcome.found = true;
        if remove_logged(dom, &container, "post comments") {
            outcome.changed += 1;
        }
    }

    outcome
}

/// Remove the comments from the post overlay: the "more comments" drop-down
/// five levels above the list, then the comment block three levels above it.
/// Only the first list on the page is handled.
pub fn remove_popup_comments<D: Dom + ?Sized>(dom: &D) -> ScanOutcome {
    let Some(list) = dom.query_first(&POPUP_COMMENT_LIST) else {
        return ScanOutcome::default();
    };
    let mut outcome = ScanOutcome {
        found: true,
        changed: 0,
    };
    if !dom.is_connected(&list) {
        return outcome;
    }

    if let Some(holder) = ascend(dom, &list, POPUP_DROPDOWN_DEPTH, AncestorFilter::Any) {
        let parts = dom.children(&holder);
        if parts.len() >= 2 && remove_logged(dom, &parts[1], "comment drop-down") {
            outcome.changed += 1;
        }
    }

    if let Some(block) = ascend(dom, &list, POPUP_BLOCK_DEPTH, AncestorFilter::Any) {
        // The drop-down removal may already have taken the block with it.
        if dom.is_connected(&block) && remove_logged(dom, &block, "popup comments") {
            outcome.changed += 1;
        }
    }

    outcome
}

/// On the home feed only: remove each post's comment button (found through
/// its `<title>Comment</title>`) and every "View all N comments" link.
pub fn remove_comment_icons<D: Dom + ?Sized>(dom: &D, location: &Location) -> ScanOutcome {
    if !location.is_root() {
        return ScanOutcome::default();
    }

    let mut icons = ScanOutcome::default();
    for title in dom.query_all(&TITLE) {
        let is_comment = dom
            .text_content(&title)
            .is_some_and(|text| text.trim() == "Comment");
        if !is_comment {
            continue;
        }
        if let Some(button) = ascend(dom, &title, COMMENT_ICON_DEPTH, AncestorFilter::Any) {
            icons.found = true;
            if remove_logged(dom, &button, "comment icon") {
                icons.changed += 1;
            }
        }
    }

    let mut links = ScanOutcome::default();
    for span in dom.query_all(&SPAN) {
        let is_view_all = dom
            .text_content(&span)
            .is_some_and(|text| text.trim().to_lowercase().contains("view all"));
        if !is_view_all {
            continue;
        }
        links.found = true;
        if remove_logged(dom, &span, "view-all link") {
            links.changed += 1;
        }
    }

    icons.merge(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryDocument, NodeId};

    const ROOT: &str = "https://www.instagram.com/";

    fn nav_icon(doc: &MemoryDocument, label: &str, divs: usize) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = doc.body();
        for _ in 0..divs {
            current = doc.append(current, "div");
            chain.push(current);
        }
        let svg = doc.append(current, "svg");
        doc.set_attr(svg, "aria-label", label);
        chain
    }

    #[test]
    fn test_remove_nav_link_sixth_div() {
        let doc = MemoryDocument::new();
        // chain[0] is outermost; the sixth div above the icon is chain[1].
        let chain = nav_icon(&doc, "Explore", 7);
        let sibling = doc.append(chain[0], "div");

        let outcome = remove_explore_link(&doc);
        assert_eq!(outcome, ScanOutcome { found: true, changed: 1 });
        assert!(!doc.is_connected(&chain[1]));
        assert!(doc.is_connected(&chain[0]));
        assert!(doc.is_connected(&sibling));
    }

    #[test]
    fn test_remove_nav_link_skips_non_div_ancestors() {
        let doc = MemoryDocument::new();
        let outer = doc.append_chain(doc.body(), "div", 3);
        let nav = doc.append(outer, "nav");
        let inner = doc.append_chain(nav, "div", 3);
        let svg = doc.append(inner, "svg");
        doc.set_attr(svg, "aria-label", "Reels");

        assert_eq!(remove_reels_link(&doc).changed, 1);
        assert!(doc.query_first(&REELS_ICON).is_none());
        assert!(!doc.is_connected(&nav));
    }

    #[test]
    fn test_remove_nav_link_needs_six_divs() {
        let doc = MemoryDocument::new();
        let chain = nav_icon(&doc, "Explore", 5);

        assert_eq!(remove_explore_link(&doc), ScanOutcome::default());
        assert!(chain.iter().all(|node| doc.is_connected(node)));
        assert_eq!(remove_reels_link(&doc), ScanOutcome::default());
    }

    fn feed_container(doc: &MemoryDocument, items: usize) -> (NodeId, Vec<NodeId>) {
        let container = doc.append(doc.body(), "div");
        doc.set_classes(container, &["x1dr59a3", "x13vifvy", "x7vhb2i", "x6bx242"]);
        let first = doc.append(container, "div");
        let children = (0..items).map(|_| doc.append(first, "div")).collect();
        (first, children)
    }

    #[test]
    fn test_remove_feed_suggestions_keeps_first() {
        let doc = MemoryDocument::new();
        let (first, items) = feed_container(&doc, 3);

        let outcome = remove_feed_suggestions(&doc);
        assert_eq!(outcome, ScanOutcome { found: true, changed: 2 });
        assert_eq!(doc.children(&first), vec![items[0]]);
    }

    #[test]
    fn test_remove_feed_suggestions_short_container() {
        let doc = MemoryDocument::new();
        let (first, items) = feed_container(&doc, 2);

        assert!(!remove_feed_suggestions(&doc).found);
        assert_eq!(doc.children(&first), items);
    }

    #[test]
    fn test_remove_profile_suggestions() {
        let doc = MemoryDocument::new();
        let section = doc.append(doc.body(), "section");
        let header = doc.append(section, "header");
        doc.set_classes(
            header,
            &["xrvj5dj", "xl463y0", "x1ec4g5p", "xdj266r", "xwy3nlu", "xh8yej3"],
        );
        let blocks: Vec<_> = (0..4).map(|_| doc.append(section, "div")).collect();

        assert_eq!(remove_profile_suggestions(&doc).changed, 1);
        assert!(!doc.is_connected(&blocks[2]));
        assert_eq!(doc.children(&section), vec![header, blocks[0], blocks[1], blocks[3]]);
    }

    #[test]
    fn test_redirect_home_links_once() {
        let doc = MemoryDocument::new();
        let link = doc.append(doc.body(), "a");
        doc.set_attr(link, "href", "/");
        let mut processed = ProcessedLinks::new();

        assert_eq!(redirect_home_links(&doc, &mut processed).changed, 1);
        assert_eq!(doc.attribute(&link, "href").as_deref(), Some(FOLLOWING_PATH));

        // The page puts the original href back; the link is still not reprocessed.
        doc.set_attr(link, "href", "/");
        assert_eq!(redirect_home_links(&doc, &mut processed).changed, 0);
        assert_eq!(doc.click_redirects(link), vec![FOLLOWING_URL.to_string()]);
        assert_eq!(processed.len(), 1);
    }

    #[test]
    fn test_remove_static_comments_exact_classes() {
        let doc = MemoryDocument::new();
        let exact = doc.append(doc.body(), "div");
        doc.set_classes(exact, &["xdt5ytf", "x78zum5", "x1iyjqo2"]);
        let wider = doc.append(doc.body(), "div");
        doc.set_classes(wider, &["x78zum5", "xdt5ytf", "x1iyjqo2", "x1n2onr6"]);

        assert_eq!(remove_static_comments(&doc).changed, 1);
        assert!(!doc.is_connected(&exact));
        assert!(doc.is_connected(&wider));
    }

    #[test]
    fn test_remove_popup_comments() {
        let doc = MemoryDocument::new();
        // a5 > [a4 > a3 > a2 > a1 > ul, dropdown]
        let a5 = doc.append(doc.body(), "div");
        let a4 = doc.append(a5, "div");
        let dropdown = doc.append(a5, "div");
        let a3 = doc.append(a4, "div");
        let a2 = doc.append(a3, "div");
        let a1 = doc.append(a2, "div");
        let ul = doc.append(a1, "ul");
        doc.set_classes(ul, &["_a9ym"]);

        let outcome = remove_popup_comments(&doc);
        assert_eq!(outcome, ScanOutcome { found: true, changed: 2 });
        assert!(!doc.is_connected(&dropdown));
        assert!(!doc.is_connected(&a3));
        assert!(doc.is_connected(&a4));
    }

    #[test]
    fn test_remove_popup_comments_only_first_list() {
        let doc = MemoryDocument::new();
        let lists: Vec<_> = (0..2)
            .map(|_| {
                let top = doc.append_chain(doc.body(), "div", 3);
                let ul = doc.append(top, "ul");
                doc.set_classes(ul, &["_a9ym"]);
                ul
            })
            .collect();

        remove_popup_comments(&doc);
        assert!(!doc.is_connected(&lists[0]));
        assert!(doc.is_connected(&lists[1]));
    }

    fn comment_icon(doc: &MemoryDocument) -> NodeId {
        let button = doc.append(doc.body(), "div");
        let svg = doc.append_chain(button, "svg", 2);
        let title = doc.append(svg, "title");
        doc.set_text(title, " Comment ");
        button
    }

    #[test]
    fn test_remove_comment_icons_on_root() {
        let doc = MemoryDocument::new();
        let button = comment_icon(&doc);
        let view_all = doc.append(doc.body(), "span");
        doc.set_text(view_all, "  View All 12 comments ");
        let caption = doc.append(doc.body(), "span");
        doc.set_text(caption, "nice view");

        let outcome = remove_comment_icons(&doc, &Location::from_href(ROOT));
        assert_eq!(outcome, ScanOutcome { found: true, changed: 2 });
        assert!(!doc.is_connected(&button));
        assert!(!doc.is_connected(&view_all));
        assert!(doc.is_connected(&caption));
    }

    #[test]
    fn test_remove_comment_icons_off_root() {
        let doc = MemoryDocument::new();
        let button = comment_icon(&doc);

        let location = Location::from_href("https://www.instagram.com/p/abc/");
        assert_eq!(remove_comment_icons(&doc, &location), ScanOutcome::default());
        assert!(doc.is_connected(&button));
    }

    #[test]
    fn test_failed_removal_is_contained() {
        let doc = MemoryDocument::new();
        let (first, items) = feed_container(&doc, 3);
        doc.reject_removal(items[2]);

        let outcome = remove_feed_suggestions(&doc);
        assert_eq!(outcome, ScanOutcome { found: true, changed: 1 });
        assert_eq!(doc.children(&first), vec![items[0], items[2]]);
    }

    #[test]
    fn test_trigger_table() {
        let doc = MemoryDocument::new();
        let wrapper = doc.append(doc.body(), "div");
        let link = doc.append(wrapper, "a");
        doc.set_attr(link, "href", "/");

        let triggered: Vec<_> = Concern::ALL
            .into_iter()
            .filter(|c| c.is_triggered_by(&doc, &wrapper))
            .collect();
        assert_eq!(triggered, vec![Concern::HomeRedirect]);
        assert_eq!(Concern::HomeRedirect.flag(), Flag::Recommendations);
    }
}
