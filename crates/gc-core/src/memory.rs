//! In-memory page host: a small element tree, a history stack and an observer
//! log. Drives the watcher in tests and in the CLI without a browser.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::dom::{Dom, DomError, Selector};
use crate::host::{Location, Navigator, ObserveOptions, ObserverHost};
use crate::registry::{Disconnect, ObserverId};
use crate::url::{extract_origin, extract_path, get_scheme_end};

// =============================================================================
// Document
// =============================================================================

/// Handle to an element in a [`MemoryDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Default)]
struct Node {
    tag: String,
    classes: Vec<String>,
    attributes: Vec<(String, String)>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    click_redirects: Vec<String>,
    reject_removal: bool,
}

/// Arena-backed element tree rooted at `<html><body>`.
///
/// Removed nodes stay in the arena, detached, so stale handles behave like
/// stale `Element`s in a browser.
#[derive(Debug)]
pub struct MemoryDocument {
    nodes: RefCell<Vec<Node>>,
    root: NodeId,
    body: NodeId,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    pub fn new() -> Self {
        let html = Node {
            tag: "html".to_string(),
            ..Node::default()
        };
        let body = Node {
            tag: "body".to_string(),
            parent: Some(NodeId(0)),
            ..Node::default()
        };
        let mut nodes = vec![html, body];
        nodes[0].children.push(NodeId(1));

        Self {
            nodes: RefCell::new(nodes),
            root: NodeId(0),
            body: NodeId(1),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Create an element and append it as the last child of `parent`.
    pub fn append(&self, parent: NodeId, tag: &str) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        let id = NodeId(nodes.len());
        nodes.push(Node {
            tag: tag.to_ascii_lowercase(),
            parent: Some(parent),
            ..Node::default()
        });
        nodes[parent.0].children.push(id);
        id
    }

    /// Append a chain of `depth` elements of `tag`, each inside the previous
    /// one. Returns the innermost.
    pub fn append_chain(&self, parent: NodeId, tag: &str, depth: usize) -> NodeId {
        (0..depth).fold(parent, |current, _| self.append(current, tag))
    }

    pub fn set_classes(&self, node: NodeId, classes: &[&str]) {
        self.nodes.borrow_mut()[node.0].classes = classes.iter().map(|c| c.to_string()).collect();
    }

    pub fn set_attr(&self, node: NodeId, name: &str, value: &str) {
        let mut nodes = self.nodes.borrow_mut();
        let attributes = &mut nodes[node.0].attributes;
        match attributes.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => attributes.push((name.to_string(), value.to_string())),
        }
    }

    /// Set the element's own text (descendant text still contributes to
    /// `text_content`).
    pub fn set_text(&self, node: NodeId, text: &str) {
        self.nodes.borrow_mut()[node.0].text = text.to_string();
    }

    /// Make every future `remove` of this node fail, the way a removal can
    /// throw when the page swaps markup underneath a script.
    pub fn reject_removal(&self, node: NodeId) {
        self.nodes.borrow_mut()[node.0].reject_removal = true;
    }

    /// Click redirect targets installed on `node`.
    pub fn click_redirects(&self, node: NodeId) -> Vec<String> {
        self.nodes.borrow()[node.0].click_redirects.clone()
    }

    /// Simulate a user click: run the installed redirect handler if there is
    /// one, otherwise follow the element's `href`. Returns whether the
    /// default action was prevented.
    pub fn click<N: Navigator + ?Sized>(&self, node: NodeId, navigator: &N) -> Result<bool, DomError> {
        let redirect = self.nodes.borrow()[node.0].click_redirects.first().cloned();
        if let Some(target) = redirect {
            if navigator.location().href != target {
                navigator.assign(&target)?;
            }
            return Ok(true);
        }

        if let Some(href) = self.attribute(&node, "href") {
            navigator.assign(&href)?;
        }
        Ok(false)
    }

    /// Number of attached elements, `html` and `body` included.
    pub fn connected_count(&self) -> usize {
        let mut count = 0;
        self.walk(self.root, &mut |_| count += 1);
        count
    }

    fn walk(&self, from: NodeId, visit: &mut dyn FnMut(NodeId)) {
        visit(from);
        let children = self.nodes.borrow()[from.0].children.clone();
        for child in children {
            self.walk(child, visit);
        }
    }
}

impl Dom for MemoryDocument {
    type Node = NodeId;

    fn query_all(&self, selector: &Selector) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.walk(self.root, &mut |id| {
            if selector.matches(self, &id) {
                found.push(id);
            }
        });
        found
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.nodes.borrow()[node.0].parent
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.nodes.borrow()[node.0].children.clone()
    }

    fn tag_name(&self, node: &NodeId) -> String {
        self.nodes.borrow()[node.0].tag.clone()
    }

    fn class_list(&self, node: &NodeId) -> Vec<String> {
        self.nodes.borrow()[node.0].classes.clone()
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.nodes.borrow()[node.0]
            .attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    fn set_attribute(&self, node: &NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.set_attr(*node, name, value);
        Ok(())
    }

    fn text_content(&self, node: &NodeId) -> Option<String> {
        let mut text = String::new();
        self.walk(*node, &mut |id| text.push_str(&self.nodes.borrow()[id.0].text));
        Some(text)
    }

    fn is_connected(&self, node: &NodeId) -> bool {
        let mut current = *node;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(&current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn contains_match(&self, node: &NodeId, selector: &Selector) -> bool {
        let mut hit = false;
        self.walk(*node, &mut |id| hit = hit || selector.matches(self, &id));
        hit
    }

    fn remove(&self, node: &NodeId) -> Result<(), DomError> {
        let mut nodes = self.nodes.borrow_mut();
        if nodes[node.0].reject_removal {
            return Err(DomError::Host(format!("removal of {node:?} rejected")));
        }
        let parent = nodes[node.0].parent.take().ok_or(DomError::Detached)?;
        nodes[parent.0].children.retain(|child| child != node);
        Ok(())
    }

    fn redirect_clicks(&self, node: &NodeId, target: &str) -> Result<(), DomError> {
        self.nodes.borrow_mut()[node.0].click_redirects.push(target.to_string());
        Ok(())
    }
}

// =============================================================================
// Navigator
// =============================================================================

/// A history stack with a cursor, standing in for `location` + `history`.
#[derive(Debug)]
pub struct MemoryNavigator {
    origin: String,
    entries: RefCell<Vec<String>>,
    index: Cell<usize>,
    replaces: Cell<usize>,
}

impl MemoryNavigator {
    /// Start with a single entry at `href`, which must be absolute.
    pub fn new(href: &str) -> Self {
        Self {
            origin: extract_origin(href).to_string(),
            entries: RefCell::new(vec![href.to_string()]),
            index: Cell::new(0),
            replaces: Cell::new(0),
        }
    }

    fn resolve(&self, url: &str) -> String {
        if get_scheme_end(url).is_some() {
            return url.to_string();
        }
        if url.starts_with('/') {
            return format!("{}{}", self.origin, url);
        }
        let current = self.current();
        format!("{}{}{}", self.origin, extract_path(&current), url)
    }

    fn current(&self) -> String {
        self.entries.borrow()[self.index.get()].clone()
    }

    /// The page's own `history.pushState`.
    pub fn push_state(&self, url: &str) {
        let resolved = self.resolve(url);
        let mut entries = self.entries.borrow_mut();
        entries.truncate(self.index.get() + 1);
        entries.push(resolved);
        self.index.set(entries.len() - 1);
    }

    /// The page's own `history.replaceState`.
    pub fn replace_state(&self, url: &str) {
        let resolved = self.resolve(url);
        self.entries.borrow_mut()[self.index.get()] = resolved;
    }

    /// Browser back button. Returns `false` at the start of history.
    pub fn back(&self) -> bool {
        match self.index.get() {
            0 => false,
            i => {
                self.index.set(i - 1);
                true
            }
        }
    }

    pub fn history_len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    /// How many times [`Navigator::replace`] ran.
    pub fn replace_count(&self) -> usize {
        self.replaces.get()
    }
}

impl Navigator for MemoryNavigator {
    fn location(&self) -> Location {
        Location::from_href(&self.current())
    }

    fn replace(&self, url: &str) -> Result<(), DomError> {
        self.replace_state(url);
        self.replaces.set(self.replaces.get() + 1);
        Ok(())
    }

    fn assign(&self, url: &str) -> Result<(), DomError> {
        self.push_state(url);
        Ok(())
    }
}

// =============================================================================
// Observers
// =============================================================================

#[derive(Debug, Default)]
struct ObserverLog {
    active: Vec<(ObserverId, ObserveOptions)>,
    disconnected: Vec<ObserverId>,
    timeouts: Vec<(ObserverId, Duration)>,
    failing: bool,
}

/// Records what the watcher asked to observe. Delivering mutations and
/// firing timeouts is up to the test, through the watcher's handlers.
#[derive(Debug, Default, Clone)]
pub struct MemoryObservers {
    log: Rc<RefCell<ObserverLog>>,
}

impl MemoryObservers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connected observers in start order.
    pub fn active(&self) -> Vec<ObserverId> {
        self.log.borrow().active.iter().map(|(id, _)| *id).collect()
    }

    pub fn options(&self, id: ObserverId) -> Option<ObserveOptions> {
        self.log
            .borrow()
            .active
            .iter()
            .find(|(active, _)| *active == id)
            .map(|(_, options)| *options)
    }

    pub fn disconnected(&self) -> Vec<ObserverId> {
        self.log.borrow().disconnected.clone()
    }

    /// Every timeout requested so far, fired or not.
    pub fn timeouts(&self) -> Vec<(ObserverId, Duration)> {
        self.log.borrow().timeouts.clone()
    }

    /// Make `observe` fail, as when the page has no body or root yet.
    pub fn set_failing(&self, failing: bool) {
        self.log.borrow_mut().failing = failing;
    }
}

#[derive(Debug)]
pub struct MemoryObserverHandle {
    id: ObserverId,
    log: Rc<RefCell<ObserverLog>>,
}

impl Disconnect for MemoryObserverHandle {
    fn disconnect(&mut self) {
        let mut log = self.log.borrow_mut();
        log.active.retain(|(id, _)| *id != self.id);
        log.disconnected.push(self.id);
    }
}

impl ObserverHost for MemoryObservers {
    type Handle = MemoryObserverHandle;

    fn observe(&self, id: ObserverId, options: ObserveOptions) -> Result<Self::Handle, DomError> {
        let mut log = self.log.borrow_mut();
        if log.failing {
            return Err(DomError::NoDocument);
        }
        log.active.push((id, options));
        Ok(MemoryObserverHandle {
            id,
            log: self.log.clone(),
        })
    }

    fn schedule_timeout(&self, id: ObserverId, after: Duration) -> Result<(), DomError> {
        self.log.borrow_mut().timeouts.push((id, after));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_detaches_subtree() {
        let doc = MemoryDocument::new();
        let outer = doc.append(doc.body(), "div");
        let inner = doc.append(outer, "span");

        doc.remove(&outer).unwrap();
        assert!(!doc.is_connected(&outer));
        assert!(!doc.is_connected(&inner));
        assert!(doc.query_all(&Selector::tag("span")).is_empty());
        assert_eq!(doc.remove(&outer), Err(DomError::Detached));
    }

    #[test]
    fn test_text_content_includes_descendants() {
        let doc = MemoryDocument::new();
        let span = doc.append(doc.body(), "span");
        doc.set_text(span, "View all ");
        let b = doc.append(span, "b");
        doc.set_text(b, "12 comments");

        assert_eq!(doc.text_content(&span).as_deref(), Some("View all 12 comments"));
    }

    #[test]
    fn test_navigator_history() {
        let nav = MemoryNavigator::new("https://www.instagram.com/explore/");
        nav.push_state("/p/abc/");
        nav.push_state("?img_index=2");
        assert_eq!(nav.location().href, "https://www.instagram.com/p/abc/?img_index=2");

        assert!(nav.back());
        nav.push_state("/reels/");
        assert_eq!(
            nav.entries(),
            vec![
                "https://www.instagram.com/explore/",
                "https://www.instagram.com/p/abc/",
                "https://www.instagram.com/reels/",
            ]
        );
    }

    #[test]
    fn test_observer_log() {
        let observers = MemoryObservers::new();
        let mut handle = observers.observe(ObserverId(4), ObserveOptions::subtree()).unwrap();
        assert_eq!(observers.active(), vec![ObserverId(4)]);

        handle.disconnect();
        assert!(observers.active().is_empty());
        assert_eq!(observers.disconnected(), vec![ObserverId(4)]);
    }
}
