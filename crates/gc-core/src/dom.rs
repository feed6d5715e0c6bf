//! Document abstraction the concerns are written against.
//!
//! The browser build implements [`Dom`] over `web_sys::Document`; tests use
//! [`crate::memory::MemoryDocument`].

use std::fmt;

/// Error type for DOM operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("node is no longer attached to the document")]
    Detached,
    #[error("invalid selector: {0}")]
    InvalidSelector(String),
    #[error("no document available")]
    NoDocument,
    #[error("host error: {0}")]
    Host(String),
}

// =============================================================================
// Selectors
// =============================================================================

/// A compound CSS selector: optional tag, any number of classes and an
/// optional attribute equality test.
///
/// Renders to CSS through `Display` for `querySelectorAll`, and can be
/// evaluated natively with [`Selector::matches`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selector {
    pub tag: Option<&'static str>,
    pub classes: &'static [&'static str],
    pub attribute: Option<(&'static str, &'static str)>,
}

impl Selector {
    /// Match elements by tag name.
    pub const fn tag(tag: &'static str) -> Self {
        Self {
            tag: Some(tag),
            classes: &[],
            attribute: None,
        }
    }

    /// Match elements carrying all of `classes`, any tag.
    pub const fn classes(classes: &'static [&'static str]) -> Self {
        Self {
            tag: None,
            classes,
            attribute: None,
        }
    }

    /// Restrict to elements also carrying all of `classes`.
    pub const fn with_classes(self, classes: &'static [&'static str]) -> Self {
        Self { classes, ..self }
    }

    /// Restrict to elements whose attribute `name` equals `value`.
    pub const fn with_attribute(self, name: &'static str, value: &'static str) -> Self {
        Self {
            attribute: Some((name, value)),
            ..self
        }
    }

    /// Evaluate the selector against a single element.
    pub fn matches<D: Dom + ?Sized>(&self, dom: &D, node: &D::Node) -> bool {
        if let Some(tag) = self.tag {
            if !dom.tag_name(node).eq_ignore_ascii_case(tag) {
                return false;
            }
        }

        if !self.classes.is_empty() {
            let present = dom.class_list(node);
            if !self.classes.iter().all(|c| present.iter().any(|p| p == c)) {
                return false;
            }
        }

        match self.attribute {
            Some((name, value)) => dom.attribute(node, name).as_deref() == Some(value),
            None => true,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag {
            Some(tag) => f.write_str(tag)?,
            None if self.classes.is_empty() && self.attribute.is_none() => f.write_str("*")?,
            None => {}
        }
        for class in self.classes {
            write!(f, ".{class}")?;
        }
        if let Some((name, value)) = self.attribute {
            write!(f, "[{name}=\"{value}\"]")?;
        }
        Ok(())
    }
}

// =============================================================================
// Document
// =============================================================================

/// Element-level access to the live page.
///
/// Every query returns elements only (never text or comment nodes). Reads
/// never fail; an element that went away simply has no parent or children.
pub trait Dom {
    type Node: Clone + PartialEq + fmt::Debug;

    /// All elements matching `selector`, in document order.
    fn query_all(&self, selector: &Selector) -> Vec<Self::Node>;

    fn query_first(&self, selector: &Selector) -> Option<Self::Node> {
        self.query_all(selector).into_iter().next()
    }

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    /// Lowercased tag name.
    fn tag_name(&self, node: &Self::Node) -> String;

    fn class_list(&self, node: &Self::Node) -> Vec<String>;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) -> Result<(), DomError>;

    fn text_content(&self, node: &Self::Node) -> Option<String>;

    /// Whether the node is still attached to the document.
    fn is_connected(&self, node: &Self::Node) -> bool;

    /// Whether `node` itself or any of its descendants matches `selector`.
    fn contains_match(&self, node: &Self::Node, selector: &Selector) -> bool;

    /// Detach `node` from the document.
    fn remove(&self, node: &Self::Node) -> Result<(), DomError>;

    /// Make clicks on `node` go to `target` instead of the default action.
    ///
    /// The installed handler cancels default navigation, stops other click
    /// listeners on the element, and navigates only if the current location
    /// differs from `target`.
    fn redirect_clicks(&self, node: &Self::Node, target: &str) -> Result<(), DomError>;
}

// =============================================================================
// Ancestor Walk
// =============================================================================

/// Which ancestors count as a step in [`ascend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AncestorFilter {
    /// Every parent element counts.
    Any,
    /// Only ancestors with this tag count; others are passed over.
    Tag(&'static str),
}

impl AncestorFilter {
    fn accepts<D: Dom + ?Sized>(self, dom: &D, node: &D::Node) -> bool {
        match self {
            Self::Any => true,
            Self::Tag(tag) => dom.tag_name(node).eq_ignore_ascii_case(tag),
        }
    }
}

/// Walk up from `start` until `steps` ancestors accepted by `filter` have
/// been seen, returning the last one.
///
/// Returns `None` when the chain runs out first. `steps == 0` yields `start`.
pub fn ascend<D: Dom + ?Sized>(
    dom: &D,
    start: &D::Node,
    steps: usize,
    filter: AncestorFilter,
) -> Option<D::Node> {
    if steps == 0 {
        return Some(start.clone());
    }

    let mut seen = 0;
    let mut current = dom.parent(start);
    while let Some(node) = current {
        if filter.accepts(dom, &node) {
            seen += 1;
            if seen == steps {
                return Some(node);
            }
        }
        current = dom.parent(&node);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocument;

    #[test]
    fn test_selector_display() {
        assert_eq!(
            Selector::tag("svg").with_attribute("aria-label", "Explore").to_string(),
            "svg[aria-label=\"Explore\"]"
        );
        assert_eq!(
            Selector::tag("ul").with_classes(&["_a9ym"]).to_string(),
            "ul._a9ym"
        );
        assert_eq!(Selector::classes(&["a", "b"]).to_string(), ".a.b");
        assert_eq!(Selector::classes(&[]).to_string(), "*");
    }

    #[test]
    fn test_selector_matches() {
        let doc = MemoryDocument::new();
        let div = doc.append(doc.body(), "div");
        doc.set_classes(div, &["a", "b", "c"]);
        let link = doc.append(doc.body(), "a");
        doc.set_attr(link, "href", "/");

        assert!(Selector::tag("div").with_classes(&["a", "c"]).matches(&doc, &div));
        assert!(!Selector::tag("div").with_classes(&["a", "d"]).matches(&doc, &div));
        assert!(!Selector::tag("span").matches(&doc, &div));
        assert!(Selector::tag("a").with_attribute("href", "/").matches(&doc, &link));
        assert!(!Selector::tag("a").with_attribute("href", "/x").matches(&doc, &link));
    }

    #[test]
    fn test_ascend_counts_only_filtered_tags() {
        let doc = MemoryDocument::new();
        let outer = doc.append(doc.body(), "div");
        let section = doc.append(outer, "section");
        let inner = doc.append(section, "div");
        let leaf = doc.append(inner, "span");

        assert_eq!(ascend(&doc, &leaf, 1, AncestorFilter::Tag("div")), Some(inner));
        assert_eq!(ascend(&doc, &leaf, 2, AncestorFilter::Tag("div")), Some(outer));
        assert_eq!(ascend(&doc, &leaf, 2, AncestorFilter::Any), Some(section));
        assert_eq!(ascend(&doc, &leaf, 0, AncestorFilter::Any), Some(leaf));
    }

    #[test]
    fn test_ascend_short_chain() {
        let doc = MemoryDocument::new();
        let div = doc.append(doc.body(), "div");
        let leaf = doc.append(div, "span");

        assert_eq!(ascend(&doc, &leaf, 3, AncestorFilter::Tag("div")), None);
    }
}
