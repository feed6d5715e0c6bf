//! Page-level host services besides the document: location, history and
//! mutation observers.

use std::time::Duration;

use crate::dom::DomError;
use crate::registry::{Disconnect, ObserverId};
use crate::url::{extract_path, extract_query, is_root_path};

// =============================================================================
// Location
// =============================================================================

/// Snapshot of `window.location`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub href: String,
    pub pathname: String,
    pub search: String,
}

impl Location {
    /// Build a location from an absolute href.
    pub fn from_href(href: &str) -> Self {
        Self {
            href: href.to_string(),
            pathname: extract_path(href).to_string(),
            search: extract_query(href).to_string(),
        }
    }

    pub fn is_root(&self) -> bool {
        is_root_path(&self.pathname)
    }
}

/// The page's current location and the two ways this extension moves it.
pub trait Navigator {
    fn location(&self) -> Location;

    /// Navigate to `url`, replacing the current history entry.
    fn replace(&self, url: &str) -> Result<(), DomError>;

    /// Navigate to `url`, adding a history entry.
    fn assign(&self, url: &str) -> Result<(), DomError>;
}

/// Client-side navigation events observed on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryEvent {
    /// `history.pushState` was called.
    Push,
    /// `history.replaceState` was called.
    Replace,
    /// Back/forward navigation (`popstate`).
    PopState,
}

// =============================================================================
// Observers
// =============================================================================

/// What a mutation observer listens for. Always observes the document body
/// (or the root element before the body exists).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserveOptions {
    pub child_list: bool,
    pub subtree: bool,
    /// When set, attribute changes to these names are reported as well.
    pub attribute_filter: Option<&'static [&'static str]>,
}

impl ObserveOptions {
    /// Child-list changes anywhere in the subtree.
    pub const fn subtree() -> Self {
        Self {
            child_list: true,
            subtree: true,
            attribute_filter: None,
        }
    }

    pub const fn with_attributes(self, names: &'static [&'static str]) -> Self {
        Self {
            attribute_filter: Some(names),
            ..self
        }
    }
}

/// Starts mutation observers and one-shot timers on behalf of the watcher.
///
/// The host reports back by calling
/// [`Watcher::handle_mutations`](crate::watcher::Watcher::handle_mutations)
/// and [`Watcher::handle_timeout`](crate::watcher::Watcher::handle_timeout)
/// with the same id.
pub trait ObserverHost {
    type Handle: Disconnect;

    fn observe(&self, id: ObserverId, options: ObserveOptions) -> Result<Self::Handle, DomError>;

    fn schedule_timeout(&self, id: ObserverId, after: Duration) -> Result<(), DomError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_from_href() {
        let loc = Location::from_href("https://www.instagram.com/?variant=following");
        assert_eq!(loc.pathname, "/");
        assert_eq!(loc.search, "?variant=following");
        assert!(loc.is_root());

        let loc = Location::from_href("https://www.instagram.com/explore/");
        assert_eq!(loc.pathname, "/explore/");
        assert_eq!(loc.search, "");
        assert!(!loc.is_root());
    }
}
