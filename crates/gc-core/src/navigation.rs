//! Keeps the user off the recommendation-driven home feed.
//!
//! Link rewriting covers clicks; this covers everything else that can land on
//! `/`: the initial load, `pushState`/`replaceState` from the page's router,
//! and back/forward.

use crate::config::{FEED_VARIANT_PARAM, FOLLOWING_PATH};
use crate::host::{HistoryEvent, Location, Navigator};
use crate::settings::Settings;
use crate::url::has_query_param;

/// Whether `location` is the undecorated home feed.
pub fn needs_following_redirect(location: &Location) -> bool {
    let (name, value) = FEED_VARIANT_PARAM;
    location.is_root() && !has_query_param(&location.search, name, value)
}

/// Replace the current entry with the following feed if the page sits on the
/// home feed and recommendations are disabled. Returns whether it redirected.
pub fn enforce_following_feed<N: Navigator + ?Sized>(settings: &Settings, navigator: &N) -> bool {
    if !settings.recommendations_disabled {
        return false;
    }

    let location = navigator.location();
    if !needs_following_redirect(&location) {
        return false;
    }

    log::debug!("Redirecting {} to the following feed", location.href);
    match navigator.replace(FOLLOWING_PATH) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Failed to redirect to the following feed: {e}");
            false
        }
    }
}

/// Run the guard for a history event.
pub fn on_history_event<N: Navigator + ?Sized>(
    settings: &Settings,
    navigator: &N,
    event: HistoryEvent,
) -> bool {
    log::trace!("History event {event:?}");
    enforce_following_feed(settings, navigator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryNavigator;
    use crate::settings::Flag;

    #[test]
    fn test_needs_following_redirect() {
        let check = |href: &str| needs_following_redirect(&Location::from_href(href));

        assert!(check("https://www.instagram.com/"));
        assert!(check("https://www.instagram.com/?variant=home"));
        assert!(!check("https://www.instagram.com/?variant=following"));
        assert!(!check("https://www.instagram.com/?a=1&variant=following"));
        assert!(!check("https://www.instagram.com/explore/"));
    }

    #[test]
    fn test_lookalike_variant_still_redirects() {
        let check = |href: &str| needs_following_redirect(&Location::from_href(href));

        assert!(check("https://www.instagram.com/?xvariant=followingx"));
        assert!(check("https://www.instagram.com/?variant=following2"));
        assert!(check("https://www.instagram.com/?variant"));
    }

    #[test]
    fn test_enforce_replaces_entry() {
        let nav = MemoryNavigator::new("https://www.instagram.com/");

        assert!(enforce_following_feed(&Settings::default(), &nav));
        assert_eq!(nav.location().href, "https://www.instagram.com/?variant=following");
        assert_eq!(nav.history_len(), 1);
        assert_eq!(nav.replace_count(), 1);

        // Already decorated: nothing more to do.
        assert!(!enforce_following_feed(&Settings::default(), &nav));
        assert_eq!(nav.replace_count(), 1);
    }

    #[test]
    fn test_enforce_respects_flag() {
        let nav = MemoryNavigator::new("https://www.instagram.com/");
        let settings = Settings::default().with(Flag::Recommendations, false);

        assert!(!enforce_following_feed(&settings, &nav));
        assert_eq!(nav.location().href, "https://www.instagram.com/");
    }
}
