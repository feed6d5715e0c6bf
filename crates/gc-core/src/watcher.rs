//! The content-script state machine.
//!
//! The host feeds it events (page ready, mutation batches, timer expiry,
//! history changes, settings changes, teardown) and it answers by running
//! concerns and starting or releasing observers. It never blocks and keeps no
//! state beyond the settings, the processed-link set and the observers it owns.

use crate::concerns::{
    redirect_home_links, remove_comment_icons, remove_explore_link, remove_feed_suggestions,
    remove_popup_comments, remove_profile_suggestions, remove_reels_link, remove_static_comments,
    Concern, ProcessedLinks, ScanOutcome,
};
use crate::config::BOUNDED_WAIT;
use crate::dom::Dom;
use crate::host::{HistoryEvent, Navigator, ObserveOptions, ObserverHost};
use crate::navigation;
use crate::registry::{ObserverId, ObserverRegistry};
use crate::settings::{Flag, Settings};

/// What an observer was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObserverRole {
    /// Catch-all: reruns whichever concerns the added nodes trigger.
    Dispatch,
    /// Notices single-page navigations and looks for the comment overlay.
    UrlChange,
    /// Rewrites home links as the feed scrolls.
    HomeLinks,
    /// Removes comment buttons as the home feed scrolls.
    CommentIcons,
    /// Waits for the profile suggestions block, then stops.
    SuggestedFriends,
    /// Waits for the comment overlay, then stops.
    PopupComments,
}

impl ObserverRole {
    /// Bounded roles stop on their first match or after [`BOUNDED_WAIT`].
    pub fn is_bounded(self) -> bool {
        matches!(self, ObserverRole::SuggestedFriends | ObserverRole::PopupComments)
    }

    pub fn options(self) -> ObserveOptions {
        match self {
            ObserverRole::HomeLinks => ObserveOptions::subtree().with_attributes(&["href"]),
            _ => ObserveOptions::subtree(),
        }
    }
}

pub struct Watcher<D: Dom, N, O: ObserverHost> {
    dom: D,
    navigator: N,
    observers: O,
    settings: Settings,
    processed: ProcessedLinks<D::Node>,
    registry: ObserverRegistry<ObserverRole, O::Handle>,
    last_href: String,
    started: bool,
    invalidated: bool,
}

impl<D: Dom, N: Navigator, O: ObserverHost> Watcher<D, N, O> {
    pub fn new(dom: D, navigator: N, observers: O, settings: Settings) -> Self {
        let last_href = navigator.location().href;
        Self {
            dom,
            navigator,
            observers,
            settings,
            processed: ProcessedLinks::new(),
            registry: ObserverRegistry::new(),
            last_href,
            started: false,
            invalidated: false,
        }
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn observers(&self) -> &O {
        &self.observers
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn processed_links(&self) -> &ProcessedLinks<D::Node> {
        &self.processed
    }

    /// Roles of the observers currently owned, in start order.
    pub fn active_roles(&self) -> Vec<ObserverRole> {
        self.registry
            .ids()
            .filter_map(|id| self.registry.tag(id).copied())
            .collect()
    }

    pub fn observer_id(&self, role: ObserverRole) -> Option<ObserverId> {
        self.registry
            .ids()
            .find(|id| self.registry.tag(*id) == Some(&role))
    }

    pub fn observer_count(&self) -> usize {
        self.registry.len()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Page is ready: redirect off the home feed if needed, run every enabled
    /// concern once, and start observing.
    pub fn start(&mut self) {
        if self.started || self.invalidated {
            return;
        }
        self.started = true;
        log::debug!("Starting watcher with {:?}", self.settings);

        self.guard_navigation();
        self.apply_all();

        self.start_observer(ObserverRole::Dispatch);
        self.start_observer(ObserverRole::UrlChange);
        self.ensure_continuous_observers();
        self.wait_for_profile_suggestions();
    }

    /// The content script's context is going away: stop every observer and
    /// forget processed links. Final; later events are ignored.
    pub fn invalidate(&mut self) {
        log::debug!("Context invalidated, disconnecting {} observers", self.registry.len());
        self.registry.disconnect_all();
        self.processed.clear();
        self.started = false;
        self.invalidated = true;
    }

    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    /// Replace the in-memory settings and apply them right away.
    pub fn update_settings(&mut self, settings: Settings) {
        if settings == self.settings {
            return;
        }
        log::debug!("Settings changed to {settings:?}");
        self.settings = settings;
        if self.started {
            self.apply_all();
            self.ensure_continuous_observers();
        }
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// A mutation batch arrived for observer `id`. `added` holds the element
    /// nodes the batch added (or whose watched attributes changed).
    pub fn handle_mutations(&mut self, id: ObserverId, added: &[D::Node]) {
        let Some(role) = self.registry.tag(id).copied() else {
            log::trace!("Mutations for released observer {id:?}");
            return;
        };

        match role {
            ObserverRole::Dispatch => self.dispatch(added),
            ObserverRole::UrlChange => {
                let href = self.navigator.location().href;
                if href != self.last_href {
                    log::debug!("Navigated to {href}");
                    self.last_href = href;
                    // Client-side navigation onto the home feed.
                    self.ensure_continuous_observers();
                    self.wait_for_popup_comments();
                }
            }
            ObserverRole::HomeLinks => {
                self.apply(Concern::HomeRedirect);
            }
            ObserverRole::CommentIcons => {
                if self.settings.comments_disabled {
                    let location = self.navigator.location();
                    remove_comment_icons(&self.dom, &location);
                }
            }
            ObserverRole::SuggestedFriends => {
                if self.apply(Concern::ProfileSuggestions).found {
                    self.registry.release(id);
                }
            }
            ObserverRole::PopupComments => {
                if self.scan_popup_comments().found {
                    self.registry.release(id);
                }
            }
        }
    }

    /// A bounded wait ran out.
    pub fn handle_timeout(&mut self, id: ObserverId) {
        match self.registry.tag(id).copied() {
            Some(role) if role.is_bounded() => {
                log::debug!("Gave up waiting for {role:?}");
                self.registry.release(id);
            }
            _ => {}
        }
    }

    /// Leave the home feed for the following feed if needed. Safe to call
    /// before the document has finished loading.
    pub fn guard_navigation(&self) -> bool {
        if self.invalidated {
            return false;
        }
        navigation::enforce_following_feed(&self.settings, &self.navigator)
    }

    /// The page pushed, replaced or popped a history entry.
    pub fn handle_history(&mut self, event: HistoryEvent) {
        if self.invalidated {
            log::trace!("Ignoring {event:?} after invalidation");
            return;
        }
        navigation::on_history_event(&self.settings, &self.navigator, event);
    }

    // =========================================================================
    // Concerns
    // =========================================================================

    /// Run one concern now if its flag is on.
    pub fn apply(&mut self, concern: Concern) -> ScanOutcome {
        if !self.settings.get(concern.flag()) {
            return ScanOutcome::default();
        }

        match concern {
            Concern::ExploreLink => remove_explore_link(&self.dom),
            Concern::ReelsLink => remove_reels_link(&self.dom),
            Concern::FeedSuggestions => remove_feed_suggestions(&self.dom),
            Concern::HomeRedirect => redirect_home_links(&self.dom, &mut self.processed),
            Concern::ProfileSuggestions => remove_profile_suggestions(&self.dom),
            Concern::Comments => {
                let location = self.navigator.location();
                remove_static_comments(&self.dom)
                    .merge(remove_popup_comments(&self.dom))
                    .merge(remove_comment_icons(&self.dom, &location))
            }
        }
    }

    pub fn apply_all(&mut self) {
        for concern in Concern::ALL {
            self.apply(concern);
        }
    }

    /// Rerun each enabled concern at most once if any added node triggers it.
    fn dispatch(&mut self, added: &[D::Node]) {
        let triggered: Vec<Concern> = Concern::ALL
            .into_iter()
            .filter(|concern| self.settings.get(concern.flag()))
            .filter(|concern| added.iter().any(|node| concern.is_triggered_by(&self.dom, node)))
            .collect();

        for concern in triggered {
            log::trace!("Mutation batch triggered {concern:?}");
            self.apply(concern);
        }
    }

    fn scan_popup_comments(&self) -> ScanOutcome {
        if !self.settings.comments_disabled {
            return ScanOutcome::default();
        }
        remove_popup_comments(&self.dom)
    }

    /// Remove profile suggestions now, or watch for them for a while.
    pub fn wait_for_profile_suggestions(&mut self) {
        if !self.settings.suggested_friends_disabled {
            return;
        }
        if self.apply(Concern::ProfileSuggestions).found {
            return;
        }
        self.start_bounded(ObserverRole::SuggestedFriends);
    }

    /// Remove overlay comments now, or watch for them for a while.
    pub fn wait_for_popup_comments(&mut self) {
        if !self.settings.comments_disabled {
            return;
        }
        if self.scan_popup_comments().found {
            return;
        }
        self.start_bounded(ObserverRole::PopupComments);
    }

    // =========================================================================
    // Observers
    // =========================================================================

    fn ensure_continuous_observers(&mut self) {
        if self.settings.get(Flag::Recommendations) {
            self.start_unique(ObserverRole::HomeLinks);
        }
        if self.settings.get(Flag::Comments) && self.navigator.location().is_root() {
            self.start_unique(ObserverRole::CommentIcons);
        }
    }

    fn start_unique(&mut self, role: ObserverRole) -> Option<ObserverId> {
        if self.registry.contains_tag(&role) {
            return None;
        }
        self.start_observer(role)
    }

    fn start_bounded(&mut self, role: ObserverRole) {
        let Some(id) = self.start_unique(role) else {
            return;
        };
        if let Err(e) = self.observers.schedule_timeout(id, BOUNDED_WAIT) {
            log::warn!("Failed to schedule timeout for {role:?}: {e}");
            self.registry.release(id);
        }
    }

    fn start_observer(&mut self, role: ObserverRole) -> Option<ObserverId> {
        let id = self.registry.allocate();
        match self.observers.observe(id, role.options()) {
            Ok(handle) => {
                self.registry.insert(id, role, handle);
                Some(id)
            }
            Err(e) => {
                log::warn!("Failed to start {role:?} observer: {e}");
                None
            }
        }
    }
}
