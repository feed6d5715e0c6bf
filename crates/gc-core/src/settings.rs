//! The settings record shared by the popup, background and content script.

use serde::{Deserialize, Serialize};

/// Five independent switches, one per concern.
///
/// Serialized with the camelCase names the extension has always stored.
/// Missing fields read as `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub recommendations_disabled: bool,
    pub explore_page_disabled: bool,
    pub reels_page_disabled: bool,
    pub suggested_friends_disabled: bool,
    pub comments_disabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            recommendations_disabled: true,
            explore_page_disabled: true,
            reels_page_disabled: true,
            suggested_friends_disabled: true,
            comments_disabled: true,
        }
    }
}

impl Settings {
    /// The record written on first install. Comments stay visible until the
    /// user opts in, unlike [`Settings::default`].
    pub fn install_defaults() -> Self {
        Self {
            comments_disabled: false,
            ..Self::default()
        }
    }

    pub fn get(&self, flag: Flag) -> bool {
        match flag {
            Flag::Recommendations => self.recommendations_disabled,
            Flag::ExplorePage => self.explore_page_disabled,
            Flag::ReelsPage => self.reels_page_disabled,
            Flag::SuggestedFriends => self.suggested_friends_disabled,
            Flag::Comments => self.comments_disabled,
        }
    }

    /// Copy of this record with one flag replaced.
    pub fn with(mut self, flag: Flag, value: bool) -> Self {
        let slot = match flag {
            Flag::Recommendations => &mut self.recommendations_disabled,
            Flag::ExplorePage => &mut self.explore_page_disabled,
            Flag::ReelsPage => &mut self.reels_page_disabled,
            Flag::SuggestedFriends => &mut self.suggested_friends_disabled,
            Flag::Comments => &mut self.comments_disabled,
        };
        *slot = value;
        self
    }

    /// Flags currently switched on, in [`Flag::ALL`] order.
    pub fn enabled(&self) -> impl Iterator<Item = Flag> + '_ {
        Flag::ALL.into_iter().filter(|flag| self.get(*flag))
    }
}

/// Names one field of [`Settings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    Recommendations,
    ExplorePage,
    ReelsPage,
    SuggestedFriends,
    Comments,
}

impl Flag {
    /// Popup order.
    pub const ALL: [Flag; 5] = [
        Flag::Recommendations,
        Flag::ExplorePage,
        Flag::ReelsPage,
        Flag::SuggestedFriends,
        Flag::Comments,
    ];

    /// Field name in the stored record.
    pub fn key(self) -> &'static str {
        match self {
            Flag::Recommendations => "recommendationsDisabled",
            Flag::ExplorePage => "explorePageDisabled",
            Flag::ReelsPage => "reelsPageDisabled",
            Flag::SuggestedFriends => "suggestedFriendsDisabled",
            Flag::Comments => "commentsDisabled",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Flag::ALL.into_iter().find(|flag| flag.key() == key)
    }

    pub fn label(self) -> &'static str {
        match self {
            Flag::Recommendations => "Disable Recommendations",
            Flag::ExplorePage => "Disable Explore Page",
            Flag::ReelsPage => "Disable Reels Page",
            Flag::SuggestedFriends => "Disable Suggested Friends",
            Flag::Comments => "Disable Comments",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Flag::Recommendations => "Hide recommendation posts from your feed",
            Flag::ExplorePage => "Disable access to the Explore page",
            Flag::ReelsPage => "Disable access to the Reels page",
            Flag::SuggestedFriends => "Hide suggested friends sections",
            Flag::Comments => "Hide comment sections on posts",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_disagree_only_on_comments() {
        let model = Settings::default();
        let installed = Settings::install_defaults();

        assert!(model.comments_disabled);
        assert!(!installed.comments_disabled);
        assert_eq!(installed.with(Flag::Comments, true), model);
    }

    #[test]
    fn test_wire_names() {
        let value = serde_json::to_value(Settings::install_defaults()).unwrap();
        assert_eq!(
            value,
            json!({
                "recommendationsDisabled": true,
                "explorePageDisabled": true,
                "reelsPageDisabled": true,
                "suggestedFriendsDisabled": true,
                "commentsDisabled": false,
            })
        );
        for flag in Flag::ALL {
            assert!(value.get(flag.key()).is_some());
            assert_eq!(Flag::from_key(flag.key()), Some(flag));
        }
    }

    #[test]
    fn test_missing_fields_default_to_true() {
        let settings: Settings =
            serde_json::from_value(json!({ "commentsDisabled": false })).unwrap();
        assert_eq!(settings, Settings::default().with(Flag::Comments, false));
    }

    #[test]
    fn test_with_touches_one_flag() {
        let base = Settings::default();
        for flag in Flag::ALL {
            let changed = base.with(flag, false);
            for other in Flag::ALL {
                assert_eq!(changed.get(other), other != flag);
            }
        }
    }

    #[test]
    fn test_enabled_order() {
        let settings = Settings::install_defaults().with(Flag::ExplorePage, false);
        let enabled: Vec<_> = settings.enabled().collect();
        assert_eq!(
            enabled,
            vec![Flag::Recommendations, Flag::ReelsPage, Flag::SuggestedFriends]
        );
    }
}
