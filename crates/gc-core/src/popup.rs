//! State behind the popup's five switches.

use crate::settings::{Flag, Settings};
use crate::store::{SettingsStore, StorageArea};

/// One switch as the popup renders it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Control {
    pub flag: Flag,
    pub label: &'static str,
    pub description: &'static str,
    pub checked: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PopupModel {
    settings: Settings,
}

impl PopupModel {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Load from the store, seeding defaults on first use.
    pub async fn load<S: StorageArea>(store: &SettingsStore<S>) -> Self {
        Self::new(store.load().await)
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn controls(&self) -> Vec<Control> {
        Flag::ALL
            .into_iter()
            .map(|flag| Control {
                flag,
                label: flag.label(),
                description: flag.description(),
                checked: self.settings.get(flag),
            })
            .collect()
    }

    /// Record a switch change. Builds a complete new record with every other
    /// flag carried over, and returns it.
    pub fn toggle(&mut self, flag: Flag, checked: bool) -> Settings {
        self.settings = self.settings.with(flag, checked);
        self.settings
    }

    /// [`toggle`](Self::toggle), then persist the full record.
    pub async fn toggle_and_save<S: StorageArea>(
        &mut self,
        store: &SettingsStore<S>,
        flag: Flag,
        checked: bool,
    ) -> Settings {
        let updated = self.toggle(flag, checked);
        store.save(&updated).await;
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStorage;

    #[test]
    fn test_controls_follow_settings() {
        let model = PopupModel::new(Settings::install_defaults());
        let controls = model.controls();

        assert_eq!(controls.len(), 5);
        assert_eq!(controls[0].label, "Disable Recommendations");
        assert!(controls[0].checked);
        assert_eq!(controls[4].flag, Flag::Comments);
        assert!(!controls[4].checked);
    }

    #[tokio::test]
    async fn test_toggle_persists_whole_record() {
        let store = SettingsStore::new(MemoryStorage::new());
        let mut model = PopupModel::load(&store).await;

        let updated = model.toggle_and_save(&store, Flag::ReelsPage, false).await;
        assert_eq!(updated, Settings::default().with(Flag::ReelsPage, false));
        assert_eq!(store.load().await, updated);

        let (_, last) = store.area().writes().pop().unwrap();
        assert_eq!(last.as_object().map(|o| o.len()), Some(5));
    }
}
