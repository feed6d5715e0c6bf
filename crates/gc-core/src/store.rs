//! Settings persistence over a key-value storage area.
//!
//! Storage is best-effort: nothing here returns an error to the caller. A
//! failed read yields defaults and a failed write is logged and dropped, so
//! the worst case is a toggle that does not survive the next page load.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use serde_json::Value;

use crate::config::{SETTINGS_AREA, SETTINGS_KEY};
use crate::settings::Settings;

/// Error type for storage access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("storage API unavailable")]
    Unavailable,
    #[error("storage operation failed: {0}")]
    Backend(String),
    #[error("malformed settings record: {0}")]
    Malformed(String),
}

/// A JSON key-value store such as `chrome.storage.local`.
#[allow(async_fn_in_trait)]
pub trait StorageArea {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
}

fn parse_record(value: Value) -> Result<Settings, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Malformed(e.to_string()))
}

// =============================================================================
// Settings Store
// =============================================================================

pub struct SettingsStore<S> {
    area: S,
}

impl<S: StorageArea> SettingsStore<S> {
    pub fn new(area: S) -> Self {
        Self { area }
    }

    pub fn area(&self) -> &S {
        &self.area
    }

    /// Read the stored record, seeding [`Settings::default`] when there is
    /// none so that every later load sees the same values.
    pub async fn load(&self) -> Settings {
        match self.area.get(SETTINGS_KEY).await {
            Ok(Some(value)) if !value.is_null() => match parse_record(value) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("Ignoring stored settings: {e}");
                    Settings::default()
                }
            },
            Ok(_) => {
                let defaults = Settings::default();
                log::debug!("No stored settings, seeding defaults");
                self.save(&defaults).await;
                defaults
            }
            Err(e) => {
                log::warn!("Failed to read settings: {e}");
                Settings::default()
            }
        }
    }

    /// Persist `settings`. Failures are logged, not returned.
    pub async fn save(&self, settings: &Settings) {
        if let Err(e) = self.try_save(settings).await {
            log::warn!("Failed to save settings: {e}");
        }
    }

    async fn try_save(&self, settings: &Settings) -> Result<(), StoreError> {
        let value =
            serde_json::to_value(settings).map_err(|e| StoreError::Malformed(e.to_string()))?;
        self.area.set(SETTINGS_KEY, value).await
    }

    /// First-install seeding: write [`Settings::install_defaults`] unless a
    /// record already exists. Returns whether a record was written.
    pub async fn seed_install_defaults(&self) -> bool {
        match self.area.get(SETTINGS_KEY).await {
            Ok(Some(value)) if !value.is_null() => false,
            Ok(_) => match self.try_save(&Settings::install_defaults()).await {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Failed to seed install defaults: {e}");
                    false
                }
            },
            Err(e) => {
                log::warn!("Failed to read settings during install: {e}");
                false
            }
        }
    }
}

// =============================================================================
// Change Notifications
// =============================================================================

/// Parsing for `storage.onChanged` events.
pub struct SettingsChange;

impl SettingsChange {
    /// Extract the new settings from an `onChanged` payload.
    ///
    /// `changes` is the event's first argument, keyed by storage key with
    /// `{ oldValue, newValue }` entries. Returns `None` for other areas, other
    /// keys, a removed record, or a record that does not parse.
    pub fn parse(area_name: &str, changes: &Value) -> Option<Settings> {
        if area_name != SETTINGS_AREA {
            return None;
        }
        let new_value = changes.get(SETTINGS_KEY)?.get("newValue")?;
        if new_value.is_null() {
            return None;
        }
        match parse_record(new_value.clone()) {
            Ok(settings) => Some(settings),
            Err(e) => {
                log::warn!("Ignoring settings change: {e}");
                None
            }
        }
    }
}

// =============================================================================
// In-memory Area
// =============================================================================

/// A [`StorageArea`] backed by a map. Records writes and can be made to fail.
#[derive(Default)]
pub struct MemoryStorage {
    values: RefCell<HashMap<String, Value>>,
    writes: RefCell<Vec<(String, Value)>>,
    failing: Cell<bool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: Value) -> Self {
        let storage = Self::new();
        storage.values.borrow_mut().insert(key.to_string(), value);
        storage
    }

    pub fn value(&self, key: &str) -> Option<Value> {
        self.values.borrow().get(key).cloned()
    }

    /// Every successful `set`, oldest first.
    pub fn writes(&self) -> Vec<(String, Value)> {
        self.writes.borrow().clone()
    }

    /// Make every subsequent call fail with [`StoreError::Backend`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }
}

impl StorageArea for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        if self.failing.get() {
            return Err(StoreError::Backend("get rejected".to_string()));
        }
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        if self.failing.get() {
            return Err(StoreError::Backend("set rejected".to_string()));
        }
        self.values.borrow_mut().insert(key.to_string(), value.clone());
        self.writes.borrow_mut().push((key.to_string(), value));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Flag;
    use serde_json::json;

    #[tokio::test]
    async fn test_load_seeds_defaults_once() {
        let store = SettingsStore::new(MemoryStorage::new());

        let first = store.load().await;
        let second = store.load().await;

        assert_eq!(first, Settings::default());
        assert_eq!(second, first);
        assert_eq!(store.area().writes().len(), 1);
        assert_eq!(
            store.area().value(SETTINGS_KEY),
            Some(serde_json::to_value(Settings::default()).unwrap())
        );
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips_every_flag() {
        let store = SettingsStore::new(MemoryStorage::new());
        let mut current = store.load().await;

        for flag in Flag::ALL {
            current = current.with(flag, !current.get(flag));
            store.save(&current).await;
            assert_eq!(store.load().await, current);
        }
    }

    #[tokio::test]
    async fn test_load_failure_falls_back_without_writing() {
        let storage = MemoryStorage::new();
        storage.set_failing(true);
        let store = SettingsStore::new(storage);

        assert_eq!(store.load().await, Settings::default());
        assert!(store.area().writes().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_record_is_not_overwritten() {
        let store = SettingsStore::new(MemoryStorage::with_value(SETTINGS_KEY, json!("garbage")));

        assert_eq!(store.load().await, Settings::default());
        assert!(store.area().writes().is_empty());
    }

    #[tokio::test]
    async fn test_save_failure_is_swallowed() {
        let storage = MemoryStorage::new();
        storage.set_failing(true);
        let store = SettingsStore::new(storage);

        store.save(&Settings::install_defaults()).await;
        store.area().set_failing(false);
        assert_eq!(store.area().value(SETTINGS_KEY), None);
    }

    #[tokio::test]
    async fn test_seed_install_defaults() {
        let store = SettingsStore::new(MemoryStorage::new());

        assert!(store.seed_install_defaults().await);
        assert!(!store.seed_install_defaults().await);
        assert_eq!(store.load().await, Settings::install_defaults());
    }

    #[tokio::test]
    async fn test_seed_keeps_existing_record() {
        let existing = Settings::default().with(Flag::ReelsPage, false);
        let store = SettingsStore::new(MemoryStorage::with_value(
            SETTINGS_KEY,
            serde_json::to_value(existing).unwrap(),
        ));

        assert!(!store.seed_install_defaults().await);
        assert_eq!(store.load().await, existing);
    }

    #[test]
    fn test_change_parse() {
        let changes = json!({
            "settings": {
                "oldValue": { "commentsDisabled": true },
                "newValue": { "commentsDisabled": false, "reelsPageDisabled": false },
            }
        });

        let parsed = SettingsChange::parse("local", &changes).unwrap();
        assert!(!parsed.comments_disabled);
        assert!(!parsed.reels_page_disabled);
        assert!(parsed.explore_page_disabled);

        assert_eq!(SettingsChange::parse("sync", &changes), None);
        assert_eq!(SettingsChange::parse("local", &json!({ "other": {} })), None);
        assert_eq!(
            SettingsChange::parse("local", &json!({ "settings": { "oldValue": {} } })),
            None
        );
    }
}
