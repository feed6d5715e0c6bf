//! `chrome.storage` access through `js-sys` reflection.
//!
//! Works with both the `chrome` and the promise-based `browser` namespace.
//! Values cross the boundary as JSON text.

use gc_core::config::SETTINGS_AREA;
use gc_core::settings::Settings;
use gc_core::store::{SettingsChange, StorageArea, StoreError};
use js_sys::{Array, Function, Object, Promise, Reflect, JSON};
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

fn backend_error(value: JsValue) -> StoreError {
    match value.as_string() {
        Some(message) => StoreError::Backend(message),
        None => StoreError::Backend(format!("{value:?}")),
    }
}

fn get_defined(target: &JsValue, key: &str) -> Option<JsValue> {
    Reflect::get(target, &JsValue::from_str(key))
        .ok()
        .filter(|value| !value.is_undefined() && !value.is_null())
}

/// `browser` or `chrome`, whichever the runtime provides.
pub(crate) fn extension_api() -> Option<JsValue> {
    let global = js_sys::global();
    get_defined(&global, "browser").or_else(|| get_defined(&global, "chrome"))
}

fn storage_namespace() -> Result<JsValue, StoreError> {
    extension_api()
        .and_then(|api| get_defined(&api, "storage"))
        .ok_or(StoreError::Unavailable)
}

/// Call `target[method](arg)` and await the returned promise.
pub(crate) async fn call_async(target: &JsValue, method: &str, arg: &JsValue) -> Result<JsValue, JsValue> {
    let function: Function = Reflect::get(target, &JsValue::from_str(method))?.dyn_into()?;
    let promise: Promise = function.call1(target, arg)?.dyn_into()?;
    JsFuture::from(promise).await
}

fn to_json(value: &JsValue) -> Result<Value, StoreError> {
    let text = JSON::stringify(value)
        .map_err(backend_error)?
        .as_string()
        .ok_or_else(|| StoreError::Malformed("value is not serializable".to_string()))?;
    serde_json::from_str(&text).map_err(|e| StoreError::Malformed(e.to_string()))
}

fn from_json(value: &Value) -> Result<JsValue, StoreError> {
    JSON::parse(&value.to_string()).map_err(backend_error)
}

// =============================================================================
// Storage area
// =============================================================================

/// One `chrome.storage` area.
#[derive(Debug, Clone)]
pub struct ChromeStorage {
    area: JsValue,
}

impl ChromeStorage {
    /// The area settings are kept in (`local`).
    pub fn settings_area() -> Result<Self, StoreError> {
        Self::named(SETTINGS_AREA)
    }

    pub fn named(name: &str) -> Result<Self, StoreError> {
        let area = get_defined(&storage_namespace()?, name).ok_or(StoreError::Unavailable)?;
        Ok(Self { area })
    }
}

impl StorageArea for ChromeStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let keys = Array::of1(&JsValue::from_str(key));
        let items = call_async(&self.area, "get", &keys)
            .await
            .map_err(backend_error)?;

        match get_defined(&items, key) {
            Some(value) => to_json(&value).map(Some),
            // A stored `null` reads back as absent, same as a missing key.
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let items = Object::new();
        Reflect::set(&items, &JsValue::from_str(key), &from_json(&value)?).map_err(backend_error)?;
        call_async(&self.area, "set", &items)
            .await
            .map_err(backend_error)?;
        Ok(())
    }
}

// =============================================================================
// Change notifications
// =============================================================================

/// Call `handler` with the new record whenever another context saves
/// settings.
pub fn on_settings_changed(mut handler: impl FnMut(Settings) + 'static) -> Result<(), StoreError> {
    let on_changed = get_defined(&storage_namespace()?, "onChanged").ok_or(StoreError::Unavailable)?;
    let add_listener: Function = Reflect::get(&on_changed, &JsValue::from_str("addListener"))
        .map_err(backend_error)?
        .dyn_into()
        .map_err(backend_error)?;

    let listener = Closure::<dyn FnMut(JsValue, JsValue)>::new(move |changes: JsValue, area: JsValue| {
        let area = area.as_string().unwrap_or_default();
        match to_json(&changes) {
            Ok(changes) => {
                if let Some(settings) = SettingsChange::parse(&area, &changes) {
                    handler(settings);
                }
            }
            Err(e) => log::warn!("Unreadable storage change: {e}"),
        }
    });

    add_listener
        .call1(&on_changed, listener.as_ref())
        .map_err(backend_error)?;
    listener.forget();
    Ok(())
}
