//! Background worker: first-run setup.

use gc_core::store::SettingsStore;
use js_sys::{Function, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;

use crate::context;
use crate::storage::{call_async, extension_api, ChromeStorage};

fn lookup(target: &JsValue, path: &[&str]) -> Result<JsValue, JsValue> {
    path.iter().try_fold(target.clone(), |current, key| {
        let next = Reflect::get(&current, &JsValue::from_str(key))?;
        if next.is_undefined() || next.is_null() {
            return Err(JsValue::from_str(&format!("missing extension API: {key}")));
        }
        Ok(next)
    })
}

/// Show the popup once so the user sees the switches. Browsers without a
/// user gesture refuse this; that is expected.
async fn open_popup(api: &JsValue) {
    let action = match lookup(api, &["action"]) {
        Ok(action) => action,
        Err(e) => {
            log::debug!("No action API: {e:?}");
            return;
        }
    };
    match call_async(&action, "openPopup", &JsValue::UNDEFINED).await {
        Ok(_) => log::debug!("Opened popup after install"),
        Err(e) => log::debug!("Could not open popup: {e:?}"),
    }
}

async fn on_installed(api: JsValue, reason: Option<String>) {
    log::info!("Installed ({})", reason.as_deref().unwrap_or("unknown"));
    if reason.as_deref() == Some("install") {
        open_popup(&api).await;
    }

    match ChromeStorage::settings_area() {
        Ok(area) => {
            if SettingsStore::new(area).seed_install_defaults().await {
                log::info!("Seeded default settings");
            }
        }
        Err(e) => log::warn!("Cannot seed settings: {e}"),
    }
}

pub(crate) fn start() -> Result<(), JsValue> {
    context::accept_content_ports()?;

    let api = extension_api().ok_or_else(|| JsValue::from_str("No extension API"))?;
    let event = lookup(&api, &["runtime", "onInstalled"])?;
    let add_listener: Function = lookup(&event, &["addListener"])?.dyn_into()?;

    let listener_api = api.clone();
    let listener = Closure::<dyn FnMut(JsValue)>::new(move |details: JsValue| {
        let reason = Reflect::get(&details, &JsValue::from_str("reason"))
            .ok()
            .and_then(|r| r.as_string());
        spawn_local(on_installed(listener_api.clone(), reason));
    });

    add_listener.call1(&event, listener.as_ref())?;
    listener.forget();
    Ok(())
}
