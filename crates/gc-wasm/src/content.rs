//! Content script: wires the page watcher to the live page.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use gc_core::store::SettingsStore;
use gc_core::Settings;
use js_sys::Reflect;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::Window;

use crate::dom::{WebDom, WebNavigator};
use crate::observers::{page_watcher, with_watcher, PageWatcher};
use crate::storage::{self, ChromeStorage};
use crate::{context, history};

thread_local! {
    static WATCHER: RefCell<Option<Rc<RefCell<PageWatcher>>>> = const { RefCell::new(None) };
}

pub(crate) fn start() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;
    if window.document().is_none() {
        return Err(JsValue::from_str("No document"));
    }

    spawn_local(async move {
        if let Err(e) = run(window).await {
            log::error!("Content script failed to start: {e:?}");
        }
    });
    Ok(())
}

pub(crate) fn stop() {
    if let Some(watcher) = WATCHER.with(|slot| slot.borrow_mut().take()) {
        with_watcher(&Rc::downgrade(&watcher), |w| w.invalidate());
    }
}

async fn load_settings() -> Settings {
    match ChromeStorage::settings_area() {
        Ok(area) => SettingsStore::new(area).load().await,
        Err(e) => {
            log::warn!("Settings unavailable, using defaults: {e}");
            Settings::default()
        }
    }
}

async fn run(window: Window) -> Result<(), JsValue> {
    let dom = WebDom::current().map_err(|e| JsValue::from_str(&e.to_string()))?;
    let settings = load_settings().await;
    let watcher = page_watcher(dom, WebNavigator::new(window.clone()), settings);
    let weak = Rc::downgrade(&watcher);

    let history_events = weak.clone();
    history::intercept(&window, move |event| {
        with_watcher(&history_events, |w| w.handle_history(event));
    })?;
    // Leave the home feed before the page has rendered it.
    watcher.borrow().guard_navigation();

    let changes = weak.clone();
    if let Err(e) = storage::on_settings_changed(move |settings| {
        with_watcher(&changes, |w| w.update_settings(settings));
    }) {
        log::warn!("Not listening for settings changes: {e}");
    }

    if let Err(e) = context::invalidate_on_disconnect(weak.clone()) {
        log::warn!("Not watching for extension reloads: {e:?}");
    }

    context::invalidate_on_pagehide(&window, weak.clone())?;

    WATCHER.with(|slot| *slot.borrow_mut() = Some(watcher));
    start_when_ready(&window, weak)
}

/// Start the watcher now, or on `DOMContentLoaded` while still loading.
fn start_when_ready(window: &Window, watcher: Weak<RefCell<PageWatcher>>) -> Result<(), JsValue> {
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("No document"))?;
    let state = Reflect::get(&document, &JsValue::from_str("readyState"))?
        .as_string()
        .unwrap_or_default();

    if state != "loading" {
        with_watcher(&watcher, |w| w.start());
        return Ok(());
    }

    let on_ready = Closure::once_into_js(move || {
        with_watcher(&watcher, |w| w.start());
    });
    document.add_event_listener_with_callback("DOMContentLoaded", on_ready.unchecked_ref())?;
    Ok(())
}
