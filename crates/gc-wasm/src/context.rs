//! Extension-context lifetime for the content script.
//!
//! The content script keeps a `runtime.connect()` port open to the
//! background. The port drops when the extension is reloaded, updated or
//! disabled, and also when the background worker is merely suspended. Only in
//! the first case does `runtime.id` go away; then the watcher is invalidated.
//! Otherwise the port is reopened after a short delay.

use std::cell::RefCell;
use std::rc::Weak;

use gc_core::config::{CONTEXT_PORT, CONTEXT_RECONNECT_DELAY};
use gloo_timers::callback::Timeout;
use js_sys::{Function, Object, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, Window};

use crate::observers::{with_watcher, PageWatcher};
use crate::storage::extension_api;

fn runtime() -> Option<JsValue> {
    let runtime = Reflect::get(&extension_api()?, &JsValue::from_str("runtime")).ok()?;
    (!runtime.is_undefined() && !runtime.is_null()).then_some(runtime)
}

/// Whether this script still belongs to a live extension.
pub fn context_alive() -> bool {
    runtime()
        .and_then(|runtime| Reflect::get(&runtime, &JsValue::from_str("id")).ok())
        .is_some_and(|id| id.as_string().is_some_and(|id| !id.is_empty()))
}

fn add_listener(target: &JsValue, event: &str, listener: &JsValue) -> Result<(), JsValue> {
    let event = Reflect::get(target, &JsValue::from_str(event))?;
    let add: Function = Reflect::get(&event, &JsValue::from_str("addListener"))?.dyn_into()?;
    add.call1(&event, listener)?;
    Ok(())
}

fn on_port_disconnect(watcher: Weak<RefCell<PageWatcher>>) {
    if watcher.strong_count() == 0 {
        return;
    }
    if !context_alive() {
        log::info!("Extension context gone, stopping");
        with_watcher(&watcher, |w| w.invalidate());
        return;
    }

    log::debug!("Background port dropped, reconnecting");
    let millis = u32::try_from(CONTEXT_RECONNECT_DELAY.as_millis()).unwrap_or(u32::MAX);
    Timeout::new(millis, move || {
        if let Err(e) = invalidate_on_disconnect(watcher) {
            log::warn!("Could not reopen background port: {e:?}");
        }
    })
    .forget();
}

/// Invalidate `watcher` once the extension context goes away.
pub fn invalidate_on_disconnect(watcher: Weak<RefCell<PageWatcher>>) -> Result<(), JsValue> {
    let runtime = runtime().ok_or_else(|| JsValue::from_str("No runtime API"))?;
    let connect: Function = Reflect::get(&runtime, &JsValue::from_str("connect"))?.dyn_into()?;

    let options = Object::new();
    Reflect::set(&options, &JsValue::from_str("name"), &JsValue::from_str(CONTEXT_PORT))?;
    let port = connect.call1(&runtime, &options)?;

    let listener = Closure::once_into_js(move || on_port_disconnect(watcher));
    add_listener(&port, "onDisconnect", &listener)
}

/// Invalidate `watcher` when the page is unloaded. A page kept in the
/// back/forward cache (`persisted`) comes back with its observers.
pub fn invalidate_on_pagehide(window: &Window, watcher: Weak<RefCell<PageWatcher>>) -> Result<(), JsValue> {
    let on_hide = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
        let persisted = Reflect::get(&event, &JsValue::from_str("persisted"))
            .ok()
            .and_then(|p| p.as_bool())
            .unwrap_or(false);
        if !persisted {
            with_watcher(&watcher, |w| w.invalidate());
        }
    });
    window.add_event_listener_with_callback("pagehide", on_hide.as_ref().unchecked_ref())?;
    on_hide.forget();
    Ok(())
}

/// Background side: accept content-script ports so they stay open.
pub fn accept_content_ports() -> Result<(), JsValue> {
    let runtime = runtime().ok_or_else(|| JsValue::from_str("No runtime API"))?;
    let listener = Closure::<dyn FnMut(JsValue)>::new(|port: JsValue| {
        let name = Reflect::get(&port, &JsValue::from_str("name"))
            .ok()
            .and_then(|name| name.as_string());
        if name.as_deref() == Some(CONTEXT_PORT) {
            log::trace!("Content script connected");
        }
    });
    add_listener(&runtime, "onConnect", listener.as_ref())?;
    listener.forget();
    Ok(())
}
