//! History interception for single-page navigations.
//!
//! `pushState` and `replaceState` are wrapped so the original runs first and
//! the listener sees the new location afterwards. `popstate` is a plain
//! listener.

use std::rc::Rc;

use gc_core::host::HistoryEvent;
use js_sys::{Array, Function, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, History, Window};

type Listener = Rc<dyn Fn(HistoryEvent)>;

fn wrap_method(history: &History, name: &str, event: HistoryEvent, listener: Listener) -> Result<(), JsValue> {
    let original: Function = Reflect::get(history, &JsValue::from_str(name))?.dyn_into()?;
    let receiver: JsValue = history.clone().into();

    let wrapper = Closure::<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>::new(
        move |state: JsValue, unused: JsValue, url: JsValue| {
            let result = original.apply(&receiver, &Array::of3(&state, &unused, &url))?;
            listener(event);
            Ok(result)
        },
    );

    Reflect::set(history, &JsValue::from_str(name), wrapper.as_ref())?;
    wrapper.forget();
    Ok(())
}

/// Report every history change on `window` to `listener`.
pub fn intercept(window: &Window, listener: impl Fn(HistoryEvent) + 'static) -> Result<(), JsValue> {
    let listener: Listener = Rc::new(listener);
    let history = window.history()?;
    wrap_method(&history, "pushState", HistoryEvent::Push, listener.clone())?;
    wrap_method(&history, "replaceState", HistoryEvent::Replace, listener.clone())?;

    let on_pop = Closure::<dyn FnMut(Event)>::new(move |_: Event| listener(HistoryEvent::PopState));
    window.add_event_listener_with_callback("popstate", on_pop.as_ref().unchecked_ref())?;
    on_pop.forget();
    Ok(())
}
