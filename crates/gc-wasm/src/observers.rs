//! Mutation observers and timers for the page watcher.
//!
//! Callbacks hold a [`Weak`] reference to the watcher. An event that arrives
//! after the watcher is gone, or while it is already running, is dropped.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use gc_core::dom::DomError;
use gc_core::host::{ObserveOptions, ObserverHost};
use gc_core::registry::{Disconnect, ObserverId};
use gc_core::watcher::Watcher;
use gloo_timers::callback::Timeout;
use js_sys::{Array, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, MutationObserver, MutationObserverInit, MutationRecord};

use crate::dom::{host_error, WebDom, WebNavigator};

/// The watcher as it runs in a content script.
pub type PageWatcher = Watcher<WebDom, WebNavigator, WebObservers>;

/// Run `f` against the watcher if it is still alive and not busy.
pub(crate) fn with_watcher(watcher: &Weak<RefCell<PageWatcher>>, f: impl FnOnce(&mut PageWatcher)) {
    let Some(watcher) = watcher.upgrade() else {
        log::debug!("Watcher gone, dropping event");
        return;
    };
    match watcher.try_borrow_mut() {
        Ok(mut watcher) => f(&mut watcher),
        Err(_) => log::debug!("Watcher busy, dropping event"),
    };
}

type MutationCallback = Closure<dyn FnMut(Array, MutationObserver)>;

pub struct WebObserverHandle {
    observer: MutationObserver,
    // Dropped together with the observer.
    _callback: MutationCallback,
}

impl Disconnect for WebObserverHandle {
    fn disconnect(&mut self) {
        self.observer.disconnect();
    }
}

pub struct WebObservers {
    document: Document,
    watcher: Weak<RefCell<PageWatcher>>,
}

impl WebObservers {
    pub fn new(document: Document, watcher: Weak<RefCell<PageWatcher>>) -> Self {
        Self { document, watcher }
    }

    /// The body, or the root element before the body exists.
    fn target(&self) -> Result<Element, DomError> {
        self.document
            .body()
            .map(Element::from)
            .or_else(|| self.document.document_element())
            .ok_or(DomError::NoDocument)
    }
}

fn observer_init(options: ObserveOptions) -> Result<MutationObserverInit, DomError> {
    let init = MutationObserverInit::new();
    let set = |key: &str, value: &JsValue| {
        Reflect::set(&init, &JsValue::from_str(key), value).map_err(host_error)
    };

    set("childList", &JsValue::from_bool(options.child_list))?;
    set("subtree", &JsValue::from_bool(options.subtree))?;
    if let Some(names) = options.attribute_filter {
        let filter: Array = names.iter().map(|name| JsValue::from_str(name)).collect();
        set("attributes", &JsValue::TRUE)?;
        set("attributeFilter", &filter)?;
    }
    Ok(init)
}

/// Elements a batch of records touched: added elements, plus the target of
/// attribute changes.
fn touched_elements(records: &Array) -> Vec<Element> {
    let mut touched = Vec::new();
    for record in records.iter() {
        let Ok(record) = record.dyn_into::<MutationRecord>() else {
            continue;
        };
        if record.type_() == "attributes" {
            if let Some(target) = record.target().and_then(|t| t.dyn_into::<Element>().ok()) {
                touched.push(target);
            }
            continue;
        }
        let added = record.added_nodes();
        touched.extend(
            (0..added.length())
                .filter_map(|i| added.item(i))
                .filter_map(|node| node.dyn_into::<Element>().ok()),
        );
    }
    touched
}

impl ObserverHost for WebObservers {
    type Handle = WebObserverHandle;

    fn observe(&self, id: ObserverId, options: ObserveOptions) -> Result<WebObserverHandle, DomError> {
        let watcher = self.watcher.clone();
        let callback: MutationCallback = Closure::new(move |records: Array, _: MutationObserver| {
            let touched = touched_elements(&records);
            with_watcher(&watcher, |w| w.handle_mutations(id, &touched));
        });

        let observer = MutationObserver::new(callback.as_ref().unchecked_ref()).map_err(host_error)?;
        observer
            .observe_with_options(&*self.target()?, &observer_init(options)?)
            .map_err(host_error)?;

        Ok(WebObserverHandle {
            observer,
            _callback: callback,
        })
    }

    fn schedule_timeout(&self, id: ObserverId, after: Duration) -> Result<(), DomError> {
        let millis = u32::try_from(after.as_millis())
            .map_err(|_| DomError::Host(format!("timeout too long: {after:?}")))?;
        let watcher = self.watcher.clone();
        Timeout::new(millis, move || {
            with_watcher(&watcher, |w| w.handle_timeout(id));
        })
        .forget();
        Ok(())
    }
}

/// Build a watcher whose observers call back into itself.
pub fn page_watcher(
    dom: WebDom,
    navigator: WebNavigator,
    settings: gc_core::Settings,
) -> Rc<RefCell<PageWatcher>> {
    let document = dom.document().clone();
    Rc::new_cyclic(|weak| {
        RefCell::new(Watcher::new(
            dom,
            navigator,
            WebObservers::new(document, weak.clone()),
            settings,
        ))
    })
}
