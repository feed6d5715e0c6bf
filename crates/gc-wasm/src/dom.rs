//! `web-sys` implementations of the document and navigation traits.

use gc_core::dom::{Dom, DomError, Selector};
use gc_core::host::{Location, Navigator};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Event, Window};

/// Convert a thrown JS value into a [`DomError`].
pub(crate) fn host_error(value: JsValue) -> DomError {
    match value.as_string() {
        Some(message) => DomError::Host(message),
        None => DomError::Host(format!("{value:?}")),
    }
}

// =============================================================================
// Document
// =============================================================================

#[derive(Debug, Clone)]
pub struct WebDom {
    document: Document,
}

impl WebDom {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    /// The current window's document.
    pub fn current() -> Result<Self, DomError> {
        web_sys::window()
            .and_then(|window| window.document())
            .map(Self::new)
            .ok_or(DomError::NoDocument)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }
}

impl Dom for WebDom {
    type Node = Element;

    fn query_all(&self, selector: &Selector) -> Vec<Element> {
        let css = selector.to_string();
        let list = match self.document.query_selector_all(&css) {
            Ok(list) => list,
            Err(e) => {
                log::warn!("querySelectorAll({css}) failed: {e:?}");
                return Vec::new();
            }
        };

        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn query_first(&self, selector: &Selector) -> Option<Element> {
        let css = selector.to_string();
        self.document.query_selector(&css).ok().flatten()
    }

    fn parent(&self, node: &Element) -> Option<Element> {
        node.parent_element()
    }

    fn children(&self, node: &Element) -> Vec<Element> {
        let children = node.children();
        (0..children.length()).filter_map(|i| children.item(i)).collect()
    }

    fn tag_name(&self, node: &Element) -> String {
        node.local_name().to_ascii_lowercase()
    }

    fn class_list(&self, node: &Element) -> Vec<String> {
        // classList works for SVG elements, className does not.
        let tokens = node.class_list();
        (0..tokens.length()).filter_map(|i| tokens.item(i)).collect()
    }

    fn attribute(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn set_attribute(&self, node: &Element, name: &str, value: &str) -> Result<(), DomError> {
        node.set_attribute(name, value).map_err(host_error)
    }

    fn text_content(&self, node: &Element) -> Option<String> {
        node.text_content()
    }

    fn is_connected(&self, node: &Element) -> bool {
        node.is_connected()
    }

    fn contains_match(&self, node: &Element, selector: &Selector) -> bool {
        let css = selector.to_string();
        node.matches(&css).unwrap_or(false) || node.query_selector(&css).ok().flatten().is_some()
    }

    fn remove(&self, node: &Element) -> Result<(), DomError> {
        if node.parent_node().is_none() {
            return Err(DomError::Detached);
        }
        node.remove();
        Ok(())
    }

    fn redirect_clicks(&self, node: &Element, target: &str) -> Result<(), DomError> {
        let target = target.to_string();
        let handler = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            event.prevent_default();
            event.stop_immediate_propagation();

            let Some(window) = web_sys::window() else {
                return;
            };
            let location = window.location();
            if location.href().ok().as_deref() == Some(target.as_str()) {
                return;
            }
            if let Err(e) = location.set_href(&target) {
                log::warn!("Redirect to {target} failed: {e:?}");
            }
        });

        node.add_event_listener_with_callback("click", handler.as_ref().unchecked_ref())
            .map_err(host_error)?;
        // The listener lives as long as the element.
        handler.forget();
        Ok(())
    }
}

// =============================================================================
// Navigation
// =============================================================================

#[derive(Debug, Clone)]
pub struct WebNavigator {
    window: Window,
}

impl WebNavigator {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl Navigator for WebNavigator {
    fn location(&self) -> Location {
        let location = self.window.location();
        Location {
            href: location.href().unwrap_or_default(),
            pathname: location.pathname().unwrap_or_default(),
            search: location.search().unwrap_or_default(),
        }
    }

    fn replace(&self, url: &str) -> Result<(), DomError> {
        self.window.location().replace(url).map_err(host_error)
    }

    fn assign(&self, url: &str) -> Result<(), DomError> {
        self.window.location().assign(url).map_err(host_error)
    }
}
