//! In-browser tests for the `web-sys` adapters.
//!
//! Run with `wasm-pack test --headless --chrome crates/gc-wasm`.

#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::rc::Rc;

use gc_core::config::selectors::{EXPLORE_ICON, STATIC_COMMENTS};
use gc_core::dom::{ascend, AncestorFilter, Dom, DomError};
use gc_core::host::{HistoryEvent, Navigator};
use gc_core::{Flag, Settings};
use gc_wasm::observers::page_watcher;
use gc_wasm::{context, history, PageWatcher, WebDom, WebNavigator};
use js_sys::{Function, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::*;
use web_sys::{Element, Event};

wasm_bindgen_test_configure!(run_in_browser);

fn fixture(html: &str) -> (WebDom, Element) {
    let dom = WebDom::current().unwrap();
    let root = dom.document().create_element("section").unwrap();
    root.set_inner_html(html);
    dom.document().body().unwrap().append_child(&root).unwrap();
    (dom, root)
}

#[wasm_bindgen_test]
fn test_query_svg_by_aria_label() {
    let (dom, root) = fixture(
        r#"<div><div><div><div><div><div><svg aria-label="Explore"></svg></div></div></div></div></div></div>"#,
    );

    let icon = dom.query_first(&EXPLORE_ICON).unwrap();
    assert_eq!(dom.tag_name(&icon), "svg");

    let sixth = ascend(&dom, &icon, 6, AncestorFilter::Tag("div")).unwrap();
    dom.remove(&sixth).unwrap();
    assert!(!dom.is_connected(&icon));
    assert!(dom.query_first(&EXPLORE_ICON).is_none());
    root.remove();
}

#[wasm_bindgen_test]
fn test_class_list_and_exact_match() {
    let (dom, root) = fixture(r#"<div class="x78zum5 xdt5ytf x1iyjqo2"><span>hi</span></div>"#);

    let found = dom.query_all(&STATIC_COMMENTS);
    assert_eq!(found.len(), 1);
    assert_eq!(dom.class_list(&found[0]), vec!["x78zum5", "xdt5ytf", "x1iyjqo2"]);
    assert_eq!(dom.text_content(&found[0]).as_deref(), Some("hi"));
    assert!(dom.contains_match(&root, &STATIC_COMMENTS));
    root.remove();
}

#[wasm_bindgen_test]
fn test_remove_detached_node_reports_detached() {
    let dom = WebDom::current().unwrap();
    let orphan = dom.document().create_element("div").unwrap();
    assert_eq!(dom.remove(&orphan), Err(DomError::Detached));
}

#[wasm_bindgen_test]
fn test_navigator_reads_location() {
    let navigator = WebNavigator::new(web_sys::window().unwrap());
    let location = navigator.location();
    assert!(location.href.starts_with("http"));
    assert!(location.href.contains(&location.pathname));
}

/// A started watcher that leaves the test page alone.
fn idle_watcher() -> Rc<RefCell<PageWatcher>> {
    let settings = Flag::ALL
        .into_iter()
        .fold(Settings::default(), |s, flag| s.with(flag, false));
    let window = web_sys::window().unwrap();
    let watcher = page_watcher(WebDom::current().unwrap(), WebNavigator::new(window), settings);
    watcher.borrow_mut().start();
    assert!(watcher.borrow().observer_count() >= 2);
    watcher
}

/// `chrome.runtime` stand-in whose port records its disconnect listener as
/// `runtime.fire`.
fn fake_runtime() -> JsValue {
    let setup = Function::new_no_args(
        r#"
        const runtime = { id: "gramcontrol-test" };
        runtime.connect = (options) => ({
            name: options.name,
            onDisconnect: { addListener: (listener) => { runtime.fire = listener; } },
        });
        globalThis.chrome = { runtime };
        return runtime;
        "#,
    );
    setup.call0(&JsValue::UNDEFINED).unwrap()
}

fn fire_disconnect(runtime: &JsValue) {
    let fire: Function = Reflect::get(runtime, &JsValue::from_str("fire"))
        .unwrap()
        .dyn_into()
        .unwrap();
    fire.call0(&JsValue::UNDEFINED).unwrap();
}

#[wasm_bindgen_test]
fn test_push_state_is_reported_after_it_applies() {
    let window = web_sys::window().unwrap();
    let original = window.location().href().unwrap();
    let seen: Rc<RefCell<Vec<(HistoryEvent, String)>>> = Rc::default();

    let record = seen.clone();
    let location = window.location();
    history::intercept(&window, move |event| {
        record.borrow_mut().push((event, location.pathname().unwrap()));
    })
    .unwrap();

    let history = window.history().unwrap();
    history
        .push_state_with_url(&JsValue::NULL, "", Some("/p/x/"))
        .unwrap();
    assert_eq!(seen.borrow()[0], (HistoryEvent::Push, "/p/x/".to_string()));

    history
        .replace_state_with_url(&JsValue::NULL, "", Some(&original))
        .unwrap();
    assert_eq!(seen.borrow()[1].0, HistoryEvent::Replace);
    assert_eq!(window.location().href().unwrap(), original);
}

#[wasm_bindgen_test]
fn test_port_disconnect_after_reload_invalidates() {
    let runtime = fake_runtime();
    let watcher = idle_watcher();
    context::invalidate_on_disconnect(Rc::downgrade(&watcher)).unwrap();

    Reflect::set(&runtime, &JsValue::from_str("id"), &JsValue::UNDEFINED).unwrap();
    assert!(!context::context_alive());
    fire_disconnect(&runtime);

    assert!(watcher.borrow().is_invalidated());
    assert_eq!(watcher.borrow().observer_count(), 0);
}

#[wasm_bindgen_test]
fn test_port_disconnect_with_live_runtime_keeps_watching() {
    let runtime = fake_runtime();
    let watcher = idle_watcher();
    context::invalidate_on_disconnect(Rc::downgrade(&watcher)).unwrap();

    assert!(context::context_alive());
    fire_disconnect(&runtime);

    assert!(!watcher.borrow().is_invalidated());
    assert!(watcher.borrow().observer_count() >= 2);
    watcher.borrow_mut().invalidate();
}

#[wasm_bindgen_test]
fn test_pagehide_invalidates_unless_cached() {
    let window = web_sys::window().unwrap();
    let watcher = idle_watcher();
    context::invalidate_on_pagehide(&window, Rc::downgrade(&watcher)).unwrap();

    let cached: Event = Function::new_no_args(
        "return new PageTransitionEvent('pagehide', { persisted: true });",
    )
    .call0(&JsValue::UNDEFINED)
    .unwrap()
    .dyn_into()
    .unwrap();
    window.dispatch_event(&cached).unwrap();
    assert!(!watcher.borrow().is_invalidated());

    window.dispatch_event(&Event::new("pagehide").unwrap()).unwrap();
    assert!(watcher.borrow().is_invalidated());
    assert_eq!(watcher.borrow().observer_count(), 0);
}
