//! Popup page: one checkbox per flag.

use std::cell::RefCell;
use std::rc::Rc;

use gc_core::popup::{Control, PopupModel};
use gc_core::store::SettingsStore;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Element, Event, HtmlInputElement};

use crate::storage::ChromeStorage;

type Store = Rc<SettingsStore<ChromeStorage>>;

pub(crate) fn start() -> Result<(), JsValue> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("No document"))?;

    spawn_local(async move {
        if let Err(e) = render(document).await {
            log::error!("Popup failed to render: {e:?}");
        }
    });
    Ok(())
}

async fn render(document: Document) -> Result<(), JsValue> {
    let container: Element = match document.get_element_by_id("app") {
        Some(app) => app,
        None => document
            .body()
            .map(Element::from)
            .ok_or_else(|| JsValue::from_str("No body"))?,
    };

    // Opened as a plain page (e.g. during development) there is no storage.
    let store = match ChromeStorage::settings_area() {
        Ok(area) => Some(Rc::new(SettingsStore::new(area))),
        Err(e) => {
            log::debug!("Storage unavailable: {e}");
            None
        }
    };
    let model = match &store {
        Some(store) => PopupModel::load(&**store).await,
        None => PopupModel::default(),
    };
    let model = Rc::new(RefCell::new(model));

    let controls = model.borrow().controls();
    for control in controls {
        render_control(&document, &container, control, model.clone(), store.clone())?;
    }
    Ok(())
}

fn render_control(
    document: &Document,
    container: &Element,
    control: Control,
    model: Rc<RefCell<PopupModel>>,
    store: Option<Store>,
) -> Result<(), JsValue> {
    let key = control.flag.key();

    let row = document.create_element("div")?;
    row.set_class_name("control");

    let label = document.create_element("label")?;
    label.set_attribute("for", key)?;
    label.set_attribute("title", control.description)?;
    label.set_text_content(Some(control.label));

    let input: HtmlInputElement = document.create_element("input")?.dyn_into()?;
    input.set_type("checkbox");
    input.set_id(key);
    input.set_checked(control.checked);

    row.append_child(&label)?;
    row.append_child(&input)?;
    container.append_child(&row)?;

    let flag = control.flag;
    let checkbox = input.clone();
    let on_change = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
        let updated = model.borrow_mut().toggle(flag, checkbox.checked());
        log::debug!("{} -> {}", flag.key(), updated.get(flag));
        if let Some(store) = store.clone() {
            spawn_local(async move { store.save(&updated).await });
        }
    });
    input.add_event_listener_with_callback("change", on_change.as_ref().unchecked_ref())?;
    on_change.forget();
    Ok(())
}
