//! WebAssembly bindings for GramControl
//!
//! Three entry points, one per extension context:
//!
//! - [`start_content_script`]: runs the page watcher on instagram.com
//! - [`start_background`]: seeds settings on install
//! - [`start_popup`]: renders the five switches
//!
//! Everything browser-specific lives here; the behaviour itself is in
//! `gc-core`.

use std::sync::Once;

use wasm_bindgen::prelude::*;

mod background;
mod content;
pub mod context;
pub mod dom;
pub mod history;
mod logger;
pub mod observers;
mod popup;
pub mod storage;

pub use dom::{WebDom, WebNavigator};
pub use observers::{PageWatcher, WebObservers};
pub use storage::ChromeStorage;

static RUNTIME: Once = Once::new();

/// Panic hook and console logger. Safe to call from every entry point.
fn init_runtime() {
    RUNTIME.call_once(|| {
        console_error_panic_hook::set_once();
        let level = if cfg!(debug_assertions) {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        logger::init(level);
    });
}

#[wasm_bindgen]
pub fn start_content_script() -> Result<(), JsValue> {
    init_runtime();
    content::start()
}

/// Tear down the content script's observers. The content script already
/// does this itself when its runtime port disconnects for good.
#[wasm_bindgen]
pub fn stop_content_script() {
    content::stop();
}

#[wasm_bindgen]
pub fn start_background() -> Result<(), JsValue> {
    init_runtime();
    background::start()
}

#[wasm_bindgen]
pub fn start_popup() -> Result<(), JsValue> {
    init_runtime();
    popup::start()
}

#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
