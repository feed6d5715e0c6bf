//! GramControl Core Library
//!
//! This crate holds everything the extension does that does not need a
//! browser: the settings model and its storage, the routines that hide parts
//! of instagram.com, and the watcher that decides when to run them.
//!
//! # Architecture
//!
//! The content script is a [`Watcher`] driven by host events. It reaches the
//! page only through three traits: [`Dom`] for elements, [`Navigator`] for
//! location and history, and [`ObserverHost`] for mutation observers and
//! timers. The wasm crate implements them over `web-sys`; [`memory`]
//! implements them in-process for tests.
//!
//! # Modules
//!
//! - `settings`: The five-flag settings record
//! - `store`: Settings persistence over a key-value area
//! - `config`: Site constants and selectors
//! - `dom`: Document abstraction, selectors, ancestor walk
//! - `host`: Location, history and observer abstractions
//! - `registry`: Observer ownership and teardown
//! - `concerns`: The individual hide/rewrite routines
//! - `navigation`: Home-feed redirect guard
//! - `watcher`: Content-script state machine
//! - `popup`: Popup switch model
//! - `memory`: In-memory host
//! - `url`: URL helpers

pub mod concerns;
pub mod config;
pub mod dom;
pub mod host;
pub mod memory;
pub mod navigation;
pub mod popup;
pub mod registry;
pub mod settings;
pub mod store;
pub mod url;
pub mod watcher;

// Re-export commonly used types
pub use concerns::{Concern, ProcessedLinks, ScanOutcome};
pub use dom::{Dom, DomError, Selector};
pub use host::{HistoryEvent, Location, Navigator, ObserveOptions, ObserverHost};
pub use popup::PopupModel;
pub use registry::{Disconnect, ObserverId, ObserverRegistry};
pub use settings::{Flag, Settings};
pub use store::{SettingsChange, SettingsStore, StorageArea, StoreError};
pub use watcher::{ObserverRole, Watcher};
