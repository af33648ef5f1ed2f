//! wasm-bindgen bridge for beacon-core.
//!
//! Builds a [`Tracker`] over browser collaborators and wires it to the
//! document. Page scripts call [`init_analytics`] (exported as
//! `initAnalytics`) and get a [`WebTracker`] handle back.
//!
//! # Exposed API
//!
//! | JS name                        | Rust                              |
//! |--------------------------------|-----------------------------------|
//! | `initAnalytics(id, options)`   | [`init_analytics`]                |
//! | `WebTracker.track`             | [`Tracker::track`]                |
//! | `WebTracker.getStoredEvents`   | [`Tracker::stored_events`]        |
//! | `WebTracker.clearStoredEvents` | [`Tracker::clear_stored_events`]  |
//! | `WebTracker.setDebugMode`      | [`Tracker::set_debug_mode`]       |
//! | `WebTracker.sessionId`         | [`Tracker::session_id`]           |
//!
//! # Listeners
//!
//! Attached once the document has finished parsing: delegated `click` and
//! `submit` on the document, capture-phase `focus` for form fields, one
//! `click` listener per component element present at that moment, and the
//! optional copy signal.

mod dom;
mod host;
mod logger;

use std::rc::Rc;

use js_sys::Reflect;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CustomEvent, Document, Element, Event, EventTarget};

use beacon_core::classify::{ComponentKind, FieldInfo, FormInfo, TRACKABLE_SELECTOR};
use beacon_core::events;
use beacon_core::models::Params;
use beacon_core::{Host, Tracker, TrackerConfig};

use crate::host::{describe_js, WebStorage, WindowBridgeHost, WindowPage};

// ---------------------------------------------------------------------------
// WebTracker
// ---------------------------------------------------------------------------

/// JS handle to a running tracker.
#[wasm_bindgen]
pub struct WebTracker {
    inner: Rc<Tracker>,
}

#[wasm_bindgen]
impl WebTracker {
    /// Track a custom event. `params` may be any JSON-compatible object;
    /// anything else is treated as no parameters.
    pub fn track(&self, name: &str, params: JsValue) {
        self.inner.track(name, params_from_js(&params));
    }

    #[wasm_bindgen(js_name = getStoredEvents)]
    pub fn get_stored_events(&self) -> JsValue {
        let records = self.inner.stored_events();
        serde_json::to_string(&records)
            .ok()
            .and_then(|json| js_sys::JSON::parse(&json).ok())
            .unwrap_or_else(|| js_sys::Array::new().into())
    }

    #[wasm_bindgen(js_name = clearStoredEvents)]
    pub fn clear_stored_events(&self) {
        self.inner.clear_stored_events();
    }

    #[wasm_bindgen(js_name = setDebugMode)]
    pub fn set_debug_mode(&self, enabled: bool) {
        logger::set_debug(enabled);
        self.inner.set_debug_mode(enabled);
    }

    #[wasm_bindgen(js_name = sessionId)]
    pub fn session_id(&self) -> String {
        self.inner.session_id()
    }

    #[wasm_bindgen(getter, js_name = isInitialized)]
    pub fn is_initialized(&self) -> bool {
        self.inner.is_initialized()
    }
}

fn params_from_js(value: &JsValue) -> Params {
    if value.is_undefined() || value.is_null() {
        return Params::new();
    }
    js_sys::JSON::stringify(value)
        .ok()
        .and_then(|s| s.as_string())
        .and_then(|json| serde_json::from_str::<Params>(&json).ok())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// initAnalytics
// ---------------------------------------------------------------------------

/// Create a tracker for `measurement_id` and start it once the document is
/// ready. `options` takes `debugMode`, `exposeGlobal`, `trackCopySignal`
/// and an optional `storage` block; unusable options are logged and
/// replaced by the defaults.
///
/// Never throws. Returns `undefined` only when there is no document to
/// track.
#[wasm_bindgen(js_name = initAnalytics)]
pub fn init_analytics(measurement_id: &str, options: JsValue) -> Option<WebTracker> {
    logger::init(false);

    let options_json = if options.is_undefined() || options.is_null() {
        String::new()
    } else {
        match js_sys::JSON::stringify(&options) {
            Ok(json) => json.as_string().unwrap_or_default(),
            Err(e) => {
                log::warn!("ignoring tracker options: {}", describe_js(&e));
                String::new()
            }
        }
    };
    let mut config = TrackerConfig::from_json_or_default(&options_json);
    config.measurement_id = measurement_id.to_string();
    logger::set_debug(config.debug_mode);

    let Some(window) = web_sys::window() else {
        log::warn!("analytics not started: no window");
        return None;
    };
    let Some(document) = window.document() else {
        log::warn!("analytics not started: no document");
        return None;
    };

    let expose_global = config.expose_global;
    let host = Host {
        bridge_host: Some(Rc::new(WindowBridgeHost::new(window.clone()))),
        local_store: Rc::new(WebStorage::local(&window)),
        session_store: Rc::new(WebStorage::session(&window)),
        page: Rc::new(WindowPage::new(window.clone())),
    };
    let tracker = match Tracker::new(config, host) {
        Ok(tracker) => Rc::new(tracker),
        Err(e) => {
            log::warn!("analytics not started: {e}");
            return None;
        }
    };

    if document.ready_state() == "loading" {
        let deferred = tracker.clone();
        let ready_document = document.clone();
        let on_ready = Closure::once_into_js(move || start(&deferred, &ready_document));
        if let Err(e) =
            document.add_event_listener_with_callback("DOMContentLoaded", on_ready.unchecked_ref())
        {
            log::warn!("deferred start failed, starting now: {}", describe_js(&e));
            start(&tracker, &document);
        }
    } else {
        start(&tracker, &document);
    }

    if expose_global {
        let handle = WebTracker {
            inner: tracker.clone(),
        };
        if let Err(e) = Reflect::set(&window, &JsValue::from_str("analytics"), &JsValue::from(handle)) {
            log::warn!("window.analytics not set: {}", describe_js(&e));
        }
    }

    Some(WebTracker { inner: tracker })
}

fn start(tracker: &Rc<Tracker>, document: &Document) {
    tracker.initialize();
    if let Err(e) = attach_listeners(tracker, document) {
        log::warn!("tracking listeners not attached: {}", describe_js(&e));
    }
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// Register `handler` for the page's lifetime.
fn listen<F>(target: &EventTarget, kind: &str, capture: bool, handler: F) -> Result<(), JsValue>
where
    F: FnMut(Event) + 'static,
{
    let closure = Closure::<dyn FnMut(Event)>::new(handler);
    target.add_event_listener_with_callback_and_bool(kind, closure.as_ref().unchecked_ref(), capture)?;
    closure.forget();
    Ok(())
}

fn attach_listeners(tracker: &Rc<Tracker>, document: &Document) -> Result<(), JsValue> {
    let t = tracker.clone();
    listen(document, "click", false, move |event| {
        let Some(target) = dom::target_element(&event) else {
            return;
        };
        if let Ok(Some(trackable)) = target.closest(TRACKABLE_SELECTOR) {
            t.handle_click(&dom::snapshot(&trackable));
        }
    })?;

    let t = tracker.clone();
    listen(document, "submit", false, move |event| {
        let form = dom::target_element(&event)
            .and_then(|el| FormInfo::from_element(&dom::snapshot_shallow(&el)));
        if let Some(form) = form {
            t.handle_submit(&form);
        }
    })?;

    // focus does not bubble; listen in the capture phase instead.
    let t = tracker.clone();
    listen(document, "focus", true, move |event| {
        let field = dom::target_element(&event)
            .and_then(|el| FieldInfo::from_element(&dom::snapshot_shallow(&el)));
        if let Some(field) = field {
            t.handle_focus(&field);
        }
    })?;

    for kind in ComponentKind::ALL {
        let nodes = document.query_selector_all(kind.selector())?;
        for i in 0..nodes.length() {
            let Some(element) = nodes.item(i).and_then(|n| n.dyn_into::<Element>().ok()) else {
                continue;
            };
            let t = tracker.clone();
            let bound = element.clone();
            listen(&element, "click", false, move |_event| {
                t.handle_component_click(kind, &dom::snapshot(&bound));
            })?;
        }
    }

    if tracker.config().track_copy_signal {
        let t = tracker.clone();
        listen(document, events::VALUE_COPIED_SIGNAL, false, move |event| {
            if let Some(value) = copied_value(&event) {
                t.handle_value_copied(&value);
            }
        })?;
    }

    Ok(())
}

/// `detail.value` (or `detail.email`) of a copy signal.
fn copied_value(event: &Event) -> Option<String> {
    let detail = event.dyn_ref::<CustomEvent>()?.detail();
    ["value", "email"].into_iter().find_map(|key| {
        Reflect::get(&detail, &JsValue::from_str(key))
            .ok()
            .and_then(|v| v.as_string())
    })
}
