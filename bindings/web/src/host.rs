//! Browser implementations of the beacon-core collaborator traits.

use std::rc::Rc;

use js_sys::{Array, Function, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{HtmlScriptElement, Storage, Window};

use beacon_core::bridge::BridgeCommand;
use beacon_core::errors::{BridgeError, StoreError};
use beacon_core::models::{PageSnapshot, Params};
use beacon_core::traits::{AnalyticsBridge, BridgeHost, KeyValueStore, PageContext};

// The vendor script only accepts `arguments` objects from the queue, which
// a Rust closure cannot produce. Must not be compiled at runtime: pages with
// a CSP lacking `unsafe-eval` reject `new Function`. Needs an ES-module
// build target (`bundler` or `web`).
#[wasm_bindgen(inline_js = "export function queueFunction() { \
    return function gtag() { window.dataLayer.push(arguments); }; \
}")]
extern "C" {
    #[wasm_bindgen(js_name = queueFunction)]
    fn queue_function() -> Function;
}

const GTAG: &str = "gtag";
const DATA_LAYER: &str = "dataLayer";

/// Best-effort text for a thrown JS value.
pub fn describe_js(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value
        .as_string()
        .unwrap_or_else(|| format!("{value:?}"))
}

/// Serialize parameters into a plain JS object.
pub fn params_to_js(params: &Params) -> Result<JsValue, String> {
    let json = serde_json::to_string(params).map_err(|e| e.to_string())?;
    js_sys::JSON::parse(&json).map_err(|e| describe_js(&e))
}

// ---------------------------------------------------------------------------
// WindowBridge
// ---------------------------------------------------------------------------

/// Calls the page's `gtag` function.
pub struct WindowBridge {
    function: Function,
}

impl WindowBridge {
    pub fn new(function: Function) -> Self {
        Self { function }
    }
}

impl AnalyticsBridge for WindowBridge {
    fn send(&self, command: BridgeCommand) -> Result<(), BridgeError> {
        let verb = JsValue::from_str(command.command());
        let failed = |message: String| BridgeError::CommandFailed {
            command: command.command().into(),
            message,
        };

        let result = match &command {
            BridgeCommand::Js { at } => {
                let date = js_sys::Date::new(&JsValue::from_f64(at.timestamp_millis() as f64));
                self.function.call2(&JsValue::NULL, &verb, &date)
            }
            BridgeCommand::Config { target, params }
            | BridgeCommand::Event {
                name: target,
                params,
            } => {
                let params = params_to_js(params).map_err(failed)?;
                self.function
                    .call3(&JsValue::NULL, &verb, &JsValue::from_str(target), &params)
            }
        };
        result.map(|_| ()).map_err(|e| failed(describe_js(&e)))
    }
}

// ---------------------------------------------------------------------------
// WindowBridgeHost
// ---------------------------------------------------------------------------

/// Finds or installs `window.gtag`.
pub struct WindowBridgeHost {
    window: Window,
}

impl WindowBridgeHost {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl BridgeHost for WindowBridgeHost {
    fn existing(&self) -> Option<Rc<dyn AnalyticsBridge>> {
        let value = Reflect::get(&self.window, &JsValue::from_str(GTAG)).ok()?;
        let function = value.dyn_into::<Function>().ok()?;
        Some(Rc::new(WindowBridge::new(function)))
    }

    fn inject_script(&self, src: &str) -> Result<(), BridgeError> {
        let injection = |message: String| BridgeError::ScriptInjection { message };

        let document = self
            .window
            .document()
            .ok_or_else(|| injection("no document".into()))?;
        let script = document
            .create_element("script")
            .map_err(|e| injection(describe_js(&e)))?
            .dyn_into::<HtmlScriptElement>()
            .map_err(|_| injection("created element is not a script".into()))?;
        script.set_async(true);
        script.set_src(src);

        let head = document
            .head()
            .ok_or_else(|| injection("document has no head".into()))?;
        head.append_child(&script)
            .map_err(|e| injection(describe_js(&e)))?;
        Ok(())
    }

    fn install_queue(&self) -> Result<Rc<dyn AnalyticsBridge>, BridgeError> {
        let install = |e: JsValue| BridgeError::QueueInstall {
            message: describe_js(&e),
        };

        let data_layer = Reflect::get(&self.window, &JsValue::from_str(DATA_LAYER)).map_err(install)?;
        if !Array::is_array(&data_layer) {
            Reflect::set(&self.window, &JsValue::from_str(DATA_LAYER), &Array::new())
                .map_err(install)?;
        }

        let gtag = queue_function();
        Reflect::set(&self.window, &JsValue::from_str(GTAG), &gtag).map_err(install)?;
        Ok(Rc::new(WindowBridge::new(gtag)))
    }
}

// ---------------------------------------------------------------------------
// WebStorage
// ---------------------------------------------------------------------------

/// `localStorage` or `sessionStorage`.
///
/// Storage can be missing entirely (disabled cookies, sandboxed frames),
/// which surfaces as [`StoreError::Unavailable`] on every call.
pub struct WebStorage {
    storage: Option<Storage>,
    name: &'static str,
}

impl WebStorage {
    pub fn local(window: &Window) -> Self {
        Self {
            storage: window.local_storage().ok().flatten(),
            name: "localStorage",
        }
    }

    pub fn session(window: &Window) -> Self {
        Self {
            storage: window.session_storage().ok().flatten(),
            name: "sessionStorage",
        }
    }

    fn storage(&self) -> Result<&Storage, StoreError> {
        self.storage.as_ref().ok_or_else(|| StoreError::Unavailable {
            message: format!("{} is not available", self.name),
        })
    }
}

impl KeyValueStore for WebStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.storage()?
            .get_item(key)
            .map_err(|e| StoreError::Unavailable {
                message: describe_js(&e),
            })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.storage()?
            .set_item(key, value)
            .map_err(|_| StoreError::QuotaExceeded { key: key.into() })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.storage()?
            .remove_item(key)
            .map_err(|e| StoreError::Other {
                message: describe_js(&e),
            })
    }
}

// ---------------------------------------------------------------------------
// WindowPage
// ---------------------------------------------------------------------------

pub struct WindowPage {
    window: Window,
}

impl WindowPage {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl PageContext for WindowPage {
    fn snapshot(&self) -> PageSnapshot {
        let fallback = PageSnapshot::default();
        let location = self.window.location();
        PageSnapshot {
            title: self
                .window
                .document()
                .map(|d| d.title())
                .unwrap_or_default(),
            location: location.href().unwrap_or(fallback.location),
            path: location.pathname().unwrap_or(fallback.path),
            viewport_width: self
                .window
                .inner_width()
                .ok()
                .and_then(|w| w.as_f64())
                .unwrap_or(fallback.viewport_width),
        }
    }
}
