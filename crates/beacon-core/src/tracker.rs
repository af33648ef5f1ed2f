//! The event tracker.
//!
//! [`Tracker`] owns the whole pipeline for one page: enrich, forward to the
//! analytics bridge, write to the local log. Listeners in the host binding
//! turn DOM events into [`crate::classify`] inputs and call the `handle_*`
//! methods; page code calls [`Tracker::track`] directly.
//!
//! # Enrichment
//!
//! Caller parameters go in first, then the common fields
//! ([`COMMON_FIELDS`](crate::models::COMMON_FIELDS)). A caller cannot
//! override `timestamp`, `page_path`, `user_agent_type` or `session_id`.
//!
//! # Failure policy
//!
//! Tracking never fails from the caller's point of view. Bridge and storage
//! errors are logged at debug level and dropped here, once; everything below
//! this module returns `Result`.

use std::cell::{Cell, OnceCell, RefCell};
use std::rc::Rc;

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::bridge::{self, BridgeCommand};
use crate::classify::{self, ComponentKind, ElementInfo, FieldInfo, FormInfo, Interaction};
use crate::config::TrackerConfig;
use crate::errors::BeaconError;
use crate::events;
use crate::models::{
    DeviceType, EventRecord, Params, TrackedEvent, PAGE_PATH, SESSION_ID, TIMESTAMP,
    USER_AGENT_TYPE,
};
use crate::store::{generate_session_id, EventLog, MemoryStore, SessionIds};
use crate::traits::{AnalyticsBridge, BridgeHost, KeyValueStore, PageContext};

/// Log target for debug-mode event output.
pub const DEBUG_TARGET: &str = "beacon::debug";

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

/// Everything the tracker talks to.
pub struct Host {
    /// Where the analytics bridge lives. `None` for hosts without one.
    pub bridge_host: Option<Rc<dyn BridgeHost>>,
    /// Persistent store for the event log (`localStorage`).
    pub local_store: Rc<dyn KeyValueStore>,
    /// Per-tab store for the session id (`sessionStorage`).
    pub session_store: Rc<dyn KeyValueStore>,
    pub page: Rc<dyn PageContext>,
}

impl Host {
    /// A host with in-memory stores and no analytics bridge.
    pub fn in_memory(page: Rc<dyn PageContext>) -> Self {
        Self {
            bridge_host: None,
            local_store: Rc::new(MemoryStore::new()),
            session_store: Rc::new(MemoryStore::new()),
            page,
        }
    }
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

pub struct Tracker {
    config: TrackerConfig,
    bridge_host: Option<Rc<dyn BridgeHost>>,
    bridge: RefCell<Option<Rc<dyn AnalyticsBridge>>>,
    log: EventLog,
    sessions: SessionIds,
    /// Used only when the session store cannot be read or written.
    fallback_session: OnceCell<String>,
    page: Rc<dyn PageContext>,
    debug_mode: Cell<bool>,
    initialized: Cell<bool>,
}

impl Tracker {
    /// Fails only when `config` does not validate.
    pub fn new(config: TrackerConfig, host: Host) -> Result<Self, BeaconError> {
        config.validate()?;
        let log = EventLog::new(
            host.local_store,
            &config.storage.events_key,
            config.storage.max_events,
        );
        let sessions = SessionIds::new(host.session_store, &config.storage.session_key);
        Ok(Self {
            debug_mode: Cell::new(config.debug_mode),
            config,
            bridge_host: host.bridge_host,
            bridge: RefCell::new(None),
            log,
            sessions,
            fallback_session: OnceCell::new(),
            page: host.page,
            initialized: Cell::new(false),
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    pub fn debug_mode(&self) -> bool {
        self.debug_mode.get()
    }

    pub fn set_debug_mode(&self, enabled: bool) {
        self.debug_mode.set(enabled);
    }

    /// Whether events are currently forwarded to an analytics bridge.
    pub fn bridge_connected(&self) -> bool {
        self.bridge.borrow().is_some()
    }

    /// Connect the analytics bridge and record the page view.
    ///
    /// Runs once; later calls are no-ops.
    pub fn initialize(&self) {
        if self.initialized.get() {
            return;
        }

        if let Some(host) = &self.bridge_host {
            *self.bridge.borrow_mut() = bridge::connect(host.as_ref(), &self.config.measurement_id);
        }

        self.track_page_view();
        self.initialized.set(true);

        if self.debug_mode() {
            log::info!(target: DEBUG_TARGET, "analytics initialized");
        }
    }

    fn track_page_view(&self) -> TrackedEvent {
        let page = self.page.snapshot();
        let mut params = Params::new();
        params.insert("page_title".into(), json!(page.title));
        params.insert("page_location".into(), json!(page.location));
        params.insert("page_path".into(), json!(page.path));
        self.track(events::PAGE_VIEW, params)
    }

    /// Current session id. Falls back to a process-local id when the
    /// session store is unusable.
    pub fn session_id(&self) -> String {
        match self.sessions.current() {
            Ok(id) => id,
            Err(e) => {
                log::debug!("session store unavailable, using fallback id: {e}");
                self.fallback_session
                    .get_or_init(generate_session_id)
                    .clone()
            }
        }
    }

    fn enrich(&self, mut params: Params) -> Params {
        let page = self.page.snapshot();
        let device = DeviceType::from_viewport_width(page.viewport_width);
        params.insert(
            TIMESTAMP.into(),
            json!(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        params.insert(PAGE_PATH.into(), json!(page.path));
        params.insert(USER_AGENT_TYPE.into(), json!(device.as_str()));
        params.insert(SESSION_ID.into(), json!(self.session_id()));
        params
    }

    /// Enrich, forward and log one event. Never fails.
    pub fn track(&self, name: &str, params: Params) -> TrackedEvent {
        let event = TrackedEvent {
            name: name.to_string(),
            parameters: self.enrich(params),
        };

        self.forward(&event);

        if self.debug_mode() {
            log::info!(
                target: DEBUG_TARGET,
                "tracked {} {}",
                event.name,
                Value::Object(event.parameters.clone())
            );
        }

        if let Err(e) = self.log.append(EventRecord::from(event.clone())) {
            log::debug!("event {} not stored locally: {e}", event.name);
        }

        event
    }

    fn forward(&self, event: &TrackedEvent) {
        if self.config.measurement_id.is_empty() {
            return;
        }
        let bridge = self.bridge.borrow();
        let Some(bridge) = bridge.as_ref() else {
            return;
        };
        let command = BridgeCommand::Event {
            name: event.name.clone(),
            params: event.parameters.clone(),
        };
        if let Err(e) = bridge.send(command) {
            log::debug!("event {} not forwarded: {e}", event.name);
        }
    }

    fn track_interaction(&self, interaction: Interaction) -> TrackedEvent {
        self.track(interaction.name, interaction.params)
    }

    // -- Listener entry points --

    /// Click on `element`, which should already be the closest trackable
    /// ancestor of the click target. `None` if it is not trackable.
    pub fn handle_click(&self, element: &ElementInfo) -> Option<TrackedEvent> {
        if !classify::is_trackable(element) {
            return None;
        }
        Some(self.track_interaction(classify::click_event(element)))
    }

    pub fn handle_submit(&self, form: &FormInfo) -> TrackedEvent {
        let location = self.page.snapshot().location;
        self.track_interaction(classify::submit_event(form, &location))
    }

    pub fn handle_focus(&self, field: &FieldInfo) -> Option<TrackedEvent> {
        classify::field_focus_event(field).map(|i| self.track_interaction(i))
    }

    pub fn handle_component_click(&self, kind: ComponentKind, element: &ElementInfo) -> TrackedEvent {
        let location = self.page.snapshot().location;
        self.track_interaction(classify::component_event(kind, element, &location))
    }

    /// The page signalled that `value` was copied to the clipboard. Ignored
    /// unless `track_copy_signal` is set.
    pub fn handle_value_copied(&self, value: &str) -> Option<TrackedEvent> {
        if !self.config.track_copy_signal {
            return None;
        }
        let mut params = Params::new();
        params.insert("copied_value".into(), json!(value));
        Some(self.track(events::VALUE_COPY, params))
    }

    // -- Local log --

    /// Everything in the local log, oldest first.
    pub fn stored_events(&self) -> Vec<EventRecord> {
        self.log.load()
    }

    pub fn clear_stored_events(&self) {
        if let Err(e) = self.log.clear() {
            log::debug!("local event log not cleared: {e}");
        }
    }
}
