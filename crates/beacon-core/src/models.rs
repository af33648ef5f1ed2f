//! Core data models for the beacon kernel.
//!
//! All structs use `serde` for JSON serialization. The persisted log layout
//! (a flat JSON object per record with an `event` key) is what browser
//! tooling reading `localStorage` expects, so [`EventRecord`] flattens its
//! parameters instead of nesting them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form event parameters, keyed by string.
pub type Params = Map<String, Value>;

// ---------------------------------------------------------------------------
// Common fields
// ---------------------------------------------------------------------------

pub const TIMESTAMP: &str = "timestamp";
pub const PAGE_PATH: &str = "page_path";
pub const USER_AGENT_TYPE: &str = "user_agent_type";
pub const SESSION_ID: &str = "session_id";

/// Keys every enriched event carries. Merged last, so they always win.
pub const COMMON_FIELDS: &[&str] = &[TIMESTAMP, PAGE_PATH, USER_AGENT_TYPE, SESSION_ID];

/// Viewport widths below this are `mobile`.
pub const MOBILE_MAX_WIDTH: f64 = 768.0;
/// Viewport widths below this (and at least [`MOBILE_MAX_WIDTH`]) are `tablet`.
pub const TABLET_MAX_WIDTH: f64 = 1024.0;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Device class derived from the viewport width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceType {
    /// Classify a viewport width in CSS pixels.
    pub fn from_viewport_width(width: f64) -> Self {
        if width < MOBILE_MAX_WIDTH {
            Self::Mobile
        } else if width < TABLET_MAX_WIDTH {
            Self::Tablet
        } else {
            Self::Desktop
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Desktop => "desktop",
        }
    }
}

// ---------------------------------------------------------------------------
// Structs
// ---------------------------------------------------------------------------

/// What the page looks like at the moment an event is tracked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    /// `document.title`.
    pub title: String,
    /// Full URL (`location.href`).
    pub location: String,
    /// Path component (`location.pathname`).
    pub path: String,
    /// `window.innerWidth` in CSS pixels.
    pub viewport_width: f64,
}

impl Default for PageSnapshot {
    fn default() -> Self {
        Self {
            title: String::new(),
            location: String::new(),
            path: "/".into(),
            viewport_width: TABLET_MAX_WIDTH,
        }
    }
}

/// An event after enrichment: name plus caller fields and common fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedEvent {
    pub name: String,
    pub parameters: Params,
}

/// One entry of the local event log.
///
/// Serialized flat: `{"event": "<name>", "<param>": ..., "session_id": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Empty for entries written without a name by other scripts.
    #[serde(default)]
    pub event: String,
    #[serde(flatten)]
    pub parameters: Params,
}

impl EventRecord {
    /// Build a record from an enriched event.
    ///
    /// A parameter named `event` would collide with the record's own name
    /// key in the flat layout; it is dropped.
    pub fn new(name: &str, mut parameters: Params) -> Self {
        parameters.remove("event");
        Self {
            event: name.to_string(),
            parameters,
        }
    }

    /// Session the record was written under, if present.
    pub fn session_id(&self) -> Option<&str> {
        self.parameters.get(SESSION_ID).and_then(Value::as_str)
    }
}

impl From<TrackedEvent> for EventRecord {
    fn from(event: TrackedEvent) -> Self {
        EventRecord::new(&event.name, event.parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn device_type_thresholds() {
        assert_eq!(DeviceType::from_viewport_width(500.0), DeviceType::Mobile);
        assert_eq!(DeviceType::from_viewport_width(900.0), DeviceType::Tablet);
        assert_eq!(DeviceType::from_viewport_width(1280.0), DeviceType::Desktop);
    }

    #[test]
    fn device_type_boundaries_belong_to_the_larger_class() {
        assert_eq!(DeviceType::from_viewport_width(767.0), DeviceType::Mobile);
        assert_eq!(DeviceType::from_viewport_width(768.0), DeviceType::Tablet);
        assert_eq!(DeviceType::from_viewport_width(1023.0), DeviceType::Tablet);
        assert_eq!(DeviceType::from_viewport_width(1024.0), DeviceType::Desktop);
    }

    #[test]
    fn device_type_serializes_lowercase() {
        let json = serde_json::to_string(&DeviceType::Tablet).unwrap();
        assert_eq!(json, "\"tablet\"");
        assert_eq!(DeviceType::Tablet.as_str(), "tablet");
    }

    #[test]
    fn event_record_serializes_flat() {
        let mut params = Params::new();
        params.insert("form_id".into(), json!("contact-form"));
        params.insert(SESSION_ID.into(), json!("session_1_abc"));
        let record = EventRecord::new("form_submit", params);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["event"], json!("form_submit"));
        assert_eq!(value["form_id"], json!("contact-form"));
        assert_eq!(record.session_id(), Some("session_1_abc"));
    }

    #[test]
    fn event_record_drops_colliding_event_param() {
        let mut params = Params::new();
        params.insert("event".into(), json!("spoofed"));
        let record = EventRecord::new("link_click", params);

        let json = serde_json::to_string(&record).unwrap();
        let back: EventRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event, "link_click");
        assert!(!back.parameters.contains_key("event"));
    }

    #[test]
    fn event_record_reads_foreign_flat_layout() {
        let back: EventRecord = serde_json::from_value(json!({
            "event": "page_view",
            "page_path": "/about",
            "session_id": "session_42_x1y2z3a",
        }))
        .unwrap();
        assert_eq!(back.event, "page_view");
        assert_eq!(back.parameters[PAGE_PATH], json!("/about"));
    }
}
