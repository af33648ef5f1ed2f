//! External analytics bridge protocol and loader.
//!
//! The vendor exposes a single variadic function taking
//! `(command, target, paramsOrDate)`:
//!
//! | Command  | Target           | Third argument           |
//! |----------|------------------|--------------------------|
//! | `js`     | current `Date`   | —                        |
//! | `config` | measurement id   | configuration parameters |
//! | `event`  | event name       | event parameters         |
//!
//! [`connect`] decides whether a bridge exists, loads one if needed, and
//! issues the initial `js` / `config` pair. Loading is fire-and-forget: the
//! queue accepts commands before the vendor script has arrived.

use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::models::Params;
use crate::traits::{AnalyticsBridge, BridgeHost};

/// Vendor script location; the measurement id is appended as `id`.
pub const SCRIPT_BASE_URL: &str = "https://www.googletagmanager.com/gtag/js";

/// Cookie policy sent with the `config` command.
pub const COOKIE_FLAGS: &str = "SameSite=None;Secure";

// ---------------------------------------------------------------------------
// BridgeCommand
// ---------------------------------------------------------------------------

/// One call into the vendor's command queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum BridgeCommand {
    /// `('js', date)`, marks the queue start time.
    Js { at: DateTime<Utc> },
    /// `('config', measurement_id, params)`.
    Config { target: String, params: Params },
    /// `('event', name, params)`.
    Event { name: String, params: Params },
}

impl BridgeCommand {
    /// The wire verb passed as the first argument.
    pub fn command(&self) -> &'static str {
        match self {
            Self::Js { .. } => "js",
            Self::Config { .. } => "config",
            Self::Event { .. } => "event",
        }
    }
}

/// Script URL for a measurement id.
pub fn script_url(measurement_id: &str) -> String {
    format!("{SCRIPT_BASE_URL}?id={measurement_id}")
}

/// Privacy flags sent with the `config` command: IP anonymization on and
/// cross-site cookies restricted to secure contexts.
pub fn privacy_params() -> Params {
    let mut params = Params::new();
    params.insert("anonymize_ip".into(), Value::Bool(true));
    params.insert("cookie_flags".into(), json!(COOKIE_FLAGS));
    params
}

/// Resolve the bridge for `measurement_id`.
///
/// - Empty id: no bridge, nothing injected. Events are only logged locally.
/// - Host already has a bridge: reuse it. No second script, no `config`.
/// - Otherwise: inject the vendor script, install the queue, send `js`
///   then `config`.
///
/// A host that cannot inject or install yields `None`; the failure is
/// logged at debug level and tracking continues local-only.
pub fn connect(host: &dyn BridgeHost, measurement_id: &str) -> Option<Rc<dyn AnalyticsBridge>> {
    if measurement_id.is_empty() {
        log::debug!("no measurement id; analytics bridge disabled");
        return None;
    }

    if let Some(existing) = host.existing() {
        log::debug!("analytics bridge already present; skipping script injection");
        return Some(existing);
    }

    if let Err(e) = host.inject_script(&script_url(measurement_id)) {
        log::debug!("analytics bridge not loaded: {e}");
        return None;
    }

    let bridge = match host.install_queue() {
        Ok(bridge) => bridge,
        Err(e) => {
            log::debug!("analytics bridge not loaded: {e}");
            return None;
        }
    };

    let commands = [
        BridgeCommand::Js { at: Utc::now() },
        BridgeCommand::Config {
            target: measurement_id.to_string(),
            params: privacy_params(),
        },
    ];
    for command in commands {
        if let Err(e) = bridge.send(command) {
            log::debug!("analytics bridge command failed: {e}");
        }
    }

    log::debug!("analytics bridge loaded for {measurement_id}");
    Some(bridge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBridge, FakeBridgeHost};

    #[test]
    fn script_url_carries_measurement_id() {
        assert_eq!(
            script_url("G-TEST123"),
            "https://www.googletagmanager.com/gtag/js?id=G-TEST123"
        );
    }

    #[test]
    fn command_verbs() {
        assert_eq!(BridgeCommand::Js { at: Utc::now() }.command(), "js");
        let config = BridgeCommand::Config {
            target: "G-1".into(),
            params: Params::new(),
        };
        assert_eq!(config.command(), "config");
        let event = BridgeCommand::Event {
            name: "page_view".into(),
            params: Params::new(),
        };
        assert_eq!(event.command(), "event");
    }

    #[test]
    fn empty_measurement_id_skips_loading() {
        let host = FakeBridgeHost::new();
        assert!(connect(&host, "").is_none());
        assert!(host.injected_scripts().is_empty());
    }

    #[test]
    fn empty_measurement_id_ignores_existing_bridge() {
        let host = FakeBridgeHost::with_existing(Rc::new(FakeBridge::new()));
        assert!(connect(&host, "").is_none());
    }

    #[test]
    fn existing_bridge_is_reused_without_injection() {
        let existing = Rc::new(FakeBridge::new());
        let host = FakeBridgeHost::with_existing(existing.clone());

        assert!(connect(&host, "G-TEST123").is_some());
        assert!(host.injected_scripts().is_empty());
        assert!(existing.recorded_commands().is_empty());
    }

    #[test]
    fn fresh_load_injects_script_and_configures() {
        let host = FakeBridgeHost::new();
        let bridge = connect(&host, "G-TEST123");
        assert!(bridge.is_some());

        assert_eq!(
            host.injected_scripts(),
            vec![script_url("G-TEST123")]
        );

        let commands = host.queue().recorded_commands();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].command(), "js");
        match &commands[1] {
            BridgeCommand::Config { target, params } => {
                assert_eq!(target, "G-TEST123");
                assert_eq!(params["anonymize_ip"], Value::Bool(true));
                assert_eq!(params["cookie_flags"], json!("SameSite=None;Secure"));
            }
            other => panic!("expected config, got {other:?}"),
        }
    }

    #[test]
    fn injection_failure_leaves_no_bridge() {
        let host = FakeBridgeHost::failing();
        assert!(connect(&host, "G-TEST123").is_none());
    }

    #[test]
    fn command_serializes_with_verb_tag() {
        let event = BridgeCommand::Event {
            name: "cta_click".into(),
            params: Params::new(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["command"], json!("event"));
        assert_eq!(value["name"], json!("cta_click"));
    }
}
