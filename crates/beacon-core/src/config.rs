//! Tracker configuration.
//!
//! Native hosts load a TOML document; the browser binding receives the
//! options object passed to `initAnalytics` as JSON. Both share one serde
//! model, so the camelCase option names the page script uses are accepted
//! as aliases. Flags take any JSON value and follow JavaScript truthiness
//! (`1`, `"yes"` and `{}` are on; `0`, `""` and `null` are off), the same
//! way the page script reads them.
//!
//! ```toml
//! measurement_id = "G-XXXXXXX"
//! debug_mode = true
//!
//! [storage]
//! max_events = 500
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::ConfigError;
use crate::store::{EVENTS_KEY, MAX_EVENTS, SESSION_KEY};

/// Top-level tracker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Vendor measurement id. Empty disables the analytics bridge; events
    /// are still logged locally.
    #[serde(alias = "measurementId")]
    pub measurement_id: String,
    /// Write every tracked event to the diagnostic log.
    #[serde(alias = "debugMode", deserialize_with = "truthy")]
    pub debug_mode: bool,
    /// Publish the tracker handle as `window.analytics`.
    #[serde(alias = "exposeGlobal", deserialize_with = "truthy")]
    pub expose_global: bool,
    /// Track the `email-copied` page signal as `value_copy`.
    #[serde(alias = "trackCopySignal", deserialize_with = "truthy")]
    pub track_copy_signal: bool,
    pub storage: StorageConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            measurement_id: String::new(),
            debug_mode: false,
            expose_global: false,
            track_copy_signal: false,
            storage: StorageConfig::default(),
        }
    }
}

/// Where and how much the local event log keeps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    #[serde(alias = "eventsKey")]
    pub events_key: String,
    #[serde(alias = "sessionKey")]
    pub session_key: String,
    #[serde(alias = "maxEvents")]
    pub max_events: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            events_key: EVENTS_KEY.into(),
            session_key: SESSION_KEY.into(),
            max_events: MAX_EVENTS,
        }
    }
}

impl TrackerConfig {
    /// Default configuration for `measurement_id`.
    pub fn with_measurement_id(measurement_id: &str) -> Self {
        Self {
            measurement_id: measurement_id.to_string(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON options object. `null` and the empty string mean
    /// "all defaults".
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        let trimmed = source.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Ok(Self::default());
        }
        let config: Self = serde_json::from_str(trimmed).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// [`from_json_str`](Self::from_json_str) for the browser entry point:
    /// a document that does not parse or validate is logged and replaced by
    /// the defaults, so a bad options object never stops tracking.
    pub fn from_json_or_default(source: &str) -> Self {
        match Self::from_json_str(source) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("ignoring tracker options: {e}");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.events_key.is_empty() {
            return Err(invalid("storage.events_key", "must not be empty"));
        }
        if self.storage.session_key.is_empty() {
            return Err(invalid("storage.session_key", "must not be empty"));
        }
        if self.storage.max_events == 0 {
            return Err(invalid("storage.max_events", "must be at least 1"));
        }
        Ok(())
    }
}

/// JavaScript truthiness of any JSON value.
fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.into(),
        reason: reason.into(),
    }
}
