//! beacon-core: first-party interaction tracking for a marketing site.
//!
//! Classifies page interactions into named events, enriches them with
//! page and session context, forwards them to an optional external
//! analytics bridge and keeps a capped local log. No browser dependency:
//! the browser binding (`beacon-web`) supplies the collaborators in
//! [`traits`]; native hosts can use [`store::MemoryStore`] or
//! [`store::FileStore`].
//!
//! # Crate Organization
//!
//! - `events` — Canonical event name constants
//! - `errors` — Error types (StoreError, BridgeError, ConfigError)
//! - `models` — Event records, page snapshots, device classes
//! - `traits` — Collaborator contracts (AnalyticsBridge, KeyValueStore, ...)
//! - `bridge` — Analytics bridge command protocol and loader
//! - `store` — Key/value stores, the capped event log, session ids
//! - `classify` — Element structure to event classification
//! - `config` — TrackerConfig loading (TOML / JSON)
//! - `tracker` — The Tracker pipeline
//! - `testing` — Concrete fakes for the collaborator traits

pub mod bridge;
pub mod classify;
pub mod config;
pub mod errors;
pub mod events;
pub mod models;
pub mod store;
pub mod testing;
pub mod traits;
pub mod tracker;

pub use config::{StorageConfig, TrackerConfig};
pub use errors::{BeaconError, BridgeError, ConfigError, StoreError};
pub use models::{DeviceType, EventRecord, PageSnapshot, Params, TrackedEvent};
pub use tracker::{Host, Tracker};
