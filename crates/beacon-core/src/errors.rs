//! Error types for the beacon kernel.
//!
//! This module defines the full error taxonomy:
//!
//! - [`BeaconError`] — top-level enum wrapping all component errors
//! - [`StoreError`] — key/value store access failures
//! - [`BridgeError`] — analytics bridge loading and command failures
//! - [`ConfigError`] — configuration parsing and validation
//!
//! Store and bridge errors never reach the host page: the tracker catches
//! them once at its boundary and turns them into logged no-ops. They are
//! still typed so collaborators can report precisely and tests can assert
//! on them.
//!
//! All types derive `Serialize` so errors can cross the JSON boundary
//! to the wasm bridge.

use serde::Serialize;

// -- StoreError --

/// Key/value store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
pub enum StoreError {
    /// The store does not exist in this environment (private browsing,
    /// storage disabled, no window).
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    /// A write was rejected because the store is full.
    #[error("store quota exceeded writing {key}")]
    QuotaExceeded { key: String },

    /// Filesystem-backed store I/O failure.
    #[error("store io error: {message}")]
    Io { message: String },

    /// Catch-all for other store errors.
    #[error("{message}")]
    Other { message: String },
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io {
            message: e.to_string(),
        }
    }
}

// -- BridgeError --

/// Analytics bridge errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
pub enum BridgeError {
    /// The vendor script element could not be created or attached.
    #[error("script injection failed: {message}")]
    ScriptInjection { message: String },

    /// The command queue could not be installed.
    #[error("command queue install failed: {message}")]
    QueueInstall { message: String },

    /// The bridge threw while handling a command.
    #[error("bridge command {command} failed: {message}")]
    CommandFailed { command: String, message: String },
}

// -- ConfigError --

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
pub enum ConfigError {
    /// The configuration document could not be parsed.
    #[error("config parse error: {message}")]
    Parse { message: String },

    /// A field holds a value the tracker cannot work with.
    #[error("invalid config {field}: {reason}")]
    Invalid { field: String, reason: String },
}

// -- BeaconError --

/// Top-level error enum wrapping all component errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
pub enum BeaconError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
