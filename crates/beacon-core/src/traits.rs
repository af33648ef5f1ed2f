//! Collaborator contract traits for the beacon kernel.
//!
//! The tracker never reaches into ambient global state. Everything it talks
//! to (the analytics vendor, the two browser stores, the page itself) is
//! injected at construction as `Rc<dyn Trait>`.
//!
//! # Design Decisions
//!
//! - **`Rc`, not `Arc`**: tracking runs on the UI thread only and the
//!   browser handles behind the web implementations are not `Send`.
//! - **`&self` everywhere**: implementations use interior mutability, so
//!   one collaborator can be shared by the tracker and its listeners.
//! - **`Result` at every fallible seam**: the tracker is the only place
//!   failures become no-ops.
//!
//! # Connections
//!
//! - [`AnalyticsBridge`] receives [`BridgeCommand`]s from [`crate::bridge`]
//!   and [`crate::tracker`].
//! - [`BridgeHost`] is consulted once by [`crate::bridge::connect`].
//! - [`KeyValueStore`] backs [`crate::store::EventLog`] and
//!   [`crate::store::SessionIds`].
//! - [`PageContext`] feeds enrichment and the `page_view` event.

use std::rc::Rc;

use crate::bridge::BridgeCommand;
use crate::errors::{BridgeError, StoreError};
use crate::models::PageSnapshot;

// ---------------------------------------------------------------------------
// AnalyticsBridge
// ---------------------------------------------------------------------------

/// The vendor's command-queue function (`gtag` in the browser).
///
/// Implementations should not fail in practice; an `Err` is logged by the
/// caller and otherwise ignored.
pub trait AnalyticsBridge {
    fn send(&self, command: BridgeCommand) -> Result<(), BridgeError>;
}

// ---------------------------------------------------------------------------
// BridgeHost
// ---------------------------------------------------------------------------

/// The environment that can provide or load an [`AnalyticsBridge`].
pub trait BridgeHost {
    /// A bridge some other script already installed, if any.
    fn existing(&self) -> Option<Rc<dyn AnalyticsBridge>>;

    /// Start loading the vendor script from `src`. Must not block on the
    /// load completing.
    fn inject_script(&self, src: &str) -> Result<(), BridgeError>;

    /// Install the command queue and return a bridge that feeds it.
    /// Commands sent before the vendor script finishes loading wait in the
    /// queue.
    fn install_queue(&self) -> Result<Rc<dyn AnalyticsBridge>, BridgeError>;
}

// ---------------------------------------------------------------------------
// KeyValueStore
// ---------------------------------------------------------------------------

/// A string key/value store (`localStorage`, `sessionStorage`, a directory).
pub trait KeyValueStore {
    /// Read `key`. `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// PageContext
// ---------------------------------------------------------------------------

/// Read access to the current document and viewport.
pub trait PageContext {
    /// Current title, URL, path and viewport width. Called on every tracked
    /// event, so it must reflect resizes and client-side navigation.
    fn snapshot(&self) -> PageSnapshot;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::{FakeBridge, FakeBridgeHost, FakePage};

    #[test]
    fn traits_are_object_safe() {
        let _bridge: Rc<dyn AnalyticsBridge> = Rc::new(FakeBridge::new());
        let _host: Rc<dyn BridgeHost> = Rc::new(FakeBridgeHost::new());
        let _store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
        let _page: Rc<dyn PageContext> = Rc::new(FakePage::new());
    }
}
