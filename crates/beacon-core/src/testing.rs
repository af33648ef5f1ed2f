//! Test fakes for beacon collaborator traits.
//!
//! Concrete, predictable implementations of the traits in
//! [`crate::traits`]. Every fake records what it was asked to do so tests
//! can assert both behaviour and interaction patterns.
//!
//! # Design Decisions
//!
//! - **Concrete fakes** with recorded state, no mocking framework.
//! - **`RefCell` for interior mutability**: fakes are shared as
//!   `Rc<dyn Trait>` on a single thread, same as the real collaborators.
//!
//! # Connections
//!
//! Used by kernel-internal tests (bridge, store, tracker) and by downstream
//! crates through the public `testing` module. The in-memory store lives in
//! [`crate::store::MemoryStore`] because non-browser hosts use it for real.

use std::cell::RefCell;
use std::rc::Rc;

use crate::bridge::BridgeCommand;
use crate::errors::{BridgeError, StoreError};
use crate::models::PageSnapshot;
use crate::traits::{AnalyticsBridge, BridgeHost, KeyValueStore, PageContext};

// ---------------------------------------------------------------------------
// FakeBridge
// ---------------------------------------------------------------------------

/// A bridge that records every command it receives.
pub struct FakeBridge {
    commands: RefCell<Vec<BridgeCommand>>,
    failing: bool,
}

impl FakeBridge {
    pub fn new() -> Self {
        Self {
            commands: RefCell::new(Vec::new()),
            failing: false,
        }
    }

    /// A bridge that records commands but reports every one as failed.
    pub fn failing() -> Self {
        Self {
            commands: RefCell::new(Vec::new()),
            failing: true,
        }
    }

    /// Return a clone of all recorded commands.
    pub fn recorded_commands(&self) -> Vec<BridgeCommand> {
        self.commands.borrow().clone()
    }

    /// Names of all recorded `event` commands, in order.
    pub fn event_names(&self) -> Vec<String> {
        self.commands
            .borrow()
            .iter()
            .filter_map(|c| match c {
                BridgeCommand::Event { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Default for FakeBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyticsBridge for FakeBridge {
    fn send(&self, command: BridgeCommand) -> Result<(), BridgeError> {
        let verb = command.command();
        self.commands.borrow_mut().push(command);
        if self.failing {
            return Err(BridgeError::CommandFailed {
                command: verb.into(),
                message: "fake bridge failure".into(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeBridgeHost
// ---------------------------------------------------------------------------

/// A bridge host that records injected scripts and hands out a
/// [`FakeBridge`] as its queue.
pub struct FakeBridgeHost {
    existing: Option<Rc<dyn AnalyticsBridge>>,
    queue: Rc<FakeBridge>,
    scripts: RefCell<Vec<String>>,
    failing: bool,
}

impl FakeBridgeHost {
    /// A host with no bridge installed yet.
    pub fn new() -> Self {
        Self {
            existing: None,
            queue: Rc::new(FakeBridge::new()),
            scripts: RefCell::new(Vec::new()),
            failing: false,
        }
    }

    /// A host where another script already installed `bridge`.
    pub fn with_existing(bridge: Rc<dyn AnalyticsBridge>) -> Self {
        Self {
            existing: Some(bridge),
            ..Self::new()
        }
    }

    /// A host whose script injection always fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new()
        }
    }

    /// Script URLs passed to `inject_script`.
    pub fn injected_scripts(&self) -> Vec<String> {
        self.scripts.borrow().clone()
    }

    /// The bridge returned by `install_queue`.
    pub fn queue(&self) -> Rc<FakeBridge> {
        self.queue.clone()
    }
}

impl Default for FakeBridgeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeHost for FakeBridgeHost {
    fn existing(&self) -> Option<Rc<dyn AnalyticsBridge>> {
        self.existing.clone()
    }

    fn inject_script(&self, src: &str) -> Result<(), BridgeError> {
        if self.failing {
            return Err(BridgeError::ScriptInjection {
                message: "fake host refuses scripts".into(),
            });
        }
        self.scripts.borrow_mut().push(src.to_string());
        Ok(())
    }

    fn install_queue(&self) -> Result<Rc<dyn AnalyticsBridge>, BridgeError> {
        Ok(self.queue.clone())
    }
}

// ---------------------------------------------------------------------------
// FailingStore
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum FailureMode {
    Unavailable,
    QuotaExceeded,
}

/// A store that fails the way browser storage does.
pub struct FailingStore {
    mode: FailureMode,
}

impl FailingStore {
    /// Every operation fails with [`StoreError::Unavailable`].
    pub fn unavailable() -> Self {
        Self {
            mode: FailureMode::Unavailable,
        }
    }

    /// Reads see an empty store; every write fails with
    /// [`StoreError::QuotaExceeded`].
    pub fn quota_exceeded() -> Self {
        Self {
            mode: FailureMode::QuotaExceeded,
        }
    }
}

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        match self.mode {
            FailureMode::Unavailable => Err(StoreError::Unavailable {
                message: "fake store disabled".into(),
            }),
            FailureMode::QuotaExceeded => Ok(None),
        }
    }

    fn set(&self, key: &str, _value: &str) -> Result<(), StoreError> {
        match self.mode {
            FailureMode::Unavailable => Err(StoreError::Unavailable {
                message: "fake store disabled".into(),
            }),
            FailureMode::QuotaExceeded => Err(StoreError::QuotaExceeded { key: key.into() }),
        }
    }

    fn remove(&self, _key: &str) -> Result<(), StoreError> {
        match self.mode {
            FailureMode::Unavailable => Err(StoreError::Unavailable {
                message: "fake store disabled".into(),
            }),
            FailureMode::QuotaExceeded => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// FakePage
// ---------------------------------------------------------------------------

/// A page whose title, URL and viewport tests can change between events.
pub struct FakePage {
    snapshot: RefCell<PageSnapshot>,
}

impl FakePage {
    /// A desktop-width page at `https://example.test/`.
    pub fn new() -> Self {
        Self::with_snapshot(PageSnapshot {
            title: "Home".into(),
            location: "https://example.test/".into(),
            path: "/".into(),
            viewport_width: 1280.0,
        })
    }

    pub fn with_snapshot(snapshot: PageSnapshot) -> Self {
        Self {
            snapshot: RefCell::new(snapshot),
        }
    }

    pub fn set_viewport_width(&self, width: f64) {
        self.snapshot.borrow_mut().viewport_width = width;
    }

    /// Simulate client-side navigation to `path` on the same origin.
    pub fn navigate(&self, path: &str) {
        let mut snapshot = self.snapshot.borrow_mut();
        snapshot.path = path.to_string();
        snapshot.location = format!("https://example.test{path}");
    }
}

impl Default for FakePage {
    fn default() -> Self {
        Self::new()
    }
}

impl PageContext for FakePage {
    fn snapshot(&self) -> PageSnapshot {
        self.snapshot.borrow().clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
