//! Persistence for the local event log and the session identifier.
//!
//! Two [`KeyValueStore`] implementations live here:
//!
//! - [`MemoryStore`] — a `HashMap` behind a `RefCell`, for tests and hosts
//!   without browser storage.
//! - [`FileStore`] — one file per key in a directory, for native hosts.
//!
//! On top of any store:
//!
//! - [`EventLog`] — the capped, append-only log of enriched events, kept as
//!   one JSON array under a single key. Unreadable or malformed content
//!   reads as an empty log and is overwritten by the next append.
//! - [`SessionIds`] — the lazily created `session_<epoch-ms>_<suffix>` id.
//!
//! # Concurrency
//!
//! `append` is load → push → trim → save. Within one tab nothing can run
//! between those steps. Two tabs sharing one origin store each do their own
//! read-modify-write and the later save wins, dropping whatever the other
//! tab appended in between. There is no cross-tab coordination.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::Utc;
use rand::Rng;

use crate::errors::StoreError;
use crate::models::EventRecord;
use crate::traits::KeyValueStore;

/// Default key for the event log in the origin-scoped store.
pub const EVENTS_KEY: &str = "analytics_events";
/// Default key for the session id in the session-scoped store.
pub const SESSION_KEY: &str = "analytics_session_id";
/// Default cap on stored events.
pub const MAX_EVENTS: usize = 1000;

const SESSION_SUFFIX_LEN: usize = 7;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory key/value store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// Directory-backed key/value store: each key is a file named after it.
///
/// Writes go to a temporary sibling and are renamed into place, so a reader
/// never observes a half-written value.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Use `dir` as the store root. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(StoreError::Other {
                message: format!("invalid store key: {key:?}"),
            });
        }
        Ok(self.dir.join(key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        let tmp = self.dir.join(format!(".{key}.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// EventLog
// ---------------------------------------------------------------------------

/// Capped, append-only event log persisted under one key.
pub struct EventLog {
    store: Rc<dyn KeyValueStore>,
    key: String,
    max_events: usize,
}

impl EventLog {
    pub fn new(store: Rc<dyn KeyValueStore>, key: &str, max_events: usize) -> Self {
        Self {
            store,
            key: key.to_string(),
            max_events,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn max_events(&self) -> usize {
        self.max_events
    }

    /// Read the whole log, oldest first.
    ///
    /// A missing key, a store read failure, and content that does not parse
    /// as a list of records all read as an empty log.
    pub fn load(&self) -> Vec<EventRecord> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                log::debug!("event log unreadable, treating as empty: {e}");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<EventRecord>>(&raw) {
            Ok(records) => records,
            Err(e) => {
                log::debug!("event log malformed, treating as empty: {e}");
                Vec::new()
            }
        }
    }

    /// Replace the stored log with `records`.
    pub fn save(&self, records: &[EventRecord]) -> Result<(), StoreError> {
        let json = serde_json::to_string(records).map_err(|e| StoreError::Other {
            message: format!("event log serialize: {e}"),
        })?;
        self.store.set(&self.key, &json)
    }

    /// Append `record`, evicting the oldest entries beyond the cap.
    pub fn append(&self, record: EventRecord) -> Result<(), StoreError> {
        let mut records = self.load();
        records.push(record);
        if records.len() > self.max_events {
            let overflow = records.len() - self.max_events;
            records.drain(..overflow);
        }
        self.save(&records)
    }

    /// Remove the log entirely.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(&self.key)
    }
}

// ---------------------------------------------------------------------------
// SessionIds
// ---------------------------------------------------------------------------

/// Session identifier persisted in a session-scoped store.
pub struct SessionIds {
    store: Rc<dyn KeyValueStore>,
    key: String,
}

impl SessionIds {
    pub fn new(store: Rc<dyn KeyValueStore>, key: &str) -> Self {
        Self {
            store,
            key: key.to_string(),
        }
    }

    /// The stored id, creating and persisting one on first use.
    pub fn current(&self) -> Result<String, StoreError> {
        if let Some(id) = self.store.get(&self.key)? {
            if !id.is_empty() {
                return Ok(id);
            }
        }
        let id = generate_session_id();
        self.store.set(&self.key, &id)?;
        Ok(id)
    }
}

/// A fresh `session_<epoch-ms>_<7 base36 chars>` identifier.
pub fn generate_session_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SESSION_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("session_{}_{suffix}", Utc::now().timestamp_millis())
}

/// Whether `id` has the `session_<digits>_<alphanumeric>` shape.
pub fn is_session_id(id: &str) -> bool {
    let Some(rest) = id.strip_prefix("session_") else {
        return false;
    };
    let Some((millis, suffix)) = rest.split_once('_') else {
        return false;
    };
    !millis.is_empty()
        && millis.chars().all(|c| c.is_ascii_digit())
        && !suffix.is_empty()
        && suffix.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Params;
    use crate::testing::FailingStore;
    use serde_json::json;

    fn record(name: &str, n: usize) -> EventRecord {
        let mut params = Params::new();
        params.insert("n".into(), json!(n));
        EventRecord::new(name, params)
    }

    fn memory_log(max: usize) -> (Rc<MemoryStore>, EventLog) {
        let store = Rc::new(MemoryStore::new());
        let log = EventLog::new(store.clone(), EVENTS_KEY, max);
        (store, log)
    }

    #[test]
    fn append_then_load_preserves_order() {
        let (_store, log) = memory_log(MAX_EVENTS);
        log.append(record("a", 1)).unwrap();
        log.append(record("b", 2)).unwrap();

        let events: Vec<String> = log.load().into_iter().map(|r| r.event).collect();
        assert_eq!(events, vec!["a", "b"]);
    }

    #[test]
    fn appending_past_cap_evicts_oldest() {
        let (_store, log) = memory_log(MAX_EVENTS);
        let records: Vec<EventRecord> = (0..MAX_EVENTS).map(|n| record("e", n)).collect();
        log.save(&records).unwrap();

        log.append(record("e", MAX_EVENTS)).unwrap();

        let loaded = log.load();
        assert_eq!(loaded.len(), MAX_EVENTS);
        assert_eq!(loaded[0].parameters["n"], json!(1));
        assert_eq!(loaded[MAX_EVENTS - 1].parameters["n"], json!(MAX_EVENTS));
    }

    #[test]
    fn oversized_stored_log_is_trimmed_on_next_append() {
        let (_store, log) = memory_log(3);
        let records: Vec<EventRecord> = (0..10).map(|n| record("e", n)).collect();
        log.save(&records).unwrap();

        log.append(record("e", 10)).unwrap();

        let ns: Vec<_> = log.load().iter().map(|r| r.parameters["n"].clone()).collect();
        assert_eq!(ns, vec![json!(8), json!(9), json!(10)]);
    }

    #[test]
    fn clear_then_load_is_empty() {
        let (_store, log) = memory_log(MAX_EVENTS);
        log.append(record("a", 1)).unwrap();
        log.clear().unwrap();
        assert!(log.load().is_empty());
    }

    #[test]
    fn corrupt_log_reads_empty_and_is_overwritten() {
        let (store, log) = memory_log(MAX_EVENTS);
        store.set(EVENTS_KEY, "{not json").unwrap();
        assert!(log.load().is_empty());

        log.append(record("a", 1)).unwrap();
        assert_eq!(log.load().len(), 1);
    }

    #[test]
    fn unnamed_foreign_entry_keeps_rest_of_log() {
        let (store, log) = memory_log(MAX_EVENTS);
        store
            .set(
                EVENTS_KEY,
                r#"[{"event":"page_view","page_path":"/"},{"source":"other-script"}]"#,
            )
            .unwrap();

        let records = log.load();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].event, "page_view");
        assert_eq!(records[1].event, "");
        assert_eq!(records[1].parameters["source"], json!("other-script"));

        log.append(record("a", 1)).unwrap();
        assert_eq!(log.load().len(), 3);
    }

    #[test]
    fn non_array_log_reads_empty() {
        let (store, log) = memory_log(MAX_EVENTS);
        store.set(EVENTS_KEY, r#"{"event":"page_view"}"#).unwrap();
        assert!(log.load().is_empty());
    }

    #[test]
    fn unavailable_store_reads_empty_and_reports_write_failure() {
        let log = EventLog::new(Rc::new(FailingStore::unavailable()), EVENTS_KEY, MAX_EVENTS);
        assert!(log.load().is_empty());
        assert!(matches!(
            log.append(record("a", 1)),
            Err(StoreError::Unavailable { .. })
        ));
    }

    #[test]
    fn quota_exceeded_is_reported() {
        let log = EventLog::new(Rc::new(FailingStore::quota_exceeded()), EVENTS_KEY, MAX_EVENTS);
        assert_eq!(
            log.append(record("a", 1)),
            Err(StoreError::QuotaExceeded {
                key: EVENTS_KEY.into()
            })
        );
    }

    // Two tabs share one origin store and interleave their read-modify-write
    // cycles. The later save wins and the other tab's entry is lost. This is
    // a known limitation of the log, not something append guards against.
    #[test]
    fn concurrent_tabs_lose_updates() {
        let shared = Rc::new(MemoryStore::new());
        let tab_a = EventLog::new(shared.clone(), EVENTS_KEY, MAX_EVENTS);
        let tab_b = EventLog::new(shared.clone(), EVENTS_KEY, MAX_EVENTS);

        let mut a_snapshot = tab_a.load();
        tab_b.append(record("from_b", 1)).unwrap();
        a_snapshot.push(record("from_a", 2));
        tab_a.save(&a_snapshot).unwrap();

        let events: Vec<String> = tab_b.load().into_iter().map(|r| r.event).collect();
        assert_eq!(events, vec!["from_a"]);
    }

    #[test]
    fn session_id_is_created_once_and_reused() {
        let ids = SessionIds::new(Rc::new(MemoryStore::new()), SESSION_KEY);
        let first = ids.current().unwrap();
        let second = ids.current().unwrap();
        assert_eq!(first, second);
        assert!(is_session_id(&first), "bad session id: {first}");
    }

    #[test]
    fn session_id_read_from_existing_store() {
        let store = Rc::new(MemoryStore::new());
        store.set(SESSION_KEY, "session_1700000000000_abc1234").unwrap();
        let ids = SessionIds::new(store, SESSION_KEY);
        assert_eq!(ids.current().unwrap(), "session_1700000000000_abc1234");
    }

    #[test]
    fn session_id_fails_when_store_unavailable() {
        let ids = SessionIds::new(Rc::new(FailingStore::unavailable()), SESSION_KEY);
        assert!(ids.current().is_err());
    }

    #[test]
    fn generated_session_ids_differ() {
        assert_ne!(generate_session_id(), generate_session_id());
    }

    #[test]
    fn session_id_shape() {
        assert!(is_session_id("session_1700000000000_k3j9x0a"));
        assert!(!is_session_id("session__abc"));
        assert!(!is_session_id("session_123_"));
        assert!(!is_session_id("sess_123_abc"));
        assert!(!is_session_id("session_12a_abc"));
    }

    #[test]
    fn file_store_round_trip_and_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("storage"));

        assert_eq!(store.get(EVENTS_KEY).unwrap(), None);
        store.set(EVENTS_KEY, "[]").unwrap();
        assert_eq!(store.get(EVENTS_KEY).unwrap().as_deref(), Some("[]"));

        store.remove(EVENTS_KEY).unwrap();
        store.remove(EVENTS_KEY).unwrap();
        assert_eq!(store.get(EVENTS_KEY).unwrap(), None);
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.set("../escape", "x").is_err());
        assert!(store.get("a/b").is_err());
        assert!(store.get(".hidden").is_err());
    }

    #[test]
    fn event_log_over_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let log = EventLog::new(Rc::new(FileStore::new(dir.path())), EVENTS_KEY, MAX_EVENTS);
            log.append(record("page_view", 1)).unwrap();
        }
        let reopened = EventLog::new(Rc::new(FileStore::new(dir.path())), EVENTS_KEY, MAX_EVENTS);
        assert_eq!(reopened.load().len(), 1);
    }
}
