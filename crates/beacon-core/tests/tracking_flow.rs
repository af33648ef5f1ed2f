//! End-to-end flow: a page load, a few interactions, a reload.

use std::rc::Rc;

use beacon_core::classify::{AncestorInfo, ElementInfo, FieldInfo, FormInfo};
use beacon_core::store::{FileStore, MemoryStore};
use beacon_core::testing::{FakeBridgeHost, FakePage};
use beacon_core::traits::BridgeHost;
use beacon_core::{Host, Tracker, TrackerConfig};

fn tracker_over(
    dir: &std::path::Path,
    session: Rc<MemoryStore>,
    host: Rc<FakeBridgeHost>,
) -> Tracker {
    let config = TrackerConfig::from_toml_str(
        r#"
        measurement_id = "G-FLOW"
        track_copy_signal = true
        "#,
    )
    .unwrap();
    Tracker::new(
        config,
        Host {
            bridge_host: Some(host as Rc<dyn BridgeHost>),
            local_store: Rc::new(FileStore::new(dir)),
            session_store: session,
            page: Rc::new(FakePage::new()),
        },
    )
    .unwrap()
}

#[test]
fn visit_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let session = Rc::new(MemoryStore::new());
    let host = Rc::new(FakeBridgeHost::new());

    let tracker = tracker_over(dir.path(), session.clone(), host.clone());
    tracker.initialize();

    let email = ElementInfo::new("a")
        .with_attr("href", "mailto:hello@example.test")
        .with_text("hello@example.test");
    tracker.handle_click(&email).unwrap();

    let cta = ElementInfo::new("button")
        .with_class("btn btn--primary")
        .with_text("Book a call")
        .within(AncestorInfo::new("section").with_id("pricing"));
    tracker.handle_click(&cta).unwrap();

    let field = FieldInfo::from_element(
        &ElementInfo::new("input")
            .with_attr("type", "email")
            .with_attr("name", "email")
            .within(AncestorInfo::new("form").with_id("contact-form")),
    )
    .unwrap();
    tracker.handle_focus(&field).unwrap();
    tracker.handle_submit(&FormInfo {
        id: "contact-form".into(),
        class_name: "form".into(),
    });
    tracker.handle_value_copied("hello@example.test").unwrap();

    let expected = vec![
        "page_view",
        "email_click",
        "cta_click",
        "form_field_focus",
        "form_submit",
        "value_copy",
    ];
    assert_eq!(host.queue().event_names(), expected);

    // Same tab reloads: new tracker, same stores.
    let reloaded = tracker_over(dir.path(), session, Rc::new(FakeBridgeHost::new()));
    let stored = reloaded.stored_events();
    let names: Vec<&str> = stored.iter().map(|r| r.event.as_str()).collect();
    assert_eq!(names, expected);

    let session_id = tracker.session_id();
    assert!(stored.iter().all(|r| r.session_id() == Some(session_id.as_str())));
    assert_eq!(reloaded.session_id(), session_id);

    reloaded.clear_stored_events();
    assert!(tracker.stored_events().is_empty());
}

#[test]
fn new_tab_gets_new_session_but_shares_log() {
    let dir = tempfile::tempdir().unwrap();
    let first = tracker_over(
        dir.path(),
        Rc::new(MemoryStore::new()),
        Rc::new(FakeBridgeHost::new()),
    );
    let second = tracker_over(
        dir.path(),
        Rc::new(MemoryStore::new()),
        Rc::new(FakeBridgeHost::new()),
    );

    first.track("link_click", Default::default());
    second.track("link_click", Default::default());

    assert_ne!(first.session_id(), second.session_id());
    assert_eq!(first.stored_events().len(), 2);
}
