//! Snapshots of live DOM elements as [`ElementInfo`].

use wasm_bindgen::JsCast;
use web_sys::{Element, Event, HtmlAnchorElement, HtmlInputElement};

use beacon_core::classify::{AncestorInfo, ElementInfo};

/// How deep below the snapshotted element children are copied.
const MAX_DEPTH: usize = 12;

/// Element, subtree and ancestry.
pub fn snapshot(element: &Element) -> ElementInfo {
    let mut info = describe(element, MAX_DEPTH);
    info.ancestors = ancestors(element);
    info
}

/// Element and ancestry, no children.
pub fn snapshot_shallow(element: &Element) -> ElementInfo {
    let mut info = describe(element, 0);
    info.ancestors = ancestors(element);
    info
}

/// The event target, when it is an element.
pub fn target_element(event: &Event) -> Option<Element> {
    event.target()?.dyn_into::<Element>().ok()
}

fn describe(element: &Element, depth: usize) -> ElementInfo {
    let mut info = ElementInfo::new(&element.tag_name());

    for name in element.get_attribute_names().iter() {
        let Some(name) = name.as_string() else {
            continue;
        };
        if let Some(value) = element.get_attribute(&name) {
            info.attributes.insert(name, value);
        }
    }

    // Properties that differ from the markup.
    if let Some(anchor) = element.dyn_ref::<HtmlAnchorElement>() {
        info.attributes.insert("href".into(), anchor.href());
    }
    if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
        info.attributes.insert("type".into(), input.type_());
    }

    info.text = element.text_content().unwrap_or_default();

    if depth > 0 {
        let children = element.children();
        for i in 0..children.length() {
            if let Some(child) = children.item(i) {
                info.children.push(describe(&child, depth - 1));
            }
        }
    }
    info
}

fn ancestors(element: &Element) -> Vec<AncestorInfo> {
    let mut out = Vec::new();
    let mut current = element.parent_element();
    while let Some(parent) = current {
        out.push(
            AncestorInfo::new(&parent.tag_name())
                .with_id(&parent.id())
                .with_class(&parent.class_name()),
        );
        current = parent.parent_element();
    }
    out
}
