//! Interaction classification: pure functions from element structure to
//! named events.
//!
//! The browser binding snapshots the interacted element into an
//! [`ElementInfo`] (tag, attributes, text, subtree, ancestry) and hands it
//! here. Nothing in this module touches a live DOM, so every rule is unit
//! testable.
//!
//! # Click rules
//!
//! Only the closest element that is an `a`, a `button`, or carries
//! `data-track` is considered ([`closest_trackable`]). For anchors, in order:
//!
//! | Condition                       | Kind                      |
//! |---------------------------------|---------------------------|
//! | `href` starts with `mailto:`    | [`ClickKind::EmailClick`] |
//! | `href` starts with `tel:`       | [`ClickKind::PhoneClick`] |
//! | `target="_blank"`               | [`ClickKind::ExternalLink`] |
//! | class `social-link`             | [`ClickKind::SocialClick`] |
//! | otherwise                       | [`ClickKind::PlainLink`]  |
//!
//! Non-anchors that are a `button` or have class `btn` are
//! [`ClickKind::CtaClick`]; anything else is [`ClickKind::Unclassified`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::events;
use crate::models::Params;

/// Maximum characters kept in `element_text`.
pub const MAX_ELEMENT_TEXT: usize = 100;

// ---------------------------------------------------------------------------
// Element structure
// ---------------------------------------------------------------------------

/// Summary of an ancestor element, enough for `closest()` lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AncestorInfo {
    pub tag: String,
    pub id: String,
    pub class_name: String,
}

impl AncestorInfo {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn with_class(mut self, class_name: &str) -> Self {
        self.class_name = class_name.to_string();
        self
    }
}

/// Structural description of an element.
///
/// `attributes["href"]` holds the resolved link target for anchors (what
/// `HTMLAnchorElement.href` returns), not necessarily the literal markup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInfo {
    /// Lower-case tag name.
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    /// `textContent`, including descendants.
    pub text: String,
    /// Child elements in document order.
    pub children: Vec<ElementInfo>,
    /// Ancestors, nearest first.
    pub ancestors: Vec<AncestorInfo>,
}

/// A selector over an element's descendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector<'s> {
    /// `.class`
    Class(&'s str),
    /// `.ancestor_class tag`
    TagWithin { tag: &'s str, ancestor_class: &'s str },
}

impl ElementInfo {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_id(self, id: &str) -> Self {
        self.with_attr("id", id)
    }

    pub fn with_class(self, class_name: &str) -> Self {
        self.with_attr("class", class_name)
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_child(mut self, child: ElementInfo) -> Self {
        self.children.push(child);
        self
    }

    /// Add an ancestor further out than any already present.
    pub fn within(mut self, ancestor: AncestorInfo) -> Self {
        self.ancestors.push(ancestor);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Attribute value, treating an empty value as absent.
    fn non_empty_attr(&self, name: &str) -> Option<&str> {
        self.attribute(name).filter(|v| !v.is_empty())
    }

    pub fn id(&self) -> &str {
        self.attribute("id").unwrap_or("")
    }

    pub fn class_name(&self) -> &str {
        self.attribute("class").unwrap_or("")
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.class_name().split_whitespace().any(|c| c == class)
    }

    /// Resolved link target; only anchors and image-map areas have one.
    pub fn link_target(&self) -> Option<&str> {
        match self.tag.as_str() {
            "a" | "area" => self.non_empty_attr("href"),
            _ => None,
        }
    }

    /// First non-empty of text content, `alt`, `title`.
    pub fn visible_text(&self) -> &str {
        if !self.text.is_empty() {
            return &self.text;
        }
        self.non_empty_attr("alt")
            .or_else(|| self.non_empty_attr("title"))
            .unwrap_or("")
    }

    /// `id` of the closest element with tag `tag`, this element included.
    pub fn closest_id(&self, tag: &str) -> Option<&str> {
        if self.tag == tag {
            return Some(self.id());
        }
        self.ancestors
            .iter()
            .find(|a| a.tag == tag)
            .map(|a| a.id.as_str())
    }

    /// First descendant matching any of `selectors`, in document order.
    pub fn query_any(&self, selectors: &[Selector<'_>]) -> Option<&ElementInfo> {
        let mut found = None;
        self.walk(&mut vec![self], &mut |node, chain| {
            if found.is_none() && selectors.iter().any(|s| matches(s, node, chain)) {
                found = Some(node);
            }
        });
        found
    }

    pub fn query(&self, selector: Selector<'_>) -> Option<&ElementInfo> {
        self.query_any(&[selector])
    }

    /// All descendants matching `selector`, in document order.
    pub fn query_all(&self, selector: Selector<'_>) -> Vec<&ElementInfo> {
        let mut out = Vec::new();
        self.walk(&mut vec![self], &mut |node, chain| {
            if matches(&selector, node, chain) {
                out.push(node);
            }
        });
        out
    }

    /// Pre-order walk over descendants. `chain` holds the path from `self`
    /// down to the visited node's parent.
    fn walk<'a, F>(&'a self, chain: &mut Vec<&'a ElementInfo>, visit: &mut F)
    where
        F: FnMut(&'a ElementInfo, &[&'a ElementInfo]),
    {
        for child in &self.children {
            visit(child, chain);
            chain.push(child);
            child.walk(chain, visit);
            chain.pop();
        }
    }
}

fn matches(selector: &Selector<'_>, node: &ElementInfo, chain: &[&ElementInfo]) -> bool {
    match selector {
        Selector::Class(class) => node.has_class(class),
        Selector::TagWithin { tag, ancestor_class } => {
            node.tag == *tag && chain.iter().any(|a| a.has_class(ancestor_class))
        }
    }
}

/// Text of the first match, if it is non-empty.
fn query_text<'a>(element: &'a ElementInfo, selectors: &[Selector<'_>]) -> Option<&'a str> {
    element
        .query_any(selectors)
        .map(|e| e.text.as_str())
        .filter(|t| !t.is_empty())
}

/// CSS form of [`is_trackable`], for `Element.closest()`.
pub const TRACKABLE_SELECTOR: &str = "a, button, [data-track]";

/// Whether a click on `element` is tracked at all.
pub fn is_trackable(element: &ElementInfo) -> bool {
    element.tag == "a" || element.tag == "button" || element.attribute("data-track").is_some()
}

/// Closest trackable element of a target-to-root chain.
pub fn closest_trackable(chain: &[ElementInfo]) -> Option<&ElementInfo> {
    chain.iter().find(|e| is_trackable(e))
}

// ---------------------------------------------------------------------------
// Classification output
// ---------------------------------------------------------------------------

/// A classified interaction ready to be tracked.
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    pub name: &'static str,
    pub params: Params,
}

/// Semantic kind of a click on a trackable element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickKind {
    EmailClick { email_address: String },
    PhoneClick { phone_number: String },
    ExternalLink,
    SocialClick { social_platform: String },
    PlainLink,
    CtaClick { section: String, button_text: String },
    Unclassified,
}

impl ClickKind {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::EmailClick { .. } => events::EMAIL_CLICK,
            Self::PhoneClick { .. } => events::PHONE_CLICK,
            Self::ExternalLink => events::EXTERNAL_LINK_CLICK,
            Self::SocialClick { .. } => events::SOCIAL_CLICK,
            Self::PlainLink => events::LINK_CLICK,
            Self::CtaClick { .. } => events::CTA_CLICK,
            Self::Unclassified => events::CLICK,
        }
    }

    fn extend_params(self, params: &mut Params) {
        match self {
            Self::EmailClick { email_address } => {
                params.insert("email_address".into(), json!(email_address));
            }
            Self::PhoneClick { phone_number } => {
                params.insert("phone_number".into(), json!(phone_number));
            }
            Self::SocialClick { social_platform } => {
                params.insert("social_platform".into(), json!(social_platform));
            }
            Self::CtaClick {
                section,
                button_text,
            } => {
                params.insert("section".into(), json!(section));
                params.insert("button_text".into(), json!(button_text));
            }
            Self::ExternalLink | Self::PlainLink | Self::Unclassified => {}
        }
    }
}

/// Decide what kind of click `element` represents.
pub fn classify_click(element: &ElementInfo) -> ClickKind {
    if element.tag == "a" {
        let href = element.link_target().unwrap_or("");
        if let Some(address) = href.strip_prefix("mailto:") {
            return ClickKind::EmailClick {
                email_address: address.to_string(),
            };
        }
        if let Some(number) = href.strip_prefix("tel:") {
            return ClickKind::PhoneClick {
                phone_number: number.to_string(),
            };
        }
        if element.attribute("target") == Some("_blank") {
            return ClickKind::ExternalLink;
        }
        if element.has_class("social-link") {
            let platform = query_text(element, &[Selector::Class("social-name")]);
            return ClickKind::SocialClick {
                social_platform: platform.unwrap_or("Unknown").to_string(),
            };
        }
        return ClickKind::PlainLink;
    }

    if element.tag == "button" || element.has_class("btn") {
        let section = element
            .closest_id("section")
            .filter(|id| !id.is_empty())
            .unwrap_or("unknown");
        return ClickKind::CtaClick {
            section: section.to_string(),
            button_text: element.visible_text().to_string(),
        };
    }

    ClickKind::Unclassified
}

fn string_or_null(value: &str) -> Value {
    if value.is_empty() {
        Value::Null
    } else {
        json!(value)
    }
}

/// Full click event: base element fields plus the kind-specific fields.
pub fn click_event(element: &ElementInfo) -> Interaction {
    let mut params = Params::new();
    let text: String = element.visible_text().chars().take(MAX_ELEMENT_TEXT).collect();

    params.insert("element_type".into(), json!(element.tag));
    params.insert("element_text".into(), json!(text));
    params.insert(
        "element_url".into(),
        element.link_target().map_or(Value::Null, |u| json!(u)),
    );
    params.insert("element_id".into(), string_or_null(element.id()));
    params.insert("element_classes".into(), string_or_null(element.class_name()));

    if let Some(label) = element.non_empty_attr("data-track") {
        params.insert("event_label".into(), json!(label));
    }

    let kind = classify_click(element);
    let name = kind.event_name();
    kind.extend_params(&mut params);
    Interaction { name, params }
}

// ---------------------------------------------------------------------------
// Forms
// ---------------------------------------------------------------------------

/// A submitted form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormInfo {
    pub id: String,
    pub class_name: String,
}

impl FormInfo {
    /// `None` unless `element` is a `form`.
    pub fn from_element(element: &ElementInfo) -> Option<Self> {
        (element.tag == "form").then(|| Self {
            id: element.id().to_string(),
            class_name: element.class_name().to_string(),
        })
    }
}

const FORM_TYPES: &[&str] = &["contact", "newsletter", "booking"];

/// Form purpose from its id and class, case-insensitive; first match in
/// `contact`, `newsletter`, `booking` order, else `unknown`.
pub fn form_type(id: &str, class_name: &str) -> &'static str {
    let id = id.to_lowercase();
    let class_name = class_name.to_lowercase();
    FORM_TYPES
        .iter()
        .find(|t| id.contains(*t) || class_name.contains(*t))
        .copied()
        .unwrap_or("unknown")
}

pub fn submit_event(form: &FormInfo, page_location: &str) -> Interaction {
    let mut params = Params::new();
    let form_id = if form.id.is_empty() { "unknown" } else { &form.id };
    params.insert("form_id".into(), json!(form_id));
    params.insert(
        "form_type".into(),
        json!(form_type(&form.id, &form.class_name)),
    );
    params.insert("page_location".into(), json!(page_location));
    Interaction {
        name: events::FORM_SUBMIT,
        params,
    }
}

/// A focused form control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub tag: String,
    /// The control's `type` property (`text`, `email`, `textarea`,
    /// `select-one`, ...).
    pub field_type: String,
    pub name: String,
    pub id: String,
    /// `id` of the enclosing form, empty when none or unnamed.
    pub form_id: String,
}

impl FieldInfo {
    /// Describe `element` the way the DOM reports it, `None` unless it is an
    /// `input`, `textarea` or `select`.
    pub fn from_element(element: &ElementInfo) -> Option<Self> {
        let field_type = match element.tag.as_str() {
            "input" => element
                .non_empty_attr("type")
                .map(str::to_ascii_lowercase)
                .unwrap_or_else(|| "text".into()),
            "textarea" => "textarea".into(),
            "select" if element.attribute("multiple").is_some() => "select-multiple".into(),
            "select" => "select-one".into(),
            _ => return None,
        };
        Some(Self {
            tag: element.tag.clone(),
            field_type,
            name: element.attribute("name").unwrap_or("").to_string(),
            id: element.id().to_string(),
            form_id: element.closest_id("form").unwrap_or("").to_string(),
        })
    }
}

/// `form_field_focus`, or `None` when the field is not a form control.
pub fn field_focus_event(field: &FieldInfo) -> Option<Interaction> {
    let tag = field.tag.to_ascii_lowercase();
    if !matches!(tag.as_str(), "input" | "textarea" | "select") {
        return None;
    }

    let field_type = if field.field_type.is_empty() {
        tag.as_str()
    } else {
        field.field_type.as_str()
    };
    let field_name = [field.name.as_str(), field.id.as_str()]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or("unknown");
    let form_id = if field.form_id.is_empty() {
        "unknown"
    } else {
        &field.form_id
    };

    let mut params = Params::new();
    params.insert("field_type".into(), json!(field_type));
    params.insert("field_name".into(), json!(field_name));
    params.insert("form_id".into(), json!(form_id));
    Some(Interaction {
        name: events::FORM_FIELD_FOCUS,
        params,
    })
}

// ---------------------------------------------------------------------------
// Site components
// ---------------------------------------------------------------------------

/// Site components with their own click tracking, bound per element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    ServiceCard,
    ConstellationStar,
    Testimonial,
    Booking,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 4] = [
        Self::ServiceCard,
        Self::ConstellationStar,
        Self::Testimonial,
        Self::Booking,
    ];

    /// CSS selector used to find instances at initialization.
    pub fn selector(&self) -> &'static str {
        match self {
            Self::ServiceCard => ".service-card",
            Self::ConstellationStar => ".constellation__star",
            Self::Testimonial => ".testimonial",
            Self::Booking => r#"[class*="booking"], [class*="calendly"]"#,
        }
    }

    pub fn matches(&self, element: &ElementInfo) -> bool {
        match self {
            Self::ServiceCard => element.has_class("service-card"),
            Self::ConstellationStar => element.has_class("constellation__star"),
            Self::Testimonial => element.has_class("testimonial"),
            Self::Booking => {
                let class_name = element.class_name();
                class_name.contains("booking") || class_name.contains("calendly")
            }
        }
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            Self::ServiceCard => events::SERVICE_INTEREST,
            Self::ConstellationStar => events::STRENGTH_INTERACTION,
            Self::Testimonial => events::TESTIMONIAL_CLICK,
            Self::Booking => events::BOOKING_INTERACTION,
        }
    }
}

/// Event for a click on a component instance.
pub fn component_event(kind: ComponentKind, element: &ElementInfo, page_location: &str) -> Interaction {
    let mut params = Params::new();
    match kind {
        ComponentKind::ServiceCard => {
            let title = query_text(element, &[Selector::Class("service-card__title")])
                .unwrap_or("Unknown Service");
            let price = query_text(
                element,
                &[
                    Selector::Class("service-card__price"),
                    Selector::Class("price__amount"),
                ],
            )
            .unwrap_or("");
            params.insert("service_name".into(), json!(title));
            params.insert("service_price".into(), json!(price));
        }
        ComponentKind::ConstellationStar => {
            let strength = element
                .non_empty_attr("data-strength")
                .or_else(|| query_text(element, &[Selector::Class("star__label")]))
                .unwrap_or("Unknown");
            params.insert("strength_name".into(), json!(strength));
        }
        ComponentKind::Testimonial => {
            let author = query_text(
                element,
                &[
                    Selector::TagWithin {
                        tag: "strong",
                        ancestor_class: "author__info",
                    },
                    Selector::Class("testimonial__author"),
                ],
            )
            .unwrap_or("Unknown");
            let strengths: Vec<&str> = element
                .query_all(Selector::Class("strength-badge"))
                .into_iter()
                .map(|b| b.text.as_str())
                .collect();
            params.insert("testimonial_author".into(), json!(author));
            params.insert("client_strengths".into(), json!(strengths.join(", ")));
        }
        ComponentKind::Booking => {
            params.insert("element_type".into(), json!(element.class_name()));
        }
    }
    params.insert("page_location".into(), json!(page_location));
    Interaction {
        name: kind.event_name(),
        params,
    }
}
