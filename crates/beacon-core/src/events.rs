//! Canonical event name constants for the beacon tracking vocabulary.
//!
//! Every tracked event, stored log record, and bridge `event` command
//! references its name through these constants. Names are flat
//! `snake_case` identifiers, the convention the analytics vendor expects.
//!
//! # Categories
//!
//! | Category   | Events                                                      |
//! |------------|-------------------------------------------------------------|
//! | Page       | `page_view`                                                 |
//! | Link       | `email_click`, `phone_click`, `external_link_click`, `social_click`, `link_click` |
//! | Control    | `cta_click`, `click`                                        |
//! | Form       | `form_submit`, `form_field_focus`                           |
//! | Component  | `service_interest`, `strength_interaction`, `testimonial_click`, `booking_interaction` |
//! | Signal     | `value_copy`                                                |
//!
//! The vocabulary is open: [`Tracker::track`](crate::tracker::Tracker::track)
//! accepts any name, these are the ones the built-in classifiers emit.

// --- Page ---

/// A page has been loaded and the tracker initialized.
pub const PAGE_VIEW: &str = "page_view";

// --- Link clicks ---

/// A `mailto:` link was clicked.
pub const EMAIL_CLICK: &str = "email_click";
/// A `tel:` link was clicked.
pub const PHONE_CLICK: &str = "phone_click";
/// A link opening a new browsing context was clicked.
pub const EXTERNAL_LINK_CLICK: &str = "external_link_click";
/// A link marked as a social profile was clicked.
pub const SOCIAL_CLICK: &str = "social_click";
/// Any other link.
pub const LINK_CLICK: &str = "link_click";

// --- Controls ---

/// A button or call-to-action element was clicked.
pub const CTA_CLICK: &str = "cta_click";
/// A tracked element matching no more specific rule.
pub const CLICK: &str = "click";

// --- Forms ---

/// A form was submitted.
pub const FORM_SUBMIT: &str = "form_submit";
/// A form field received focus.
pub const FORM_FIELD_FOCUS: &str = "form_field_focus";

// --- Site components ---

pub const SERVICE_INTEREST: &str = "service_interest";
pub const STRENGTH_INTERACTION: &str = "strength_interaction";
pub const TESTIMONIAL_CLICK: &str = "testimonial_click";
pub const BOOKING_INTERACTION: &str = "booking_interaction";

// --- Signals ---

/// A value was copied to the clipboard by a page widget.
pub const VALUE_COPY: &str = "value_copy";

/// DOM custom event the site's copy-to-clipboard helper dispatches on the
/// document, with the copied address in `detail.email`. Not a tracked event.
pub const VALUE_COPIED_SIGNAL: &str = "email-copied";

// --- Aggregate ---

/// All canonical event names, for iteration and validation.
pub const ALL_EVENTS: &[&str] = &[
    PAGE_VIEW,
    EMAIL_CLICK,
    PHONE_CLICK,
    EXTERNAL_LINK_CLICK,
    SOCIAL_CLICK,
    LINK_CLICK,
    CTA_CLICK,
    CLICK,
    FORM_SUBMIT,
    FORM_FIELD_FOCUS,
    SERVICE_INTEREST,
    STRENGTH_INTERACTION,
    TESTIMONIAL_CLICK,
    BOOKING_INTERACTION,
    VALUE_COPY,
];
