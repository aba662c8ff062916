//! # Sitecraft Editor
//!
//! Live editing of a rendered page.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ template: content tree → annotated HTML     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ instrument: rule tables → edit targets      │
//! │  - text, image and section tables           │
//! │  - gallery container and items              │
//! │  - bootstrap script injected once           │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ session (frame) ⇄ protocol ⇄ reconcile      │
//! │  fire-and-forget JSON messages              │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use sitecraft_editor::{instrument, DocumentSession, InboundMessage, Rules};
//!
//! let page = r#"<body><h1 data-sc-path="hero.title">Hi</h1></body>"#;
//! let doc = instrument(page, &Rules::default());
//!
//! let mut session = DocumentSession::from_instrumented(&doc);
//! session.handle_inbound(InboundMessage::ToggleEditMode { enabled: true });
//!
//! let id = doc.targets[0].id.clone();
//! session.begin_text_edit(&id).unwrap();
//! let message = session.confirm_text_edit("Hello").unwrap();
//! assert!(message.is_some());
//! ```

mod errors;
mod instrument;
mod protocol;
pub mod reconcile;
mod rules;
mod selector;
mod session;

pub use errors::SessionError;
pub use instrument::{
    capture_inner_html, instrument, strip_instrumentation, EditTarget, Instrumented, TargetKind,
    CONTROL_ATTR, CONTROL_FOR_ATTR, GALLERY_INDEX_ATTR, TARGET_ATTR,
};
pub use protocol::{
    data_url_content_type, decode_file, decode_inbound, decode_outbound, encode, encode_file,
    InboundMessage, OutboundMessage,
};
pub use rules::{EditRule, GalleryRule, PathSpec, Rules, SectionRule};
pub use selector::Selector;
pub use session::{DocumentSession, InboundEffect, SessionState};
