//! # Document Session
//!
//! Frame-side state of one edit session. Every handler takes the session
//! explicitly; edit mode, the open section editor and the optimistic text
//! values all live here.
//!
//! The document always shows the last locally confirmed edit. The editor's
//! store catches up when it applies the emitted message, and nothing is
//! rolled back if it refuses.

use crate::errors::SessionError;
use crate::instrument::{strip_instrumentation, EditTarget, Instrumented, TargetKind};
use crate::protocol::{decode_inbound, encode_file, InboundMessage, OutboundMessage};
use crate::reconcile::filename_of;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub edit_mode: bool,
    /// Section target whose HTML editor is open
    pub modal: Option<String>,
}

/// What the frame must do after an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEffect {
    /// Show or hide every affordance
    Affordances { visible: bool },
    Reload,
}

#[derive(Debug, Clone)]
struct PendingTextEdit {
    target: String,
    path: String,
    original: String,
}

#[derive(Debug, Default)]
pub struct DocumentSession {
    state: SessionState,
    targets: Vec<EditTarget>,
    optimistic: HashMap<String, String>,
    pending: Option<PendingTextEdit>,
}

impl DocumentSession {
    pub fn new(targets: Vec<EditTarget>) -> Self {
        Self {
            targets,
            ..Self::default()
        }
    }

    pub fn from_instrumented(doc: &Instrumented) -> Self {
        Self::new(doc.targets.clone())
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn targets(&self) -> &[EditTarget] {
        &self.targets
    }

    pub fn affordances_visible(&self) -> bool {
        self.state.edit_mode
    }

    /// Decode and handle a raw inbound message; bad input is dropped.
    pub fn receive(&mut self, raw: &str) -> Option<InboundEffect> {
        decode_inbound(raw).map(|message| self.handle_inbound(message))
    }

    pub fn handle_inbound(&mut self, message: InboundMessage) -> InboundEffect {
        match message {
            InboundMessage::ToggleEditMode { enabled } => {
                self.state.edit_mode = enabled;
                if !enabled && self.pending.take().is_some() {
                    tracing::debug!("edit mode turned off, pending text edit discarded");
                }
                InboundEffect::Affordances { visible: enabled }
            }
            InboundMessage::Reload => InboundEffect::Reload,
        }
    }

    /// Text currently shown for a target.
    pub fn text_value(&self, target_id: &str) -> Option<&str> {
        if let Some(value) = self.optimistic.get(target_id) {
            return Some(value.as_str());
        }
        self.target(target_id, TargetKind::Text)
            .ok()
            .and_then(|t| t.value.as_deref())
    }

    pub fn begin_text_edit(&mut self, target_id: &str) -> Result<(), SessionError> {
        self.ensure_interactive()?;
        let target = self.target(target_id, TargetKind::Text)?;
        let path = target.path.clone();
        let original = self.text_value(target_id).unwrap_or_default().to_string();
        self.pending = Some(PendingTextEdit {
            target: target_id.to_string(),
            path,
            original,
        });
        Ok(())
    }

    /// Commit the pending edit locally. A message is emitted only when the
    /// value changed.
    pub fn confirm_text_edit(&mut self, new_value: &str) -> Result<Option<OutboundMessage>, SessionError> {
        let pending = self.pending.take().ok_or(SessionError::NoPendingEdit)?;
        if pending.original == new_value {
            return Ok(None);
        }
        self.optimistic.insert(pending.target, new_value.to_string());
        Ok(Some(OutboundMessage::ElementEdited {
            path: pending.path,
            new_value: new_value.to_string(),
            old_value: pending.original,
        }))
    }

    /// Dismiss the pending edit. Nothing was committed, so nothing is sent.
    pub fn cancel_text_edit(&mut self) {
        self.pending = None;
    }

    /// A file dropped on a target. Images are replaced in place; the
    /// gallery container appends a new item.
    pub fn drop_file(&mut self, target_id: &str, filename: &str, bytes: &[u8]) -> Result<OutboundMessage, SessionError> {
        self.ensure_interactive()?;
        let file = encode_file(bytes);

        if let Ok(image) = self.target(target_id, TargetKind::Image) {
            return Ok(OutboundMessage::ImageUpload {
                file,
                filename: filename.to_string(),
                path: image.path.clone(),
            });
        }
        if self.target(target_id, TargetKind::Gallery).is_ok() {
            return Ok(OutboundMessage::AddPortfolioImage {
                file,
                filename: filename.to_string(),
            });
        }
        if self.targets.iter().any(|t| t.id == target_id) {
            Err(SessionError::NotADropTarget(target_id.to_string()))
        } else {
            Err(SessionError::UnknownTarget(target_id.to_string()))
        }
    }

    /// Delete a gallery item. Both index and filename are sent so the
    /// editor can reconcile against a drifted list.
    pub fn delete_gallery_item(&mut self, target_id: &str) -> Result<OutboundMessage, SessionError> {
        self.ensure_interactive()?;
        let item = self.target(target_id, TargetKind::GalleryItem)?;
        let index = item.index.unwrap_or_default();
        let filename = match item.value.as_deref() {
            Some(name) => name,
            None => self
                .target(target_id, TargetKind::Image)
                .ok()
                .and_then(|image| image.value.as_deref())
                .and_then(filename_of)
                .unwrap_or_default(),
        }
        .to_string();

        self.targets.retain(|t| t.id != target_id);
        Ok(OutboundMessage::DeletePortfolioImage { index, filename })
    }

    /// Open the section editor on a section's current markup. Returns the
    /// markup to edit, with instrumentation stripped.
    pub fn open_section_editor(&mut self, target_id: &str, inner_html: &str) -> Result<String, SessionError> {
        self.ensure_interactive()?;
        self.target(target_id, TargetKind::Section)?;
        self.state.modal = Some(target_id.to_string());
        Ok(strip_instrumentation(inner_html))
    }

    pub fn save_section_html(&mut self, html: &str) -> Result<OutboundMessage, SessionError> {
        let target_id = self.state.modal.take().ok_or(SessionError::NoOpenModal)?;
        let section = self.target(&target_id, TargetKind::Section)?;
        Ok(OutboundMessage::EditSectionHtml {
            section_path: section.path.clone(),
            html: strip_instrumentation(html),
        })
    }

    pub fn close_section_editor(&mut self) {
        self.state.modal = None;
    }

    fn ensure_interactive(&self) -> Result<(), SessionError> {
        if !self.state.edit_mode {
            return Err(SessionError::EditModeOff);
        }
        if self.state.modal.is_some() || self.pending.is_some() {
            return Err(SessionError::Blocked);
        }
        Ok(())
    }

    fn target(&self, id: &str, kind: TargetKind) -> Result<&EditTarget, SessionError> {
        let mut found = false;
        for target in self.targets.iter().filter(|t| t.id == id) {
            if target.kind == kind {
                return Ok(target);
            }
            found = true;
        }
        if found {
            Err(SessionError::WrongKind {
                target: id.to_string(),
                kind,
            })
        } else {
            Err(SessionError::UnknownTarget(id.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(id: &str, kind: TargetKind, path: &str, index: Option<usize>, value: Option<&str>) -> EditTarget {
        EditTarget {
            id: id.into(),
            kind,
            path: path.into(),
            index,
            value: value.map(str::to_string),
        }
    }

    fn session() -> DocumentSession {
        let mut session = DocumentSession::new(vec![
            target("sc-1", TargetKind::Text, "hero.title", None, Some("Hello")),
            target("sc-2", TargetKind::Section, "about", None, None),
            target("sc-3", TargetKind::Gallery, "portfolio.images", None, None),
            target("sc-4", TargetKind::Image, "portfolio.images[0].src", None, Some("/assets/a.jpg?v=3")),
            target("sc-4", TargetKind::GalleryItem, "portfolio.images", Some(0), None),
        ]);
        session.handle_inbound(InboundMessage::ToggleEditMode { enabled: true });
        session
    }

    #[test]
    fn test_edit_mode_gates_interaction() {
        let mut session = DocumentSession::new(vec![target("sc-1", TargetKind::Text, "a", None, None)]);
        assert!(!session.affordances_visible());
        assert!(matches!(session.begin_text_edit("sc-1"), Err(SessionError::EditModeOff)));

        let effect = session.receive(r#"{"type":"toggleEditMode","enabled":true}"#);
        assert_eq!(effect, Some(InboundEffect::Affordances { visible: true }));
        assert!(session.begin_text_edit("sc-1").is_ok());
    }

    #[test]
    fn test_malformed_inbound_is_ignored() {
        let mut session = session();
        assert_eq!(session.receive(r#"{"type":"nope"}"#), None);
        assert_eq!(session.receive("{"), None);
        assert!(session.state().edit_mode);
    }

    #[test]
    fn test_text_edit_is_optimistic() {
        let mut session = session();
        session.begin_text_edit("sc-1").unwrap();
        let message = session.confirm_text_edit("Welcome").unwrap();
        assert_eq!(
            message,
            Some(OutboundMessage::ElementEdited {
                path: "hero.title".into(),
                new_value: "Welcome".into(),
                old_value: "Hello".into(),
            })
        );
        assert_eq!(session.text_value("sc-1"), Some("Welcome"));

        session.begin_text_edit("sc-1").unwrap();
        assert_eq!(session.confirm_text_edit("Welcome").unwrap(), None);
    }

    #[test]
    fn test_cancel_emits_nothing() {
        let mut session = session();
        session.begin_text_edit("sc-1").unwrap();
        session.cancel_text_edit();
        assert!(matches!(session.confirm_text_edit("x"), Err(SessionError::NoPendingEdit)));
        assert_eq!(session.text_value("sc-1"), Some("Hello"));
    }

    #[test]
    fn test_drop_target_decides_append_or_replace() {
        let mut session = session();
        match session.drop_file("sc-4", "new.png", b"img").unwrap() {
            OutboundMessage::ImageUpload { path, filename, .. } => {
                assert_eq!(path, "portfolio.images[0].src");
                assert_eq!(filename, "new.png");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            session.drop_file("sc-3", "more.png", b"img").unwrap(),
            OutboundMessage::AddPortfolioImage { .. }
        ));
        assert!(matches!(session.drop_file("sc-1", "x.png", b""), Err(SessionError::NotADropTarget(_))));
        assert!(matches!(session.drop_file("sc-9", "x.png", b""), Err(SessionError::UnknownTarget(_))));
    }

    #[test]
    fn test_delete_sends_index_and_filename() {
        let mut session = session();
        let message = session.delete_gallery_item("sc-4").unwrap();
        assert_eq!(
            message,
            OutboundMessage::DeletePortfolioImage {
                index: 0,
                filename: "a.jpg".into()
            }
        );
        assert!(matches!(session.delete_gallery_item("sc-4"), Err(SessionError::UnknownTarget(_))));
    }

    #[test]
    fn test_modal_blocks_other_interaction() {
        let mut session = session();
        let html = session
            .open_section_editor("sc-2", r#"<button data-sc-control="edit-html">Edit HTML</button><p data-sc-target="sc-9">Hi</p>"#)
            .unwrap();
        assert_eq!(html, "<p>Hi</p>");
        assert!(matches!(session.begin_text_edit("sc-1"), Err(SessionError::Blocked)));
        assert!(matches!(session.delete_gallery_item("sc-4"), Err(SessionError::Blocked)));

        let message = session.save_section_html("<p>Bye</p>").unwrap();
        assert_eq!(
            message,
            OutboundMessage::EditSectionHtml {
                section_path: "about".into(),
                html: "<p>Bye</p>".into()
            }
        );
        assert!(session.state().modal.is_none());
        assert!(session.begin_text_edit("sc-1").is_ok());
    }

    #[test]
    fn test_pending_text_edit_blocks_other_interaction() {
        let mut session = session();
        session.begin_text_edit("sc-1").unwrap();

        assert!(matches!(session.delete_gallery_item("sc-4"), Err(SessionError::Blocked)));
        assert!(matches!(session.begin_text_edit("sc-1"), Err(SessionError::Blocked)));
        assert!(matches!(session.drop_file("sc-3", "x.png", b"img"), Err(SessionError::Blocked)));
        assert!(matches!(session.open_section_editor("sc-2", ""), Err(SessionError::Blocked)));

        let message = session.confirm_text_edit("Welcome").unwrap();
        assert!(matches!(message, Some(OutboundMessage::ElementEdited { .. })));
        assert!(session.delete_gallery_item("sc-4").is_ok());
    }

    #[test]
    fn test_cancelled_text_edit_unblocks() {
        let mut session = session();
        session.begin_text_edit("sc-1").unwrap();
        session.cancel_text_edit();
        assert!(session.open_section_editor("sc-2", "").is_ok());
    }

    #[test]
    fn test_delete_prefers_the_item_filename() {
        let mut session = DocumentSession::new(vec![target(
            "sc-7",
            TargetKind::GalleryItem,
            "portfolio.images",
            Some(2),
            Some("c.jpg"),
        )]);
        session.handle_inbound(InboundMessage::ToggleEditMode { enabled: true });
        assert_eq!(
            session.delete_gallery_item("sc-7").unwrap(),
            OutboundMessage::DeletePortfolioImage {
                index: 2,
                filename: "c.jpg".into()
            }
        );
    }

    #[test]
    fn test_closing_modal_sends_nothing() {
        let mut session = session();
        session.open_section_editor("sc-2", "").unwrap();
        session.close_section_editor();
        assert!(matches!(session.save_section_html("x"), Err(SessionError::NoOpenModal)));
    }
}
