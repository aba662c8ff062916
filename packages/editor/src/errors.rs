//! Error types for the editor

use crate::instrument::TargetKind;
use sitecraft_content::PathError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Edit mode is off")]
    EditModeOff,

    #[error("Interaction blocked while another edit is open")]
    Blocked,

    #[error("Unknown edit target {0:?}")]
    UnknownTarget(String),

    #[error("Target {target:?} is not a {kind:?} target")]
    WrongKind { target: String, kind: TargetKind },

    #[error("Target {0:?} does not accept dropped files")]
    NotADropTarget(String),

    #[error("No text edit in progress")]
    NoPendingEdit,

    #[error("No section editor is open")]
    NoOpenModal,

    #[error("Malformed data URL")]
    MalformedDataUrl,

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Path error: {0}")]
    Path(#[from] PathError),
}
