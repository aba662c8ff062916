//! Wire contract between the instrumented document and the editor.
//!
//! Every message is a JSON object discriminated by its `type` field. The
//! receiver never fails on bad input: [`decode_inbound`] and
//! [`decode_outbound`] return `None` for anything malformed or unknown.

use crate::errors::SessionError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Editor to document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InboundMessage {
    ToggleEditMode { enabled: bool },
    /// Ask the frame to reload after a structural change
    Reload,
}

/// Document to editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundMessage {
    #[serde(rename_all = "camelCase")]
    ElementEdited {
        path: String,
        new_value: String,
        old_value: String,
    },
    ImageUpload {
        file: String,
        filename: String,
        path: String,
    },
    AddPortfolioImage { file: String, filename: String },
    DeletePortfolioImage { index: usize, filename: String },
    #[serde(rename_all = "camelCase")]
    EditSectionHtml { section_path: String, html: String },
}

impl OutboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::ElementEdited { .. } => "elementEdited",
            OutboundMessage::ImageUpload { .. } => "imageUpload",
            OutboundMessage::AddPortfolioImage { .. } => "addPortfolioImage",
            OutboundMessage::DeletePortfolioImage { .. } => "deletePortfolioImage",
            OutboundMessage::EditSectionHtml { .. } => "editSectionHtml",
        }
    }
}

pub fn decode_inbound(raw: &str) -> Option<InboundMessage> {
    decode(raw)
}

pub fn decode_outbound(raw: &str) -> Option<OutboundMessage> {
    decode(raw)
}

fn decode<T: for<'de> Deserialize<'de>>(raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(message) => Some(message),
        Err(err) => {
            tracing::debug!(%err, "dropping malformed message");
            None
        }
    }
}

pub fn encode<T: Serialize>(message: &T) -> String {
    // Plain enums of strings and integers always serialize.
    serde_json::to_string(message).unwrap_or_default()
}

/// Encode file bytes the way the document sends them.
pub fn encode_file(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a `file` payload. Accepts bare base64 or a `data:` URL.
pub fn decode_file(payload: &str) -> Result<Vec<u8>, SessionError> {
    let encoded = match payload.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or(SessionError::MalformedDataUrl)?,
        None => payload,
    };
    Ok(STANDARD.decode(encoded.trim())?)
}

/// Media type carried by a `data:` URL, if any.
pub fn data_url_content_type(payload: &str) -> Option<&str> {
    let header = payload.strip_prefix("data:")?.split_once(',')?.0;
    let media = header.split(';').next()?;
    (!media.is_empty()).then_some(media)
}
