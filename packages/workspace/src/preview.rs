//! Editor side of the single live edit session.
//!
//! Holds the preview content tree, applies outbound messages from the
//! frame to it, persists the preview snapshot after every change and fans
//! inbound messages out to every connected frame.

use crate::storage::{content_type_for, unique_blob_name, BlobStore, ContentStore, Snapshot, StorageError};
use serde::Serialize;
use serde_json::Value;
use sitecraft_content::PathError;
use sitecraft_editor::reconcile::{
    append_gallery_item, apply_text_edit, item_filename, remove_gallery_item, set_image, set_section_html,
};
use sitecraft_editor::{data_url_content_type, decode_file, instrument, InboundMessage, OutboundMessage, Rules, SessionError};
use sitecraft_template::{compile_with, CompileOptions};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};

const DEFAULT_GALLERY_LIST: &str = "portfolio.images";

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cannot apply edit: {0}")]
    Path(#[from] PathError),

    #[error("Invalid payload: {0}")]
    Payload(#[from] SessionError),

    #[error("Failed to read template {path:?}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of applying one outbound message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Applied {
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

pub struct PreviewSession {
    content: Arc<dyn ContentStore>,
    blobs: Arc<dyn BlobStore>,
    template_path: PathBuf,
    image_container: String,
    rules: Rules,
    tree: RwLock<Value>,
    events: broadcast::Sender<InboundMessage>,
}

impl PreviewSession {
    /// Start from the stored preview snapshot, or an empty tree.
    pub async fn load(
        content: Arc<dyn ContentStore>,
        blobs: Arc<dyn BlobStore>,
        template_path: impl Into<PathBuf>,
        image_container: impl Into<String>,
    ) -> Result<Self, PreviewError> {
        let tree = content
            .load(Snapshot::Preview)
            .await?
            .unwrap_or_else(|| Value::Object(Default::default()));
        let (events, _) = broadcast::channel(64);

        Ok(Self {
            content,
            blobs,
            template_path: template_path.into(),
            image_container: image_container.into(),
            rules: Rules::default(),
            tree: RwLock::new(tree),
            events,
        })
    }

    pub fn with_rules(mut self, rules: Rules) -> Self {
        self.rules = rules;
        self
    }

    pub async fn tree(&self) -> Value {
        self.tree.read().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InboundMessage> {
        self.events.subscribe()
    }

    /// Send an inbound message to every connected frame.
    pub fn broadcast(&self, message: InboundMessage) {
        // No receivers simply means no open frame.
        let receivers = self.events.send(message).unwrap_or(0);
        tracing::debug!(receivers, "inbound message broadcast");
    }

    pub fn set_edit_mode(&self, enabled: bool) {
        self.broadcast(InboundMessage::ToggleEditMode { enabled });
    }

    /// Annotated, instrumented preview of the current tree.
    pub async fn render(&self) -> Result<String, PreviewError> {
        let template = tokio::fs::read_to_string(&self.template_path)
            .await
            .map_err(|source| PreviewError::Template {
                path: self.template_path.clone(),
                source,
            })?;
        let tree = self.tree.read().await;
        let html = compile_with(&template, &tree, &CompileOptions::preview());
        Ok(instrument(&html, &self.rules).html)
    }

    pub async fn apply(&self, message: OutboundMessage) -> Result<Applied, PreviewError> {
        tracing::debug!(kind = message.kind(), "applying message");

        match message {
            OutboundMessage::ElementEdited { path, new_value, .. } => {
                let changed = self.update(|tree| apply_text_edit(tree, &path, &new_value)).await?;
                Ok(Applied { changed, url: None })
            }
            OutboundMessage::ImageUpload { file, filename, path } => {
                let (name, url) = self.upload(&file, &filename).await?;
                let updated = self.update(|tree| set_image(tree, &path, &url)).await;
                self.keep_upload(&name, updated).await?;
                Ok(Applied {
                    changed: true,
                    url: Some(url),
                })
            }
            OutboundMessage::AddPortfolioImage { file, filename } => {
                let (name, url) = self.upload(&file, &filename).await?;
                let alt = filename.rsplit_once('.').map_or(filename.as_str(), |(stem, _)| stem);
                let updated = self
                    .update(|tree| append_gallery_item(tree, self.gallery_list(), &url, alt))
                    .await;
                self.keep_upload(&name, updated.map(drop)).await?;
                self.broadcast(InboundMessage::Reload);
                Ok(Applied {
                    changed: true,
                    url: Some(url),
                })
            }
            OutboundMessage::DeletePortfolioImage { index, filename } => {
                let removed = self
                    .update(|tree| remove_gallery_item(tree, self.gallery_list(), index, &filename))
                    .await?;
                let Some(item) = removed else {
                    return Ok(Applied::default());
                };
                self.delete_blob(&item).await;
                self.broadcast(InboundMessage::Reload);
                Ok(Applied { changed: true, url: None })
            }
            OutboundMessage::EditSectionHtml { section_path, html } => {
                self.update(|tree| set_section_html(tree, &section_path, &html)).await?;
                self.broadcast(InboundMessage::Reload);
                Ok(Applied { changed: true, url: None })
            }
        }
    }

    /// Run `edit` on a copy of the tree. The copy replaces the tree only
    /// after it was saved, so a failed edit or save leaves both untouched.
    async fn update<T>(&self, edit: impl FnOnce(&mut Value) -> Result<T, PathError>) -> Result<T, PreviewError> {
        let mut tree = self.tree.write().await;
        let mut next = tree.clone();
        let result = edit(&mut next)?;
        if next != *tree {
            self.persist(&next).await?;
            *tree = next;
        }
        Ok(result)
    }

    fn gallery_list(&self) -> &str {
        self.rules
            .gallery
            .as_ref()
            .map_or(DEFAULT_GALLERY_LIST, |g| g.list.as_str())
    }

    async fn persist(&self, tree: &Value) -> Result<(), StorageError> {
        self.content.save(Snapshot::Preview, tree).await
    }

    async fn upload(&self, file: &str, filename: &str) -> Result<(String, String), PreviewError> {
        let bytes = decode_file(file)?;
        let name = unique_blob_name(filename, chrono::Utc::now());
        let content_type = data_url_content_type(file).unwrap_or_else(|| content_type_for(&name));

        self.blobs.ensure_container(&self.image_container).await?;
        let url = self
            .blobs
            .put(&self.image_container, &name, bytes, content_type)
            .await?;
        tracing::info!(%url, "image uploaded");
        Ok((name, url))
    }

    /// Remove a fresh upload when the content change it was meant for
    /// did not happen.
    async fn keep_upload(&self, name: &str, updated: Result<(), PreviewError>) -> Result<(), PreviewError> {
        let Err(err) = updated else {
            return Ok(());
        };
        if let Err(delete_err) = self.blobs.delete(&self.image_container, name).await {
            tracing::warn!(error = %delete_err, name, "failed to remove orphaned upload");
        }
        Err(err)
    }

    /// Best effort: the content change already happened.
    async fn delete_blob(&self, item: &Value) {
        let Some(name) = item_filename(item) else {
            return;
        };
        let owned = item
            .get("src")
            .and_then(Value::as_str)
            .map_or(false, |src| src == self.blobs.public_url(&self.image_container, name));
        if !owned {
            return;
        }
        if let Err(err) = self.blobs.delete(&self.image_container, name).await {
            tracing::warn!(error = %err, name, "failed to delete image blob");
        }
    }
}
