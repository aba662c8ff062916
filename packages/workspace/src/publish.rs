//! # Publish Pipeline
//!
//! `Draft → Promoted → Compiled → Uploaded`. Each stage starts only after
//! the previous one completed.
//!
//! - A failed build stops the pipeline before upload.
//! - A failed upload leaves the promoted snapshot in place. Publishing
//!   again is safe and is the recovery path.

use crate::builder::{BuildError, SiteBuilder, ARTIFACT_NAME};
use crate::storage::{BlobStore, ContentStore, Snapshot, StorageError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PublishStage {
    Draft,
    Promoted,
    Compiled,
    Uploaded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRecord {
    pub stage: PublishStage,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReport {
    pub started_at: DateTime<Utc>,
    pub stages: Vec<StageRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl PublishReport {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            stages: vec![StageRecord {
                stage: PublishStage::Draft,
                completed_at: Utc::now(),
            }],
            url: None,
        }
    }

    fn reached(&mut self, stage: PublishStage) {
        tracing::info!(?stage, "publish stage completed");
        self.stages.push(StageRecord {
            stage,
            completed_at: Utc::now(),
        });
    }

    /// Last completed stage.
    pub fn stage(&self) -> PublishStage {
        self.stages
            .last()
            .map(|r| r.stage)
            .unwrap_or(PublishStage::Draft)
    }
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Promote failed: {0}")]
    Promote(#[source] StorageError),

    #[error("Build failed: {0}")]
    Build(#[source] BuildError),

    #[error("Upload failed: {0}")]
    Upload(#[source] StorageError),
}

impl PublishError {
    /// Last stage that completed before the failure.
    pub fn completed_stage(&self) -> PublishStage {
        match self {
            PublishError::Promote(_) => PublishStage::Draft,
            PublishError::Build(_) => PublishStage::Promoted,
            PublishError::Upload(_) => PublishStage::Compiled,
        }
    }
}

#[derive(Clone)]
pub struct Publisher {
    content: Arc<dyn ContentStore>,
    blobs: Arc<dyn BlobStore>,
    builder: Arc<dyn SiteBuilder>,
    site_container: String,
}

impl Publisher {
    pub fn new(
        content: Arc<dyn ContentStore>,
        blobs: Arc<dyn BlobStore>,
        builder: Arc<dyn SiteBuilder>,
        site_container: impl Into<String>,
    ) -> Self {
        Self {
            content,
            blobs,
            builder,
            site_container: site_container.into(),
        }
    }

    pub async fn publish(&self) -> Result<PublishReport, PublishError> {
        let mut report = PublishReport::new();

        let production = self.promote().await.map_err(|e| {
            tracing::error!(error = %e, "promote failed");
            PublishError::Promote(e)
        })?;
        report.reached(PublishStage::Promoted);

        let artifact = self.builder.build(&production).await.map_err(|e| {
            tracing::error!(error = %e, "build failed, nothing uploaded");
            PublishError::Build(e)
        })?;
        report.reached(PublishStage::Compiled);

        let url = self.upload(&artifact.path).await.map_err(|e| {
            tracing::error!(error = %e, "upload failed, promoted content kept");
            PublishError::Upload(e)
        })?;
        report.url = Some(url);
        report.reached(PublishStage::Uploaded);

        Ok(report)
    }

    async fn promote(&self) -> Result<serde_json::Value, StorageError> {
        let preview = self
            .content
            .load(Snapshot::Preview)
            .await?
            .ok_or(StorageError::MissingSnapshot(Snapshot::Preview))?;
        self.content.save(Snapshot::Production, &preview).await?;
        Ok(preview)
    }

    async fn upload(&self, artifact: &std::path::Path) -> Result<String, StorageError> {
        let bytes = tokio::fs::read(artifact).await.map_err(|source| StorageError::Io {
            path: artifact.to_path_buf(),
            source,
        })?;
        self.blobs.ensure_container(&self.site_container).await?;
        self.blobs
            .put(&self.site_container, ARTIFACT_NAME, bytes, "text/html")
            .await
    }
}
