//! Wiring of a project directory into stores, builder and sessions.

use crate::builder::{CommandBuilder, CompileBuilder, SiteBuilder, ARTIFACT_NAME};
use crate::config::Config;
use crate::preview::{PreviewError, PreviewSession};
use crate::publish::Publisher;
use crate::reviews::{HttpReviewSource, ReviewSource, StaticReviewSource};
use crate::server::{AppState, AssetMount};
use crate::storage::{BlobStore, ContentStore, FsBlobStore, FsContentStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub struct Site {
    root: PathBuf,
    config: Config,
    content: Arc<dyn ContentStore>,
    blobs: Arc<dyn BlobStore>,
}

impl Site {
    /// Filesystem-backed site rooted at `root`.
    pub fn open(root: impl Into<PathBuf>, config: Config) -> Self {
        let root = root.into();
        let content = Arc::new(FsContentStore::new(config.content_dir(&root)));
        let blobs = Arc::new(FsBlobStore::new(config.blob_dir(&root), config.public_base_url.clone()));
        Self::with_stores(root, config, content, blobs)
    }

    pub fn with_stores(
        root: impl Into<PathBuf>,
        config: Config,
        content: Arc<dyn ContentStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            root: root.into(),
            config,
            content,
            blobs,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn content(&self) -> Arc<dyn ContentStore> {
        self.content.clone()
    }

    pub fn template_path(&self) -> PathBuf {
        self.config.template_path(&self.root)
    }

    pub fn builder(&self) -> Arc<dyn SiteBuilder> {
        let out_dir = self.config.out_dir(&self.root);
        match &self.config.build_command {
            Some(command) => Arc::new(CommandBuilder::new(
                command.clone(),
                self.root.clone(),
                out_dir.join(ARTIFACT_NAME),
                Duration::from_secs(self.config.build_timeout_secs),
            )),
            None => Arc::new(CompileBuilder::new(self.template_path(), out_dir)),
        }
    }

    pub fn publisher(&self) -> Publisher {
        Publisher::new(
            self.content.clone(),
            self.blobs.clone(),
            self.builder(),
            self.config.site_container.clone(),
        )
    }

    /// Configured review source; an empty one when unset or unusable.
    pub fn reviews(&self) -> Arc<dyn ReviewSource> {
        let Some(reviews) = &self.config.reviews else {
            return Arc::new(StaticReviewSource::default());
        };

        let api_key = std::env::var(&reviews.api_key_env).ok();
        if api_key.is_none() {
            tracing::warn!(var = %reviews.api_key_env, "review API key not set");
        }

        match HttpReviewSource::new(
            reviews.endpoint.clone(),
            reviews.place_id.clone(),
            api_key,
            Duration::from_secs(reviews.timeout_secs),
            reviews.limit,
        ) {
            Ok(source) => Arc::new(source),
            Err(err) => {
                tracing::warn!(error = %err, "review client unavailable, serving none");
                Arc::new(StaticReviewSource::default())
            }
        }
    }

    pub async fn preview(&self) -> Result<PreviewSession, PreviewError> {
        PreviewSession::load(
            self.content.clone(),
            self.blobs.clone(),
            self.template_path(),
            self.config.image_container.clone(),
        )
        .await
    }

    pub async fn app_state(&self) -> Result<AppState, PreviewError> {
        Ok(AppState {
            preview: Arc::new(self.preview().await?),
            publisher: self.publisher(),
            reviews: self.reviews(),
        })
    }

    pub fn asset_mount(&self) -> AssetMount {
        AssetMount {
            prefix: self.config.public_base_url.clone(),
            dir: self.config.blob_dir(&self.root),
        }
    }
}
