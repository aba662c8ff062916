//! # Sitecraft Workspace
//!
//! Everything around the pure compile and edit core: snapshot and blob
//! storage, the publish pipeline, the editor's preview session and the
//! HTTP surface that connects the frame to it.

pub mod builder;
pub mod config;
pub mod preview;
pub mod publish;
pub mod reviews;
pub mod server;
pub mod site;
pub mod storage;
pub mod watcher;

pub use builder::{Artifact, BuildError, CommandBuilder, CompileBuilder, SiteBuilder};
pub use config::{Config, ConfigError, HttpConfig, ReviewsConfig, DEFAULT_CONFIG_NAME};
pub use preview::{Applied, PreviewError, PreviewSession};
pub use publish::{PublishError, PublishReport, PublishStage, Publisher, StageRecord};
pub use reviews::{HttpReviewSource, Review, ReviewSource, StaticReviewSource};
pub use server::{router, serve, AppState, AssetMount};
pub use site::Site;
pub use storage::{
    content_type_for, unique_blob_name, Blob, BlobStore, ContentStore, FsBlobStore, FsContentStore, MemoryBlobStore,
    MemoryContentStore, Snapshot, StorageError, StorageResult,
};
pub use watcher::{reload_on_template_change, FileWatcher, WatcherError, WatcherResult};
