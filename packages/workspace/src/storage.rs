//! Content snapshots and blob storage.
//!
//! Both stores are last-writer-wins and are reached through async traits so
//! the filesystem implementations can be swapped for in-memory ones.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Snapshot {
    Preview,
    Production,
}

impl Snapshot {
    pub fn file_name(self) -> &'static str {
        match self {
            Snapshot::Preview => "content.preview.json",
            Snapshot::Production => "content.json",
        }
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Snapshot::Preview => write!(f, "preview"),
            Snapshot::Production => write!(f, "production"),
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {snapshot} snapshot: {source}")]
    Json {
        snapshot: Snapshot,
        #[source]
        source: serde_json::Error,
    },

    #[error("The {0} snapshot does not exist")]
    MissingSnapshot(Snapshot),

    #[error("Container {0:?} does not exist")]
    MissingContainer(String),

    #[error("Blob {container}/{name} not found")]
    NotFound { container: String, name: String },

    #[error("Invalid blob name {0:?}")]
    InvalidName(String),
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// `None` when the snapshot was never written.
    async fn load(&self, snapshot: Snapshot) -> StorageResult<Option<Value>>;
    async fn save(&self, snapshot: Snapshot, tree: &Value) -> StorageResult<()>;
}

/// Snapshots as pretty-printed JSON files in one directory.
pub struct FsContentStore {
    dir: PathBuf,
}

impl FsContentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, snapshot: Snapshot) -> PathBuf {
        self.dir.join(snapshot.file_name())
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn load(&self, snapshot: Snapshot) -> StorageResult<Option<Value>> {
        let path = self.path(snapshot);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StorageError::io(&path, err)),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Json { snapshot, source })
    }

    async fn save(&self, snapshot: Snapshot, tree: &Value) -> StorageResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| StorageError::io(&self.dir, err))?;
        let path = self.path(snapshot);
        let json = serde_json::to_string_pretty(tree).map_err(|source| StorageError::Json { snapshot, source })?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|err| StorageError::io(&path, err))
    }
}

#[derive(Default)]
pub struct MemoryContentStore {
    snapshots: Mutex<BTreeMap<Snapshot, Value>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preview(tree: Value) -> Self {
        let store = Self::default();
        store.put(Snapshot::Preview, tree);
        store
    }

    pub fn get(&self, snapshot: Snapshot) -> Option<Value> {
        self.snapshots.lock().unwrap().get(&snapshot).cloned()
    }

    pub fn put(&self, snapshot: Snapshot, tree: Value) {
        self.snapshots.lock().unwrap().insert(snapshot, tree);
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn load(&self, snapshot: Snapshot) -> StorageResult<Option<Value>> {
        Ok(self.get(snapshot))
    }

    async fn save(&self, snapshot: Snapshot, tree: &Value) -> StorageResult<()> {
        self.put(snapshot, tree.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Idempotent.
    async fn ensure_container(&self, container: &str) -> StorageResult<()>;
    /// Store a blob and return its public URL.
    async fn put(&self, container: &str, name: &str, bytes: Vec<u8>, content_type: &str) -> StorageResult<String>;
    async fn get(&self, container: &str, name: &str) -> StorageResult<Blob>;
    async fn list(&self, container: &str) -> StorageResult<Vec<String>>;
    /// Returns whether a blob was removed.
    async fn delete(&self, container: &str, name: &str) -> StorageResult<bool>;
    fn public_url(&self, container: &str, name: &str) -> String;
}

/// Blobs as files, one directory per container.
pub struct FsBlobStore {
    root: PathBuf,
    base_url: String,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    fn container_dir(&self, container: &str) -> StorageResult<PathBuf> {
        check_name(container)?;
        Ok(self.root.join(container))
    }

    async fn existing_container(&self, container: &str) -> StorageResult<PathBuf> {
        let dir = self.container_dir(container)?;
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(dir),
            _ => Err(StorageError::MissingContainer(container.to_string())),
        }
    }

    async fn blob_path(&self, container: &str, name: &str) -> StorageResult<PathBuf> {
        check_name(name)?;
        Ok(self.existing_container(container).await?.join(name))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn ensure_container(&self, container: &str) -> StorageResult<()> {
        let dir = self.container_dir(container)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|err| StorageError::io(&dir, err))
    }

    async fn put(&self, container: &str, name: &str, bytes: Vec<u8>, _content_type: &str) -> StorageResult<String> {
        let path = self.blob_path(container, name).await?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|err| StorageError::io(&path, err))?;
        Ok(self.public_url(container, name))
    }

    async fn get(&self, container: &str, name: &str) -> StorageResult<Blob> {
        let path = self.blob_path(container, name).await?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Blob {
                bytes,
                content_type: content_type_for(name).to_string(),
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound {
                container: container.to_string(),
                name: name.to_string(),
            }),
            Err(err) => Err(StorageError::io(&path, err)),
        }
    }

    async fn list(&self, container: &str) -> StorageResult<Vec<String>> {
        let dir = self.existing_container(container).await?;
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|err| StorageError::io(&dir, err))?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|err| StorageError::io(&dir, err))? {
            if entry.path().is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, container: &str, name: &str) -> StorageResult<bool> {
        let path = self.blob_path(container, name).await?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StorageError::io(&path, err)),
        }
    }

    fn public_url(&self, container: &str, name: &str) -> String {
        format!("{}/{}/{}", self.base_url.trim_end_matches('/'), container, name)
    }
}

#[derive(Default)]
pub struct MemoryBlobStore {
    containers: Mutex<BTreeMap<String, BTreeMap<String, Blob>>>,
    puts: Mutex<Vec<(String, String)>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every successful `put` as `(container, name)`, in call order.
    pub fn puts(&self) -> Vec<(String, String)> {
        self.puts.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn ensure_container(&self, container: &str) -> StorageResult<()> {
        check_name(container)?;
        self.containers
            .lock()
            .unwrap()
            .entry(container.to_string())
            .or_default();
        Ok(())
    }

    async fn put(&self, container: &str, name: &str, bytes: Vec<u8>, content_type: &str) -> StorageResult<String> {
        check_name(name)?;
        let mut containers = self.containers.lock().unwrap();
        let blobs = containers
            .get_mut(container)
            .ok_or_else(|| StorageError::MissingContainer(container.to_string()))?;
        blobs.insert(
            name.to_string(),
            Blob {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        self.puts
            .lock()
            .unwrap()
            .push((container.to_string(), name.to_string()));
        Ok(self.public_url(container, name))
    }

    async fn get(&self, container: &str, name: &str) -> StorageResult<Blob> {
        let containers = self.containers.lock().unwrap();
        let blobs = containers
            .get(container)
            .ok_or_else(|| StorageError::MissingContainer(container.to_string()))?;
        blobs.get(name).cloned().ok_or_else(|| StorageError::NotFound {
            container: container.to_string(),
            name: name.to_string(),
        })
    }

    async fn list(&self, container: &str) -> StorageResult<Vec<String>> {
        let containers = self.containers.lock().unwrap();
        containers
            .get(container)
            .map(|blobs| blobs.keys().cloned().collect())
            .ok_or_else(|| StorageError::MissingContainer(container.to_string()))
    }

    async fn delete(&self, container: &str, name: &str) -> StorageResult<bool> {
        let mut containers = self.containers.lock().unwrap();
        let blobs = containers
            .get_mut(container)
            .ok_or_else(|| StorageError::MissingContainer(container.to_string()))?;
        Ok(blobs.remove(name).is_some())
    }

    fn public_url(&self, container: &str, name: &str) -> String {
        format!("memory://{}/{}", container, name)
    }
}

fn check_name(name: &str) -> StorageResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Content type from a file extension; `application/octet-stream` otherwise.
pub fn content_type_for(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        _ => "application/octet-stream",
    }
}

/// Unique, URL-safe blob name: a millisecond timestamp prefix followed by
/// the original name restricted to `[A-Za-z0-9._-]`.
pub fn unique_blob_name(filename: &str, now: chrono::DateTime<chrono::Utc>) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let mut clean: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    let trimmed = clean.trim_start_matches('.');
    if trimmed.is_empty() {
        clean = "upload".to_string();
    } else if trimmed.len() != clean.len() {
        clean = trimmed.to_string();
    }
    format!("{}-{}", now.timestamp_millis(), clean)
}
