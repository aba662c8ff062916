use crate::preview::PreviewSession;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use sitecraft_editor::InboundMessage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("Failed to create watcher: {0}")]
    CreateError(#[from] notify::Error),

    #[error("Cannot watch {0:?}: no parent directory")]
    NoParent(PathBuf),
}

pub type WatcherResult<T> = Result<T, WatcherError>;

pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    receiver: UnboundedReceiver<notify::Result<Event>>,
}

impl FileWatcher {
    pub fn new(path: &Path, mode: RecursiveMode) -> WatcherResult<Self> {
        let (tx, rx) = unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;

        watcher.watch(path, mode)?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
        })
    }

    /// Next event; watcher errors are logged and skipped.
    pub async fn next_event(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await? {
                Ok(event) => return Some(event),
                Err(err) => tracing::warn!(error = %err, "watch error"),
            }
        }
    }
}

/// Broadcast `reload` to connected frames whenever the template changes.
///
/// The parent directory is watched so that editors replacing the file on
/// save are still seen.
pub fn reload_on_template_change(
    template: PathBuf,
    preview: Arc<PreviewSession>,
) -> WatcherResult<tokio::task::JoinHandle<()>> {
    let dir = template
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| WatcherError::NoParent(template.clone()))?;
    let mut watcher = FileWatcher::new(&dir, RecursiveMode::NonRecursive)?;
    let name = template.file_name().map(|n| n.to_os_string());

    Ok(tokio::spawn(async move {
        while let Some(event) = watcher.next_event().await {
            let relevant = event.kind.is_create() || event.kind.is_modify() || event.kind.is_remove();
            let ours = event
                .paths
                .iter()
                .any(|p| p.file_name().map(|n| n.to_os_string()) == name);
            if relevant && ours {
                tracing::info!(template = ?template, "template changed, reloading frames");
                preview.broadcast(InboundMessage::Reload);
            }
        }
    }))
}
