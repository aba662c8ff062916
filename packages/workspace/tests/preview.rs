//! Applying frame messages through the preview session.

use async_trait::async_trait;
use serde_json::{json, Value};
use sitecraft_editor::{encode_file, InboundMessage, OutboundMessage};
use sitecraft_workspace::{
    BlobStore, ContentStore, MemoryBlobStore, MemoryContentStore, PreviewError, PreviewSession, Snapshot, StorageError,
    StorageResult,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const TEMPLATE: &str = r#"<html><body><h1>{{hero.title}}</h1><section id="portfolio" class="portfolio-section"><div class="gallery">{{#each portfolio.images}}<img src="{{this.src}}" alt="{{this.alt}}">{{/each}}</div></section></body></html>"#;

struct Fixture {
    _dir: tempfile::TempDir,
    content: Arc<MemoryContentStore>,
    blobs: Arc<MemoryBlobStore>,
    session: PreviewSession,
}

async fn fixture(tree: Value) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("index.html");
    std::fs::write(&template, TEMPLATE).unwrap();

    let content = Arc::new(MemoryContentStore::with_preview(tree));
    let blobs = Arc::new(MemoryBlobStore::new());
    let session = PreviewSession::load(content.clone(), blobs.clone(), template, "images")
        .await
        .unwrap();

    Fixture {
        _dir: dir,
        content,
        blobs,
        session,
    }
}

fn tree() -> Value {
    json!({
        "hero": {"title": "Hello"},
        "portfolio": {"images": [
            {"src": "memory://images/a.jpg", "alt": "a"},
            {"src": "memory://images/b.jpg", "alt": "b"}
        ]}
    })
}

#[tokio::test]
async fn test_text_edit_persists_preview() {
    let f = fixture(tree()).await;
    let applied = f
        .session
        .apply(OutboundMessage::ElementEdited {
            path: "hero.title".into(),
            new_value: "Hi there".into(),
            old_value: "Hello".into(),
        })
        .await
        .unwrap();

    assert!(applied.changed);
    assert_eq!(f.content.get(Snapshot::Preview).unwrap()["hero"]["title"], "Hi there");
    assert!(f.session.render().await.unwrap().contains("Hi there</h1>"));
    assert_eq!(f.content.get(Snapshot::Production), None);
}

#[tokio::test]
async fn test_image_upload_replaces_path() {
    let f = fixture(tree()).await;
    let applied = f
        .session
        .apply(OutboundMessage::ImageUpload {
            file: format!("data:image/png;base64,{}", encode_file(b"\x89PNG")),
            filename: "new shot.png".into(),
            path: "portfolio.images[0].src".into(),
        })
        .await
        .unwrap();

    let url = applied.url.unwrap();
    assert!(url.starts_with("memory://images/") && url.ends_with("-new_shot.png"));
    assert_eq!(f.session.tree().await["portfolio"]["images"][0]["src"], url.as_str());

    let (_, name) = f.blobs.puts().pop().unwrap();
    let blob = f.blobs.get("images", &name).await.unwrap();
    assert_eq!(blob.bytes, b"\x89PNG");
    assert_eq!(blob.content_type, "image/png");
}

#[tokio::test]
async fn test_append_broadcasts_reload() {
    let f = fixture(tree()).await;
    let mut events = f.session.subscribe();

    f.session
        .apply(OutboundMessage::AddPortfolioImage {
            file: encode_file(b"jpg"),
            filename: "c.jpg".into(),
        })
        .await
        .unwrap();

    let images = f.content.get(Snapshot::Preview).unwrap()["portfolio"]["images"].clone();
    assert_eq!(images.as_array().unwrap().len(), 3);
    assert_eq!(images[2]["alt"], "c");
    assert_eq!(events.recv().await.unwrap(), InboundMessage::Reload);
}

#[tokio::test]
async fn test_stale_delete_matches_filename() {
    let f = fixture(tree()).await;
    f.blobs.ensure_container("images").await.unwrap();
    f.blobs.put("images", "b.jpg", vec![1], "image/jpeg").await.unwrap();

    let applied = f
        .session
        .apply(OutboundMessage::DeletePortfolioImage {
            index: 7,
            filename: "b.jpg".into(),
        })
        .await
        .unwrap();

    assert!(applied.changed);
    let images = f.session.tree().await["portfolio"]["images"].clone();
    assert_eq!(images, json!([{"src": "memory://images/a.jpg", "alt": "a"}]));
    assert!(f.blobs.list("images").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_without_match_changes_nothing() {
    let f = fixture(tree()).await;
    let applied = f
        .session
        .apply(OutboundMessage::DeletePortfolioImage {
            index: 9,
            filename: "zzz.jpg".into(),
        })
        .await
        .unwrap();
    assert!(!applied.changed);
    assert_eq!(f.session.tree().await, tree());
}

#[tokio::test]
async fn test_section_html_and_bad_payloads() {
    let f = fixture(tree()).await;
    f.session
        .apply(OutboundMessage::EditSectionHtml {
            section_path: "portfolio".into(),
            html: "<p>Coming soon</p>".into(),
        })
        .await
        .unwrap();
    assert!(f.session.render().await.unwrap().contains("<p>Coming soon</p>"));

    let err = f
        .session
        .apply(OutboundMessage::ImageUpload {
            file: "%%%".into(),
            filename: "x.png".into(),
            path: "hero.image".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PreviewError::Payload(_)));

    let err = f
        .session
        .apply(OutboundMessage::ElementEdited {
            path: "hero..title".into(),
            new_value: "x".into(),
            old_value: "y".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PreviewError::Path(_)));
}

#[tokio::test]
async fn test_render_is_instrumented() {
    let f = fixture(tree()).await;
    let html = f.session.render().await.unwrap();
    assert!(html.contains(r#"data-sc-edit-text="hero.title""#));
    assert!(html.contains(r#"data-sc-gallery="portfolio.images""#));
    assert!(html.contains(r#"data-sc-control="bootstrap""#));
}

/// Content store whose saves fail until `recover` is called.
struct FlakyContentStore {
    inner: MemoryContentStore,
    failing: AtomicBool,
}

impl FlakyContentStore {
    fn new(tree: Value) -> Self {
        Self {
            inner: MemoryContentStore::with_preview(tree),
            failing: AtomicBool::new(true),
        }
    }

    fn recover(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContentStore for FlakyContentStore {
    async fn load(&self, snapshot: Snapshot) -> StorageResult<Option<Value>> {
        self.inner.load(snapshot).await
    }

    async fn save(&self, snapshot: Snapshot, tree: &Value) -> StorageResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Io {
                path: "content.preview.json".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        self.inner.save(snapshot, tree).await
    }
}

#[tokio::test]
async fn test_failed_save_leaves_tree_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("index.html");
    std::fs::write(&template, TEMPLATE).unwrap();
    let content = Arc::new(FlakyContentStore::new(tree()));
    let blobs = Arc::new(MemoryBlobStore::new());
    let session = PreviewSession::load(content.clone(), blobs.clone(), template, "images")
        .await
        .unwrap();

    let edit = || OutboundMessage::ElementEdited {
        path: "hero.title".into(),
        new_value: "Hi there".into(),
        old_value: "Hello".into(),
    };

    let err = session.apply(edit()).await.unwrap_err();
    assert!(matches!(err, PreviewError::Storage(_)));
    assert_eq!(session.tree().await, tree());

    let err = session
        .apply(OutboundMessage::AddPortfolioImage {
            file: encode_file(b"jpg"),
            filename: "c.jpg".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PreviewError::Storage(_)));
    assert_eq!(session.tree().await, tree());
    assert!(blobs.list("images").await.unwrap().is_empty());

    content.recover();
    let applied = session.apply(edit()).await.unwrap();
    assert!(applied.changed);
    assert_eq!(content.inner.get(Snapshot::Preview).unwrap()["hero"]["title"], "Hi there");
}

#[tokio::test]
async fn test_rejected_image_path_removes_upload() {
    let f = fixture(tree()).await;
    let err = f
        .session
        .apply(OutboundMessage::ImageUpload {
            file: encode_file(b"png"),
            filename: "late.png".into(),
            path: "portfolio.images[9].src".into(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, PreviewError::Path(_)));
    assert_eq!(f.blobs.puts().len(), 1);
    assert!(f.blobs.list("images").await.unwrap().is_empty());
    assert_eq!(f.session.tree().await, tree());
}
