//! Browser-side checks; run with `wasm-pack test --headless --firefox`.
#![cfg(target_arch = "wasm32")]

use sitecraft_wasm::{compile_js, instrument_js, JsDocumentSession};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

const PAGE: &str = r#"<html><body><h1>{{hero.title}}</h1><section id="about"><p>{{about.body}}</p></section><div class="gallery">{{#each portfolio.images}}<img src="{{this.src}}">{{/each}}</div></body></html>"#;
const TREE: &str = r#"{"hero":{"title":"Hi"},"about":{"body":"Us"},"portfolio":{"images":[{"src":"/assets/images/a.jpg?v=1"}]}}"#;

fn session() -> (JsDocumentSession, Vec<serde_json::Value>) {
    let html = compile_js(PAGE, TREE, true).unwrap();
    let result = instrument_js(&html);
    let mut session = JsDocumentSession::new(&result.targets()).unwrap();
    session.receive(r#"{"type":"toggleEditMode","enabled":true}"#);
    (session, serde_json::from_str(&result.targets()).unwrap())
}

fn id_of(targets: &[serde_json::Value], kind: &str) -> String {
    targets.iter().find(|t| t["kind"] == kind).unwrap()["id"].as_str().unwrap().to_string()
}

#[wasm_bindgen_test]
fn open_text_edit_rejects_other_actions() {
    let (mut session, targets) = session();
    session.begin_text_edit(&id_of(&targets, "text")).unwrap();

    let err = session.delete_gallery_item(&id_of(&targets, "galleryItem")).unwrap_err();
    assert!(err.as_string().unwrap().contains("blocked"));

    session.cancel_text_edit();
    assert!(session.delete_gallery_item(&id_of(&targets, "galleryItem")).is_ok());
}

#[wasm_bindgen_test]
fn delete_sends_filename_without_query() {
    let (mut session, targets) = session();
    let message = session.delete_gallery_item(&id_of(&targets, "galleryItem")).unwrap();
    let message: serde_json::Value = serde_json::from_str(&message).unwrap();
    assert_eq!(message["type"], "deletePortfolioImage");
    assert_eq!(message["filename"], "a.jpg");
}

#[wasm_bindgen_test]
fn toggle_applies_while_section_editor_is_open() {
    let (mut session, targets) = session();
    session.open_section_editor(&id_of(&targets, "section"), "<p>Us</p>").unwrap();
    assert_eq!(session.receive(r#"{"type":"toggleEditMode","enabled":false}"#).as_deref(), Some("hide"));
    assert!(!session.edit_mode());
}
