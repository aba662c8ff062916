use sitecraft_editor::{encode, instrument, DocumentSession, InboundEffect, OutboundMessage, Rules};
use sitecraft_template::{compile_with, CompileOptions};
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn parse_tree(tree_json: &str) -> Result<serde_json::Value, JsValue> {
    serde_json::from_str(tree_json).map_err(|e| JsValue::from_str(&format!("Invalid content tree: {}", e)))
}

/// Render a template against a JSON content tree
#[wasm_bindgen(js_name = compile)]
pub fn compile_js(template: &str, tree_json: &str, annotate: bool) -> Result<String, JsValue> {
    let tree = parse_tree(tree_json)?;
    let options = if annotate {
        CompileOptions::preview()
    } else {
        CompileOptions::default()
    };
    Ok(compile_with(template, &tree, &options))
}

#[wasm_bindgen]
pub struct InstrumentResult {
    html: String,
    targets: String,
}

#[wasm_bindgen]
impl InstrumentResult {
    #[wasm_bindgen(getter)]
    pub fn html(&self) -> String {
        self.html.clone()
    }

    /// Edit targets as a JSON array
    #[wasm_bindgen(getter)]
    pub fn targets(&self) -> String {
        self.targets.clone()
    }
}

/// Instrument rendered HTML with the default rule tables
#[wasm_bindgen(js_name = instrument)]
pub fn instrument_js(html: &str) -> InstrumentResult {
    let doc = instrument(html, &Rules::default());
    InstrumentResult {
        targets: encode(&doc.targets),
        html: doc.html,
    }
}

/// Frame-side edit session. Outbound messages are returned as JSON
/// strings ready for `postMessage`.
#[wasm_bindgen(js_name = DocumentSession)]
pub struct JsDocumentSession {
    inner: DocumentSession,
}

fn js_err(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn outbound(message: OutboundMessage) -> String {
    encode(&message)
}

#[wasm_bindgen(js_class = DocumentSession)]
impl JsDocumentSession {
    #[wasm_bindgen(constructor)]
    pub fn new(targets_json: &str) -> Result<JsDocumentSession, JsValue> {
        let targets = serde_json::from_str(targets_json).map_err(js_err)?;
        Ok(Self {
            inner: DocumentSession::new(targets),
        })
    }

    #[wasm_bindgen(getter, js_name = editMode)]
    pub fn edit_mode(&self) -> bool {
        self.inner.state().edit_mode
    }

    /// Handle a raw inbound message. Returns `"show"`, `"hide"` or
    /// `"reload"`; bad input yields `undefined`.
    pub fn receive(&mut self, raw: &str) -> Option<String> {
        self.inner.receive(raw).map(|effect| match effect {
            InboundEffect::Affordances { visible: true } => "show".to_string(),
            InboundEffect::Affordances { visible: false } => "hide".to_string(),
            InboundEffect::Reload => "reload".to_string(),
        })
    }

    #[wasm_bindgen(js_name = beginTextEdit)]
    pub fn begin_text_edit(&mut self, target: &str) -> Result<(), JsValue> {
        self.inner.begin_text_edit(target).map_err(js_err)
    }

    #[wasm_bindgen(js_name = confirmTextEdit)]
    pub fn confirm_text_edit(&mut self, value: &str) -> Result<Option<String>, JsValue> {
        Ok(self.inner.confirm_text_edit(value).map_err(js_err)?.map(outbound))
    }

    #[wasm_bindgen(js_name = cancelTextEdit)]
    pub fn cancel_text_edit(&mut self) {
        self.inner.cancel_text_edit();
    }

    #[wasm_bindgen(js_name = dropFile)]
    pub fn drop_file(&mut self, target: &str, filename: &str, bytes: &[u8]) -> Result<String, JsValue> {
        self.inner.drop_file(target, filename, bytes).map(outbound).map_err(js_err)
    }

    #[wasm_bindgen(js_name = deleteGalleryItem)]
    pub fn delete_gallery_item(&mut self, target: &str) -> Result<String, JsValue> {
        self.inner.delete_gallery_item(target).map(outbound).map_err(js_err)
    }

    #[wasm_bindgen(js_name = openSectionEditor)]
    pub fn open_section_editor(&mut self, target: &str, inner_html: &str) -> Result<String, JsValue> {
        self.inner.open_section_editor(target, inner_html).map_err(js_err)
    }

    #[wasm_bindgen(js_name = saveSectionHtml)]
    pub fn save_section_html(&mut self, html: &str) -> Result<String, JsValue> {
        self.inner.save_section_html(html).map(outbound).map_err(js_err)
    }

    #[wasm_bindgen(js_name = closeSectionEditor)]
    pub fn close_section_editor(&mut self) {
        self.inner.close_section_editor();
    }
}
