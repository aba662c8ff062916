//! Whole-section overrides.
//!
//! A section is located structurally (first element in document order whose
//! id or class matches) and, when the tree holds a non-empty
//! `<contentPath>.customHtml` string, its inner content is swapped for that
//! markup. The start and end tags are kept as written.

use crate::dom::{HtmlDocument, Splice};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sitecraft_content::get;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    pub content_path: String,
}

impl SectionOverride {
    pub fn new(id: Option<&str>, class: Option<&str>, content_path: impl Into<String>) -> Self {
        Self {
            id: id.map(str::to_string),
            class: class.map(str::to_string),
            content_path: content_path.into(),
        }
    }

    /// `<name>` id, `<name>-section` class, `<name>` content path
    pub fn named(name: &str) -> Self {
        Self::new(Some(name), Some(&format!("{}-section", name)), name)
    }

    /// Id equals, or class list contains, whichever selectors are set.
    pub fn matches(&self, element: &crate::dom::HtmlElement) -> bool {
        let by_id = self
            .id
            .as_deref()
            .is_some_and(|id| element.id() == Some(id));
        let by_class = self
            .class
            .as_deref()
            .is_some_and(|class| element.has_class(class));
        by_id || by_class
    }

    pub fn custom_html_path(&self) -> String {
        format!("{}.customHtml", self.content_path)
    }

    /// CSS selector equivalent of this override's match rule
    pub fn selector(&self) -> String {
        let mut parts = Vec::new();
        if let Some(id) = &self.id {
            parts.push(format!("#{}", id));
        }
        if let Some(class) = &self.class {
            parts.push(format!(".{}", class));
        }
        parts.join(", ")
    }
}

pub fn default_sections() -> Vec<SectionOverride> {
    ["hero", "about", "services", "portfolio", "testimonials", "contact"]
        .into_iter()
        .map(SectionOverride::named)
        .collect()
}

/// Apply every override in table order. Each lookup sees the document as
/// rewritten by the previous ones.
pub fn apply_section_overrides(html: &str, tree: &Value, sections: &[SectionOverride]) -> String {
    let mut out = html.to_string();

    for section in sections {
        let custom = match get(tree, &section.custom_html_path()) {
            Some(Value::String(custom)) if !custom.is_empty() => custom,
            _ => continue,
        };

        let inner = {
            let doc = HtmlDocument::parse(&out);
            let found = doc
                .find(|el| section.matches(el))
                .map(|id| doc.element(id))
                .filter(|el| el.has_content_slot());
            match found {
                Some(el) => el.inner.clone(),
                None => {
                    tracing::debug!(section = %section.selector(), "override target not found");
                    continue;
                }
            }
        };

        out = Splice::apply(&out, vec![Splice::replace(inner, custom.clone())]);
    }

    out
}
