//! Instrumentation rule tables.
//!
//! Each table maps a selector to the content path an element edits. Paths
//! come from one of three places, in order of robustness:
//!
//! 1. a render-time tag (`data-sc-path`, `data-sc-image`, `data-sc-item`)
//!    written by the template compiler
//! 2. a fixed path
//! 3. the element's ordinal among all matches of the same selector. This
//!    only holds while DOM order equals sequence order in the tree, so
//!    tables list positional rules after tag-based ones.

use serde::{Deserialize, Serialize};
use sitecraft_content::EditPath;
use sitecraft_template::{default_sections, HtmlElement, IMAGE_PATH_ATTR, ITEM_PATH_ATTR, TEXT_PATH_ATTR};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "camelCase")]
pub enum PathSpec {
    Fixed {
        path: String,
    },
    #[serde(rename_all = "camelCase")]
    Indexed {
        list: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },
    Attribute {
        name: String,
    },
}

impl PathSpec {
    /// Path for the element at `ordinal` among its selector's matches.
    /// `None` or an unparseable result means the element is skipped.
    pub fn derive(&self, element: &HtmlElement, ordinal: usize) -> Option<String> {
        let path = match self {
            PathSpec::Fixed { path } => path.clone(),
            PathSpec::Indexed { list, field } => match field {
                Some(field) => format!("{}[{}].{}", list, ordinal, field),
                None => format!("{}[{}]", list, ordinal),
            },
            PathSpec::Attribute { name } => element.attr(name)?.trim().to_string(),
        };
        EditPath::parse(&path).ok().map(|p| p.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRule {
    pub selector: String,
    pub path: PathSpec,
}

impl EditRule {
    pub fn new(selector: impl Into<String>, path: PathSpec) -> Self {
        Self {
            selector: selector.into(),
            path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRule {
    pub selector: String,
    pub content_path: String,
}

/// Drop target that appends to a sequence of images, and whose items can be
/// deleted individually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryRule {
    pub container: String,
    pub items: String,
    pub list: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    pub text: Vec<EditRule>,
    pub images: Vec<EditRule>,
    pub sections: Vec<SectionRule>,
    pub gallery: Option<GalleryRule>,
}

impl Default for Rules {
    fn default() -> Self {
        let attribute = |name: &str| PathSpec::Attribute {
            name: name.to_string(),
        };
        let indexed = |list: &str, field: &str| PathSpec::Indexed {
            list: list.to_string(),
            field: Some(field.to_string()),
        };

        Self {
            text: vec![
                EditRule::new(format!("[{}]", TEXT_PATH_ATTR), attribute(TEXT_PATH_ATTR)),
                EditRule::new(".services-section .card h3", indexed("services.items", "title")),
                EditRule::new(".services-section .card p", indexed("services.items", "description")),
            ],
            images: vec![
                EditRule::new(format!("[{}]", IMAGE_PATH_ATTR), attribute(IMAGE_PATH_ATTR)),
                EditRule::new(".gallery img", indexed("portfolio.images", "src")),
            ],
            sections: default_sections()
                .into_iter()
                .map(|s| SectionRule {
                    selector: s.selector(),
                    content_path: s.content_path,
                })
                .collect(),
            gallery: Some(GalleryRule {
                container: ".gallery".to_string(),
                items: ".gallery img".to_string(),
                list: "portfolio.images".to_string(),
            }),
        }
    }
}

/// Gallery item index: render-time tag first, ordinal otherwise.
pub(crate) fn item_index(element: &HtmlElement, list: &str, ordinal: usize) -> usize {
    element
        .attr(ITEM_PATH_ATTR)
        .and_then(|tag| tag.strip_prefix(list))
        .and_then(|rest| rest.strip_prefix('['))
        .and_then(|rest| rest.strip_suffix(']'))
        .and_then(|index| index.parse().ok())
        .unwrap_or(ordinal)
}
