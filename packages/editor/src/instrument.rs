//! Document instrumentation.
//!
//! Turns a rendered page into an editable one: every element matched by the
//! rule tables gets a stable target id and the content path it edits,
//! sections and gallery items get their inline controls, and the bootstrap
//! script plus its target table are injected once before `</body>`.
//!
//! Running [`instrument`] on its own output returns the same document and
//! the same targets. Already tagged elements keep their ids and receive no
//! second set of attributes or controls.

use crate::reconcile::filename_of;
use crate::rules::{item_index, EditRule, Rules};
use crate::selector::Selector;
use serde::{Deserialize, Serialize};
use sitecraft_template::{escape_attr, HtmlDocument, NodeId, Splice};
use std::collections::{BTreeMap, HashSet};

pub const TARGET_ATTR: &str = "data-sc-target";
pub const CONTROL_ATTR: &str = "data-sc-control";
pub const CONTROL_FOR_ATTR: &str = "data-sc-for";
pub const GALLERY_INDEX_ATTR: &str = "data-sc-gallery-index";

const BOOTSTRAP_JS: &str = include_str!("../assets/bootstrap.js");
const AFFORDANCES_CSS: &str = include_str!("../assets/affordances.css");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TargetKind {
    Text,
    Image,
    Section,
    Gallery,
    GalleryItem,
}

impl TargetKind {
    /// Marker attribute carrying the target's path
    pub fn attr(self) -> &'static str {
        match self {
            TargetKind::Text => "data-sc-edit-text",
            TargetKind::Image => "data-sc-edit-image",
            TargetKind::Section => "data-sc-edit-section",
            TargetKind::Gallery => "data-sc-gallery",
            TargetKind::GalleryItem => "data-sc-gallery-item",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditTarget {
    /// Element id shared by all kinds on the same element
    pub id: String,
    pub kind: TargetKind,
    /// Content path; the sequence path for gallery kinds
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Text, image source or gallery item filename at instrumentation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrumented {
    pub html: String,
    pub targets: Vec<EditTarget>,
}

struct Assignment {
    kind: TargetKind,
    path: String,
    index: Option<usize>,
}

#[derive(Default)]
struct Plan {
    by_element: BTreeMap<NodeId, Vec<Assignment>>,
    claimed: HashSet<(NodeId, TargetKind)>,
}

impl Plan {
    fn claim(&mut self, id: NodeId, kind: TargetKind, path: String, index: Option<usize>) {
        if self.claimed.insert((id, kind)) {
            self.by_element
                .entry(id)
                .or_default()
                .push(Assignment { kind, path, index });
        }
    }

    fn assign_rules(&mut self, doc: &HtmlDocument<'_>, kind: TargetKind, rules: &[EditRule]) {
        for rule in rules {
            let Some(selector) = Selector::parse(&rule.selector) else {
                tracing::debug!(selector = %rule.selector, "unsupported selector, rule skipped");
                continue;
            };
            for (ordinal, id) in selector.select(doc).into_iter().enumerate() {
                if self.claimed.contains(&(id, kind)) {
                    continue;
                }
                match rule.path.derive(doc.element(id), ordinal) {
                    Some(path) => self.claim(id, kind, path, None),
                    None => {
                        tracing::debug!(selector = %rule.selector, ordinal, "no path for element, skipped")
                    }
                }
            }
        }
    }
}

pub fn instrument(html: &str, rules: &Rules) -> Instrumented {
    let doc = HtmlDocument::parse(html);
    let plan = plan(&doc, rules);

    let mut next_id = doc
        .elements()
        .iter()
        .filter_map(|el| el.attr(TARGET_ATTR)?.strip_prefix("sc-")?.parse::<usize>().ok())
        .max()
        .map_or(1, |n| n + 1);

    let mut targets = Vec::new();
    let mut splices = Vec::new();

    for (&node, assignments) in &plan.by_element {
        let element = doc.element(node);
        let existing = element.attr(TARGET_ATTR).map(str::to_string);
        let fresh = existing.is_none();
        let target_id = existing.unwrap_or_else(|| {
            let id = format!("sc-{}", next_id);
            next_id += 1;
            id
        });

        let mut attrs = format!(" {}=\"{}\"", TARGET_ATTR, target_id);

        for assignment in assignments {
            let value = match assignment.kind {
                TargetKind::Text => Some(doc.text_content(node).trim().to_string()),
                TargetKind::Image => element.attr("src").map(str::to_string),
                TargetKind::GalleryItem => item_source(&doc, node)
                    .and_then(filename_of)
                    .map(str::to_string),
                _ => None,
            };
            targets.push(EditTarget {
                id: target_id.clone(),
                kind: assignment.kind,
                path: assignment.path.clone(),
                index: assignment.index,
                value,
            });

            if !fresh {
                continue;
            }
            attrs.push_str(&format!(" {}=\"{}\"", assignment.kind.attr(), escape_attr(&assignment.path)));
            if let Some(index) = assignment.index {
                attrs.push_str(&format!(" {}=\"{}\"", GALLERY_INDEX_ATTR, index));
            }

            match assignment.kind {
                TargetKind::Section if element.has_content_slot() => {
                    splices.push(Splice::insert(
                        element.inner.start,
                        control("edit-html", &target_id, "Edit HTML"),
                    ));
                }
                TargetKind::GalleryItem => {
                    splices.push(Splice::insert(
                        element.outer().end,
                        control("delete", &target_id, "&times;"),
                    ));
                }
                _ => {}
            }
        }

        if fresh {
            splices.push(Splice::insert(element.attr_insert_at(html), attrs));
        }
    }

    let bootstrapped = doc
        .elements()
        .iter()
        .any(|el| el.attr(CONTROL_ATTR) == Some("bootstrap"));
    if !bootstrapped {
        let at = doc
            .find(|el| el.name == "body")
            .map(|body| doc.element(body).inner.end)
            .unwrap_or(html.len());
        splices.push(Splice::insert(at, bootstrap_markup(&targets)));
    }

    Instrumented {
        html: Splice::apply(html, splices),
        targets,
    }
}

fn plan(doc: &HtmlDocument<'_>, rules: &Rules) -> Plan {
    let mut plan = Plan::default();

    plan.assign_rules(doc, TargetKind::Text, &rules.text);
    plan.assign_rules(doc, TargetKind::Image, &rules.images);

    for section in &rules.sections {
        let Some(selector) = Selector::parse(&section.selector) else {
            continue;
        };
        if let Some(id) = selector.select(doc).into_iter().next() {
            plan.claim(id, TargetKind::Section, section.content_path.clone(), None);
        }
    }

    if let Some(gallery) = &rules.gallery {
        if let Some(container) = Selector::parse(&gallery.container).and_then(|s| s.select(doc).into_iter().next()) {
            plan.claim(container, TargetKind::Gallery, gallery.list.clone(), None);
        }
        if let Some(items) = Selector::parse(&gallery.items) {
            for (ordinal, id) in items.select(doc).into_iter().enumerate() {
                let index = item_index(doc.element(id), &gallery.list, ordinal);
                plan.claim(id, TargetKind::GalleryItem, gallery.list.clone(), Some(index));
            }
        }
    }

    plan
}

/// The item's own `src`, or that of the first image inside it.
fn item_source<'a>(doc: &'a HtmlDocument<'_>, node: NodeId) -> Option<&'a str> {
    let element = doc.element(node);
    if let Some(src) = element.attr("src") {
        return Some(src);
    }
    element.children.iter().find_map(|&child| {
        let child_el = doc.element(child);
        if child_el.name == "img" {
            child_el.attr("src")
        } else {
            item_source(doc, child)
        }
    })
}

fn control(action: &str, target_id: &str, label: &str) -> String {
    format!(
        "<button type=\"button\" {}=\"{}\" {}=\"{}\">{}</button>",
        CONTROL_ATTR, action, CONTROL_FOR_ATTR, target_id, label
    )
}

fn bootstrap_markup(targets: &[EditTarget]) -> String {
    let table = serde_json::to_string(targets)
        .unwrap_or_else(|_| "[]".to_string())
        .replace("</", "<\\/");
    format!(
        "<style {attr}=\"style\">{css}</style>\
         <script type=\"application/json\" {attr}=\"targets\">{table}</script>\
         <script type=\"module\" {attr}=\"bootstrap\">{js}</script>",
        attr = CONTROL_ATTR,
        css = AFFORDANCES_CSS,
        table = table,
        js = BOOTSTRAP_JS,
    )
}

/// Remove instrumentation from markup: control elements go entirely and
/// every `data-sc-*` attribute is dropped.
pub fn strip_instrumentation(html: &str) -> String {
    let doc = HtmlDocument::parse(html);
    let mut splices = Vec::new();

    for element in doc.elements() {
        if element.has_attr(CONTROL_ATTR) {
            splices.push(Splice::replace(element.outer(), ""));
            continue;
        }
        for attribute in &element.attributes {
            if attribute.name.starts_with("data-sc-") {
                splices.push(Splice::replace(attribute.span.clone(), ""));
            }
        }
    }

    Splice::apply(html, splices)
}

/// Inner markup of a target element with instrumentation stripped.
pub fn capture_inner_html(html: &str, target_id: &str) -> Option<String> {
    let doc = HtmlDocument::parse(html);
    let node = doc.find(|el| el.attr(TARGET_ATTR) == Some(target_id))?;
    Some(strip_instrumentation(doc.inner_html(node)))
}
