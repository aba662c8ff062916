//! The CSS selector subset used by instrumentation rules.
//!
//! Supported: type (`img`), id (`#about`), class (`.card`), attribute
//! presence (`[data-sc-path]`), compounds of those, descendant combinator
//! (whitespace) and selector lists (`,`). Anything else makes the selector
//! match nothing.

use sitecraft_template::{HtmlDocument, HtmlElement, NodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Vec<Compound>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<String>,
}

impl Compound {
    fn parse(text: &str) -> Option<Self> {
        let mut compound = Compound::default();
        let mut rest = text;

        let tag_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
            .unwrap_or(rest.len());
        if tag_len > 0 {
            compound.tag = Some(rest[..tag_len].to_ascii_lowercase());
            rest = &rest[tag_len..];
        }

        while !rest.is_empty() {
            if !rest.as_bytes()[0].is_ascii() {
                return None;
            }
            let (marker, body) = rest.split_at(1);
            match marker {
                "#" | "." => {
                    let len = body
                        .find(|c: char| matches!(c, '#' | '.' | '['))
                        .unwrap_or(body.len());
                    if len == 0 {
                        return None;
                    }
                    let name = body[..len].to_string();
                    if marker == "#" {
                        compound.id = Some(name);
                    } else {
                        compound.classes.push(name);
                    }
                    rest = &body[len..];
                }
                "[" => {
                    let close = body.find(']')?;
                    let name = body[..close].trim();
                    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
                        return None;
                    }
                    compound.attributes.push(name.to_ascii_lowercase());
                    rest = &body[close + 1..];
                }
                _ => return None,
            }
        }

        Some(compound)
    }

    fn matches(&self, element: &HtmlElement) -> bool {
        self.tag.as_deref().map_or(true, |tag| element.name == tag)
            && self.id.as_deref().map_or(true, |id| element.id() == Some(id))
            && self.classes.iter().all(|c| element.has_class(c))
            && self.attributes.iter().all(|a| element.has_attr(a))
    }
}

impl Selector {
    /// `None` when the selector uses syntax outside the supported subset.
    pub fn parse(source: &str) -> Option<Self> {
        let mut alternatives = Vec::new();
        for alternative in source.split(',') {
            let chain: Option<Vec<Compound>> =
                alternative.split_whitespace().map(Compound::parse).collect();
            let chain = chain?;
            if chain.is_empty() {
                return None;
            }
            alternatives.push(chain);
        }
        Some(Self { alternatives })
    }

    pub fn matches(&self, doc: &HtmlDocument<'_>, id: NodeId) -> bool {
        self.alternatives.iter().any(|chain| chain_matches(chain, doc, id))
    }

    /// Matching elements in document order
    pub fn select(&self, doc: &HtmlDocument<'_>) -> Vec<NodeId> {
        (0..doc.elements().len())
            .filter(|&id| self.matches(doc, id))
            .collect()
    }
}

fn chain_matches(chain: &[Compound], doc: &HtmlDocument<'_>, id: NodeId) -> bool {
    let Some((last, ancestors)) = chain.split_last() else {
        return false;
    };
    if !last.matches(doc.element(id)) {
        return false;
    }

    let mut pending = ancestors.iter().rev().peekable();
    for ancestor in doc.ancestors(id) {
        match pending.peek() {
            Some(compound) if compound.matches(doc.element(ancestor)) => {
                pending.next();
            }
            Some(_) => {}
            None => break,
        }
    }
    pending.peek().is_none()
}
