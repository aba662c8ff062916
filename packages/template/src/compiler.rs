//! Template → HTML compilation.
//!
//! The template is lexed once into a block tree and rendered against the
//! Content Tree, then section overrides are applied to the result. Because
//! rendering walks the block tree rather than rescanning text, substituted
//! values are inert: a content string containing `{{...}}` is output as is.

use crate::dom::{escape_attr, HtmlDocument};
use crate::lexer::{lex, Token};
use crate::sections::{apply_section_overrides, default_sections, SectionOverride};
use serde_json::Value;
use sitecraft_content::{display_value, get, EditPath};

/// Element whose whole content is one placeholder
pub const TEXT_PATH_ATTR: &str = "data-sc-path";
/// `<img>` whose `src` is one placeholder
pub const IMAGE_PATH_ATTR: &str = "data-sc-image";
/// First element of each iteration of an each-block
pub const ITEM_PATH_ATTR: &str = "data-sc-item";

#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Ordered section override table
    pub sections: Vec<SectionOverride>,
    /// Tag rendered elements with the content paths they came from
    pub annotate: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            sections: default_sections(),
            annotate: false,
        }
    }
}

impl CompileOptions {
    /// Options for the editable preview: annotated output.
    pub fn preview() -> Self {
        Self {
            annotate: true,
            ..Self::default()
        }
    }
}

/// Compile with the default section table and no annotations.
pub fn compile(template: &str, tree: &Value) -> String {
    compile_with(template, tree, &CompileOptions::default())
}

pub fn compile_with(template: &str, tree: &Value, options: &CompileOptions) -> String {
    let blocks = parse_blocks(template);

    let mut renderer = Renderer {
        tree,
        annotate: options.annotate,
        out: String::with_capacity(template.len()),
    };
    renderer.render(&blocks, &Scope::default());

    apply_section_overrides(&renderer.out, tree, &options.sections)
}

#[derive(Debug, Clone, PartialEq)]
enum Block<'src> {
    Text(&'src str),
    Placeholder { expr: &'src str, raw: &'src str },
    Each { path: &'src str, body: Vec<Block<'src>> },
}

struct Frame<'src> {
    path: &'src str,
    open_raw: &'src str,
    body: Vec<Block<'src>>,
}

fn parse_blocks(source: &str) -> Vec<Block<'_>> {
    let mut root = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    for spanned in lex(source) {
        let raw = &source[spanned.span.start..spanned.span.end];

        let block = match spanned.token {
            Token::Tag(expr) => {
                if let Some(path) = each_path(expr) {
                    stack.push(Frame {
                        path,
                        open_raw: raw,
                        body: Vec::new(),
                    });
                    continue;
                }

                if expr == "/each" {
                    match stack.pop() {
                        Some(frame) => Block::Each {
                            path: frame.path,
                            body: frame.body,
                        },
                        None => Block::Text(raw),
                    }
                } else if expr.is_empty() || expr.starts_with('#') || expr.starts_with('/') {
                    Block::Text(raw)
                } else {
                    Block::Placeholder { expr, raw }
                }
            }
            Token::Text(text) | Token::Brace(text) => Block::Text(text),
        };

        match stack.last_mut() {
            Some(frame) => frame.body.push(block),
            None => root.push(block),
        }
    }

    // Unterminated blocks are copied through with their contents rendered.
    while let Some(frame) = stack.pop() {
        tracing::debug!(path = frame.path, "unterminated each-block left unexpanded");
        let target = match stack.last_mut() {
            Some(parent) => &mut parent.body,
            None => &mut root,
        };
        target.push(Block::Text(frame.open_raw));
        target.extend(frame.body);
    }

    root
}

fn each_path(expr: &str) -> Option<&str> {
    let rest = expr.strip_prefix("#each")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let path = rest.trim();
    (!path.is_empty()).then_some(path)
}

#[derive(Debug, Clone, Default)]
struct Scope<'a> {
    item: Option<Item<'a>>,
}

#[derive(Debug, Clone)]
struct Item<'a> {
    value: &'a Value,
    path: Option<EditPath>,
}

struct Renderer<'a> {
    tree: &'a Value,
    annotate: bool,
    out: String,
}

impl<'a> Renderer<'a> {
    fn render(&mut self, blocks: &[Block<'_>], scope: &Scope<'a>) {
        for (i, block) in blocks.iter().enumerate() {
            match block {
                Block::Text(text) => self.out.push_str(text),
                Block::Placeholder { expr, raw } => match self.resolve(expr, scope) {
                    Some((text, path)) => {
                        if self.annotate {
                            if let Some(path) = path {
                                self.annotate_placeholder(&path, blocks.get(i + 1));
                            }
                        }
                        self.out.push_str(&text);
                    }
                    None => self.out.push_str(raw),
                },
                Block::Each { path, body } => self.render_each(path, body, scope),
            }
        }
    }

    /// Text for a placeholder plus the content path it came from.
    /// `None` means the placeholder stays verbatim.
    fn resolve(&self, expr: &str, scope: &Scope<'a>) -> Option<(String, Option<EditPath>)> {
        if expr == "this" {
            let item = scope.item.as_ref()?;
            let text = match item.value {
                Value::String(s) => s.clone(),
                _ => String::new(),
            };
            return Some((text, item.path.clone()));
        }

        if let Some(field) = expr.strip_prefix("this.") {
            let item = scope.item.as_ref()?;
            let text = get(item.value, field).map(display_value).unwrap_or_default();
            let path = item.path.as_ref().and_then(|base| join(base, field));
            return Some((text, path));
        }

        if expr.starts_with("this") && expr[4..].starts_with('[') {
            return None;
        }

        let value = get(self.tree, expr)?;
        Some((display_value(value), EditPath::parse(expr).ok()))
    }

    fn render_each(&mut self, path: &str, body: &[Block<'_>], scope: &Scope<'a>) {
        let (source, base) = match path.strip_prefix("this.") {
            Some(field) => match &scope.item {
                Some(item) => (
                    get(item.value, field),
                    item.path.as_ref().and_then(|p| join(p, field)),
                ),
                None => (None, None),
            },
            None => (get(self.tree, path), EditPath::parse(path).ok()),
        };

        let items = match source {
            Some(Value::Array(items)) => items,
            _ => {
                tracing::debug!(path, "each-block source is not a sequence, rendering empty");
                return;
            }
        };

        for (index, value) in items.iter().enumerate() {
            let item_path = base.as_ref().map(|p| p.index(index));
            let start = self.out.len();

            let inner = Scope {
                item: Some(Item {
                    value,
                    path: item_path.clone(),
                }),
            };
            self.render(body, &inner);

            if self.annotate {
                if let Some(item_path) = item_path {
                    self.tag_first_element(start, &item_path);
                }
            }
        }
    }

    /// `<h1>{{path}}</h1>` gains `data-sc-path`, `<img src="{{path}}">`
    /// gains `data-sc-image`.
    fn annotate_placeholder(&mut self, path: &EditPath, next: Option<&Block<'_>>) {
        let next_text = match next {
            Some(Block::Text(text)) => *text,
            _ => "",
        };
        let Some(lt) = self.out.rfind('<') else {
            return;
        };
        let tag = &self.out[lt..];
        if !tag[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            return;
        }

        let value = escape_attr(&path.to_string());

        if tag.ends_with('>') && !tag.ends_with("/>") && next_text.starts_with("</") {
            if tag[..tag.len() - 1].contains('>') || tag.contains(TEXT_PATH_ATTR) {
                return;
            }
            let at = self.out.len() - 1;
            self.out.insert_str(at, &format!(" {}=\"{}\"", TEXT_PATH_ATTR, value));
            return;
        }

        let in_src = opens_src_value(tag);
        let name_len = tag[1..]
            .find(|c: char| c.is_ascii_whitespace())
            .unwrap_or(0);
        if in_src && tag[1..1 + name_len].eq_ignore_ascii_case("img") && !tag.contains(IMAGE_PATH_ATTR) {
            let at = lt + 1 + name_len;
            self.out.insert_str(at, &format!(" {}=\"{}\"", IMAGE_PATH_ATTR, value));
        }
    }

    fn tag_first_element(&mut self, start: usize, path: &EditPath) {
        let at = {
            let doc = HtmlDocument::parse(&self.out[start..]);
            match doc.elements().first() {
                Some(el) if !el.has_attr(ITEM_PATH_ATTR) => start + el.attr_insert_at(doc.source()),
                _ => return,
            }
        };
        let attr = format!(" {}=\"{}\"", ITEM_PATH_ATTR, escape_attr(&path.to_string()));
        self.out.insert_str(at, &attr);
    }
}

fn join(base: &EditPath, relative: &str) -> Option<EditPath> {
    let relative = EditPath::parse(relative).ok()?;
    let mut segments = base.segments().to_vec();
    segments.extend_from_slice(relative.segments());
    Some(EditPath::from_segments(segments))
}

/// Whether an open tag ends right after `src="` (any case).
fn opens_src_value(tag: &str) -> bool {
    let Some(head) = tag.strip_suffix("=\"").or_else(|| tag.strip_suffix("='")) else {
        return false;
    };
    let bytes = head.as_bytes();
    bytes.len() > 3
        && bytes[bytes.len() - 3..].eq_ignore_ascii_case(b"src")
        && bytes[bytes.len() - 4].is_ascii_whitespace()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_blocks_nesting() {
        let blocks = parse_blocks("a{{#each xs}}b{{x}}{{/each}}c");
        assert_eq!(
            blocks,
            vec![
                Block::Text("a"),
                Block::Each {
                    path: "xs",
                    body: vec![
                        Block::Text("b"),
                        Block::Placeholder { expr: "x", raw: "{{x}}" }
                    ],
                },
                Block::Text("c"),
            ]
        );
    }

    #[test]
    fn test_parse_blocks_unterminated() {
        let blocks = parse_blocks("{{#each xs}}b{{/if}}");
        assert_eq!(
            blocks,
            vec![Block::Text("{{#each xs}}"), Block::Text("b"), Block::Text("{{/if}}")]
        );
    }

    #[test]
    fn test_each_path() {
        assert_eq!(each_path("#each items"), Some("items"));
        assert_eq!(each_path("#each   a.b[0] "), Some("a.b[0]"));
        assert_eq!(each_path("#eachitems"), None);
        assert_eq!(each_path("#each"), None);
    }
}
