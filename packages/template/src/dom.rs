//! Structural view over HTML source.
//!
//! The lexer is deliberately forgiving: anything that is not a well formed
//! tag, comment or declaration is text. Elements remember byte ranges into
//! the original source, so rewrites are splices and every untouched byte
//! survives exactly.
//!
//! Known limitation: optional end tags are not inferred. `<li>a<li>b</ul>`
//! yields a second `li` nested in the first, both closed by `</ul>`.

use logos::{Lexer, Logos};
use std::ops::Range;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum HtmlToken {
    #[token("<!--", skip_comment)]
    Comment,

    #[regex(r"<![a-zA-Z][^>]*>")]
    Declaration,

    #[regex(r#"<[a-zA-Z][^\t\n\f\r />]*([^>"']|"[^"]*"|'[^']*')*>"#)]
    StartTag,

    #[regex(r"</[a-zA-Z][^>]*>")]
    EndTag,

    #[regex(r"[^<]+")]
    Text,

    #[token("<")]
    Lt,
}

fn skip_comment(lex: &mut Lexer<HtmlToken>) {
    match lex.remainder().find("-->") {
        Some(i) => lex.bump(i + 3),
        None => lex.bump(lex.remainder().len()),
    }
}

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlAttribute {
    /// Lowercased attribute name
    pub name: String,
    /// Decoded value, `None` for bare attributes like `hidden`
    pub value: Option<String>,
    /// Source range including the leading whitespace
    pub span: Range<usize>,
}

#[derive(Debug, Clone)]
pub struct HtmlElement {
    /// Lowercased tag name
    pub name: String,
    pub attributes: Vec<HtmlAttribute>,
    /// Start tag
    pub open: Range<usize>,
    /// Content between start and end tag
    pub inner: Range<usize>,
    /// End tag, `None` for void elements and implicitly closed ones
    pub close: Option<Range<usize>>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub void: bool,
}

impl HtmlElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_deref().unwrap_or(""))
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// Whole element including its end tag
    pub fn outer(&self) -> Range<usize> {
        let end = self.close.as_ref().map(|c| c.end).unwrap_or(self.inner.end);
        self.open.start..end
    }

    /// Offset in the start tag where new attributes can be written.
    pub fn attr_insert_at(&self, source: &str) -> usize {
        let tag = &source[self.open.clone()];
        if tag.ends_with("/>") {
            self.open.end - 2
        } else {
            self.open.end - 1
        }
    }

    /// Whether inner content can be replaced without breaking the markup.
    pub fn has_content_slot(&self) -> bool {
        !self.void
    }
}

/// Parsed document borrowing its source.
#[derive(Debug, Clone)]
pub struct HtmlDocument<'src> {
    source: &'src str,
    elements: Vec<HtmlElement>,
}

impl<'src> HtmlDocument<'src> {
    pub fn parse(source: &'src str) -> Self {
        let mut elements: Vec<HtmlElement> = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();
        let mut lex = HtmlToken::lexer(source);

        while let Some(result) = lex.next() {
            let span = lex.span();
            match result {
                Ok(HtmlToken::StartTag) => {
                    let (name, attributes, self_closing) =
                        parse_start_tag(&source[span.clone()], span.start);
                    let void = self_closing || is_void(&name);
                    let raw_text = !void && is_raw_text(&name);
                    let parent = stack.last().copied();
                    let id = elements.len();

                    elements.push(HtmlElement {
                        name,
                        attributes,
                        open: span.clone(),
                        inner: span.end..span.end,
                        close: None,
                        parent,
                        children: Vec::new(),
                        void,
                    });
                    if let Some(parent) = parent {
                        elements[parent].children.push(id);
                    }

                    if raw_text {
                        let needle = format!("</{}", elements[id].name);
                        let rest = lex.remainder().to_ascii_lowercase();
                        let skip = rest.find(&needle).unwrap_or(rest.len());
                        lex.bump(skip);
                    }
                    if !void {
                        stack.push(id);
                    }
                }
                Ok(HtmlToken::EndTag) => {
                    let name = end_tag_name(&source[span.clone()]);
                    if let Some(pos) = stack.iter().rposition(|&id| elements[id].name == name) {
                        while stack.len() > pos {
                            let Some(id) = stack.pop() else { break };
                            elements[id].inner.end = span.start;
                            if stack.len() == pos {
                                elements[id].close = Some(span.clone());
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        for id in stack {
            elements[id].inner.end = source.len();
        }

        Self { source, elements }
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    /// All elements in document order
    pub fn elements(&self) -> &[HtmlElement] {
        &self.elements
    }

    pub fn element(&self, id: NodeId) -> &HtmlElement {
        &self.elements[id]
    }

    /// First element in document order satisfying `pred`
    pub fn find(&self, pred: impl Fn(&HtmlElement) -> bool) -> Option<NodeId> {
        self.elements.iter().position(pred)
    }

    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.elements[id].parent, move |&p| self.elements[p].parent)
    }

    pub fn inner_html(&self, id: NodeId) -> &'src str {
        &self.source[self.elements[id].inner.clone()]
    }

    pub fn outer_html(&self, id: NodeId) -> &'src str {
        &self.source[self.elements[id].outer()]
    }

    /// Concatenated text inside an element with markup removed.
    pub fn text_content(&self, id: NodeId) -> String {
        let inner = self.inner_html(id);
        let mut lex = HtmlToken::lexer(inner);
        let mut text = String::new();
        while let Some(result) = lex.next() {
            if let Ok(HtmlToken::Text) = result {
                text.push_str(lex.slice());
            }
        }
        decode_entities(&text)
    }
}

/// One replacement of a source range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    pub range: Range<usize>,
    pub replacement: String,
}

impl Splice {
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            range: at..at,
            replacement: text.into(),
        }
    }

    pub fn replace(range: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            range,
            replacement: text.into(),
        }
    }

    /// Apply non-overlapping splices. Insertions at the same offset keep
    /// their relative order; a splice overlapping an earlier one is dropped.
    pub fn apply(source: &str, mut splices: Vec<Splice>) -> String {
        splices.sort_by_key(|s| s.range.start);

        let mut out = String::with_capacity(source.len());
        let mut cursor = 0;
        for splice in splices {
            if splice.range.start < cursor || splice.range.end > source.len() {
                tracing::debug!(?splice.range, "dropping overlapping splice");
                continue;
            }
            out.push_str(&source[cursor..splice.range.start]);
            out.push_str(&splice.replacement);
            cursor = splice.range.end;
        }
        out.push_str(&source[cursor..]);
        out
    }
}

pub fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

fn is_void(tag: &str) -> bool {
    matches!(
        tag,
        "img"
            | "input"
            | "br"
            | "hr"
            | "meta"
            | "link"
            | "area"
            | "base"
            | "col"
            | "embed"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn is_raw_text(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "textarea" | "title")
}

fn end_tag_name(tag: &str) -> String {
    tag[2..]
        .trim_end_matches('>')
        .split(|c: char| c.is_ascii_whitespace())
        .next()
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Split a start tag into name, attributes and the self-closing flag.
/// `offset` is the tag's position in the document.
fn parse_start_tag(tag: &str, offset: usize) -> (String, Vec<HtmlAttribute>, bool) {
    let bytes = tag.as_bytes();
    let mut i = 1;
    while i < bytes.len() && !is_tag_delim(bytes[i]) {
        i += 1;
    }
    let name = tag[1..i].to_ascii_lowercase();

    let mut attributes = Vec::new();
    let mut self_closing = false;

    loop {
        let attr_start = i;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] == b'>' {
            break;
        }
        if bytes[i] == b'/' {
            if bytes.get(i + 1) == Some(&b'>') {
                self_closing = true;
                break;
            }
            i += 1;
            continue;
        }

        let name_start = i;
        while i < bytes.len() && !is_tag_delim(bytes[i]) && bytes[i] != b'=' {
            i += 1;
        }
        let attr_name = tag[name_start..i].to_ascii_lowercase();

        let mut j = i;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }

        let mut value = None;
        if bytes.get(j) == Some(&b'=') {
            j += 1;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            match bytes.get(j) {
                Some(&quote) if quote == b'"' || quote == b'\'' => {
                    let value_start = j + 1;
                    let value_end = tag[value_start..]
                        .find(quote as char)
                        .map(|k| value_start + k)
                        .unwrap_or(bytes.len());
                    value = Some(decode_entities(&tag[value_start..value_end]));
                    j = (value_end + 1).min(bytes.len());
                }
                _ => {
                    let value_start = j;
                    while j < bytes.len() && !bytes[j].is_ascii_whitespace() && bytes[j] != b'>' {
                        j += 1;
                    }
                    value = Some(decode_entities(&tag[value_start..j]));
                }
            }
            i = j;
        }

        if attr_name.is_empty() {
            i += 1;
            continue;
        }

        attributes.push(HtmlAttribute {
            name: attr_name,
            value,
            span: offset + attr_start..offset + i,
        });
    }

    (name, attributes, self_closing)
}

fn is_tag_delim(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'/' || b == b'>'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_elements() {
        let html = r#"<section id="about" class="a b"><div><p>Hi</p></div></section>"#;
        let doc = HtmlDocument::parse(html);
        assert_eq!(doc.elements().len(), 3);

        let section = doc.element(0);
        assert_eq!(section.name, "section");
        assert_eq!(section.id(), Some("about"));
        assert!(section.has_class("b"));
        assert_eq!(doc.inner_html(0), "<div><p>Hi</p></div>");
        assert_eq!(doc.element(2).parent, Some(1));
        assert_eq!(doc.ancestors(2).collect::<Vec<_>>(), vec![1, 0]);
    }

    #[test]
    fn test_attribute_forms() {
        let html = r#"<img data-x = 'one two' hidden src=pic.jpg alt="a &amp; b"/>"#;
        let doc = HtmlDocument::parse(html);
        let img = doc.element(0);
        assert!(img.void);
        assert_eq!(img.attr("data-x"), Some("one two"));
        assert_eq!(img.attr("hidden"), Some(""));
        assert_eq!(img.attr("src"), Some("pic.jpg"));
        assert_eq!(img.attr("alt"), Some("a & b"));
        assert_eq!(img.attr_insert_at(html), html.len() - 2);
    }

    #[test]
    fn test_attribute_spans_cover_leading_space() {
        let html = r#"<div class="x" data-sc-target="t1">y</div>"#;
        let doc = HtmlDocument::parse(html);
        let attr = &doc.element(0).attributes[1];
        assert_eq!(&html[attr.span.clone()], r#" data-sc-target="t1""#);
    }

    #[test]
    fn test_comments_and_scripts_are_opaque() {
        let html = r#"<!-- <section id="about"> --><script>if (a < b) { x = "<div>" }</script><p>x</p>"#;
        let doc = HtmlDocument::parse(html);
        let names: Vec<_> = doc.elements().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["script", "p"]);
        assert_eq!(doc.inner_html(0), r#"if (a < b) { x = "<div>" }"#);
    }

    #[test]
    fn test_implicit_close_and_stray_end_tags() {
        let html = "<ul><li>a<li>b</ul></span><p>tail";
        let doc = HtmlDocument::parse(html);
        assert_eq!(doc.element(0).close, Some(14..19));
        assert!(doc.element(1).close.is_none());
        assert_eq!(doc.inner_html(3), "tail");
    }

    #[test]
    fn test_text_content() {
        let html = "<h2>Hello <em>there</em> &amp; bye</h2>";
        let doc = HtmlDocument::parse(html);
        assert_eq!(doc.text_content(0), "Hello there & bye");
    }

    #[test]
    fn test_splices() {
        let out = Splice::apply(
            "<p>old</p>",
            vec![Splice::replace(3..6, "new"), Splice::insert(2, " id=\"x\"")],
        );
        assert_eq!(out, "<p id=\"x\">new</p>");
    }
}
