//! # Sitecraft Template
//!
//! Compiles a static HTML template and a Content Tree into a finished page.
//!
//! ```text
//! template ──lex──▶ block tree ──render(tree)──▶ html ──sections(tree)──▶ page
//!                   text / {{path}} / {{#each}}       parse tree + splice
//! ```
//!
//! Compilation is total. Unresolvable placeholders stay in the output
//! verbatim, non-sequence iteration sources render empty, malformed regions
//! are copied through. Hand-edited content must never take the site down.
//!
//! The [`dom`] module is a small structural view over HTML source: it keeps
//! byte ranges for every element so callers can rewrite one element without
//! re-serializing the rest of the document.

pub mod compiler;
pub mod dom;
pub mod lexer;
pub mod sections;

pub use compiler::{compile, compile_with, CompileOptions, IMAGE_PATH_ATTR, ITEM_PATH_ATTR, TEXT_PATH_ATTR};
pub use dom::{escape_attr, HtmlDocument, HtmlElement, NodeId, Splice};
pub use sections::{apply_section_overrides, default_sections, SectionOverride};
