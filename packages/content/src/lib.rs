//! # Sitecraft Content
//!
//! The Content Tree and the dotted-path resolver used by every other crate.
//!
//! A Content Tree is plain JSON. Key order is preserved (serde_json is built
//! with `preserve_order`), so rendering a tree and writing it back to disk
//! never reshuffles what the editor typed.
//!
//! ```text
//! services.items[2].title
//! └──────┘ └───┘└┘ └───┘
//!   key     key  idx key
//! ```
//!
//! Reads are soft: a missing segment yields `None`. Writes are strict: they
//! create missing mappings but refuse to deepen a scalar or to grow a
//! sequence implicitly. Sequence growth goes through [`push`] / [`insert`].

mod error;
mod path;
mod resolver;
mod value;

pub use error::{PathError, PathResult};
pub use path::{EditPath, Segment};
pub use resolver::{get, get_path, insert, push, remove, set, set_path};
pub use value::display_value;

/// The JSON document holding all editable text and media references.
pub type ContentTree = serde_json::Value;
