use thiserror::Error;

pub type PathResult<T> = Result<T, PathError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Path is empty")]
    Empty,

    #[error("Invalid path {path:?}: {message}")]
    Syntax { path: String, message: String },

    #[error("Cannot descend into scalar value at {at:?}")]
    NotAContainer { at: String },

    #[error("Value at {at:?} is not a sequence")]
    NotASequence { at: String },

    #[error("Index {index} out of bounds at {at:?} (length {len})")]
    IndexOutOfBounds { at: String, index: usize, len: usize },
}

impl PathError {
    pub fn syntax(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Syntax {
            path: path.into(),
            message: message.into(),
        }
    }
}
