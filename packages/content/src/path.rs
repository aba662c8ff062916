//! Edit path parsing.

use crate::error::{PathError, PathResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// One step of an [`EditPath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Parsed dotted/bracketed address into a Content Tree.
///
/// Every dot-separated part starts with a key and may be followed by any
/// number of `[n]` indices: `gallery.images[3].src`, `grid[1][2]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EditPath {
    segments: Vec<Segment>,
}

impl EditPath {
    pub fn parse(source: &str) -> PathResult<Self> {
        if source.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = Vec::new();

        for part in source.split('.') {
            if part.is_empty() {
                return Err(PathError::syntax(source, "empty segment"));
            }

            let (key, mut rest) = match part.find('[') {
                Some(i) => (&part[..i], &part[i..]),
                None => (part, ""),
            };

            if key.is_empty() {
                return Err(PathError::syntax(source, "segment must start with a key"));
            }
            if key.contains(']') {
                return Err(PathError::syntax(source, "unbalanced ']'"));
            }
            segments.push(Segment::Key(key.to_string()));

            while !rest.is_empty() {
                if !rest.starts_with('[') {
                    return Err(PathError::syntax(source, "unexpected text after index"));
                }
                let close = rest
                    .find(']')
                    .ok_or_else(|| PathError::syntax(source, "unterminated index"))?;
                let digits = &rest[1..close];
                let index = digits
                    .parse::<usize>()
                    .map_err(|_| PathError::syntax(source, format!("invalid index {:?}", digits)))?;
                segments.push(Segment::Index(index));
                rest = &rest[close + 1..];
            }
        }

        Ok(Self { segments })
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Path extended with a mapping key
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Key(key.into()));
        Self { segments }
    }

    /// Path extended with a sequence index
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Index(index));
        Self { segments }
    }

    /// Rendered form of the first `len` segments, used in error messages.
    pub(crate) fn prefix(&self, len: usize) -> String {
        Self::from_segments(self.segments[..len.min(self.segments.len())].to_vec()).to_string()
    }
}

impl fmt::Display for EditPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => write!(f, "{}", key)?,
                Segment::Key(key) => write!(f, ".{}", key)?,
                Segment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

impl FromStr for EditPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Paths travel as their rendered string form.
impl Serialize for EditPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EditPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
