//! Dotted/bracketed addresses into nested JSON documents.
//!
//! A path such as `root.layoutSections.dnd_area.rows[2].0.label` is parsed once
//! into a sequence of [`Segment`]s. The string form is kept byte-for-byte
//! compatible with mapping files written by earlier runs.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Name of the synthetic wrapper key that extraction prefixes every path with.
pub const ROOT_KEY: &str = "root";

/// One step of a traversal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Mapping lookup by key
    Key(String),
    /// Sequence lookup by position
    Index(usize),
}

/// Reasons a path could not be parsed or resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("malformed path '{path}': {reason}")]
    Malformed { path: String, reason: String },

    #[error("key '{key}' not found")]
    MissingKey { key: String },

    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("expected {expected} at segment '{segment}'")]
    TypeMismatch {
        expected: &'static str,
        segment: String,
    },

    #[error("path has no segments")]
    Empty,
}

/// A parsed path into a nested document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// The synthetic root path every extracted path starts from.
    pub fn root() -> Self {
        Self {
            segments: vec![Segment::Key(ROOT_KEY.to_string())],
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn push_key(&mut self, key: impl Into<String>) {
        self.segments.push(Segment::Key(key.into()));
    }

    pub fn push_index(&mut self, index: usize) {
        self.segments.push(Segment::Index(index));
    }

    pub fn pop(&mut self) -> Option<Segment> {
        self.segments.pop()
    }

    /// Name of the last key segment, if the path ends in a mapping lookup.
    pub fn last_key(&self) -> Option<&str> {
        match self.segments.last() {
            Some(Segment::Key(key)) => Some(key),
            _ => None,
        }
    }

    /// Drop the synthetic `root` prefix unless the document itself has a
    /// top-level `root` key.
    pub fn relative_to(&self, doc: &Value) -> Path {
        match self.segments.first() {
            Some(Segment::Key(first)) if first == ROOT_KEY => {
                let doc_has_root = doc
                    .as_object()
                    .map(|obj| obj.contains_key(ROOT_KEY))
                    .unwrap_or(false);
                if doc_has_root {
                    self.clone()
                } else {
                    Path {
                        segments: self.segments[1..].to_vec(),
                    }
                }
            }
            _ => self.clone(),
        }
    }

    /// Read the value this path points at.
    pub fn get<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(doc, |current, segment| match segment {
                Segment::Key(key) => current.as_object()?.get(key),
                Segment::Index(index) => current.as_array()?.get(*index),
            })
    }

    pub fn get_mut<'a>(&self, doc: &'a mut Value) -> Option<&'a mut Value> {
        self.segments
            .iter()
            .try_fold(doc, |current, segment| step_mut(current, segment).ok())
    }

    /// Write `value` at this path.
    ///
    /// Every segment but the last must already resolve. The last segment
    /// assigns into the penultimate container: a key is inserted into (or
    /// replaced in) an existing mapping, an index must already exist in the
    /// sequence.
    pub fn set(&self, doc: &mut Value, value: Value) -> Result<(), PathError> {
        let (last, parents) = self.segments.split_last().ok_or(PathError::Empty)?;

        let mut current = doc;
        for segment in parents {
            current = step_mut(current, segment)?;
        }

        match last {
            Segment::Key(key) => {
                let obj = current.as_object_mut().ok_or_else(|| PathError::TypeMismatch {
                    expected: "mapping",
                    segment: key.clone(),
                })?;
                obj.insert(key.clone(), value);
            }
            Segment::Index(index) => {
                let arr = current.as_array_mut().ok_or_else(|| PathError::TypeMismatch {
                    expected: "sequence",
                    segment: format!("[{}]", index),
                })?;
                let len = arr.len();
                let slot = arr
                    .get_mut(*index)
                    .ok_or(PathError::IndexOutOfRange { index: *index, len })?;
                *slot = value;
            }
        }

        Ok(())
    }
}

fn step_mut<'a>(current: &'a mut Value, segment: &Segment) -> Result<&'a mut Value, PathError> {
    match segment {
        Segment::Key(key) => current
            .as_object_mut()
            .ok_or_else(|| PathError::TypeMismatch {
                expected: "mapping",
                segment: key.clone(),
            })?
            .get_mut(key)
            .ok_or_else(|| PathError::MissingKey { key: key.clone() }),
        Segment::Index(index) => {
            let arr = current.as_array_mut().ok_or_else(|| PathError::TypeMismatch {
                expected: "sequence",
                segment: format!("[{}]", index),
            })?;
            let len = arr.len();
            arr.get_mut(*index)
                .ok_or(PathError::IndexOutOfRange { index: *index, len })
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(key)?;
                }
                Segment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }

        let malformed = |reason: &str| PathError::Malformed {
            path: s.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        for part in s.split('.') {
            // `name[1][2]` is a key lookup followed by one or more index lookups
            let (name, mut rest) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };

            if !name.is_empty() || rest.is_empty() {
                segments.push(Segment::Key(name.to_string()));
            } else if !segments.is_empty() {
                return Err(malformed("index without a key"));
            }

            while !rest.is_empty() {
                let inner = rest
                    .strip_prefix('[')
                    .ok_or_else(|| malformed("unexpected text after index"))?;
                let close = inner.find(']').ok_or_else(|| malformed("unclosed '['"))?;
                let index = inner[..close]
                    .parse::<usize>()
                    .map_err(|_| malformed("index is not a non-negative integer"))?;
                segments.push(Segment::Index(index));
                rest = &inner[close + 1..];
            }
        }

        Ok(Path { segments })
    }
}
