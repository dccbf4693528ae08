use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path as FsPath;

/// Ordered mapping from path string to text, in document traversal order.
///
/// Serialized as a plain JSON object so files stay readable and editable
/// between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlatMapping {
    entries: IndexMap<String, String>,
}

impl FlatMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    /// Insert or replace. A replaced entry keeps its original position.
    pub fn insert(&mut self, path: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(path.into(), value.into());
    }

    /// Position of `path` in insertion order.
    pub fn position(&self, path: &str) -> Option<usize> {
        self.entries.get_index_of(path)
    }

    pub fn first_key(&self) -> Option<&str> {
        self.entries.first().map(|(k, _)| k.as_str())
    }

    pub fn last_key(&self) -> Option<&str> {
        self.entries.last().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Load a mapping file written by a previous run.
    pub fn load(path: &FsPath) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Load a mapping, treating a missing or unreadable file as empty.
    pub fn load_or_default(path: &FsPath) -> Self {
        if !path.exists() {
            return Self::new();
        }
        match Self::load(path) {
            Ok(mapping) => mapping,
            Err(e) => {
                tracing::warn!("⚠ {:#}; starting from an empty mapping", e);
                Self::new()
            }
        }
    }

    /// Write the mapping as pretty JSON (non-ASCII text kept as-is).
    pub fn save(&self, path: &FsPath) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }
}

impl FromIterator<(String, String)> for FlatMapping {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
