use crate::mapping::FlatMapping;
use crate::path::Path;
use serde::Deserialize;
use serde_json::Value;

const DEFAULT_INCLUDE: &[&str] = &[
    "text",
    "heading",
    "title",
    "label",
    "content",
    "value",
    "placeholder",
    "caption",
    "alt",
    "description",
];

const DEFAULT_EXCLUDE: &[&str] = &["script", "style", "css", "path"];

/// Key-name heuristics deciding which string leaves are translatable.
///
/// Both lists are matched as case-insensitive substrings of the key name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawFieldFilter")]
pub struct FieldFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

#[derive(Deserialize)]
struct RawFieldFilter {
    include: Vec<String>,
    #[serde(default)]
    exclude: Vec<String>,
}

impl From<RawFieldFilter> for FieldFilter {
    fn from(raw: RawFieldFilter) -> Self {
        Self::new(raw.include, raw.exclude)
    }
}

impl FieldFilter {
    pub fn new<I, E>(include: I, exclude: E) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Self {
            include: include
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect(),
            exclude: exclude
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Whether a leaf under `key` should be collected, judged on the key name alone.
    pub fn accepts_key(&self, key: &str) -> bool {
        let key = key.to_lowercase();
        self.include.iter().any(|kw| key.contains(kw.as_str()))
            && !self.exclude.iter().any(|kw| key.contains(kw.as_str()))
    }
}

impl Default for FieldFilter {
    fn default() -> Self {
        Self::new(DEFAULT_INCLUDE, DEFAULT_EXCLUDE)
    }
}

/// Collect every translatable string leaf of `doc`, keyed by its path.
///
/// Paths start at the synthetic `root` key, extend with `.key` into mappings
/// and `[i]` into sequences. Only string values sitting directly under a
/// mapping key are candidates; strings inside sequences have no key name to
/// judge and are never collected.
pub fn extract_text_fields(doc: &Value, filter: &FieldFilter) -> FlatMapping {
    let mut result = FlatMapping::new();
    let mut path = Path::root();
    walk(doc, &mut path, filter, &mut result);
    result
}

fn walk(value: &Value, path: &mut Path, filter: &FieldFilter, out: &mut FlatMapping) {
    match value {
        Value::Object(obj) => {
            for (key, child) in obj {
                path.push_key(key.as_str());
                match child {
                    Value::Object(_) | Value::Array(_) => walk(child, path, filter, out),
                    Value::String(text) if filter.accepts_key(key) && !text.trim().is_empty() => {
                        out.insert(path.to_string(), text.as_str());
                    }
                    _ => {}
                }
                path.pop();
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                path.push_index(i);
                walk(item, path, filter, out);
                path.pop();
            }
        }
        _ => {}
    }
}
