use crate::mapping::FlatMapping;
use crate::path::Path;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Top-level fields owned by the CMS; echoing them back makes a PATCH fail.
pub const READONLY_FIELDS: &[&str] = &[
    "id",
    "createdAt",
    "updatedAt",
    "archived",
    "archivedAt",
    "authorName",
    "categoryId",
    "contentTypeCategory",
    "domain",
    "state",
    "currentState",
    "slug",
    "createdById",
    "updatedById",
];

/// Top-level fields the page update endpoint accepts.
pub const UPDATABLE_FIELDS: &[&str] = &[
    "layoutSections",
    "name",
    "slug",
    "pageTitle",
    "metaDescription",
    "pageExcerpt",
    "category",
    "subcategory",
];

/// Outcome of writing a translated mapping back into a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReinjectReport {
    pub updated: usize,
    /// Paths that could not be resolved, with the reason
    pub not_found: Vec<(String, String)>,
}

impl ReinjectReport {
    pub fn not_found_paths(&self) -> impl Iterator<Item = &str> {
        self.not_found.iter().map(|(path, _)| path.as_str())
    }
}

/// Write every translated value into `doc` at its path.
///
/// Paths carrying the synthetic `root` prefix are resolved relative to the
/// document. Unresolvable paths are recorded in the report and skipped.
pub fn apply_translations(doc: &mut Value, translations: &FlatMapping) -> ReinjectReport {
    let mut report = ReinjectReport::default();

    for (key, text) in translations.iter() {
        let result = key
            .parse::<Path>()
            .and_then(|path| {
                let path = path.relative_to(doc);
                path.set(doc, Value::String(text.to_string())).map(|_| path)
            });

        match result {
            Ok(path) => {
                debug!("✓ Updated: {}", path);
                report.updated += 1;
            }
            Err(e) => {
                warn!("⚠ Could not locate {}: {}", key, e);
                report.not_found.push((key.to_string(), e.to_string()));
            }
        }
    }

    report
}

/// Remove read-only top-level fields in place.
pub fn strip_readonly_fields(doc: &mut Value, fields: &[&str]) {
    if let Some(obj) = doc.as_object_mut() {
        for field in fields {
            obj.shift_remove(*field);
        }
    }
}

/// Build a payload holding only the updatable top-level fields of `doc`.
pub fn restrict_to_updatable(doc: &Value, fields: &[&str]) -> Value {
    let payload: Map<String, Value> = doc
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter(|(key, _)| fields.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default();
    Value::Object(payload)
}
