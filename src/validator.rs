//! Markup-preservation checks for translated text.
//!
//! Page content carries inline HTML. A translation that drops or reorders
//! tags, or rewrites a link, still gets stored, but the mismatch is reported
//! so the operator can review it before publishing.

use regex::Regex;
use std::sync::OnceLock;

/// Validation report containing errors and warnings about a translation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Structural problems that will likely break rendering
    pub errors: Vec<String>,

    /// Differences worth a second look
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }
}

pub struct MarkupValidator;

static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
static URL_REGEX: OnceLock<Regex> = OnceLock::new();

impl MarkupValidator {
    /// Compare the markup of `original` and `translated`.
    ///
    /// - A different sequence of tag names is an error.
    /// - A different set of URLs (href/src values and bare links) is a warning.
    pub fn validate(original: &str, translated: &str) -> ValidationReport {
        let mut report = ValidationReport::default();

        let orig_tags = Self::extract_tags(original);
        let trans_tags = Self::extract_tags(translated);
        if orig_tags != trans_tags {
            report.errors.push(format!(
                "HTML tag mismatch: original has {} tags {:?}, translation has {} tags {:?}",
                orig_tags.len(),
                orig_tags,
                trans_tags.len(),
                trans_tags
            ));
        }

        let orig_urls = Self::extract_urls(original);
        let trans_urls = Self::extract_urls(translated);
        if orig_urls != trans_urls {
            report.warnings.push(format!(
                "URL mismatch: original has {:?}, translation has {:?}",
                orig_urls, trans_urls
            ));
        }

        report
    }

    /// Tag names in document order, closing tags prefixed with `/`.
    fn extract_tags(text: &str) -> Vec<String> {
        let regex = TAG_REGEX.get_or_init(|| {
            Regex::new(r"<(/?)([a-zA-Z][a-zA-Z0-9-]*)[^>]*>").expect("static pattern")
        });

        regex
            .captures_iter(text)
            .map(|cap| format!("{}{}", &cap[1], cap[2].to_lowercase()))
            .collect()
    }

    fn extract_urls(text: &str) -> Vec<String> {
        let regex = URL_REGEX
            .get_or_init(|| Regex::new(r#"https?://[^\s"'<>)]+"#).expect("static pattern"));

        let mut urls: Vec<String> = regex
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect();
        urls.sort();
        urls
    }
}
