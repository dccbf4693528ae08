//! Pass-through rules for the translation loop.
//!
//! A rule decides, before any translation request is made, that an entry is
//! either dropped entirely or copied verbatim into the translated mapping.
//! Rules are evaluated in declared order and the first match wins, so a more
//! specific rule must be listed before a broader one that overlaps it.

use crate::extract::FieldFilter;
use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::Path as FsPath;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule '{name}' has an invalid pattern: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}

/// What happens to an entry matched by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    /// Leave the entry out of the translated mapping
    Skip,
    /// Store the source value unchanged
    Copy,
}

#[derive(Debug, Clone)]
pub enum Matcher {
    KeySuffix(String),
    KeyPattern(Regex),
    ValuePrefix {
        prefix: String,
        case_insensitive: bool,
    },
}

impl Matcher {
    fn matches(&self, key: &str, value: &str) -> bool {
        match self {
            Matcher::KeySuffix(suffix) => key.ends_with(suffix.as_str()),
            Matcher::KeyPattern(re) => re.is_match(key),
            Matcher::ValuePrefix {
                prefix,
                case_insensitive,
            } => {
                let value = value.trim();
                if *case_insensitive {
                    value.to_lowercase().starts_with(&prefix.to_lowercase())
                } else {
                    value.starts_with(prefix.as_str())
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub matcher: Matcher,
    pub action: RuleAction,
}

/// Serialized form of a rule, as found in a rules file.
#[derive(Debug, Deserialize)]
#[serde(tag = "match", rename_all = "snake_case")]
enum RawMatcher {
    KeySuffix {
        suffix: String,
    },
    KeyPattern {
        pattern: String,
    },
    ValuePrefix {
        prefix: String,
        #[serde(default)]
        case_insensitive: bool,
    },
}

#[derive(Debug, Deserialize)]
struct RawRule {
    name: String,
    #[serde(flatten)]
    matcher: RawMatcher,
    action: RuleAction,
}

impl TryFrom<RawRule> for Rule {
    type Error = RuleError;

    fn try_from(raw: RawRule) -> Result<Self, Self::Error> {
        let matcher = match raw.matcher {
            RawMatcher::KeySuffix { suffix } => Matcher::KeySuffix(suffix),
            RawMatcher::KeyPattern { pattern } => {
                Matcher::KeyPattern(Regex::new(&pattern).map_err(|source| {
                    RuleError::InvalidPattern {
                        name: raw.name.clone(),
                        source,
                    }
                })?)
            }
            RawMatcher::ValuePrefix {
                prefix,
                case_insensitive,
            } => Matcher::ValuePrefix {
                prefix,
                case_insensitive,
            },
        };
        Ok(Rule {
            name: raw.name,
            matcher,
            action: raw.action,
        })
    }
}

/// Ordered list of pass-through rules.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// First rule matching this entry, if any.
    pub fn evaluate(&self, key: &str, value: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.matcher.matches(key, value))
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        let rule = |name: &str, matcher, action| Rule {
            name: name.to_string(),
            matcher,
            action,
        };
        Self::new(vec![
            rule(
                "placeholder",
                Matcher::ValuePrefix {
                    prefix: "lorem ipsum".to_string(),
                    case_insensitive: true,
                },
                RuleAction::Skip,
            ),
            rule(
                "dnd-area-label",
                Matcher::KeySuffix("dnd_area.label".to_string()),
                RuleAction::Copy,
            ),
            rule(
                "rows-label",
                Matcher::KeySuffix("0.rows[0].0.label".to_string()),
                RuleAction::Copy,
            ),
            rule(
                "content-type",
                Matcher::KeySuffix(".content_type".to_string()),
                RuleAction::Copy,
            ),
        ])
    }
}

/// Contents of a rules file. Any section left out keeps its built-in default.
#[derive(Debug, Deserialize)]
struct RawRulesFile {
    #[serde(default)]
    fields: Option<FieldFilter>,
    #[serde(default)]
    pass_through: Option<Vec<RawRule>>,
}

/// Field filter and pass-through rules, loaded together.
#[derive(Debug, Clone, Default)]
pub struct Rules {
    pub fields: FieldFilter,
    pub pass_through: RuleSet,
}

impl Rules {
    pub fn from_json(raw: &str) -> Result<Self> {
        let file: RawRulesFile = serde_json::from_str(raw).context("Invalid rules file")?;

        let pass_through = match file.pass_through {
            Some(raw_rules) => RuleSet::new(
                raw_rules
                    .into_iter()
                    .map(Rule::try_from)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            None => RuleSet::default(),
        };

        Ok(Self {
            fields: file.fields.unwrap_or_default(),
            pass_through,
        })
    }

    pub fn load(path: &FsPath) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read rules file {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("Failed to load {}", path.display()))
    }
}
