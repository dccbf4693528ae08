use crate::language::Language;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_CMS_API_URL: &str = "https://api.hubapi.com";
const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Read a required variable; unset and blank are both treated as missing.
fn required(name: &str) -> Result<String> {
    optional(name).with_context(|| format!("{} not set", name))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// First of `names` that is set.
fn required_any(names: &[&str]) -> Result<String> {
    names
        .iter()
        .find_map(|name| optional(name))
        .with_context(|| format!("{} not set", names.join(" or ")))
}

fn millis_or(name: &str, default_ms: u64) -> Duration {
    Duration::from_millis(
        optional(name)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default_ms),
    )
}

/// Credentials and target for the CMS REST API.
#[derive(Debug, Clone)]
pub struct CmsConfig {
    pub api_key: String,
    pub page_id: String,
    pub api_url: String,
}

impl CmsConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_key: required_any(&["HUBSPOT_API_KEY", "HUBSPOT_PRIVATE_APP_TOKEN"])?,
            page_id: required("PAGE_ID")?,
            api_url: optional("CMS_API_URL")
                .unwrap_or_else(|| DEFAULT_CMS_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

/// Where the translation loop resumes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumeMode {
    /// Continue right after the last key already in the translated mapping
    #[default]
    LastKey,
    /// Rescan from the first key so earlier failures are retried
    FillGaps,
}

impl FromStr for ResumeMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "last-key" | "last_key" => Ok(ResumeMode::LastKey),
            "fill-gaps" | "fill_gaps" => Ok(ResumeMode::FillGaps),
            other => bail!("Unknown RESUME_MODE '{}' (expected last-key or fill-gaps)", other),
        }
    }
}

/// Language-model settings and pacing for the translation loop.
#[derive(Debug, Clone)]
pub struct TranslationConfig {
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_api_url: String,
    pub source_language: Language,
    pub target_language: Language,
    /// Suffix stamped into the translated file name
    pub file_suffix: String,
    pub success_delay: Duration,
    pub failure_delay: Duration,
    pub resume_mode: ResumeMode,
    pub rules_file: Option<PathBuf>,
}

fn target_language_from_env() -> Result<Language> {
    Language::from_code(&optional("TARGET_LANG").unwrap_or_else(|| "th".to_string()))
}

/// Optional rules file overriding the built-in field filter and pass-through rules.
pub fn rules_file_from_env() -> Option<PathBuf> {
    optional("RULES_FILE").map(PathBuf::from)
}

/// File-name suffix of the translated mapping, without needing model credentials.
pub fn target_suffix_from_env() -> Result<String> {
    match optional("TARGET_LANG_SUFFIX") {
        Some(suffix) => Ok(suffix),
        None => Ok(target_language_from_env()?.code().to_string()),
    }
}

impl TranslationConfig {
    pub fn from_env() -> Result<Self> {
        let target_language = target_language_from_env()?;

        Ok(Self {
            openai_api_key: required_any(&["OPENAI_API_KEY", "GPT_API_KEY"])?,
            openai_model: optional("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            openai_api_url: optional("OPENAI_API_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_API_URL.to_string()),
            source_language: Language::from_code(
                &optional("SOURCE_LANG").unwrap_or_else(|| "en".to_string()),
            )?,
            target_language,
            file_suffix: target_suffix_from_env()?,
            success_delay: millis_or("TRANSLATE_DELAY_MS", 2000),
            failure_delay: millis_or("TRANSLATE_FAILURE_DELAY_MS", 5000),
            resume_mode: optional("RESUME_MODE")
                .map(|v| v.parse::<ResumeMode>())
                .transpose()?
                .unwrap_or_default(),
            rules_file: rules_file_from_env(),
        })
    }
}

/// Every file the commands read or write, derived from one working directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    dir: PathBuf,
    translated_override: Option<PathBuf>,
}

impl Workspace {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            translated_override: None,
        }
    }

    pub fn from_env() -> Self {
        let mut workspace = Self::new(optional("WORK_DIR").unwrap_or_else(|| ".".to_string()));
        workspace.translated_override = optional("TRANSLATED_JSON").map(PathBuf::from);
        workspace
    }

    pub fn with_translated_override(mut self, path: impl Into<PathBuf>) -> Self {
        self.translated_override = Some(path.into());
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Source flat mapping (path -> original text)
    pub fn source_mapping(&self) -> PathBuf {
        self.dir.join("hubspot_translatable_content.json")
    }

    /// Translated flat mapping for one target
    pub fn translated_mapping(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("hubspot_translated_{}.json", suffix))
    }

    /// Mapping the update command reinjects: an explicit override, else the
    /// translated mapping when present, else the untranslated source.
    pub fn update_input(&self, suffix: &str) -> PathBuf {
        if let Some(path) = &self.translated_override {
            return path.clone();
        }
        let translated = self.translated_mapping(suffix);
        if translated.exists() {
            translated
        } else {
            self.source_mapping()
        }
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.dir.join("backups")
    }

    /// Raw page snapshot used by the holiday commands
    pub fn page_content(&self) -> PathBuf {
        self.dir.join("page_content.json")
    }

    pub fn region_data_dir(&self) -> PathBuf {
        self.dir.join("data")
    }

    pub fn updated_page(&self, region: &str) -> PathBuf {
        self.dir.join(format!("updated_{}_page_content.json", region))
    }

    pub fn updated_dir(&self) -> PathBuf {
        self.dir.join("updated")
    }
}
