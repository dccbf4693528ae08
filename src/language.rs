//! Supported languages.
//!
//! A [`Language`] can only be built from a code present in the table below,
//! so prompts always receive a real language name.

use anyhow::{bail, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LanguageEntry {
    code: &'static str,
    name: &'static str,
}

const LANGUAGES: &[LanguageEntry] = &[
    LanguageEntry { code: "en", name: "English" },
    LanguageEntry { code: "th", name: "Thai" },
    LanguageEntry { code: "es", name: "Spanish" },
    LanguageEntry { code: "fr", name: "French" },
    LanguageEntry { code: "de", name: "German" },
    LanguageEntry { code: "ja", name: "Japanese" },
    LanguageEntry { code: "zh", name: "Chinese" },
    LanguageEntry { code: "ko", name: "Korean" },
    LanguageEntry { code: "vi", name: "Vietnamese" },
    LanguageEntry { code: "id", name: "Indonesian" },
    LanguageEntry { code: "ms", name: "Malay" },
    LanguageEntry { code: "pt", name: "Portuguese" },
];

/// A validated language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    entry: LanguageEntry,
}

impl Language {
    pub const ENGLISH: Language = Language { entry: LANGUAGES[0] };
    pub const THAI: Language = Language { entry: LANGUAGES[1] };

    /// Look a language up by ISO 639-1 code (case-insensitive).
    pub fn from_code(code: &str) -> Result<Language> {
        let code = code.trim().to_lowercase();
        match LANGUAGES.iter().find(|entry| entry.code == code) {
            Some(entry) => Ok(Language { entry: *entry }),
            None => bail!("Unknown language code: '{}'", code),
        }
    }

    pub fn code(&self) -> &'static str {
        self.entry.code
    }

    /// English name of the language, as used in prompts
    pub fn name(&self) -> &'static str {
        self.entry.name
    }
}
