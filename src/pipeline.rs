//! Resumable, key-by-key translation of a flat mapping.
//!
//! Entries are processed in source order. After every change the whole
//! translated mapping is written back to its checkpoint file, so an
//! interrupted run loses at most the entry that was in flight.

use crate::checkpoint::CheckpointStore;
use crate::config::{ResumeMode, TranslationConfig};
use crate::mapping::FlatMapping;
use crate::rules::{RuleAction, RuleSet};
use crate::translator::Translator;
use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Fixed waits between external calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub after_success: Duration,
    pub after_failure: Duration,
}

impl Pacing {
    pub fn none() -> Self {
        Self {
            after_success: Duration::ZERO,
            after_failure: Duration::ZERO,
        }
    }
}

impl From<&TranslationConfig> for Pacing {
    fn from(config: &TranslationConfig) -> Self {
        Self {
            after_success: config.success_delay,
            after_failure: config.failure_delay,
        }
    }
}

/// Where processing starts for a given pair of mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// Nothing left to do
    Complete,
    /// Start at this position of the source mapping
    StartAt(usize),
}

/// Resume position following the last key of the translated mapping.
///
/// - empty source, or its last key already translated: complete
/// - empty translated mapping: start at 0
/// - otherwise: one past the translated mapping's last key in source order,
///   or 0 if that key is not part of the source at all
pub fn resume_position(source: &FlatMapping, translated: &FlatMapping) -> Resume {
    let Some(source_last) = source.last_key() else {
        return Resume::Complete;
    };
    if translated.contains(source_last) {
        return Resume::Complete;
    }

    let start = translated
        .last_key()
        .and_then(|last| source.position(last))
        .map(|pos| pos + 1)
        .unwrap_or(0);
    Resume::StartAt(start)
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub start_index: usize,
    pub translated: usize,
    pub copied: usize,
    pub skipped: usize,
    pub failed: usize,
    pub already_complete: bool,
    pub backup: Option<PathBuf>,
}

impl RunSummary {
    /// Number of external translation calls made.
    pub fn calls(&self) -> usize {
        self.translated + self.failed
    }
}

pub struct CheckpointLoop<'a, T: Translator> {
    translator: &'a T,
    rules: &'a RuleSet,
    store: &'a CheckpointStore,
    pacing: Pacing,
    resume_mode: ResumeMode,
}

impl<'a, T: Translator> CheckpointLoop<'a, T> {
    pub fn new(translator: &'a T, rules: &'a RuleSet, store: &'a CheckpointStore) -> Self {
        Self {
            translator,
            rules,
            store,
            pacing: Pacing::none(),
            resume_mode: ResumeMode::LastKey,
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_resume_mode(mut self, resume_mode: ResumeMode) -> Self {
        self.resume_mode = resume_mode;
        self
    }

    /// Translate every pending entry of `source` into the checkpoint file.
    ///
    /// Per-entry failures are logged and counted, never returned. The only
    /// error is failing to write the checkpoint itself.
    pub async fn run(&self, source: &FlatMapping) -> Result<RunSummary> {
        let mut translated = self.store.load();
        let mut summary = RunSummary {
            total: source.len(),
            ..Default::default()
        };

        if translated.is_empty() {
            info!("No existing translation file found. Starting fresh...");
        } else {
            info!(
                "Found existing translation file with {} entries",
                translated.len()
            );
        }

        let resume = match self.resume_mode {
            ResumeMode::LastKey => resume_position(source, &translated),
            ResumeMode::FillGaps => Resume::StartAt(0),
        };
        let start = match resume {
            Resume::Complete => {
                info!("✓ All text is already translated");
                summary.already_complete = true;
                return Ok(summary);
            }
            Resume::StartAt(start) => start,
        };
        summary.start_index = start;

        if self.store.exists() {
            match self.store.backup() {
                Ok(path) => {
                    info!("Backup created: {}", path.display());
                    summary.backup = Some(path);
                }
                Err(e) => warn!("⚠ Could not create backup: {:#}", e),
            }
        }

        if start > 0 {
            info!(
                "Resuming translation from key #{}/{} ({})",
                start + 1,
                source.len(),
                translated.last_key().unwrap_or_default()
            );
        }

        for (i, (key, value)) in source.iter().enumerate().skip(start) {
            if translated.contains(key) {
                continue;
            }

            if let Some(rule) = self.rules.evaluate(key, value) {
                match rule.action {
                    RuleAction::Skip => {
                        info!("⊘ Skipping {} ({})", key, rule.name);
                        summary.skipped += 1;
                    }
                    RuleAction::Copy => {
                        info!("Copying {} ({}) without translating", key, rule.name);
                        translated.insert(key, value);
                        self.store.save(&translated)?;
                        summary.copied += 1;
                    }
                }
                continue;
            }

            info!("Translating ({}/{}): {}", i + 1, source.len(), key);
            match self.translator.translate(value).await {
                Ok(text) if !text.trim().is_empty() => {
                    translated.insert(key, text);
                    self.store.save(&translated)?;
                    summary.translated += 1;
                    info!("✓ Added translation for {}", key);
                    self.pause(self.pacing.after_success).await;
                }
                Ok(_) => {
                    warn!("⚠ Empty response for {}, skipping", key);
                    summary.failed += 1;
                }
                Err(e) => {
                    warn!("✗ Error translating {}: {:#}", key, e);
                    summary.failed += 1;
                    self.pause(self.pacing.after_failure).await;
                }
            }
        }

        info!(
            "✓ Translation pass finished: {} translated, {} copied, {} skipped, {} failed",
            summary.translated, summary.copied, summary.skipped, summary.failed
        );
        info!("Updated file: {}", self.store.path().display());

        Ok(summary)
    }

    async fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            debug!("Waiting {:?} before the next request", delay);
            sleep(delay).await;
        }
    }
}
