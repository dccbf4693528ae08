//! Durable storage for the translated mapping.
//!
//! The file itself is the resume cursor: its key count and last key tell the
//! next run where to pick up. Every write goes to a sibling temp file first
//! and is renamed into place, so a killed process never leaves a truncated
//! checkpoint behind.

use crate::mapping::FlatMapping;
use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

/// Format used for backup file suffixes, e.g. `20250114_093000`.
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the translated mapping; a missing or unparsable file yields an empty one.
    pub fn load(&self) -> FlatMapping {
        FlatMapping::load_or_default(&self.path)
    }

    /// Persist the full mapping, replacing the previous checkpoint atomically.
    pub fn save(&self, mapping: &FlatMapping) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        mapping.save(&tmp)?;
        fs::rename(&tmp, &self.path).with_context(|| {
            format!(
                "Failed to move checkpoint into place at {}",
                self.path.display()
            )
        })
    }

    /// Copy the current checkpoint to `<stem>_backup_<timestamp><ext>`.
    pub fn backup(&self) -> Result<PathBuf> {
        backup_file(&self.path)
    }
}

/// Copy `path` next to itself with a timestamp inserted before the extension.
pub fn backup_file(path: &Path) -> Result<PathBuf> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .context("Backup source has no file name")?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    let timestamp = Local::now().format(BACKUP_TIMESTAMP_FORMAT);

    let backup = path.with_file_name(format!("{}_backup_{}{}", stem, timestamp, ext));
    fs::copy(path, &backup)
        .with_context(|| format!("Failed to back up {} to {}", path.display(), backup.display()))?;
    Ok(backup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("hubspot_translated_th.json"));
        assert!(!store.exists());
        assert!(store.load().is_empty());

        let mut m = FlatMapping::new();
        m.insert("root.a.title", "สวัสดี");
        store.save(&m).unwrap();

        assert!(store.exists());
        assert_eq!(store.load(), m);
        assert!(!dir.path().join("hubspot_translated_th.json.tmp").exists());
    }

    #[test]
    fn test_backup_name_and_contents() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("hubspot_translated_th.json"));
        let mut m = FlatMapping::new();
        m.insert("root.x", "y");
        store.save(&m).unwrap();

        let backup = store.backup().unwrap();
        let name = backup.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("hubspot_translated_th_backup_"));
        assert!(name.ends_with(".json"));
        // stem + "_backup_" + 15-char timestamp + ".json"
        assert_eq!(name.len(), "hubspot_translated_th_backup_".len() + 15 + 5);
        assert_eq!(FlatMapping::load(&backup).unwrap(), m);
    }

    #[test]
    fn test_backup_missing_file_errors() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("absent.json"));
        assert!(store.backup().is_err());
    }
}
