//! Subcommand flows: each one loads its inputs from the workspace, talks to the
//! CMS and leaves its outputs next to them.

use crate::checkpoint::{backup_file, CheckpointStore, BACKUP_TIMESTAMP_FORMAT};
use crate::cms::{CmsClient, CmsError};
use crate::config::{TranslationConfig, Workspace};
use crate::extract::extract_text_fields;
use crate::holiday::{self, PayloadReport, RegionData};
use crate::mapping::FlatMapping;
use crate::pipeline::{CheckpointLoop, Pacing, RunSummary};
use crate::reinject::{
    apply_translations, restrict_to_updatable, strip_readonly_fields, ReinjectReport,
    READONLY_FIELDS, UPDATABLE_FIELDS,
};
use crate::rules::Rules;
use crate::translator::Translator;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Rules from `path`, or the built-in ones.
pub fn load_rules(path: Option<&Path>) -> Result<Rules> {
    match path {
        Some(path) => {
            let rules = Rules::load(path)?;
            info!(
                "✓ Loaded {} pass-through rules from {}",
                rules.pass_through.rules().len(),
                path.display()
            );
            Ok(rules)
        }
        None => Ok(Rules::default()),
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn write_json(path: &Path, value: &Value) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

fn log_patch_failure(e: &CmsError, payload: &Value) {
    error!("✗ Update failed: {}", e);
    if let CmsError::Rejected { messages } = e {
        for message in messages {
            error!("  • {}", message);
        }
    }
    match serde_json::to_string_pretty(payload) {
        Ok(json) => error!("Payload sent:\n{}", json),
        Err(_) => error!("Payload sent: {}", payload),
    }
}

// ==================== Translation Flow ====================

pub async fn extract(
    cms: &CmsClient,
    page_id: &str,
    rules: &Rules,
    workspace: &Workspace,
) -> Result<FlatMapping> {
    let page = cms.fetch_page(page_id).await?;
    let mapping = extract_text_fields(&page, &rules.fields);

    let output = workspace.source_mapping();
    if output.exists() {
        match backup_file(&output) {
            Ok(path) => info!("Backup created: {}", path.display()),
            Err(e) => warn!("⚠ Could not create backup: {:#}", e),
        }
    }
    mapping.save(&output)?;
    info!(
        "✓ Extracted {} translatable fields to {}",
        mapping.len(),
        output.display()
    );
    Ok(mapping)
}

pub async fn translate<T: Translator>(
    translator: &T,
    rules: &Rules,
    config: &TranslationConfig,
    workspace: &Workspace,
) -> Result<RunSummary> {
    let source_path = workspace.source_mapping();
    if !source_path.exists() {
        bail!(
            "Source mapping {} not found; run extract first",
            source_path.display()
        );
    }
    let source = FlatMapping::load(&source_path)?;
    info!(
        "Translating {} entries from {} to {}",
        source.len(),
        config.source_language.name(),
        config.target_language.name()
    );

    let store = CheckpointStore::new(workspace.translated_mapping(&config.file_suffix));
    let checkpoint_loop = CheckpointLoop::new(translator, &rules.pass_through, &store)
        .with_pacing(Pacing::from(config))
        .with_resume_mode(config.resume_mode);
    let summary = checkpoint_loop.run(&source).await?;
    Ok(summary)
}

#[derive(Debug)]
pub struct UpdateOutcome {
    pub report: ReinjectReport,
    pub backup: PathBuf,
    /// Mapping files deleted after the successful patch
    pub removed: Vec<PathBuf>,
}

/// Reinject a mapping into a fresh copy of the page and patch it.
///
/// The mapping files are only deleted once the CMS accepted the update.
pub async fn update(
    cms: &CmsClient,
    page_id: &str,
    suffix: &str,
    workspace: &Workspace,
) -> Result<UpdateOutcome> {
    let input = workspace.update_input(suffix);
    if !input.exists() {
        bail!("Translation mapping not found at {}", input.display());
    }
    let translations = FlatMapping::load(&input)?;
    info!(
        "✓ Using translation file {} ({} entries)",
        input.display(),
        translations.len()
    );

    let mut page = cms.fetch_page(page_id).await?;
    let report = apply_translations(&mut page, &translations);
    info!(
        "✓ Applied {} translations ({} paths not found)",
        report.updated,
        report.not_found.len()
    );

    let backup = backup_page(workspace, page_id, &page)?;
    info!("Backup of the page saved to {}", backup.display());

    strip_readonly_fields(&mut page, READONLY_FIELDS);
    info!("Sending update request...");
    if let Err(e) = cms.patch_page(page_id, &page).await {
        log_patch_failure(&e, &page);
        return Err(anyhow::Error::new(e).context("Failed to update page"));
    }
    info!("✓ Page updated successfully with translated content");

    let removed = remove_files(&[workspace.source_mapping(), workspace.translated_mapping(suffix)]);
    Ok(UpdateOutcome {
        report,
        backup,
        removed,
    })
}

fn backup_page(workspace: &Workspace, page_id: &str, page: &Value) -> Result<PathBuf> {
    let dir = workspace.backups_dir();
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(format!(
        "hubspot_page_backup_{}_{}.json",
        page_id,
        Utc::now().format(BACKUP_TIMESTAMP_FORMAT)
    ));
    write_json(&path, page)?;
    Ok(path)
}

fn remove_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut removed = Vec::new();
    for path in paths {
        if !path.exists() {
            continue;
        }
        match fs::remove_file(path) {
            Ok(()) => {
                info!("✓ Deleted {}", path.display());
                removed.push(path.clone());
            }
            Err(e) => warn!("⚠ Failed to delete {}: {}", path.display(), e),
        }
    }
    removed
}

// ==================== Holiday Flow ====================

/// Save the page snapshot the payload step merges into.
pub async fn holiday_fetch(
    cms: &CmsClient,
    page_id: &str,
    workspace: &Workspace,
) -> Result<PathBuf> {
    let page = cms.fetch_page(page_id).await?;
    let output = workspace.page_content();
    write_json(&output, &page)?;
    info!("✓ Page content saved to {}", output.display());
    Ok(output)
}

#[derive(Debug)]
pub struct HolidayPayload {
    pub output: PathBuf,
    pub report: PayloadReport,
}

/// Resolve a region argument: an existing path, else a file under `data/`.
fn region_path(workspace: &Workspace, region: &Path) -> PathBuf {
    if region.exists() {
        return region.to_path_buf();
    }
    workspace.region_data_dir().join(region)
}

pub fn holiday_payload(workspace: &Workspace, region: &Path) -> Result<HolidayPayload> {
    let region_file = region_path(workspace, region);
    let data = RegionData::load(&region_file)?;

    let snapshot = workspace.page_content();
    if !snapshot.exists() {
        bail!(
            "{} not found; run holiday fetch first",
            snapshot.display()
        );
    }
    let mut page = read_json(&snapshot)?;
    info!("✓ Loaded {} and {}", region_file.display(), snapshot.display());

    let report = holiday::apply_region(&mut page, &data);

    let output = workspace.updated_page(&data.slug());
    write_json(&output, &page)?;
    info!("✓ Saved updated page content to {}", output.display());
    Ok(HolidayPayload { output, report })
}

/// First `updated_*_page_content.json` in the workspace, by name.
fn find_updated_page(workspace: &Workspace) -> Result<Option<PathBuf>> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(workspace.dir())
        .with_context(|| format!("Failed to list {}", workspace.dir().display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.starts_with("updated_") && name.ends_with("_page_content.json"))
                .unwrap_or(false)
        })
        .collect();
    candidates.sort();
    Ok(candidates.into_iter().next())
}

/// Patch the page with the merged payload, then archive it into `updated/`.
pub async fn holiday_push(
    cms: &CmsClient,
    page_id: &str,
    workspace: &Workspace,
) -> Result<PathBuf> {
    let Some(updated) = find_updated_page(workspace)? else {
        bail!("No updated_*_page_content.json file found; run holiday payload first");
    };
    info!("✓ Found {}", updated.display());

    let page = read_json(&updated)?;
    let payload = restrict_to_updatable(&page, UPDATABLE_FIELDS);
    let fields: Vec<&str> = payload
        .as_object()
        .map(|obj| obj.keys().map(String::as_str).collect())
        .unwrap_or_default();
    info!("Payload fields: {:?}", fields);

    let response = match cms.patch_page(page_id, &payload).await {
        Ok(response) => response,
        Err(e) => {
            log_patch_failure(&e, &payload);
            return Err(anyhow::Error::new(e).context("Failed to push holiday page"));
        }
    };
    let updated_at = response
        .get("updatedAt")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    info!("✓ Page {} updated at {}", page_id, updated_at);

    let archive_dir = workspace.updated_dir();
    fs::create_dir_all(&archive_dir)
        .with_context(|| format!("Failed to create {}", archive_dir.display()))?;
    let file_name = updated
        .file_name()
        .context("Updated page file has no name")?;
    let destination = archive_dir.join(file_name);
    fs::rename(&updated, &destination)
        .with_context(|| format!("Failed to move {} into updated/", updated.display()))?;
    info!("✓ Moved {} to {}", updated.display(), destination.display());

    remove_files(&[workspace.page_content()]);
    Ok(destination)
}

#[derive(Debug, Default)]
pub struct CloneSummary {
    /// (region, new page id)
    pub cloned: Vec<(String, String)>,
    /// (region, reason)
    pub failed: Vec<(String, String)>,
}

fn region_files(workspace: &Workspace, exclude: &[String]) -> Result<Vec<PathBuf>> {
    let dir = workspace.region_data_dir();
    let mut files: Vec<PathBuf> = fs::read_dir(&dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
        .filter(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            !exclude.iter().any(|excluded| excluded == name)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Clone the base page once per region file. Failures are collected, not fatal.
pub async fn holiday_clone(
    cms: &CmsClient,
    base_page_id: &str,
    workspace: &Workspace,
    exclude: &[String],
) -> Result<CloneSummary> {
    let files = region_files(workspace, exclude)?;
    if files.is_empty() {
        bail!(
            "No region files found in {}",
            workspace.region_data_dir().display()
        );
    }
    info!("Found {} region(s) to process", files.len());

    let mut summary = CloneSummary::default();
    for (i, file) in files.iter().enumerate() {
        let region = file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let name = holiday::clone_name(&region);
        info!("[{}/{}] Cloning page for {}", i + 1, files.len(), region);

        match cms.clone_page(base_page_id, &name).await {
            Ok(id) => {
                info!("✓ Cloned {} as page {}", name, id);
                summary.cloned.push((region, id));
            }
            Err(e) => {
                warn!("✗ Failed to clone page for {}: {}", region, e);
                summary.failed.push((region, e.to_string()));
            }
        }
    }

    info!(
        "Clone summary: {} succeeded, {} failed",
        summary.cloned.len(),
        summary.failed.len()
    );
    for (region, reason) in &summary.failed {
        warn!("  • {}: {}", region, reason);
    }
    Ok(summary)
}
