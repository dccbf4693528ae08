use anyhow::Result;
use clap::{Parser, Subcommand};
use cms_page_translator::cms::CmsClient;
use cms_page_translator::commands;
use cms_page_translator::config::{
    rules_file_from_env, target_suffix_from_env, CmsConfig, TranslationConfig, Workspace,
};
use cms_page_translator::translator::OpenAiTranslator;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "cms-translate")]
#[command(about = "Translate CMS page content and publish holiday pages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the page and write its translatable fields to the source mapping
    Extract,
    /// Translate the source mapping, resuming from the checkpoint file
    Translate,
    /// Reinject the translated mapping into the page and patch it
    Update,
    /// Holiday landing page workflow
    #[command(subcommand)]
    Holiday(HolidayCommand),
}

#[derive(Subcommand, Debug)]
enum HolidayCommand {
    /// Save the page as page_content.json
    Fetch,
    /// Merge a region file into page_content.json
    Payload {
        /// Region file, either a path or a name under data/
        #[arg(value_name = "REGION_JSON")]
        region: PathBuf,
    },
    /// Patch the page with the merged updated_*_page_content.json
    Push,
    /// Clone the base page once per region file in data/
    Clone {
        /// Region file names to leave out, e.g. delhi.json
        #[arg(long, value_name = "FILE")]
        exclude: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored when absent)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cms_page_translator=info".parse()?)
                .add_directive("cms_translate=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let workspace = Workspace::from_env();
    let http = reqwest::Client::new();

    match cli.command {
        Command::Extract => {
            let (cms, page_id) = cms_from_env(http)?;
            let translation_rules = commands::load_rules(rules_file_from_env().as_deref())?;
            commands::extract(&cms, &page_id, &translation_rules, &workspace).await?;
        }
        Command::Translate => {
            let config = TranslationConfig::from_env()?;
            let translation_rules = commands::load_rules(config.rules_file.as_deref())?;
            let translator = OpenAiTranslator::new(http, &config);
            let summary =
                commands::translate(&translator, &translation_rules, &config, &workspace).await?;
            if summary.failed > 0 {
                warn!(
                    "⚠ {} entries failed; run translate again to retry them",
                    summary.failed
                );
            }
        }
        Command::Update => {
            let suffix = target_suffix_from_env()?;
            let (cms, page_id) = cms_from_env(http)?;
            let outcome = commands::update(&cms, &page_id, &suffix, &workspace).await?;
            for path in outcome.report.not_found_paths() {
                warn!("⚠ Not found in page: {}", path);
            }
        }
        Command::Holiday(HolidayCommand::Fetch) => {
            let (cms, page_id) = cms_from_env(http)?;
            commands::holiday_fetch(&cms, &page_id, &workspace).await?;
        }
        Command::Holiday(HolidayCommand::Payload { region }) => {
            commands::holiday_payload(&workspace, &region)?;
        }
        Command::Holiday(HolidayCommand::Push) => {
            let (cms, page_id) = cms_from_env(http)?;
            commands::holiday_push(&cms, &page_id, &workspace).await?;
        }
        Command::Holiday(HolidayCommand::Clone { exclude }) => {
            let (cms, page_id) = cms_from_env(http)?;
            let summary = commands::holiday_clone(&cms, &page_id, &workspace, &exclude).await?;
            if !summary.failed.is_empty() {
                warn!("⚠ {} region(s) failed; review the errors above", summary.failed.len());
            }
        }
    }

    info!("✓ Done");
    Ok(())
}

/// CMS client and target page, both from the environment.
fn cms_from_env(http: reqwest::Client) -> Result<(CmsClient, String)> {
    let config = CmsConfig::from_env()?;
    Ok((CmsClient::new(http, &config), config.page_id))
}
