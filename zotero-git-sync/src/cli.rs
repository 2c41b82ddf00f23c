//! CLI glue for zotero-git-sync: argument parsing and command routing.
//!
//! All business logic lives in `zotero-git-sync-core`; this module only
//! loads the config, builds the Zotero client and reports the outcome.
use crate::load_config::load_config;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use zotero_git_sync_core::synchronise::{fetch_document, synchronise, SyncOutcome};
use zotero_git_sync_core::zotero::ZoteroClient;

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Mirror a Zotero collection into a git repository.
#[derive(Parser, Debug)]
#[clap(
    name = "zotero-git-sync",
    version,
    about = "Export a Zotero collection as a markdown bibliography plus PDFs and push it to git"
)]
pub struct Cli {
    /// Path to the YAML config file
    #[clap(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[clap(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch the collection, update the repository, commit and push (default)
    Sync,
    /// Fetch the collection and print the bibliography without touching git
    Render {
        /// Write the document here instead of stdout
        #[clap(long)]
        output: Option<PathBuf>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let config = load_config(&cli.config)?;
    let client = ZoteroClient::from_config(&config).context("Failed to build Zotero client")?;

    match cli.command.unwrap_or(Commands::Sync) {
        Commands::Sync => {
            tracing::info!(command = "sync", "Starting synchronisation process");
            let report = synchronise(&config, &client).await.map_err(|e| {
                tracing::error!(command = "sync", error = %e, "Synchronisation failed");
                e
            })?;
            match report.outcome {
                SyncOutcome::NothingChanged => println!("Nothing changed."),
                SyncOutcome::Pushed { commit } => {
                    println!(
                        "Pushed {} ({} entries, {} downloaded, {} renamed, {} moved to other/)",
                        commit,
                        report.export.entries,
                        report.export.downloaded.len(),
                        report.export.renamed.len(),
                        report.export.moved_to_other.len()
                    );
                }
            }
            Ok(())
        }
        Commands::Render { output } => {
            tracing::info!(command = "render", "Rendering bibliography");
            let document = fetch_document(&config, &client).await?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &document.text)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    tracing::info!(path = %path.display(), entries = document.entries, "Bibliography written");
                }
                None => print!("{}", document.text),
            }
            Ok(())
        }
    }
}
