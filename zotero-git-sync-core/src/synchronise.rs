//! High-level pipeline: fetch → export → commit → push.
//!
//! This module provides the top-level orchestration for "synchronising" a
//! Zotero collection into a git repository:
//!   - Fetches every top-level item of the configured collection through an [`ItemSource`]
//!   - Clones the target repository (shallow) into a temporary directory
//!   - Exports the bibliography, PDFs and lockfile via [`Exporter`]
//!   - Commits and pushes when the checkout changed
//!
//! # Responsibilities
//! - Fail-fast: the first error of any step aborts the run and is returned as is
//! - The collection is fetched before anything touches the filesystem, so a
//!   rejected key never leaves a clone behind
//! - The clone lives in a [`tempfile::TempDir`] and disappears with the run,
//!   whether it succeeded or not
//!
//! # Navigation
//! - Main entrypoint: [`synchronise`]
//! - Dry run without git: [`fetch_document`]

use tracing::{error, info};

use crate::config::SyncConfig;
use crate::contract::ItemSource;
use crate::error::{Result, SyncError};
use crate::export::{ExportReport, Exporter, Throttle};
use crate::git::GitRepository;
use crate::render::{render_document, ExportDocument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A commit was created and pushed.
    Pushed { commit: String },
    /// The checkout already matched the collection.
    NothingChanged,
}

#[derive(Debug, Clone)]
pub struct SynchroniseReport {
    pub export: ExportReport,
    pub outcome: SyncOutcome,
}

/// Fetches the collection and renders it, without touching git.
pub async fn fetch_document<S>(config: &SyncConfig, source: &S) -> Result<ExportDocument>
where
    S: ItemSource + ?Sized,
{
    let items = source
        .collection_items(&config.zotero_collection_id)
        .await?;
    Ok(render_document(&items))
}

pub async fn synchronise<S>(config: &SyncConfig, source: &S) -> Result<SynchroniseReport>
where
    S: ItemSource + ?Sized,
{
    info!(
        collection = %config.zotero_collection_id,
        repository = %config.git_repository_url,
        "[SYNC] Starting synchronisation"
    );

    let items = match source.collection_items(&config.zotero_collection_id).await {
        Ok(items) => {
            info!(items = items.len(), "[SYNC] Fetched collection");
            items
        }
        Err(e) => {
            error!(error = %e, "[SYNC][ERROR] Fetching collection failed");
            return Err(e.into());
        }
    };

    let workdir = tempfile::Builder::new()
        .prefix("zotero-git-sync-")
        .tempdir()
        .map_err(|e| SyncError::io(std::env::temp_dir(), e))?;
    let checkout = workdir.path().join("repository");

    let repo = GitRepository::clone_shallow(&config.git_repository_url, &checkout)?;
    repo.set_identity(&config.git_name, &config.git_email)?;

    let exporter = Exporter::new(
        source,
        &repo,
        &config.export_path,
        &config.bibliography_file,
        Throttle::new(config.max_download_delay_secs),
    );
    let export = exporter.export(&items).await.map_err(|e| {
        error!(error = %e, "[SYNC][ERROR] Export failed");
        e
    })?;

    if !repo.is_dirty()? {
        info!("[SYNC] Nothing changed");
        return Ok(SynchroniseReport {
            export,
            outcome: SyncOutcome::NothingChanged,
        });
    }

    repo.commit(&config.commit_message)?;
    let commit = repo.head_commit()?;
    repo.push().map_err(|e| {
        error!(error = %e, commit = %commit, "[SYNC][ERROR] Push failed");
        e
    })?;

    info!(commit = %commit, "[SYNC] Synchronisation complete");
    Ok(SynchroniseReport {
        export,
        outcome: SyncOutcome::Pushed { commit },
    })
}
