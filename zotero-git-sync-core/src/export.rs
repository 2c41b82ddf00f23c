//! Writes a collection into a checkout: the bibliography document, the
//! mirrored PDFs, the `.zotero` lockfile, and the matching git index
//! changes. Committing and pushing is left to the caller.

use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::contract::ItemSource;
use crate::error::{Result, SyncError};
use crate::git::GitRepository;
use crate::item::BibliographicItem;
use crate::lockfile::{Lockfile, LOCKFILE_NAME};
use crate::normalize::attachment_file_name;
use crate::render::render_document;

/// Subfolder for PDFs that are no longer part of the collection.
pub const OTHER_DIR: &str = "other";

/// Spaces out attachment downloads: the n-th download waits
/// `max_delay * tanh(n / 10)`, so the first few are quick and long runs
/// settle near `max_delay`.
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    max_delay_secs: f64,
}

impl Throttle {
    pub fn new(max_delay_secs: f64) -> Self {
        Self {
            max_delay_secs: max_delay_secs.max(0.0),
        }
    }

    pub fn delay_for(&self, download_index: u32) -> Duration {
        let factor = (f64::from(download_index) / 10.0).tanh();
        if factor == 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(self.max_delay_secs * factor).unwrap_or(Duration::MAX)
    }
}

/// What an export changed in the checkout.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub entries: usize,
    pub downloaded: Vec<String>,
    pub renamed: Vec<(String, String)>,
    pub unchanged: usize,
    pub moved_to_other: Vec<String>,
}

pub struct Exporter<'a, S: ItemSource + ?Sized> {
    source: &'a S,
    repo: &'a GitRepository,
    export_dir: PathBuf,
    bibliography_file: PathBuf,
    throttle: Throttle,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> SyncError + '_ {
    move |e| SyncError::io(path, e)
}

fn pdf_file_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err(dir))? {
        let entry = entry.map_err(io_err(dir))?;
        let path = entry.path();
        let is_pdf = path.extension().and_then(|e| e.to_str()) == Some("pdf");
        if path.is_file() && is_pdf {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// `name`, or `stem.N.ext` with the smallest free `N >= 1`.
pub fn free_name_in(dir: &Path, name: &str) -> String {
    if !dir.join(name).exists() {
        return name.to_string();
    }
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    let suffix = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    (1..)
        .map(|n| format!("{stem}.{n}{suffix}"))
        .find(|candidate| !dir.join(candidate).exists())
        .unwrap_or_else(|| name.to_string())
}

fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    bar.set_message("Download PDFs");
    bar
}

impl<'a, S: ItemSource + ?Sized> Exporter<'a, S> {
    pub fn new(
        source: &'a S,
        repo: &'a GitRepository,
        export_dir: impl Into<PathBuf>,
        bibliography_file: impl Into<PathBuf>,
        throttle: Throttle,
    ) -> Self {
        Self {
            source,
            repo,
            export_dir: export_dir.into(),
            bibliography_file: bibliography_file.into(),
            throttle,
        }
    }

    fn absolute(&self, relative: &Path) -> PathBuf {
        self.repo.path().join(relative)
    }

    /// Brings the export directory in line with `items` and stages every change.
    pub async fn export(&self, items: &[BibliographicItem]) -> Result<ExportReport> {
        let export_abs = self.absolute(&self.export_dir);
        let other_abs = export_abs.join(OTHER_DIR);
        fs::create_dir_all(&other_abs).map_err(io_err(&other_abs))?;

        let previous_pdfs = pdf_file_names(&export_abs)?;
        let lock_rel = self.export_dir.join(LOCKFILE_NAME);
        let previous_lock = Lockfile::load(&self.absolute(&lock_rel))?;
        debug!(
            pdfs = previous_pdfs.len(),
            locked = previous_lock.entries().len(),
            "Inspected existing export directory"
        );

        let mut report = ExportReport {
            entries: items.len(),
            ..Default::default()
        };
        let lock = self
            .mirror_attachments(items, &previous_lock, &mut report)
            .await?;
        self.move_stale(&previous_pdfs, &lock, &mut report)?;

        lock.save(&self.absolute(&lock_rel))?;
        self.repo.add(&lock_rel)?;

        let document = render_document(items);
        let bibliography_rel = self.export_dir.join(&self.bibliography_file);
        let bibliography_abs = self.absolute(&bibliography_rel);
        fs::write(&bibliography_abs, &document.text).map_err(io_err(&bibliography_abs))?;
        self.repo.add(&bibliography_rel)?;

        info!(
            entries = report.entries,
            downloaded = report.downloaded.len(),
            renamed = report.renamed.len(),
            unchanged = report.unchanged,
            moved_to_other = report.moved_to_other.len(),
            "Export written to checkout"
        );
        Ok(report)
    }

    async fn mirror_attachments(
        &self,
        items: &[BibliographicItem],
        previous_lock: &Lockfile,
        report: &mut ExportReport,
    ) -> Result<Lockfile> {
        let export_abs = self.absolute(&self.export_dir);
        let with_pdf: Vec<_> = items
            .iter()
            .filter_map(|item| item.pdf_attachment().map(|a| (item, a)))
            .collect();

        let bar = progress_bar(with_pdf.len());
        let mut lock = Lockfile::default();
        let mut downloads: u32 = 0;

        for (item, attachment) in with_pdf {
            let file_name = attachment_file_name(item);
            let target_rel = self.export_dir.join(&file_name);
            let existing = previous_lock
                .file_name(&attachment.key)
                .filter(|old| export_abs.join(old).is_file());

            match existing {
                Some(old) if old == file_name => report.unchanged += 1,
                Some(old) => {
                    let target_abs = export_abs.join(&file_name);
                    if target_abs.exists() {
                        self.repo.rm(&target_rel)?;
                        if target_abs.exists() {
                            fs::remove_file(&target_abs).map_err(io_err(&target_abs))?;
                        }
                    }
                    self.repo.mv(&self.export_dir.join(old), &target_rel)?;
                    info!(from = old, to = %file_name, "Renamed attachment");
                    report.renamed.push((old.to_string(), file_name.clone()));
                }
                None => {
                    let delay = self.throttle.delay_for(downloads);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    let bytes = self.source.attachment_file(&attachment.key).await?;
                    let target_abs = export_abs.join(&file_name);
                    fs::write(&target_abs, &bytes).map_err(io_err(&target_abs))?;
                    self.repo.add(&target_rel)?;
                    downloads += 1;
                    info!(
                        attachment = %attachment.key,
                        file = %file_name,
                        bytes = bytes.len(),
                        "Downloaded attachment"
                    );
                    report.downloaded.push(file_name.clone());
                }
            }

            lock.insert(attachment.key.clone(), file_name);
            bar.inc(1);
        }

        bar.finish_and_clear();
        Ok(lock)
    }

    fn move_stale(
        &self,
        previous_pdfs: &[String],
        lock: &Lockfile,
        report: &mut ExportReport,
    ) -> Result<()> {
        let export_abs = self.absolute(&self.export_dir);
        let other_abs = export_abs.join(OTHER_DIR);
        let current: HashSet<&str> = lock.entries().iter().map(|e| e.file_name.as_str()).collect();

        for name in previous_pdfs {
            // Renamed sources are already gone.
            if current.contains(name.as_str()) || !export_abs.join(name).exists() {
                continue;
            }
            let target = free_name_in(&other_abs, name);
            self.repo.mv(
                &self.export_dir.join(name),
                &self.export_dir.join(OTHER_DIR).join(&target),
            )?;
            warn!(file = %name, moved_to = %target, "Attachment left the collection, moved to other/");
            report.moved_to_other.push(target);
        }
        Ok(())
    }
}
