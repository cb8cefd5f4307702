//! Document pipeline: every page of one PDF → one combined artifact.
//!
//! Resumability works at two granularities:
//!
//! * **Document** — if `<stem>_complete.md` exists the PDF is not even
//!   opened.
//! * **Page** — if `<stem>/<stem>_page_<n>.md` exists its text is reused
//!   and the service is not called for that page.
//!
//! A page's text is persisted as soon as it is extracted, so a crash
//! mid-document loses at most the page in flight. A failed page is left out
//! of the combined artifact without stopping its siblings; if no page
//! produced text nothing combined is written and the next run retries the
//! whole document. A combined artifact that cannot be written is reported as
//! [`DocumentOutcome::Unpersisted`]; its pages stay on disk for reuse.

use crate::artifacts::{self, stem_of, ArtifactLayout};
use crate::error::UnitError;
use crate::output::{DocumentArtifact, DocumentOutcome, PageArtifact};
use crate::pipeline::pace::Pacer;
use crate::pipeline::render::{DocumentOpener, PageSource};
use crate::progress::ProgressCallback;
use crate::unit::UnitProcessor;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Drives all pages of a document through the [`UnitProcessor`].
pub struct DocumentPipeline {
    units: UnitProcessor,
    opener: Box<dyn DocumentOpener>,
    layout: ArtifactLayout,
    pacer: Pacer,
    progress: Option<ProgressCallback>,
}

impl DocumentPipeline {
    pub fn new(
        units: UnitProcessor,
        opener: Box<dyn DocumentOpener>,
        layout: ArtifactLayout,
        page_delay: Duration,
        progress: Option<ProgressCallback>,
    ) -> Self {
        Self {
            units,
            opener,
            layout,
            pacer: Pacer::new("page", page_delay),
            progress,
        }
    }

    /// Number of per-page pacing delays taken so far.
    pub fn page_pauses(&self) -> usize {
        self.pacer.pauses()
    }

    /// Process one PDF.
    pub async fn process_document(&self, path: &Path) -> DocumentOutcome {
        let stem = stem_of(path);
        let name = display_name(path);
        let complete = self.layout.complete_artifact(&stem);

        if artifacts::is_done(&complete) {
            info!("Skipping {} - already processed", name);
            return DocumentOutcome::Skipped;
        }

        info!("Processing {}", name);

        // Dropped at the end of this function on every path, closing the document.
        let source = match self.opener.open(path) {
            Ok(source) => source,
            Err(e) => {
                warn!("Error opening {}: {}", name, e);
                return DocumentOutcome::Failed(e);
            }
        };

        let total = source.page_count();
        if let Some(ref cb) = self.progress {
            cb.on_document_open(&name, total);
        }

        let mut pages = Vec::with_capacity(total);
        let mut failed_pages = Vec::new();

        for index in 0..total {
            match self.process_page(&*source, &stem, &name, index, total).await {
                Some(page) => pages.push(page),
                None => failed_pages.push(index),
            }
        }

        let Some(combined) = artifacts::assemble(pages.iter().map(|p| p.text.as_str())) else {
            warn!("{}: no page produced text; leaving it for the next run", name);
            return DocumentOutcome::Incomplete { failed_pages };
        };

        if let Err(error) = artifacts::write_artifact(&complete, &combined) {
            warn!("{}: {}", name, error);
            return DocumentOutcome::Unpersisted {
                failed_pages,
                error,
            };
        }

        info!(
            "Created: {} ({}/{} pages)",
            complete.display(),
            pages.len(),
            total
        );
        DocumentOutcome::Completed(DocumentArtifact {
            path: complete,
            pages,
            failed_pages,
        })
    }

    /// Reuse or extract one page; `None` when it produced no text.
    async fn process_page(
        &self,
        source: &dyn PageSource,
        stem: &str,
        name: &str,
        index: usize,
        total: usize,
    ) -> Option<PageArtifact> {
        let page_path = self.layout.page_artifact(stem, index);

        if artifacts::is_done(&page_path) {
            match artifacts::read_artifact(&page_path) {
                Ok(text) => {
                    info!("Skipping {} page {} - already processed", name, index + 1);
                    if let Some(ref cb) = self.progress {
                        cb.on_page_reused(name, index + 1, total);
                    }
                    return Some(PageArtifact {
                        index,
                        text,
                        reused: true,
                    });
                }
                // Unreadable marker: fall through and extract again.
                Err(e) => warn!("{}: cannot reuse {}: {}", name, page_path.display(), e),
            }
        }

        let result = match self.units.process_page(source, name, index).await {
            Ok(text) => artifacts::write_artifact(&page_path, &text).map(|()| text),
            Err(e) => Err(e),
        };
        let page = self.report_page(name, index, total, result);

        self.pacer.pause().await;
        page
    }

    fn report_page(
        &self,
        name: &str,
        index: usize,
        total: usize,
        result: Result<String, UnitError>,
    ) -> Option<PageArtifact> {
        match result {
            Ok(text) => {
                if let Some(ref cb) = self.progress {
                    cb.on_page_complete(name, index + 1, total, text.len());
                }
                Some(PageArtifact {
                    index,
                    text,
                    reused: false,
                })
            }
            Err(e) => {
                warn!("Error processing {} page {}: {}", name, index + 1, e);
                if let Some(ref cb) = self.progress {
                    cb.on_page_error(name, index + 1, total, &e.to_string());
                }
                None
            }
        }
    }
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
