//! Result types produced by the document pipeline and the batch driver.

use crate::error::UnitError;
use serde::Serialize;
use std::path::PathBuf;

/// Text for one page.
#[derive(Debug, Clone, Serialize)]
pub struct PageArtifact {
    /// 0-based page index.
    pub index: usize,
    pub text: String,
    /// Loaded from a previous run's artifact instead of extracted now.
    pub reused: bool,
}

/// The combined text of one document, in page order.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentArtifact {
    pub path: PathBuf,
    pub pages: Vec<PageArtifact>,
    /// Pages that produced nothing and are absent from `pages`.
    pub failed_pages: Vec<usize>,
}

/// What happened to one PDF.
#[derive(Debug)]
pub enum DocumentOutcome {
    /// The combined artifact already existed.
    Skipped,
    /// The combined artifact was written.
    Completed(DocumentArtifact),
    /// No page produced text; nothing combined was written.
    Incomplete { failed_pages: Vec<usize> },
    /// Pages produced text, but the combined artifact could not be written.
    /// The page artifacts stay on disk and are reused next run.
    Unpersisted {
        failed_pages: Vec<usize>,
        error: UnitError,
    },
    /// The document could not be opened.
    Failed(UnitError),
}

/// What happened to one standalone image.
#[derive(Debug)]
pub enum ImageOutcome {
    Skipped,
    Completed { path: PathBuf },
    Failed(UnitError),
}

/// Summary of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// No PDF or supported image was discovered.
    pub nothing_found: bool,
    pub documents_found: usize,
    pub documents_completed: usize,
    pub documents_skipped: usize,
    pub documents_incomplete: usize,
    /// Documents whose pages were extracted but whose combined artifact
    /// could not be written.
    pub documents_unpersisted: usize,
    pub documents_failed: usize,
    /// Pages (across all documents) that produced no text this run.
    pub pages_failed: usize,
    /// Pages whose text was reused from an earlier run.
    pub pages_reused: usize,
    pub images_found: usize,
    pub images_completed: usize,
    pub images_skipped: usize,
    pub images_failed: usize,
    /// Calls made to the extraction service, retries included.
    pub service_calls: usize,
}

impl BatchReport {
    pub fn record_document(&mut self, outcome: &DocumentOutcome) {
        match outcome {
            DocumentOutcome::Skipped => self.documents_skipped += 1,
            DocumentOutcome::Completed(artifact) => {
                self.documents_completed += 1;
                self.pages_failed += artifact.failed_pages.len();
                self.pages_reused += artifact.pages.iter().filter(|p| p.reused).count();
            }
            DocumentOutcome::Incomplete { failed_pages } => {
                self.documents_incomplete += 1;
                self.pages_failed += failed_pages.len();
            }
            DocumentOutcome::Unpersisted { failed_pages, .. } => {
                self.documents_unpersisted += 1;
                self.pages_failed += failed_pages.len();
            }
            DocumentOutcome::Failed(_) => self.documents_failed += 1,
        }
    }

    pub fn record_image(&mut self, outcome: &ImageOutcome) {
        match outcome {
            ImageOutcome::Skipped => self.images_skipped += 1,
            ImageOutcome::Completed { .. } => self.images_completed += 1,
            ImageOutcome::Failed(_) => self.images_failed += 1,
        }
    }

    /// Every discovered item is now done (completed or previously done).
    pub fn all_done(&self) -> bool {
        self.documents_completed + self.documents_skipped == self.documents_found
            && self.images_completed + self.images_skipped == self.images_found
    }
}
