//! Batch driver: discover the working set and walk it, documents first.
//!
//! One item at a time, one page at a time. Each item is independent: a
//! failure is logged and tallied in the [`BatchReport`], then the batch moves
//! on. Only an unreadable working directory stops a run.
//!
//! The item pacer runs between every two consecutive items, skipped ones
//! included, and never after the last.

use crate::artifacts::{self, stem_of, ArtifactLayout};
use crate::config::BatchConfig;
use crate::document::{display_name, DocumentPipeline};
use crate::error::OcrBatchError;
use crate::output::{BatchReport, DocumentOutcome, ImageOutcome};
use crate::pipeline::llm::{ExtractionClient, VisionBackend};
use crate::pipeline::pace::Pacer;
use crate::pipeline::render::DocumentOpener;
use crate::progress::ProgressCallback;
use crate::unit::UnitProcessor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Extensions treated as documents.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf"];

/// Extensions treated as standalone images.
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "heic", "heif"];

/// Files found in the working directory, each list sorted by file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingSet {
    pub documents: Vec<PathBuf>,
    pub images: Vec<PathBuf>,
}

impl WorkingSet {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty() && self.images.is_empty()
    }
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)))
}

/// Scan `dir` (non-recursively) for documents and images.
pub fn discover(dir: &Path) -> Result<WorkingSet, OcrBatchError> {
    let unreadable = |source: std::io::Error| OcrBatchError::WorkingDirUnreadable {
        path: dir.to_path_buf(),
        source,
    };

    let mut set = WorkingSet::default();
    for entry in std::fs::read_dir(dir).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        // Follows symlinks; dangling links and directories are ignored.
        if !entry.path().is_file() {
            continue;
        }
        let path = entry.path();
        if has_extension(&path, DOCUMENT_EXTENSIONS) {
            set.documents.push(path);
        } else if has_extension(&path, SUPPORTED_IMAGE_EXTENSIONS) {
            set.images.push(path);
        }
    }

    set.documents.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    set.images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(set)
}

/// Walks a [`WorkingSet`] sequentially.
pub struct BatchDriver {
    documents: DocumentPipeline,
    units: UnitProcessor,
    layout: ArtifactLayout,
    item_pacer: Pacer,
    progress: Option<ProgressCallback>,
}

impl BatchDriver {
    /// Assemble a driver from a config plus the two external seams.
    pub fn from_parts(
        config: &BatchConfig,
        backend: Arc<dyn VisionBackend>,
        opener: Box<dyn DocumentOpener>,
    ) -> Self {
        let client = ExtractionClient::from_config(backend, config);
        let units = UnitProcessor::from_config(client, config);
        let layout = ArtifactLayout::new(config.output_root());
        let progress = config.progress_callback.clone();

        Self {
            documents: DocumentPipeline::new(
                units.clone(),
                opener,
                layout.clone(),
                config.page_delay,
                progress.clone(),
            ),
            units,
            layout,
            item_pacer: Pacer::new("item", config.item_delay),
            progress,
        }
    }

    /// Extraction-service calls made so far, retries included.
    pub fn service_calls(&self) -> usize {
        self.units.client().calls()
    }

    /// Number of between-item delays taken so far.
    pub fn item_pauses(&self) -> usize {
        self.item_pacer.pauses()
    }

    /// Discover `dir` and process everything in it.
    pub async fn run(&self, dir: &Path) -> Result<BatchReport, OcrBatchError> {
        let set = discover(dir)?;
        if set.is_empty() {
            info!("No PDF or image files found in {}; nothing to do", dir.display());
            return Ok(BatchReport {
                nothing_found: true,
                ..Default::default()
            });
        }
        Ok(self.run_set(&set).await)
    }

    /// Process an already discovered working set.
    pub async fn run_set(&self, set: &WorkingSet) -> BatchReport {
        let mut report = BatchReport {
            nothing_found: set.is_empty(),
            documents_found: set.documents.len(),
            images_found: set.images.len(),
            ..Default::default()
        };
        if set.is_empty() {
            return report;
        }

        info!(
            "Found {} PDF(s) and {} image(s)",
            set.documents.len(),
            set.images.len()
        );
        if let Some(ref cb) = self.progress {
            cb.on_batch_start(set.documents.len(), set.images.len());
        }

        let calls_before = self.service_calls();
        let mut items = 0usize;

        for path in &set.documents {
            let name = display_name(path);
            if items > 0 {
                self.item_pacer.pause().await;
            }
            items += 1;
            if let Some(ref cb) = self.progress {
                cb.on_item_start(&name);
            }

            let outcome = self.documents.process_document(path).await;
            report.record_document(&outcome);

            if let Some(ref cb) = self.progress {
                match outcome {
                    DocumentOutcome::Skipped => cb.on_item_skipped(&name),
                    DocumentOutcome::Completed(_) => cb.on_item_complete(&name, true),
                    _ => cb.on_item_complete(&name, false),
                }
            }
        }

        for path in &set.images {
            let name = display_name(path);
            if items > 0 {
                self.item_pacer.pause().await;
            }
            items += 1;
            if let Some(ref cb) = self.progress {
                cb.on_item_start(&name);
            }

            let outcome = self.process_image(path).await;
            report.record_image(&outcome);

            if let Some(ref cb) = self.progress {
                match outcome {
                    ImageOutcome::Skipped => cb.on_item_skipped(&name),
                    ImageOutcome::Completed { .. } => cb.on_item_complete(&name, true),
                    ImageOutcome::Failed(_) => cb.on_item_complete(&name, false),
                }
            }
        }

        report.service_calls = self.service_calls() - calls_before;
        info!(
            "Batch finished: {} document(s) completed, {} image(s) completed, {} service call(s)",
            report.documents_completed, report.images_completed, report.service_calls
        );
        report
    }

    /// Process one standalone image into `image_ocr/<stem>.md`.
    pub async fn process_image(&self, path: &Path) -> ImageOutcome {
        let name = display_name(path);
        let target = self.layout.image_artifact(&stem_of(path));

        if artifacts::is_done(&target) {
            info!("Skipping {} - already processed", name);
            return ImageOutcome::Skipped;
        }

        info!("Processing {}", name);
        let result = match self.units.process_image_file(path).await {
            Ok(text) => artifacts::write_artifact(&target, &text),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!("Created: {}", target.display());
                ImageOutcome::Completed { path: target }
            }
            Err(e) => {
                warn!("{}: no artifact written: {}", name, e);
                ImageOutcome::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths.iter().map(|p| display_name(p)).collect()
    }

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn discovery_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "b.pdf", "A.PDF", "notes.txt", "z.png", "c.JPEG", "d.webp", "e.heic", "f.gif",
        ] {
            touch(dir.path(), name);
        }
        std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let set = discover(dir.path()).unwrap();
        assert_eq!(names(&set.documents), vec!["A.PDF", "b.pdf"]);
        assert_eq!(names(&set.images), vec!["c.JPEG", "d.webp", "e.heic", "z.png"]);
    }

    #[test]
    fn discovery_is_not_recursive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        touch(&dir.path().join("sub"), "deep.pdf");
        assert!(discover(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_fatal() {
        let err = discover(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, OcrBatchError::WorkingDirUnreadable { .. }));
    }
}
