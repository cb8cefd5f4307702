//! Progress-callback trait for batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::BatchConfigBuilder::progress_callback`] to receive events
//! as the batch walks documents, pages and images. The library itself only
//! logs through `tracing`; rendering progress (the CLI uses `indicatif`) is
//! the host's business.
//!
//! # Example
//!
//! ```rust
//! use edgequake_ocrbatch::{BatchConfig, BatchProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PageCounter(AtomicUsize);
//!
//! impl BatchProgressCallback for PageCounter {
//!     fn on_page_complete(&self, _doc: &str, _page: usize, _total: usize, _chars: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = BatchConfig::builder()
//!     .progress_callback(Arc::new(PageCounter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch driver and the document pipeline.
///
/// All methods default to no-ops. Page numbers are 1-based.
pub trait BatchProgressCallback: Send + Sync {
    /// Discovery finished.
    fn on_batch_start(&self, documents: usize, images: usize) {
        let _ = (documents, images);
    }

    /// A document or image is about to be processed.
    fn on_item_start(&self, name: &str) {
        let _ = name;
    }

    /// The item's completion marker already existed.
    fn on_item_skipped(&self, name: &str) {
        let _ = name;
    }

    /// A document was opened and its pages are about to be visited.
    fn on_document_open(&self, name: &str, total_pages: usize) {
        let _ = (name, total_pages);
    }

    /// A page's text was extracted and persisted.
    fn on_page_complete(&self, document: &str, page_num: usize, total_pages: usize, chars: usize) {
        let _ = (document, page_num, total_pages, chars);
    }

    /// A page's text was loaded from an earlier run.
    fn on_page_reused(&self, document: &str, page_num: usize, total_pages: usize) {
        let _ = (document, page_num, total_pages);
    }

    /// A page produced nothing.
    fn on_page_error(&self, document: &str, page_num: usize, total_pages: usize, error: &str) {
        let _ = (document, page_num, total_pages, error);
    }

    /// The item finished; `ok` is false when it produced no artifact.
    fn on_item_complete(&self, name: &str, ok: bool) {
        let _ = (name, ok);
    }
}

/// A no-op implementation for callers that don't need events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BatchConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
