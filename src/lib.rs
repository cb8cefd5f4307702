//! # edgequake-ocrbatch
//!
//! Resumable batch OCR of a folder of PDFs and images using Vision Language
//! Models (VLMs).
//!
//! Point it at a directory: every PDF is rasterised page by page, every page
//! and every standalone image is normalised into the size envelope the model
//! accepts, and the model's transcription is written to Markdown files next
//! to the inputs. The service is slow, rate limited and flaky, so the run is
//! strictly sequential, paced, retried per unit, and **resumable**: every
//! artifact doubles as a completion marker and a re-run only does the work
//! that is still missing.
//!
//! ## Pipeline Overview
//!
//! ```text
//! working dir
//!  │
//!  ├─ discover   *.pdf, then *.png|jpg|jpeg|webp|heic|heif (sorted)
//!  ├─ per PDF    skip if <stem>_complete.md exists
//!  │   └─ per page   reuse <stem>/<stem>_page_<n>.md, or
//!  │                 render → normalise → VLM (3 attempts) → persist
//!  │   └─ assemble   <stem>_complete.md  ("\n\n---\n\n" between pages)
//!  └─ per image  skip if image_ocr/<stem>.md exists, else
//!                decode → normalise → VLM → image_ocr/<stem>.md
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_ocrbatch::{run, BatchConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / …
//!     let config = BatchConfig::builder().working_dir("scans").build()?;
//!     let report = run(&config).await?;
//!     eprintln!(
//!         "{} documents, {} images completed",
//!         report.documents_completed, report.images_completed
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Testing without a service
//!
//! [`BatchDriver::from_parts`] takes the two external seams explicitly: a
//! [`VisionBackend`] (the extraction service) and a [`DocumentOpener`] (the
//! PDF rasteriser). Combined with [`BatchConfigBuilder::without_delays`] this
//! runs the whole pipeline offline and instantly.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ocrbatch` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod artifacts;
pub mod batch;
pub mod config;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod run;
pub mod unit;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use artifacts::{ArtifactLayout, IMAGE_DIR, PAGE_SEPARATOR};
pub use batch::{discover, BatchDriver, WorkingSet, SUPPORTED_IMAGE_EXTENSIONS};
pub use config::{BatchConfig, BatchConfigBuilder};
pub use document::DocumentPipeline;
pub use error::{OcrBatchError, ServiceError, UnitError};
pub use output::{BatchReport, DocumentArtifact, DocumentOutcome, ImageOutcome, PageArtifact};
pub use pipeline::llm::{ExtractionClient, LlmBackend, VisionBackend};
pub use pipeline::normalize::DimensionLimits;
pub use pipeline::render::{DocumentOpener, PageSource, PdfiumOpener};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use run::{resolve_provider, run};
pub use unit::{UnitId, UnitProcessor};
