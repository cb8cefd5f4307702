//! Error types for the edgequake-ocrbatch library.
//!
//! Three error types mirror the three scopes a failure can have:
//!
//! * [`OcrBatchError`] — **Fatal**: the batch cannot start at all (working
//!   directory unreadable, provider not configured, pdfium missing). Returned
//!   as `Err(OcrBatchError)` from [`crate::run`] and
//!   [`crate::batch::BatchDriver::run`].
//!
//! * [`UnitError`] — **Non-fatal**: one image or one page produced nothing
//!   (undecodable input, retries exhausted, artifact not writable). Units
//!   never propagate it past their own boundary; pipelines observe it as a
//!   value inside [`crate::output::DocumentOutcome`] /
//!   [`crate::output::ImageOutcome`].
//!
//! * [`ServiceError`] — a single failed call to the extraction service.
//!   The Extraction Client retries these and only surfaces the last one,
//!   wrapped in [`UnitError::Extraction`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-ocrbatch library.
#[derive(Debug, Error)]
pub enum OcrBatchError {
    /// The working directory could not be listed.
    #[error("Cannot read working directory '{path}': {source}")]
    WorkingDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDF documents were found but the PDFium engine is not available.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Or place libpdfium next to the working directory / on the system library path.\n"
    )]
    PdfiumBindingFailed(String),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal failure of one processing unit (an image file or a PDF page).
#[derive(Debug, Error)]
pub enum UnitError {
    /// The image or document could not be opened or decoded.
    #[error("{unit}: cannot decode: {detail}")]
    Decode { unit: String, detail: String },

    /// The page could not be rasterised.
    #[error("{unit}: rasterisation failed: {detail}")]
    Render { unit: String, detail: String },

    /// Every attempt against the extraction service failed.
    #[error("{unit}: extraction failed after {attempts} attempts: {source}")]
    Extraction {
        unit: String,
        attempts: u32,
        #[source]
        source: ServiceError,
    },

    /// The service answered but nothing usable remained.
    #[error("{unit}: extraction produced no text")]
    EmptyText { unit: String },

    /// An artifact file could not be written.
    #[error("Failed to write artifact '{path}': {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A single failed call to the extraction service.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ServiceError {
    /// Transport or API failure reported by the provider.
    #[error("API error: {0}")]
    Api(String),

    /// The provider rejected the call because of its rate limit.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The response carried no text payload.
    #[error("response carried no text payload")]
    EmptyResponse,

    /// The call did not complete within the configured timeout.
    #[error("call timed out after {secs}s")]
    Timeout { secs: u64 },
}
