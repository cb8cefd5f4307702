//! Page source: open a PDF and rasterise one page at a time via pdfium.
//!
//! The pipeline only needs two things from a document: how many pages it has
//! and a raster image for page `i`. [`DocumentOpener`] / [`PageSource`]
//! capture exactly that, so tests can feed synthetic pages and the rest of
//! the crate never touches pdfium types.
//!
//! ## Why render lazily?
//!
//! Pages whose artifact already exists are never rendered, and a page that
//! fails to rasterise only loses that page. Rendering everything up front
//! would cost both properties.
//!
//! ## Lifetime of the document handle
//!
//! A [`PdfiumPages`] borrows the bound [`Pdfium`] instance and owns the open
//! `PdfDocument`. It is dropped at the end of the document's scope on every
//! path, which closes the handle.
//!
//! ## Why not `spawn_blocking`?
//!
//! Rasterisation is CPU-bound and must not stall the async worker, but the
//! document borrows the bound library, so it cannot be moved onto the
//! blocking pool. [`render_page`] runs it under
//! [`tokio::task::block_in_place`] instead: the current worker becomes a
//! blocking thread and its other tasks are handed to the rest of the pool.
//! On a current-thread runtime there is no pool to hand them to, and the
//! render runs inline.

use crate::error::{OcrBatchError, UnitError};
use image::DynamicImage;
use once_cell::sync::OnceCell;
use pdfium_render::prelude::*;
use std::path::Path;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, info};

/// Pages of an open document.
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Rasterise page `index` (0-based).
    fn render(&self, index: usize) -> Result<DynamicImage, UnitError>;
}

/// Opens documents into [`PageSource`]s.
pub trait DocumentOpener {
    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn PageSource + 'a>, UnitError>;
}

/// Rasterise one page without blocking the runtime's other tasks.
pub fn render_page(source: &dyn PageSource, index: usize) -> Result<DynamicImage, UnitError> {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| source.render(index))
        }
        _ => source.render(index),
    }
}

/// Environment variable pointing at an existing pdfium shared library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// [`DocumentOpener`] backed by pdfium, bound on first use.
///
/// Binding is deferred so a working set without PDFs never needs the
/// library. Call [`PdfiumOpener::ensure_bound`] to surface a missing library
/// as a fatal error before the batch starts.
pub struct PdfiumOpener {
    pdfium: OnceCell<Pdfium>,
    scale: f32,
    password: Option<String>,
}

impl PdfiumOpener {
    pub fn new(scale: f32, password: Option<String>) -> Self {
        Self {
            pdfium: OnceCell::new(),
            scale,
            password,
        }
    }

    /// Bind pdfium now if it is not bound yet.
    pub fn ensure_bound(&self) -> Result<&Pdfium, OcrBatchError> {
        self.pdfium.get_or_try_init(bind_pdfium)
    }
}

/// Bind pdfium: `PDFIUM_LIB_PATH`, then the current directory, then the system library.
pub fn bind_pdfium() -> Result<Pdfium, OcrBatchError> {
    let bindings = match std::env::var(PDFIUM_LIB_PATH_ENV) {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| OcrBatchError::PdfiumBindingFailed(format!("{e:?}")))?;

    info!("PDFium bound");
    Ok(Pdfium::new(bindings))
}

impl DocumentOpener for PdfiumOpener {
    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn PageSource + 'a>, UnitError> {
        let unit = path.display().to_string();
        let pdfium = self.ensure_bound().map_err(|e| UnitError::Decode {
            unit: unit.clone(),
            detail: e.to_string(),
        })?;

        let document = pdfium
            .load_pdf_from_file(path, self.password.as_deref())
            .map_err(|e| UnitError::Decode {
                unit,
                detail: format!("{e:?}"),
            })?;

        info!("PDF loaded: {} pages", document.pages().len());

        Ok(Box::new(PdfiumPages {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            document,
            render_config: PdfRenderConfig::new().scale_page_by_factor(self.scale),
        }))
    }
}

/// An open pdfium document.
pub struct PdfiumPages<'a> {
    name: String,
    document: PdfDocument<'a>,
    render_config: PdfRenderConfig,
}

impl PageSource for PdfiumPages<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn render(&self, index: usize) -> Result<DynamicImage, UnitError> {
        let failed = |detail: String| UnitError::Render {
            unit: format!("{} page {}", self.name, index + 1),
            detail,
        };

        let page_index =
            u16::try_from(index).map_err(|_| failed("page index exceeds u16".into()))?;
        let page = self
            .document
            .pages()
            .get(page_index)
            .map_err(|e| failed(format!("{e:?}")))?;
        let bitmap = page
            .render_with_config(&self.render_config)
            .map_err(|e| failed(format!("{e:?}")))?;

        let image = bitmap.as_image();
        debug!(
            "Rendered {} page {} → {}x{} px",
            self.name,
            index + 1,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opener_defers_binding() {
        // Construction must not touch the library.
        let opener = PdfiumOpener::new(2.0, None);
        assert!(opener.pdfium.get().is_none());
        assert_eq!(opener.scale, 2.0);
    }

    struct Blank;

    impl PageSource for Blank {
        fn page_count(&self) -> usize {
            1
        }

        fn render(&self, _index: usize) -> Result<DynamicImage, UnitError> {
            Ok(DynamicImage::new_rgb8(8, 8))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn render_page_on_multi_thread_runtime() {
        let img = render_page(&Blank, 0).unwrap();
        assert_eq!((img.width(), img.height()), (8, 8));
    }

    #[tokio::test]
    async fn render_page_on_current_thread_runtime() {
        assert!(render_page(&Blank, 0).is_ok());
    }

    #[test]
    fn render_page_outside_a_runtime() {
        assert!(render_page(&Blank, 0).is_ok());
    }
}
