//! Unit processing: one image file or one PDF page → text.
//!
//! A unit is acquire → normalise → extract (→ optional sentinel stripping).
//! Every failure is logged with the unit's identity and returned as a
//! [`UnitError`] value; nothing here panics or aborts the caller. The
//! normalised image only ever lives in memory, so there is no temporary
//! file to clean up on either path.

use crate::config::BatchConfig;
use crate::error::UnitError;
use crate::pipeline::llm::ExtractionClient;
use crate::pipeline::normalize::{normalize_to_png, DimensionLimits};
use crate::pipeline::postprocess::strip_sentinels;
use crate::pipeline::render::{render_page, PageSource};
use image::DynamicImage;
use std::fmt;
use std::path::Path;
use tracing::warn;

/// Logical identity of a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitId {
    /// 0-based page of a document.
    Page { document: String, index: usize },
    Image { name: String },
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitId::Page { document, index } => write!(f, "{} page {}", document, index + 1),
            UnitId::Image { name } => write!(f, "image {}", name),
        }
    }
}

/// What is sent to the extraction service: normalised PNG plus identity.
#[derive(Debug)]
pub struct ProcessingUnit {
    pub id: UnitId,
    pub png: Vec<u8>,
}

/// Runs units through normalisation and extraction.
#[derive(Clone)]
pub struct UnitProcessor {
    client: ExtractionClient,
    limits: DimensionLimits,
    strip_sentinels: bool,
}

impl UnitProcessor {
    pub fn new(client: ExtractionClient, limits: DimensionLimits, strip_sentinels: bool) -> Self {
        Self {
            client,
            limits,
            strip_sentinels,
        }
    }

    pub fn from_config(client: ExtractionClient, config: &BatchConfig) -> Self {
        Self::new(client, config.limits, config.strip_sentinels)
    }

    pub fn client(&self) -> &ExtractionClient {
        &self.client
    }

    /// Decode a standalone image file and extract its text.
    pub async fn process_image_file(&self, path: &Path) -> Result<String, UnitError> {
        let id = UnitId::Image {
            name: file_name(path),
        };
        let owned = path.to_path_buf();
        let decoded = tokio::task::spawn_blocking(move || image::open(owned))
            .await
            .map_err(|e| e.to_string())
            .and_then(|r| r.map_err(|e| e.to_string()));
        let result = match decoded {
            Ok(img) => self.process_image(id.clone(), img).await,
            Err(detail) => Err(UnitError::Decode {
                unit: id.to_string(),
                detail,
            }),
        };
        log_failure(&id, result)
    }

    /// Render page `index` of an open document and extract its text.
    pub async fn process_page(
        &self,
        source: &dyn PageSource,
        document: &str,
        index: usize,
    ) -> Result<String, UnitError> {
        let id = UnitId::Page {
            document: document.to_string(),
            index,
        };
        let result = match render_page(source, index) {
            Ok(img) => self.process_image(id.clone(), img).await,
            Err(e) => Err(e),
        };
        log_failure(&id, result)
    }

    async fn process_image(&self, id: UnitId, img: DynamicImage) -> Result<String, UnitError> {
        let label = id.to_string();
        let unit = ProcessingUnit {
            png: normalize_to_png(img, self.limits, &label).await?,
            id,
        };

        let raw = self.client.extract(&label, &unit.png).await?;
        let text = if self.strip_sentinels {
            strip_sentinels(&raw)
        } else {
            raw
        };

        if text.trim().is_empty() {
            return Err(UnitError::EmptyText { unit: label });
        }
        Ok(text)
    }
}

fn log_failure(id: &UnitId, result: Result<String, UnitError>) -> Result<String, UnitError> {
    if let Err(ref e) = result {
        warn!("Error processing {}: {}", id, e);
    }
    result
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::pipeline::llm::VisionBackend;
    use async_trait::async_trait;
    use image::{Rgb, RgbImage};
    use std::sync::Arc;
    use std::time::Duration;

    struct Echo(&'static str);

    #[async_trait]
    impl VisionBackend for Echo {
        async fn transcribe(&self, png: &[u8]) -> Result<Option<String>, ServiceError> {
            let img =
                image::load_from_memory(png).map_err(|e| ServiceError::Api(e.to_string()))?;
            Ok(Some(format!("{} {}x{}", self.0, img.width(), img.height())))
        }
    }

    struct Fixed(&'static str);

    #[async_trait]
    impl VisionBackend for Fixed {
        async fn transcribe(&self, _png: &[u8]) -> Result<Option<String>, ServiceError> {
            Ok(Some(self.0.to_string()))
        }
    }

    struct OnePage;

    impl PageSource for OnePage {
        fn page_count(&self) -> usize {
            1
        }

        fn render(&self, index: usize) -> Result<DynamicImage, UnitError> {
            if index == 0 {
                let page = RgbImage::from_pixel(100, 50, Rgb([9, 9, 9]));
                Ok(DynamicImage::ImageRgb8(page))
            } else {
                Err(UnitError::Render {
                    unit: format!("doc page {}", index + 1),
                    detail: "out of range".into(),
                })
            }
        }
    }

    fn with_backend(backend: Arc<dyn VisionBackend>, strip: bool) -> UnitProcessor {
        let client = ExtractionClient::new(backend, 3, Duration::ZERO, Duration::from_secs(5));
        UnitProcessor::new(client, DimensionLimits::default(), strip)
    }

    fn processor(label: &'static str) -> UnitProcessor {
        with_backend(Arc::new(Echo(label)), false)
    }

    #[test]
    fn unit_id_display() {
        let page = UnitId::Page { document: "book.pdf".into(), index: 0 };
        assert_eq!(page.to_string(), "book.pdf page 1");
        let img = UnitId::Image { name: "cat.png".into() };
        assert_eq!(img.to_string(), "image cat.png");
    }

    #[tokio::test]
    async fn page_is_normalised_before_extraction() {
        let text = processor("text").process_page(&OnePage, "doc.pdf", 0).await.unwrap();
        assert_eq!(text, "text 1536x768");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn page_renders_on_a_multi_thread_runtime() {
        let p = processor("text");
        let text = p.process_page(&OnePage, "doc.pdf", 0).await.unwrap();
        assert_eq!(text, "text 1536x768");
        assert_eq!(p.client().calls(), 1);
    }

    #[tokio::test]
    async fn render_failure_is_a_unit_error() {
        let p = processor("text");
        let err = p.process_page(&OnePage, "doc.pdf", 3).await.unwrap_err();
        assert!(matches!(err, UnitError::Render { .. }));
        assert_eq!(p.client().calls(), 0);
    }

    #[tokio::test]
    async fn undecodable_image_is_a_unit_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();
        let p = processor("text");
        let err = p.process_image_file(&path).await.unwrap_err();
        assert!(matches!(err, UnitError::Decode { .. }));
        assert!(err.to_string().contains("broken.png"));
        assert_eq!(p.client().calls(), 0);
    }

    #[tokio::test]
    async fn image_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        RgbImage::from_pixel(1000, 800, Rgb([200, 200, 200])).save(&path).unwrap();
        let text = processor("scan").process_image_file(&path).await.unwrap();
        assert_eq!(text, "scan 1000x800");
    }

    #[tokio::test]
    async fn whitespace_only_reply_is_empty_text() {
        let err = with_backend(Arc::new(Fixed("'''\n   \n'''")), true)
            .process_page(&OnePage, "d", 0)
            .await
            .unwrap_err();
        assert!(matches!(err, UnitError::EmptyText { .. }));
    }

    #[tokio::test]
    async fn sentinels_stripped_only_when_enabled() {
        let reply = "Sure:\n'''\nbody\n'''";
        let raw = with_backend(Arc::new(Fixed(reply)), false)
            .process_page(&OnePage, "d", 0)
            .await
            .unwrap();
        assert_eq!(raw, reply);
        let clean = with_backend(Arc::new(Fixed(reply)), true)
            .process_page(&OnePage, "d", 0)
            .await
            .unwrap();
        assert_eq!(clean, "body");
    }
}
