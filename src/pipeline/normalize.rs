//! Image normalisation: fit any raster into the service's size envelope.
//!
//! Vision endpoints degrade on tiny inputs (glyphs below a few pixels are
//! unreadable) and reject or silently downsample huge ones. Every unit is
//! therefore converted to RGB and rescaled so that it lands inside
//! `[min, max]` before it is PNG-encoded for transport.
//!
//! The floor can push a strip-shaped input far past the ceiling on its long
//! axis. A target above `max_pixels` is refused with [`UnitError::Decode`]
//! before anything is allocated, so one pathological file fails alone instead
//! of exhausting memory for the whole batch.

use crate::error::UnitError;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::debug;

/// Pixel bounds the extraction service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionLimits {
    /// Floor for both dimensions. Default: 768.
    pub min: u32,
    /// Ceiling for both dimensions. Default: 3072.
    pub max: u32,
    /// Largest normalised area, in pixels, that will be allocated.
    /// Default: 64 000 000 (≈ 192 MB as RGB).
    pub max_pixels: u64,
}

impl Default for DimensionLimits {
    fn default() -> Self {
        Self {
            min: 768,
            max: 3072,
            max_pixels: 64_000_000,
        }
    }
}

impl DimensionLimits {
    /// Target size for a `width × height` input.
    ///
    /// Upscaling takes precedence: an input below the floor on either axis is
    /// scaled by the larger of the two factors and the ceiling is not
    /// consulted afterwards.
    pub fn target_size(&self, width: u32, height: u32) -> (u32, u32) {
        if width == 0 || height == 0 {
            return (width, height);
        }
        let (w, h) = (width as f64, height as f64);
        if width < self.min || height < self.min {
            let scale = (self.min as f64 / w).max(self.min as f64 / h);
            (
                scaled(w, scale).max(self.min),
                scaled(h, scale).max(self.min),
            )
        } else if width > self.max || height > self.max {
            let scale = (self.max as f64 / w).min(self.max as f64 / h);
            (
                scaled(w, scale).clamp(1, self.max),
                scaled(h, scale).clamp(1, self.max),
            )
        } else {
            (width, height)
        }
    }

    /// Whether a `width × height` target stays within `max_pixels`.
    pub fn within_budget(&self, width: u32, height: u32) -> bool {
        width as u64 * height as u64 <= self.max_pixels
    }
}

fn scaled(dim: f64, scale: f64) -> u32 {
    (dim * scale).round() as u32
}

/// Convert to RGB and rescale into `limits` with a Lanczos3 filter.
pub fn normalize(img: &DynamicImage, limits: &DimensionLimits) -> RgbImage {
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    let (tw, th) = limits.target_size(width, height);
    if (tw, th) == (width, height) {
        return rgb;
    }
    debug!("Normalising {}x{} → {}x{}", width, height, tw, th);
    image::imageops::resize(&rgb, tw, th, FilterType::Lanczos3)
}

/// Encode as PNG: lossless, so glyph edges survive transport intact.
pub fn encode_png(img: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Normalise and encode on the blocking pool; resizing a 3k page is CPU-bound.
pub async fn normalize_to_png(
    img: DynamicImage,
    limits: DimensionLimits,
    unit: &str,
) -> Result<Vec<u8>, UnitError> {
    let (tw, th) = limits.target_size(img.width(), img.height());
    if !limits.within_budget(tw, th) {
        return Err(UnitError::Decode {
            unit: unit.to_string(),
            detail: format!(
                "{}x{} would normalise to {}x{}, above the {} pixel budget",
                img.width(),
                img.height(),
                tw,
                th,
                limits.max_pixels
            ),
        });
    }

    let result = tokio::task::spawn_blocking(move || encode_png(&normalize(&img, &limits)))
        .await
        .map_err(|e| UnitError::Decode {
            unit: unit.to_string(),
            detail: format!("normalisation task panicked: {e}"),
        })?;

    result.map_err(|e| UnitError::Decode {
        unit: unit.to_string(),
        detail: format!("PNG encoding failed: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn limits() -> DimensionLimits {
        DimensionLimits::default()
    }

    fn aspect(w: u32, h: u32) -> f64 {
        w as f64 / h as f64
    }

    #[test]
    fn small_images_reach_the_floor() {
        for (w, h) in [(100, 200), (500, 1000), (767, 2000), (10, 10), (300, 7)] {
            let (tw, th) = limits().target_size(w, h);
            assert!(tw >= 768 && th >= 768, "{w}x{h} → {tw}x{th}");
            assert!(
                (aspect(tw, th) - aspect(w, h)).abs() / aspect(w, h) < 0.01,
                "{w}x{h} → {tw}x{th} lost aspect ratio"
            );
        }
    }

    #[test]
    fn large_images_respect_the_ceiling() {
        for (w, h) in [(4000, 3000), (3073, 800), (10000, 9999), (1000, 6000)] {
            let (tw, th) = limits().target_size(w, h);
            assert!(tw <= 3072 && th <= 3072, "{w}x{h} → {tw}x{th}");
            assert!(
                (aspect(tw, th) - aspect(w, h)).abs() / aspect(w, h) < 0.01,
                "{w}x{h} → {tw}x{th} lost aspect ratio"
            );
        }
    }

    #[test]
    fn in_range_images_pass_through() {
        for (w, h) in [(768, 768), (3072, 3072), (1200, 1700), (768, 3072)] {
            assert_eq!(limits().target_size(w, h), (w, h));
        }
    }

    #[test]
    fn upscale_branch_wins_for_extreme_aspect() {
        // Narrow strip: below the floor on one axis, so only the upscale branch runs.
        let (tw, th) = limits().target_size(100, 2000);
        assert_eq!(tw, 768);
        assert_eq!(th, 15360);
    }

    #[test]
    fn normalize_converts_to_rgb_and_resizes() {
        let img =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(64, 32, Rgba([10, 20, 30, 128])));
        let out = normalize(&img, &limits());
        assert_eq!(out.dimensions(), (1536, 768));
    }

    #[test]
    fn encoded_png_round_trips_dimensions() {
        let img =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(800, 900, Rgba([0, 0, 0, 255])));
        let png = encode_png(&normalize(&img, &limits())).unwrap();
        assert_eq!(&png[1..4], b"PNG");
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (800, 900));
    }

    #[tokio::test]
    async fn normalize_to_png_runs_off_thread() {
        let img =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(20, 40, Rgba([255, 255, 255, 255])));
        let png = normalize_to_png(img, limits(), "test.png").await.unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (768, 1536));
    }

    #[test]
    fn defaults_cover_the_ceiling_and_floor_strips() {
        let l = limits();
        assert!(l.within_budget(3072, 3072));
        let (tw, th) = l.target_size(300, 7);
        assert!(l.within_budget(tw, th), "{tw}x{th}");
    }

    #[tokio::test]
    async fn hairline_strip_is_refused_before_resizing() {
        // 1×20000 would upscale to 768×15 360 000.
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 20000, image::Rgb([0, 0, 0])));
        let err = normalize_to_png(img, limits(), "strip.png").await.unwrap_err();
        match err {
            UnitError::Decode { unit, detail } => {
                assert_eq!(unit, "strip.png");
                assert!(detail.contains("768x15360000"), "{detail}");
            }
            other => panic!("expected a decode error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn tighter_budget_refuses_ordinary_upscales() {
        let small = DimensionLimits {
            max_pixels: 768 * 768 - 1,
            ..limits()
        };
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, image::Rgb([9, 9, 9])));
        assert!(matches!(
            normalize_to_png(img, small, "tiny.png").await,
            Err(UnitError::Decode { .. })
        ));
    }
}
