//! Image encoding: normalised PNG bytes → base64 `ImageData`.
//!
//! VLM APIs (Gemini, OpenAI, Anthropic) accept images as base64 data-URIs
//! embedded in the JSON request body. The bytes are already PNG, produced by
//! [`crate::pipeline::normalize`], so this stage only wraps them.
//! `detail: "high"` asks GPT-4-class models for the full tile budget; without
//! it fine print such as page numbers in a corner is lost.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use tracing::debug;

/// Wrap PNG bytes as a base64 image attachment for the VLM request.
pub fn png_image_data(png: &[u8]) -> ImageData {
    let b64 = STANDARD.encode(png);
    debug!("Encoded image → {} bytes base64", b64.len());
    ImageData::new(b64, "image/png").with_detail("high")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::normalize::encode_png;
    use image::{Rgb, RgbImage};

    #[test]
    fn wraps_png_as_base64() {
        let png = encode_png(&RgbImage::from_pixel(10, 10, Rgb([255, 0, 0]))).unwrap();
        let data = png_image_data(&png);
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(decoded, png);
    }
}
