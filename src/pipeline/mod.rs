//! Per-unit stages of the OCR pipeline.
//!
//! Each submodule implements exactly one step, so each is testable on its
//! own and the external collaborators (pdfium, the VLM) stay behind traits.
//!
//! ## Data Flow
//!
//! ```text
//! render ──▶ normalize ──▶ encode ──▶ llm ──▶ postprocess
//! (pdfium)   (768–3072px)  (base64)   (VLM)   (sentinels, opt-in)
//! ```
//!
//! 1. [`render`]    — open a PDF and rasterise one page on demand, under
//!    `block_in_place` so the async workers keep running
//! 2. [`normalize`] — RGB conversion and resize into the service envelope,
//!    refusing targets above the pixel budget; runs in `spawn_blocking`
//! 3. [`encode`]    — base64-wrap the PNG for the multimodal request body
//! 4. [`llm`]       — one call with fixed-delay retry; the only stage with
//!    network I/O
//! 5. [`postprocess`] — optional isolation of the `'''`-fenced content
//!
//! [`pace`] provides the fixed-interval delays used by [`llm`] and by the
//! document and batch loops.

pub mod encode;
pub mod llm;
pub mod normalize;
pub mod pace;
pub mod postprocess;
pub mod render;
