//! Top-level entry point: discover, resolve the provider, bind pdfium, run.
//!
//! The order matters. Discovery comes first so that an empty folder is a
//! no-op even on a machine with no API key and no pdfium. pdfium is bound
//! only when the working set holds at least one PDF.

use crate::batch::{discover, BatchDriver};
use crate::config::BatchConfig;
use crate::error::OcrBatchError;
use crate::output::BatchReport;
use crate::pipeline::llm::LlmBackend;
use crate::pipeline::render::PdfiumOpener;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::sync::Arc;
use tracing::info;

/// Model used when a provider is named without one.
pub fn default_model(provider: &str) -> &'static str {
    match provider {
        "gemini" | "vertex" | "vertexai" => "gemini-1.5-pro-latest",
        "anthropic" => "claude-sonnet-4-20250514",
        _ => "gpt-4.1-nano",
    }
}

/// OCR every PDF and image in `config.working_dir`.
///
/// Returns `Err` only for fatal conditions (unreadable directory, provider
/// or pdfium unavailable, invalid config). Per-item failures are counted in
/// the returned [`BatchReport`].
///
/// # Example
///
/// ```rust,no_run
/// use edgequake_ocrbatch::{run, BatchConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = BatchConfig::builder().working_dir("scans").build()?;
///     let report = run(&config).await?;
///     eprintln!("{} documents completed", report.documents_completed);
///     Ok(())
/// }
/// ```
pub async fn run(config: &BatchConfig) -> Result<BatchReport, OcrBatchError> {
    let set = discover(&config.working_dir)?;
    if set.is_empty() {
        info!(
            "No PDF or image files found in {}; nothing to do",
            config.working_dir.display()
        );
        return Ok(BatchReport {
            nothing_found: true,
            ..Default::default()
        });
    }

    let provider = resolve_provider(config)?;
    info!(
        "Provider resolved ({} / {})",
        config.provider_name.as_deref().unwrap_or("auto"),
        config.model.as_deref().unwrap_or("default model")
    );

    let opener = PdfiumOpener::new(config.render_scale, config.password.clone());
    if !set.documents.is_empty() {
        opener.ensure_bound()?;
    }

    let backend = Arc::new(LlmBackend::new(provider, config));
    let driver = BatchDriver::from_parts(config, backend, Box::new(opener));
    Ok(driver.run_set(&set).await)
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, OcrBatchError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        OcrBatchError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model` or the
///    provider's default model.
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, both set.
/// 4. **Auto-detection** through [`ProviderFactory::from_env`].
pub fn resolve_provider(config: &BatchConfig) -> Result<Arc<dyn LLMProvider>, OcrBatchError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or_else(|| default_model(name));
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| OcrBatchError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY or ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
