//! VLM interaction: send one normalised image, get its text back.
//!
//! The [`VisionBackend`] trait is the seam to the external service: a single
//! "image in, text or failure out" call. [`LlmBackend`] implements it on top
//! of any `edgequake-llm` provider; tests substitute scripted fakes.
//!
//! [`ExtractionClient`] owns the retry policy. The service is rate limited
//! and flaky, so every kind of failure is retried after a fixed delay (no
//! exponential growth: the pipeline is sequential and the delay doubles as
//! pacing). The final attempt reports immediately without waiting.

use crate::config::BatchConfig;
use crate::error::{ServiceError, UnitError};
use crate::pipeline::encode::png_image_data;
use crate::pipeline::pace::Pacer;
use crate::prompts::EXTRACTION_PROMPT;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// One call to the external extraction service.
#[async_trait]
pub trait VisionBackend: Send + Sync {
    /// Transcribe a PNG image.
    ///
    /// `Ok(None)` means the service answered without a text payload; the
    /// client treats it like any other failed attempt.
    async fn transcribe(&self, png: &[u8]) -> Result<Option<String>, ServiceError>;
}

/// [`VisionBackend`] backed by an `edgequake-llm` provider.
pub struct LlmBackend {
    provider: Arc<dyn LLMProvider>,
    prompt: String,
    options: CompletionOptions,
}

impl LlmBackend {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &BatchConfig) -> Self {
        Self {
            provider,
            prompt: config
                .prompt
                .clone()
                .unwrap_or_else(|| EXTRACTION_PROMPT.to_string()),
            options: build_options(config),
        }
    }
}

#[async_trait]
impl VisionBackend for LlmBackend {
    async fn transcribe(&self, png: &[u8]) -> Result<Option<String>, ServiceError> {
        // One user turn: the directive text plus the page image.
        let messages = vec![ChatMessage::user_with_images(
            self.prompt.as_str(),
            vec![png_image_data(png)],
        )];

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| classify(e.to_string()))?;

        debug!(
            "{} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );

        if response.content.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(response.content))
        }
    }
}

/// Providers report rate limiting through their error text (HTTP 429).
fn classify(message: String) -> ServiceError {
    let lower = message.to_lowercase();
    if lower.contains("429")
        || lower.contains("rate limit")
        || lower.contains("resource exhausted")
    {
        ServiceError::RateLimited(message)
    } else {
        ServiceError::Api(message)
    }
}

/// Build `CompletionOptions` from the batch config.
fn build_options(config: &BatchConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Calls a [`VisionBackend`] with bounded, fixed-delay retry.
///
/// Cheap to clone: the backend, the retry pacer and the call counter are shared.
#[derive(Clone)]
pub struct ExtractionClient {
    backend: Arc<dyn VisionBackend>,
    max_attempts: u32,
    timeout: Duration,
    retry_pacer: Arc<Pacer>,
    calls: Arc<AtomicUsize>,
}

impl ExtractionClient {
    pub fn new(
        backend: Arc<dyn VisionBackend>,
        max_attempts: u32,
        retry_delay: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            max_attempts: max_attempts.max(1),
            timeout,
            retry_pacer: Arc::new(Pacer::new("retry", retry_delay)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn from_config(backend: Arc<dyn VisionBackend>, config: &BatchConfig) -> Self {
        Self::new(
            backend,
            config.max_attempts,
            config.retry_delay,
            Duration::from_secs(config.api_timeout_secs),
        )
    }

    /// Total backend calls made through this client (and its clones).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of retry delays taken so far.
    pub fn retry_pauses(&self) -> usize {
        self.retry_pacer.pauses()
    }

    /// Extract the text of one normalised image.
    ///
    /// Returns the raw text of the first attempt that carries a payload. The
    /// content itself is not inspected.
    pub async fn extract(&self, unit: &str, png: &[u8]) -> Result<String, UnitError> {
        let mut last_err: Option<ServiceError> = None;

        for attempt in 1..=self.max_attempts {
            let start = Instant::now();
            self.calls.fetch_add(1, Ordering::SeqCst);

            let call = tokio::time::timeout(self.timeout, self.backend.transcribe(png));
            let outcome = match call.await {
                Ok(Ok(Some(text))) => Ok(text),
                Ok(Ok(None)) => Err(ServiceError::EmptyResponse),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(ServiceError::Timeout {
                    secs: self.timeout.as_secs(),
                }),
            };

            match outcome {
                Ok(text) => {
                    debug!(
                        "{}: {} chars on attempt {} in {:?}",
                        unit,
                        text.len(),
                        attempt,
                        start.elapsed()
                    );
                    return Ok(text);
                }
                Err(e) if attempt < self.max_attempts => {
                    warn!(
                        "{}: attempt {} failed, retrying in {:?}: {}",
                        unit,
                        attempt,
                        self.retry_pacer.interval(),
                        e
                    );
                    self.retry_pacer.pause().await;
                    last_err = Some(e);
                }
                Err(e) => {
                    warn!("{}: final attempt failed: {}", unit, e);
                    last_err = Some(e);
                }
            }
        }

        Err(UnitError::Extraction {
            unit: unit.to_string(),
            attempts: self.max_attempts,
            source: last_err.unwrap_or(ServiceError::EmptyResponse),
        })
    }
}
