//! Configuration for a batch OCR run.
//!
//! Every knob lives in [`BatchConfig`], built via [`BatchConfigBuilder`].
//! Nothing is read from module-level state: the provider, the model and all
//! pacing intervals travel with the config value, which is what lets tests
//! swap in a fake backend and zero-length delays.

use crate::error::OcrBatchError;
use crate::pipeline::normalize::DimensionLimits;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a batch run over one working directory.
///
/// # Example
/// ```rust
/// use edgequake_ocrbatch::BatchConfig;
/// use std::time::Duration;
///
/// let config = BatchConfig::builder()
///     .working_dir("scans")
///     .model("gemini-2.0-flash")
///     .page_delay(Duration::from_secs(1))
///     .build()
///     .unwrap();
/// assert_eq!(config.max_attempts, 3);
/// ```
#[derive(Clone)]
pub struct BatchConfig {
    /// Directory scanned (non-recursively) for PDFs and images. Default: `.`.
    pub working_dir: PathBuf,

    /// Root for all artifacts. Default: `None`, meaning the working directory.
    pub output_dir: Option<PathBuf>,

    /// LLM model identifier. If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens generated per unit. Default: 4096.
    pub max_tokens: usize,

    /// Attempts per unit against the extraction service. Default: 3.
    pub max_attempts: u32,

    /// Fixed delay between two attempts of the same unit. Default: 5 s.
    pub retry_delay: Duration,

    /// Delay after each page that reached the extraction service. Default: 2 s.
    pub page_delay: Duration,

    /// Delay between two consecutive documents / images. Default: 2 s.
    pub item_delay: Duration,

    /// Per-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Scale applied to a page's native size when rasterising. Default: 2.0.
    pub render_scale: f32,

    /// Size envelope accepted by the extraction service. Default: 768–3072 px.
    pub limits: DimensionLimits,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Custom extraction directive. If None, uses [`crate::prompts::EXTRACTION_PROMPT`].
    pub prompt: Option<String>,

    /// Keep only the content between the `'''` sentinel lines. Default: false.
    pub strip_sentinels: bool,

    /// Receiver for per-item / per-page events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            output_dir: None,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            max_attempts: 3,
            retry_delay: Duration::from_secs(5),
            page_delay: Duration::from_secs(2),
            item_delay: Duration::from_secs(2),
            api_timeout_secs: 120,
            render_scale: 2.0,
            limits: DimensionLimits::default(),
            password: None,
            prompt: None,
            strip_sentinels: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("working_dir", &self.working_dir)
            .field("output_dir", &self.output_dir)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("max_attempts", &self.max_attempts)
            .field("retry_delay", &self.retry_delay)
            .field("page_delay", &self.page_delay)
            .field("item_delay", &self.item_delay)
            .field("render_scale", &self.render_scale)
            .field("limits", &self.limits)
            .field("strip_sentinels", &self.strip_sentinels)
            .finish()
    }
}

impl BatchConfig {
    /// Create a new builder for `BatchConfig`.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self::default(),
        }
    }

    /// Root directory under which every artifact is written.
    pub fn output_root(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.working_dir.clone())
    }
}

/// Builder for [`BatchConfig`].
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl fmt::Debug for BatchConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl BatchConfigBuilder {
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.working_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn retry_delay(mut self, d: Duration) -> Self {
        self.config.retry_delay = d;
        self
    }

    pub fn page_delay(mut self, d: Duration) -> Self {
        self.config.page_delay = d;
        self
    }

    pub fn item_delay(mut self, d: Duration) -> Self {
        self.config.item_delay = d;
        self
    }

    /// Zero every pacing interval. Intended for tests and offline backends.
    pub fn without_delays(self) -> Self {
        self.retry_delay(Duration::ZERO)
            .page_delay(Duration::ZERO)
            .item_delay(Duration::ZERO)
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale;
        self
    }

    pub fn limits(mut self, limits: DimensionLimits) -> Self {
        self.config.limits = limits;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn strip_sentinels(mut self, v: bool) -> Self {
        self.config.strip_sentinels = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, OcrBatchError> {
        let c = &self.config;
        if c.max_attempts == 0 {
            return Err(OcrBatchError::InvalidConfig(
                "max_attempts must be ≥ 1".into(),
            ));
        }
        if c.limits.min == 0 || c.limits.min > c.limits.max {
            return Err(OcrBatchError::InvalidConfig(format!(
                "dimension limits must satisfy 1 ≤ min ≤ max, got {}–{}",
                c.limits.min, c.limits.max
            )));
        }
        if c.limits.max_pixels < c.limits.max as u64 * c.limits.max as u64 {
            return Err(OcrBatchError::InvalidConfig(format!(
                "pixel budget {} is smaller than a {}x{} page",
                c.limits.max_pixels, c.limits.max, c.limits.max
            )));
        }
        if !(c.render_scale.is_finite() && c.render_scale > 0.0) {
            return Err(OcrBatchError::InvalidConfig(format!(
                "render scale must be positive, got {}",
                c.render_scale
            )));
        }
        if c.api_timeout_secs == 0 {
            return Err(OcrBatchError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_constraints() {
        let c = BatchConfig::default();
        assert_eq!(c.max_attempts, 3);
        assert_eq!(c.retry_delay, Duration::from_secs(5));
        assert_eq!(c.page_delay, Duration::from_secs(2));
        assert_eq!(c.item_delay, Duration::from_secs(2));
        assert_eq!(c.render_scale, 2.0);
        assert_eq!(c.limits.min, 768);
        assert_eq!(c.limits.max, 3072);
        assert!(!c.strip_sentinels);
    }

    #[test]
    fn output_root_defaults_to_working_dir() {
        let c = BatchConfig::builder().working_dir("/data/scans").build().unwrap();
        assert_eq!(c.output_root(), PathBuf::from("/data/scans"));

        let c = BatchConfig::builder()
            .working_dir("/data/scans")
            .output_dir("/data/out")
            .build()
            .unwrap();
        assert_eq!(c.output_root(), PathBuf::from("/data/out"));
    }

    #[test]
    fn without_delays_zeroes_all_pacing() {
        let c = BatchConfig::builder().without_delays().build().unwrap();
        assert_eq!(c.retry_delay, Duration::ZERO);
        assert_eq!(c.page_delay, Duration::ZERO);
        assert_eq!(c.item_delay, Duration::ZERO);
    }

    #[test]
    fn rejects_zero_attempts() {
        let err = BatchConfig::builder().max_attempts(0).build().unwrap_err();
        assert!(matches!(err, OcrBatchError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_inverted_limits() {
        let err = BatchConfig::builder()
            .limits(DimensionLimits {
                min: 4000,
                max: 3072,
                ..Default::default()
            })
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("4000"));
    }

    #[test]
    fn rejects_pixel_budget_below_a_full_page() {
        let err = BatchConfig::builder()
            .limits(DimensionLimits {
                max_pixels: 1_000_000,
                ..Default::default()
            })
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("pixel budget"));
    }

    #[test]
    fn rejects_non_positive_scale() {
        assert!(BatchConfig::builder().render_scale(0.0).build().is_err());
        assert!(BatchConfig::builder().render_scale(f32::NAN).build().is_err());
    }

    #[test]
    fn temperature_is_clamped() {
        let c = BatchConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }
}
