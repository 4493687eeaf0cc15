//! Configuration types for page-by-page translation.
//!
//! All pipeline behaviour is controlled through [`TranslationConfig`], built
//! via its [`TranslationConfigBuilder`]. Keeping every knob in one struct
//! makes it easy to share a config between the PDF and live-reader entry
//! points and to log exactly what a run was started with.

use crate::error::TranslateError;
use crate::pipeline::retry::RetryPolicy;
use crate::progress::ProgressCallback;
use crate::prompts::{DEFAULT_OCR_PROMPT, DEFAULT_TRANSLATION_PROMPT};
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a translation run.
///
/// Built via [`TranslationConfig::builder()`] or using
/// [`TranslationConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_book_translate::TranslationConfig;
///
/// let config = TranslationConfig::builder()
///     .model("gpt-4.1-mini")
///     .max_attempts(3)
///     .checkpoint_path("book_progress.json")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct TranslationConfig {
    /// LLM model identifier, e.g. "gpt-4.1-mini", "gemini-2.5-flash".
    /// If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "gemini", "ollama").
    /// If None along with `provider`, the provider is auto-detected.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.3.
    ///
    /// Translation needs some freedom to produce idiomatic sentences but
    /// should stay close to the source; 0.3 keeps outputs stable across
    /// re-runs of the same page.
    pub temperature: f32,

    /// Maximum tokens the model may generate per page. Default: 8192.
    ///
    /// Translated text can be noticeably longer than the source (Italian or
    /// German into English rarely shrinks), and a truncated page silently
    /// loses its last paragraph.
    pub max_tokens: usize,

    /// Total attempts per model call on quota errors. Default: 3.
    ///
    /// Only quota/rate-limit failures are retried. Invalid input and other
    /// errors are recorded on the first attempt.
    pub max_attempts: u32,

    /// First backoff delay in milliseconds. Default: 4000.
    ///
    /// Doubles after each failed attempt: 4 s → 8 s → 16 s …
    pub retry_base_delay_ms: u64,

    /// Upper bound for a single backoff delay in milliseconds. Default: 60000.
    pub retry_max_delay_ms: u64,

    /// Per model call timeout in seconds. Default: 120.
    ///
    /// A call that exceeds it is recorded as `failed_after_retries`.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Translation instruction placed at the top of every prompt.
    /// If None, uses [`DEFAULT_TRANSLATION_PROMPT`].
    pub prompt_template: Option<String>,

    /// Instruction sent with each captured page image.
    /// If None, uses [`DEFAULT_OCR_PROMPT`].
    pub ocr_prompt: Option<String>,

    /// Stop once this absolute page number has been processed. Default: None.
    pub max_pages: Option<usize>,

    /// Where to persist the resume checkpoint. Default: None (no checkpoint).
    ///
    /// When set, the checkpoint is read once at startup and rewritten after
    /// every page, so an interrupted run continues where it left off.
    pub checkpoint_path: Option<PathBuf>,

    /// Seed translation history from the result log when resuming. Default: false.
    ///
    /// Without it a resumed run translates its first page with no context,
    /// exactly like a fresh run would.
    pub resume_history: bool,

    /// Live readers stop after this many blank pages in a row. Default: 5.
    pub max_consecutive_empty: usize,

    /// Pause after a page whose last error was a quota error. Default: 0.
    pub quota_cooldown_secs: u64,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.3,
            max_tokens: 8192,
            max_attempts: 3,
            retry_base_delay_ms: 4_000,
            retry_max_delay_ms: 60_000,
            api_timeout_secs: 120,
            download_timeout_secs: 120,
            password: None,
            prompt_template: None,
            ocr_prompt: None,
            max_pages: None,
            checkpoint_path: None,
            resume_history: false,
            max_consecutive_empty: 5,
            quota_cooldown_secs: 0,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for TranslationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_attempts", &self.max_attempts)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .field("retry_max_delay_ms", &self.retry_max_delay_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_pages", &self.max_pages)
            .field("checkpoint_path", &self.checkpoint_path)
            .field("resume_history", &self.resume_history)
            .field("max_consecutive_empty", &self.max_consecutive_empty)
            .field("quota_cooldown_secs", &self.quota_cooldown_secs)
            .finish()
    }
}

impl TranslationConfig {
    /// Create a new builder for `TranslationConfig`.
    pub fn builder() -> TranslationConfigBuilder {
        TranslationConfigBuilder {
            config: Self::default(),
        }
    }

    /// The translation template in effect.
    pub fn template(&self) -> &str {
        self.prompt_template
            .as_deref()
            .unwrap_or(DEFAULT_TRANSLATION_PROMPT)
    }

    /// The OCR instruction in effect.
    pub fn ocr_instruction(&self) -> &str {
        self.ocr_prompt.as_deref().unwrap_or(DEFAULT_OCR_PROMPT)
    }

    /// Retry policy derived from the attempt and delay settings.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.retry_base_delay_ms),
            Duration::from_millis(self.retry_max_delay_ms),
        )
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn quota_cooldown(&self) -> Duration {
        Duration::from_secs(self.quota_cooldown_secs)
    }
}

/// Builder for [`TranslationConfig`].
#[derive(Debug)]
pub struct TranslationConfigBuilder {
    config: TranslationConfig,
}

impl TranslationConfigBuilder {
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

    pub fn retry_base_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry_base_delay_ms = ms;
        self
    }

    pub fn retry_max_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry_max_delay_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn prompt_template(mut self, template: impl Into<String>) -> Self {
        self.config.prompt_template = Some(template.into());
        self
    }

    pub fn ocr_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.ocr_prompt = Some(prompt.into());
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = Some(n);
        self
    }

    pub fn checkpoint_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.checkpoint_path = Some(path.into());
        self
    }

    pub fn resume_history(mut self, v: bool) -> Self {
        self.config.resume_history = v;
        self
    }

    pub fn max_consecutive_empty(mut self, n: usize) -> Self {
        self.config.max_consecutive_empty = n;
        self
    }

    pub fn quota_cooldown_secs(mut self, secs: u64) -> Self {
        self.config.quota_cooldown_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<TranslationConfig, TranslateError> {
        let c = &self.config;
        if c.max_attempts == 0 {
            return Err(TranslateError::InvalidConfig(
                "max_attempts must be ≥ 1".into(),
            ));
        }
        if c.retry_base_delay_ms > c.retry_max_delay_ms {
            return Err(TranslateError::InvalidConfig(format!(
                "retry base delay ({}ms) exceeds max delay ({}ms)",
                c.retry_base_delay_ms, c.retry_max_delay_ms
            )));
        }
        if c.max_consecutive_empty == 0 {
            return Err(TranslateError::InvalidConfig(
                "max_consecutive_empty must be ≥ 1".into(),
            ));
        }
        if c.max_pages == Some(0) {
            return Err(TranslateError::InvalidConfig(
                "max_pages must be ≥ 1 when set".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(TranslateError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if c.prompt_template.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(TranslateError::InvalidConfig(
                "translation prompt template is empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How to separate pages in an exported document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSeparator {
    /// No separator; pages joined with "\n\n".
    None,
    /// Horizontal rule: "\n\n---\n\n" (default)
    #[default]
    HorizontalRule,
    /// HTML comment with page number: "<!-- page N -->"
    Comment,
    /// Custom string inserted between pages.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator string for the given page number (1-indexed).
    pub fn render(&self, page_num: usize) -> String {
        match self {
            PageSeparator::None => "\n\n".to_string(),
            PageSeparator::HorizontalRule => "\n\n---\n\n".to_string(),
            PageSeparator::Comment => format!("\n\n<!-- page {} -->\n\n", page_num),
            PageSeparator::Custom(s) => format!("\n\n{}\n\n", s),
        }
    }
}
