//! Model interaction: the [`ModelClient`] seam and its edgequake-llm adapter.
//!
//! The driver only needs two stateless calls, "translate this prompt" and
//! "read the text in this image". Putting them behind a small trait keeps
//! the page loop testable with scripted fakes, while [`ProviderClient`]
//! forwards to any `edgequake_llm::LLMProvider` in production.
//!
//! Retries are *not* handled here; see [`crate::pipeline::retry`].

use crate::config::TranslationConfig;
use crate::error::ModelError;
use crate::pipeline::encode;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, LlmError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// A stateless text-generation backend.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send a fully composed prompt and return the model's reply.
    async fn generate(&self, prompt: &str) -> Result<String, ModelError>;

    /// Return the text visible in `image`, following `instruction`.
    async fn extract_text(&self, image: &Path, instruction: &str) -> Result<String, ModelError>;
}

#[async_trait]
impl<T: ModelClient + ?Sized> ModelClient for Arc<T> {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        (**self).generate(prompt).await
    }

    async fn extract_text(&self, image: &Path, instruction: &str) -> Result<String, ModelError> {
        (**self).extract_text(image, instruction).await
    }
}

/// [`ModelClient`] backed by an edgequake-llm provider.
pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    timeout: Duration,
}

impl ProviderClient {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &TranslationConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
            timeout: config.api_timeout(),
        }
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, ModelError> {
        let start = Instant::now();
        let call = self.provider.chat(&messages, Some(&self.options));
        let response = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(classify_llm_error(&e)),
            Err(_) => {
                return Err(ModelError::DeadlineExceeded(format!(
                    "no response within {}s",
                    self.timeout.as_secs()
                )))
            }
        };

        debug!(
            "{} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        Ok(response.content)
    }
}

#[async_trait]
impl ModelClient for ProviderClient {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        self.chat(vec![ChatMessage::user(prompt)]).await
    }

    async fn extract_text(&self, image: &Path, instruction: &str) -> Result<String, ModelError> {
        let data = encode::encode_image_file(image).await?;
        self.chat(vec![ChatMessage::user_with_images(instruction, vec![data])])
            .await
    }
}

/// Build `CompletionOptions` from the translation config.
fn build_options(config: &TranslationConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Map an edgequake-llm error onto the [`ModelError`] taxonomy.
///
/// The typed variant decides. Only the catch-all `ApiError` and
/// `ProviderError` fall back to reading the message.
pub fn classify_llm_error(err: &LlmError) -> ModelError {
    let message = err.to_string();
    match err {
        LlmError::RateLimited(_) => ModelError::TransientQuota(message),
        LlmError::Timeout => ModelError::DeadlineExceeded(message),
        LlmError::InvalidRequest(_) | LlmError::TokenLimitExceeded { .. } => {
            ModelError::InvalidInput(message)
        }
        LlmError::ApiError(_) | LlmError::ProviderError(_) => classify_provider_error(&message),
        _ => ModelError::Generic(message),
    }
}

static RE_QUOTA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b429\b|rate[ _-]?limit|quota|resource[ _]exhausted|too many requests",
    )
    .unwrap()
});

static RE_DEADLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b504\b|deadline[ _]exceeded|gateway timeout").unwrap());

static RE_INVALID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b400\b|invalid[ _]argument|invalid request|bad request").unwrap()
});

/// Classify an untyped provider message by its status code or status name.
///
/// Status codes must stand alone, so ids and counts that merely contain
/// `429` or `400` stay generic. Quota wins over everything else: a 429
/// body often also says "invalid".
pub fn classify_provider_error(message: &str) -> ModelError {
    if RE_QUOTA.is_match(message) {
        ModelError::TransientQuota(message.to_string())
    } else if RE_DEADLINE.is_match(message) {
        ModelError::DeadlineExceeded(message.to_string())
    } else if RE_INVALID.is_match(message) {
        ModelError::InvalidInput(message.to_string())
    } else {
        ModelError::Generic(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_follow_config() {
        let config = TranslationConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.3));
        assert_eq!(opts.max_tokens, Some(8192));
    }

    #[test]
    fn quota_messages_are_transient() {
        for msg in [
            "HTTP 429 Too Many Requests",
            "Rate limit exceeded for model",
            "429 RESOURCE_EXHAUSTED: Quota exceeded",
        ] {
            assert!(
                matches!(classify_provider_error(msg), ModelError::TransientQuota(_)),
                "{msg}"
            );
        }
    }

    #[test]
    fn other_messages_classify_by_kind() {
        assert!(matches!(
            classify_provider_error("504 DEADLINE_EXCEEDED"),
            ModelError::DeadlineExceeded(_)
        ));
        assert!(matches!(
            classify_provider_error("400 INVALID_ARGUMENT: request contains an invalid argument"),
            ModelError::InvalidInput(_)
        ));
        assert!(matches!(
            classify_provider_error("connection reset by peer"),
            ModelError::Generic(_)
        ));
    }

    #[test]
    fn typed_errors_classify_by_variant() {
        let cases = [
            (LlmError::RateLimited("slow down".into()), "quota"),
            (LlmError::Timeout, "deadline"),
            (LlmError::InvalidRequest("bad image".into()), "invalid"),
            (LlmError::TokenLimitExceeded { max: 4290, got: 5000 }, "invalid"),
            (LlmError::NetworkError("Connection failed: dns timeout".into()), "generic"),
            (LlmError::AuthError("HTTP 429 in body".into()), "generic"),
            (LlmError::ApiError("upstream 500, trace id 74291c".into()), "generic"),
            (LlmError::ApiError("429 RESOURCE_EXHAUSTED".into()), "quota"),
            (LlmError::ProviderError("400 INVALID_ARGUMENT".into()), "invalid"),
        ];
        for (err, expected) in cases {
            let kind = match classify_llm_error(&err) {
                ModelError::TransientQuota(_) => "quota",
                ModelError::DeadlineExceeded(_) => "deadline",
                ModelError::InvalidInput(_) => "invalid",
                ModelError::Generic(_) => "generic",
            };
            assert_eq!(kind, expected, "{err}");
        }
    }

    #[test]
    fn embedded_digits_are_not_status_codes() {
        assert!(matches!(
            classify_provider_error("request 14290 failed, id 4001"),
            ModelError::Generic(_)
        ));
    }

    #[test]
    fn classification_keeps_original_message() {
        let e = classify_provider_error("Rate limit reached");
        assert_eq!(e, ModelError::TransientQuota("Rate limit reached".into()));
    }
}
