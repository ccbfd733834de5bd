//! LLM Provider Abstraction
//!
//! Defines the LlmProvider trait for plain-text narrative generation.
//! All providers return `LlmResponse` with token usage metrics for logging.
//!
//! ## Modules
//!
//! - `gemini`: Google Gemini `generateContent` REST API
//! - `openai`: OpenAI-compatible Chat Completions API

mod gemini;
mod openai;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

pub use crate::types::{ErrorCategory, ErrorClassifier, LlmError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::config::LlmConfig;
use crate::constants::{generation, network};
use crate::types::{ReportError, Result};

// =============================================================================
// LLM Response with Usage Metrics
// =============================================================================

/// Narrative text returned by a provider, with usage metrics
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated narrative (Markdown)
    pub text: String,
    /// Token usage metrics
    pub usage: TokenUsage,
    /// Response timing
    pub timing: ResponseTiming,
    /// Provider and model info
    pub metadata: ResponseMetadata,
}

impl LlmResponse {
    /// Create response with text only (usage unknown)
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: TokenUsage::default(),
            timing: ResponseTiming::default(),
            metadata: ResponseMetadata::default(),
        }
    }

    pub fn with_metrics(
        text: String,
        usage: TokenUsage,
        timing: ResponseTiming,
        metadata: ResponseMetadata,
    ) -> Self {
        Self {
            text,
            usage,
            timing,
            metadata,
        }
    }
}

/// Token usage metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input tokens (prompt)
    pub input_tokens: u32,
    /// Output tokens (response)
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used (input + output)
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }
}

/// Response timing metrics
#[derive(Debug, Clone, Default)]
pub struct ResponseTiming {
    /// Total response time in milliseconds (wall clock)
    pub total_ms: u64,
}

impl ResponseTiming {
    pub fn from_duration(duration: Duration) -> Self {
        Self {
            total_ms: duration.as_millis() as u64,
        }
    }
}

/// Response metadata
#[derive(Debug, Clone, Default)]
pub struct ResponseMetadata {
    /// Model used
    pub model: String,
    /// Provider name
    pub provider: String,
}

/// Shared LLM provider type for concurrent access across pipeline runs.
pub type SharedProvider = Arc<dyn LlmProvider + Send + Sync>;

// =============================================================================
// Provider Configuration
// =============================================================================

/// Configuration for LLM providers
///
/// Note: API keys are never serialized to output and are redacted in debug
/// output. Each provider converts the key to SecretString internally.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider type: "gemini", "openai"
    pub provider: String,
    /// Model name (provider-specific)
    pub model: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Sampling temperature
    pub temperature: f32,
    /// API key, never serialized
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// API base URL (for custom endpoints)
    #[serde(default)]
    pub api_base: Option<String>,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn default_max_tokens() -> u32 {
    network::MAX_OUTPUT_TOKENS
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: None,
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            temperature: network::DEFAULT_TEMPERATURE,
            api_key: None,
            api_base: None,
            max_tokens: network::MAX_OUTPUT_TOKENS,
        }
    }
}

impl ProviderConfig {
    /// Build from the `[llm]` config section and a resolved credential
    pub fn from_llm(llm: &LlmConfig, api_key: Option<String>) -> Self {
        Self {
            provider: llm.provider.clone(),
            model: Some(llm.model.clone()),
            timeout_secs: llm.timeout_secs,
            temperature: llm.temperature,
            api_key,
            api_base: llm.api_base.clone(),
            max_tokens: network::MAX_OUTPUT_TOKENS,
        }
    }
}

// =============================================================================
// LLM Provider Trait
// =============================================================================

/// LLM Provider trait for narrative generation
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a narrative for the prompt
    ///
    /// Failures carry an [`LlmError`] category so the generation client can
    /// decide between retry, fallback and surfacing.
    async fn generate(&self, prompt: &str) -> Result<LlmResponse>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;
}

/// Create a shared provider from configuration
pub fn create_provider(config: &ProviderConfig) -> Result<SharedProvider> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiProvider::new(config.clone())?)),
        "openai" => Ok(Arc::new(OpenAiProvider::new(config.clone())?)),
        _ => Err(ReportError::Config(format!(
            "Unknown provider: {}. Supported: gemini, openai",
            config.provider
        ))),
    }
}

// =============================================================================
// Shared HTTP helpers
// =============================================================================

/// Validate a provider endpoint URL
///
/// Only allows http/https schemes and warns for plain http to a remote host.
pub(crate) fn validate_endpoint(endpoint: &str, provider: &str) -> Result<String> {
    let url = url::Url::parse(endpoint).map_err(|e| {
        ReportError::Config(format!(
            "Invalid {} endpoint URL '{}': {}",
            provider, endpoint, e
        ))
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ReportError::Config(format!(
            "{} endpoint must use http or https scheme, got: {}",
            provider,
            url.scheme()
        )));
    }

    if url.scheme() == "http"
        && let Some(host) = url.host_str()
        && !matches!(host, "localhost" | "127.0.0.1" | "::1")
    {
        warn!(
            "{} endpoint sends the API key over plain http to {}",
            provider, host
        );
    }

    let mut result = url.to_string();
    if result.ends_with('/') {
        result.pop();
    }
    Ok(result)
}

/// Map a transport failure onto a categorized error
pub(crate) fn transport_error(err: reqwest::Error, provider: &str) -> ReportError {
    let category = if err.is_timeout() || err.is_connect() || err.is_request() {
        ErrorCategory::Network
    } else if err.is_decode() {
        ErrorCategory::ParseError
    } else {
        ErrorClassifier::classify(&err.to_string(), provider).category
    };

    ReportError::Llm(LlmError::with_provider(
        category,
        format!("{} request failed: {}", provider, err),
        provider,
    ))
}

/// Map a non-success HTTP status onto a categorized error
pub(crate) fn status_error(
    status: u16,
    body: &str,
    retry_after: Option<Duration>,
    provider: &str,
) -> ReportError {
    let message = format!("{} API error ({}): {}", provider, status, truncate_body(body));
    let mut err = ErrorClassifier::classify_http_status(status, &message, provider);
    if let Some(delay) = retry_after {
        err = err.retry_after(delay);
    }
    ReportError::Llm(err)
}

/// Parse a `Retry-After` header given in seconds
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs.min(generation::MAX_RETRY_AFTER_SECS)))
}

fn truncate_body(body: &str) -> String {
    const MAX_BODY_CHARS: usize = 500;
    if body.chars().count() <= MAX_BODY_CHARS {
        body.to_string()
    } else {
        let head: String = body.chars().take(MAX_BODY_CHARS).collect();
        format!("{}…", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};

    #[test]
    fn test_provider_config_debug_redacts_key() {
        let config = ProviderConfig {
            api_key: Some("AIza-secret".to_string()),
            ..ProviderConfig::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("AIza-secret"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!serde_json::to_string(&config).unwrap().contains("AIza-secret"));
    }

    #[test]
    fn test_create_provider_unknown() {
        let config = ProviderConfig {
            provider: "claude-code".to_string(),
            ..ProviderConfig::default()
        };
        assert!(matches!(create_provider(&config), Err(ReportError::Config(_))));
    }

    #[test]
    fn test_create_provider_requires_key() {
        let config = ProviderConfig {
            api_key: Some("k".to_string()),
            ..ProviderConfig::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "gemini");
        assert_eq!(provider.model(), "gemini-2.5-flash");
    }

    #[test]
    fn test_validate_endpoint() {
        assert_eq!(
            validate_endpoint("https://example.com/v1/", "openai").unwrap(),
            "https://example.com/v1"
        );
        assert!(validate_endpoint("ftp://example.com", "openai").is_err());
        assert!(validate_endpoint("not a url", "openai").is_err());
    }

    #[test]
    fn test_status_error_carries_category_and_hint() {
        let err = status_error(429, "slow down", Some(Duration::from_secs(3)), "gemini");
        match err {
            ReportError::Llm(e) => {
                assert_eq!(e.category, ErrorCategory::RateLimit);
                assert_eq!(e.retry_after, Some(Duration::from_secs(3)));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let err = status_error(403, "denied", None, "gemini");
        assert!(matches!(err, ReportError::Llm(ref e) if e.category == ErrorCategory::Auth));
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(12)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("99999"));
        assert_eq!(
            parse_retry_after(&headers),
            Some(Duration::from_secs(generation::MAX_RETRY_AFTER_SECS))
        );
    }
}
