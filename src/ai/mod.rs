//! AI Integration Layer
//!
//! Prompt construction, provider calls with retry and fallback, and fact
//! validation of the returned narrative.

pub mod client;
pub mod fallback;
pub mod prompt;
pub mod provider;
pub mod timeout;
pub mod validation;

pub use client::{
    AttemptRecord, CancellationFlag, GenerationClient, GenerationStats, RetryPolicy,
};
pub use fallback::FallbackNarrator;
pub use prompt::{PromptBuilder, PromptTemplates};
pub use provider::{
    ErrorCategory, ErrorClassifier, GeminiProvider, LlmError, LlmProvider, LlmResponse,
    OpenAiProvider, ProviderConfig, ResponseMetadata, ResponseTiming, SharedProvider, TokenUsage,
    create_provider,
};
pub use timeout::with_timeout;
pub use validation::{FactValidator, ValidatorConfig};
