//! Google Gemini Provider
//!
//! LLM provider using the Gemini `generateContent` REST API.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::{
    LlmProvider, LlmResponse, ProviderConfig, ResponseMetadata, ResponseTiming, TokenUsage,
    parse_retry_after, status_error, transport_error, validate_endpoint,
};
use crate::constants::network;
use crate::types::{ErrorCategory, LlmError, ReportError, Result};

const PROVIDER: &str = "gemini";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Gemini provider with secure API key handling
pub struct GeminiProvider {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key = config.api_key.ok_or_else(|| {
            ReportError::Config(
                "Gemini API key not found. Set GEMINI_API_KEY env var or provide in config"
                    .to_string(),
            )
        })?;

        let api_base = validate_endpoint(
            config
                .api_base
                .as_deref()
                .unwrap_or(network::GEMINI_API_BASE),
            PROVIDER,
        )?;

        let model = config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ReportError::LlmApi(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            api_base,
            model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    fn build_request(&self, prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        }
    }

    /// Extract narrative text and usage from a decoded response body
    fn parse_response(body: GenerateContentResponse) -> Result<(String, TokenUsage)> {
        let usage = body
            .usage_metadata
            .map(|u| TokenUsage::new(u.prompt_token_count, u.candidates_token_count))
            .unwrap_or_default();

        if body.candidates.is_empty()
            && let Some(reason) = body.prompt_feedback.and_then(|f| f.block_reason)
        {
            return Err(ReportError::Llm(LlmError::with_provider(
                ErrorCategory::BadRequest,
                format!("prompt blocked: {}", reason),
                PROVIDER,
            )));
        }

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok((text, usage))
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn generate(&self, prompt: &str) -> Result<LlmResponse> {
        info!(
            "Generating with Gemini (model: {}, temperature: {})",
            self.model, self.temperature
        );

        let start_time = Instant::now();
        let request = self.build_request(prompt);

        debug!("Sending request to Gemini API");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(e, PROVIDER))?;

        let elapsed = start_time.elapsed();

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let retry_after = parse_retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body, retry_after, PROVIDER));
        }

        let body: GenerateContentResponse =
            response.json().await.map_err(|e| transport_error(e, PROVIDER))?;

        let (text, usage) = Self::parse_response(body)?;
        debug!(
            "Received {} chars from Gemini ({} tokens)",
            text.len(),
            usage.total()
        );

        Ok(LlmResponse::with_metrics(
            text,
            usage,
            ResponseTiming::from_duration(elapsed),
            ResponseMetadata {
                model: self.model.clone(),
                provider: PROVIDER.to_string(),
            },
        ))
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> GeminiProvider {
        GeminiProvider::new(ProviderConfig {
            api_key: Some("test-key".to_string()),
            ..ProviderConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let result = GeminiProvider::new(ProviderConfig::default());
        assert!(matches!(result, Err(ReportError::Config(_))));
    }

    #[test]
    fn test_endpoint_and_request_shape() {
        let provider = provider();
        assert_eq!(
            provider.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );

        let json = serde_json::to_value(provider.build_request("Tulis laporan")).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Tulis laporan");
        assert_eq!(json["contents"][0]["role"], "user");
        assert!(json["generationConfig"]["maxOutputTokens"].is_number());
        assert!(json["generationConfig"]["temperature"].is_number());
    }

    #[test]
    fn test_debug_redacts_key() {
        assert!(!format!("{:?}", provider()).contains("test-key"));
    }

    #[test]
    fn test_parse_response_joins_parts() {
        let body: GenerateContentResponse = serde_json::from_str(
            r#"{
                "candidates": [{"content": {"parts": [{"text": "Rata-rata "}, {"text": "nilai 3.55."}]}}],
                "usageMetadata": {"promptTokenCount": 120, "candidatesTokenCount": 30}
            }"#,
        )
        .unwrap();

        let (text, usage) = GeminiProvider::parse_response(body).unwrap();
        assert_eq!(text, "Rata-rata nilai 3.55.");
        assert_eq!(usage.total(), 150);
    }

    #[test]
    fn test_parse_response_blocked_prompt() {
        let body: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();

        match GeminiProvider::parse_response(body) {
            Err(ReportError::Llm(e)) => assert_eq!(e.category, ErrorCategory::BadRequest),
            other => panic!("expected blocked prompt error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_response_empty_candidates_yields_empty_text() {
        let body: GenerateContentResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        let (text, _) = GeminiProvider::parse_response(body).unwrap();
        assert!(text.is_empty());
    }
}
