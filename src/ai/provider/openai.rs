//! OpenAI API Provider
//!
//! LLM provider using OpenAI's Chat Completions API, or any endpoint that
//! speaks the same protocol.

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
use crate::types::{ReportError, Result};

const PROVIDER: &str = "openai";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

const SYSTEM_PROMPT: &str = "Anda adalah analis data universitas. Tulis laporan hanya dalam \
Bahasa Indonesia dengan format Markdown dan gunakan hanya angka yang tercantum pada data.";

/// OpenAI API Provider with secure API key handling
pub struct OpenAiProvider {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key = config.api_key.ok_or_else(|| {
            ReportError::Config(
                "OpenAI API key not found. Set OPENAI_API_KEY env var or provide in config"
                    .to_string(),
            )
        })?;

        let api_base = validate_endpoint(
            config
                .api_base
                .as_deref()
                .unwrap_or(network::OPENAI_API_BASE),
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

    fn build_request(&self, prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
        }
    }

    fn parse_response(body: ChatCompletionResponse) -> (String, TokenUsage) {
        let usage = body
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        (text, usage)
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate(&self, prompt: &str) -> Result<LlmResponse> {
        info!(
            "Generating with OpenAI (model: {}, temperature: {})",
            self.model, self.temperature
        );

        let start_time = Instant::now();
        let request = self.build_request(prompt);
        let url = format!("{}/chat/completions", self.api_base);

        debug!("Sending request to OpenAI API");

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
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

        let body: ChatCompletionResponse =
            response.json().await.map_err(|e| transport_error(e, PROVIDER))?;

        let (text, usage) = Self::parse_response(body);

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
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(api_base: Option<&str>) -> Result<OpenAiProvider> {
        OpenAiProvider::new(ProviderConfig {
            provider: "openai".to_string(),
            model: None,
            api_key: Some("sk-test".to_string()),
            api_base: api_base.map(String::from),
            ..ProviderConfig::default()
        })
    }

    #[test]
    fn test_request_has_system_and_user_messages() {
        let provider = provider(None).unwrap();
        assert_eq!(provider.model(), DEFAULT_MODEL);

        let json = serde_json::to_value(provider.build_request("Buat laporan")).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Buat laporan");
        assert!(json.get("response_format").is_none());
    }

    #[test]
    fn test_custom_endpoint_is_validated() {
        let local = provider(Some("http://localhost:8080/v1/")).unwrap();
        assert_eq!(local.api_base, "http://localhost:8080/v1");
        assert!(provider(Some("file:///etc/passwd")).is_err());
    }

    #[test]
    fn test_parse_response() {
        let body: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"content": "Laporan siap."}}],
                "usage": {"prompt_tokens": 100, "completion_tokens": 50}}"#,
        )
        .unwrap();

        let (text, usage) = OpenAiProvider::parse_response(body);
        assert_eq!(text, "Laporan siap.");
        assert_eq!(usage.input_tokens, 100);
        assert_eq!(usage.total(), 150);
    }

    #[test]
    fn test_parse_response_without_choices() {
        let body: ChatCompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        let (text, usage) = OpenAiProvider::parse_response(body);
        assert!(text.is_empty());
        assert_eq!(usage.total(), 0);
    }
}
