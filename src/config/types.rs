//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/laporan/) and project (.laporan/) level configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{generation, network, output, prompt, validation};
use crate::types::{ReportError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// LLM provider settings
    pub llm: LlmConfig,

    /// Retry and fallback policy
    pub generation: GenerationConfig,

    /// Fact validation thresholds
    pub validation: ValidationConfig,

    /// Prompt construction settings
    pub prompt: PromptConfig,

    /// Report output settings
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            generation: GenerationConfig::default(),
            validation: ValidationConfig::default(),
            prompt: PromptConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `ReportError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ReportError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(ReportError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.generation.max_retries == 0 {
            return Err(ReportError::Config(
                "generation.max_retries must be at least 1".to_string(),
            ));
        }

        if self.generation.backoff_base_ms > self.generation.backoff_max_ms {
            return Err(ReportError::Config(format!(
                "generation.backoff_base_ms ({}) exceeds backoff_max_ms ({})",
                self.generation.backoff_base_ms, self.generation.backoff_max_ms
            )));
        }

        let tolerance = self.validation.tolerance_pct;
        if !tolerance.is_finite() || !(0.0..=100.0).contains(&tolerance) {
            return Err(ReportError::Config(format!(
                "validation.tolerance_pct must be between 0 and 100, got {}",
                tolerance
            )));
        }

        if self.prompt.max_chars < prompt::MIN_MAX_CHARS {
            return Err(ReportError::Config(format!(
                "prompt.max_chars must be at least {}, got {}",
                prompt::MIN_MAX_CHARS,
                self.prompt.max_chars
            )));
        }

        Ok(())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (gemini, openai)
    pub provider: String,

    /// Model name
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Sampling temperature
    pub temperature: f32,

    /// Override for the provider endpoint
    pub api_base: Option<String>,

    /// API key; prefer GEMINI_API_KEY / OPENAI_API_KEY over writing it to disk
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash".to_string(),
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            temperature: network::DEFAULT_TEMPERATURE,
            api_base: None,
            api_key: None,
        }
    }
}

// =============================================================================
// Generation Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Provider calls before falling back to the template
    pub max_retries: u32,

    /// First backoff delay in milliseconds
    pub backoff_base_ms: u64,

    /// Backoff ceiling in milliseconds
    pub backoff_max_ms: u64,

    /// Randomize backoff delays
    pub jitter: bool,

    /// Skip the provider entirely and use the template narrative
    pub offline_mode: bool,

    /// Fall back instead of failing when the credential is rejected
    pub fallback_on_auth_error: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_retries: generation::DEFAULT_MAX_RETRIES,
            backoff_base_ms: generation::BASE_DELAY_MS,
            backoff_max_ms: generation::MAX_DELAY_MS,
            jitter: true,
            offline_mode: false,
            fallback_on_auth_error: false,
        }
    }
}

// =============================================================================
// Validation Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Relative tolerance for figure comparison, in percent
    pub tolerance_pct: f64,

    /// Narratives shorter than this many words fail validation
    pub min_narrative_words: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            tolerance_pct: validation::DEFAULT_TOLERANCE_PCT,
            min_narrative_words: validation::DEFAULT_MIN_NARRATIVE_WORDS,
        }
    }
}

// =============================================================================
// Prompt / Output Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Prompt budget in characters
    pub max_chars: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_chars: prompt::DEFAULT_MAX_CHARS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root directory for exported reports
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(output::DEFAULT_DIR),
        }
    }
}

// =============================================================================
// Pipeline Settings
// =============================================================================

/// Immutable settings bundle passed into every pipeline stage
///
/// Holds no credential: the key is resolved once and handed to the provider,
/// so a run without a key is a run without a provider.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    pub jitter: bool,
    pub request_timeout: Duration,
    pub validation_tolerance_pct: f64,
    pub min_narrative_words: usize,
    pub offline_mode: bool,
    pub fallback_on_auth_error: bool,
    pub prompt_max_chars: usize,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.generation.max_retries,
            backoff_base: Duration::from_millis(config.generation.backoff_base_ms),
            backoff_max: Duration::from_millis(config.generation.backoff_max_ms),
            jitter: config.generation.jitter,
            request_timeout: Duration::from_secs(config.llm.timeout_secs),
            validation_tolerance_pct: config.validation.tolerance_pct,
            min_narrative_words: config.validation.min_narrative_words,
            offline_mode: config.generation.offline_mode,
            fallback_on_auth_error: config.generation.fallback_on_auth_error,
            prompt_max_chars: config.prompt.max_chars,
        }
    }

    /// Settings that never contact a provider
    pub fn offline() -> Self {
        Self {
            offline_mode: true,
            ..Self::default()
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.llm.provider, "gemini");
        assert_eq!(config.llm.model, "gemini-2.5-flash");
        assert_eq!(config.generation.max_retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.llm.temperature = 3.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.generation.max_retries = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.generation.backoff_base_ms = 60_000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.validation.tolerance_pct = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.prompt.max_chars = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_never_serialized_or_logged() {
        let mut config = Config::default();
        config.llm.api_key = Some("super-secret".to_string());

        let toml = toml::to_string(&config).unwrap();
        assert!(!toml.contains("super-secret"));
        assert!(!format!("{:?}", config).contains("super-secret"));

        let settings = PipelineSettings::from_config(&config);
        assert!(!format!("{:?}", settings).contains("super-secret"));
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.generation.backoff_base_ms = 10;
        config.generation.offline_mode = true;
        config.llm.timeout_secs = 5;

        let settings = PipelineSettings::from_config(&config);
        assert_eq!(settings.backoff_base, Duration::from_millis(10));
        assert_eq!(settings.request_timeout, Duration::from_secs(5));
        assert!(settings.offline_mode);
        assert!(PipelineSettings::offline().offline_mode);
    }
}
