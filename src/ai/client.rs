//! Generation Client
//!
//! Drives one narrative request through the provider with retry, backoff
//! and template fallback.
//!
//! ## Strategy
//!
//! 1. Offline mode or no provider: template narrative, zero provider calls
//! 2. Check cancellation before every attempt
//! 3. Call the provider under the request timeout
//! 4. On failure, classify the error:
//!    - transient (timeout, rate limit, 5xx, network, empty text): back off, retry
//!    - credential rejected: surface `Authentication` unless policy says fallback
//!    - anything else: `Failure { reason }`, never retried
//! 5. Retries exhausted: template narrative with the last error as reason

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use super::fallback::FallbackNarrator;
use super::provider::{SharedProvider, TokenUsage};
use super::timeout::with_timeout;
use crate::config::PipelineSettings;
use crate::constants::generation;
use crate::types::{
    ErrorCategory, ErrorClassifier, GenerationRequest, GenerationResult, LlmError, ReportError,
    Result,
};

// =============================================================================
// Cancellation
// =============================================================================

/// Cooperative cancellation shared between a caller and a running pipeline
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Retry Policy
// =============================================================================

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Provider calls before giving up
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl RetryPolicy {
    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self {
            max_retries: settings.max_retries.max(1),
            base_delay: settings.backoff_base,
            max_delay: settings.backoff_max,
            jitter: settings.jitter,
        }
    }

    /// Delay schedule: base × 2^n, capped at `max_delay`
    pub fn backoff(&self) -> ExponentialBackoff {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_factor(generation::BACKOFF_FACTOR)
            .with_max_times(self.max_retries as usize);

        if self.jitter {
            builder.with_jitter().build()
        } else {
            builder.build()
        }
    }

    /// Next delay, stretched to honor a server retry hint, never past `max_delay`
    fn next_delay(&self, schedule: &mut ExponentialBackoff, error: &LlmError) -> Duration {
        let backoff = schedule.next().unwrap_or(self.max_delay);
        match error.retry_after {
            Some(hint) => hint.max(backoff).min(self.max_delay),
            None => backoff,
        }
    }
}

// =============================================================================
// Stats
// =============================================================================

/// Record of a single provider call
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub success: bool,
    pub category: Option<ErrorCategory>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// What happened while producing one narrative
#[derive(Debug, Clone, Default)]
pub struct GenerationStats {
    pub attempts: Vec<AttemptRecord>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub usage: TokenUsage,
    /// Set whenever the template narrative was used
    pub fallback_reason: Option<String>,
    pub total_duration_ms: u64,
}

impl GenerationStats {
    /// Number of provider calls made
    pub fn call_count(&self) -> u32 {
        self.attempts.len() as u32
    }

    fn record(&mut self, attempt: u32, started: Instant, error: Option<&LlmError>) {
        self.attempts.push(AttemptRecord {
            attempt,
            success: error.is_none(),
            category: error.map(|e| e.category),
            error: error.map(|e| e.to_string()),
            duration_ms: started.elapsed().as_millis() as u64,
        });
    }
}

// =============================================================================
// Client
// =============================================================================

enum AttemptState {
    Ready { attempt: u32 },
    Backoff { attempt: u32, error: LlmError },
    Exhausted { error: LlmError },
}

pub struct GenerationClient {
    provider: Option<SharedProvider>,
    policy: RetryPolicy,
    request_timeout: Duration,
    offline_mode: bool,
    fallback_on_auth_error: bool,
}

impl GenerationClient {
    pub fn new(provider: Option<SharedProvider>, settings: &PipelineSettings) -> Self {
        Self {
            provider,
            policy: RetryPolicy::from_settings(settings),
            request_timeout: settings.request_timeout,
            offline_mode: settings.offline_mode,
            fallback_on_auth_error: settings.fallback_on_auth_error,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// [`execute`](Self::execute) without the attempt log
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationFlag,
    ) -> Result<GenerationResult> {
        self.execute(request, cancel).await.map(|(result, _)| result)
    }

    /// Produce a narrative for the request
    ///
    /// Returns `Err` only for a rejected credential (unless the fallback
    /// policy is on). Every other outcome is a [`GenerationResult`].
    #[instrument(skip_all, fields(max_retries = self.policy.max_retries))]
    pub async fn execute(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationFlag,
    ) -> Result<(GenerationResult, GenerationStats)> {
        let started = Instant::now();
        let mut stats = GenerationStats::default();

        let provider = match (&self.provider, self.offline_mode) {
            (_, true) => {
                return Ok(self.fallback(request, "offline mode", stats, started));
            }
            (None, false) => {
                return Ok(self.fallback(request, "no AI provider configured", stats, started));
            }
            (Some(provider), false) => provider,
        };

        let provider_name = provider.name().to_string();
        stats.provider = Some(provider_name.clone());
        stats.model = Some(provider.model().to_string());

        let mut schedule = self.policy.backoff();
        let mut state = AttemptState::Ready { attempt: 1 };

        loop {
            state = match state {
                AttemptState::Ready { attempt } => {
                    if cancel.is_cancelled() {
                        info!(attempt, "Generation cancelled before attempt");
                        stats.total_duration_ms = started.elapsed().as_millis() as u64;
                        return Ok((GenerationResult::Cancelled, stats));
                    }

                    debug!(attempt, provider = %provider_name, "Generation attempt");
                    let attempt_start = Instant::now();

                    let outcome = with_timeout(
                        self.request_timeout,
                        provider.generate(request.prompt()),
                        "narrative request",
                    )
                    .await
                    .and_then(|response| {
                        if response.text.trim().is_empty() {
                            Err(ReportError::Llm(LlmError::with_provider(
                                ErrorCategory::Transient,
                                "provider returned an empty narrative",
                                provider_name.as_str(),
                            )))
                        } else {
                            Ok(response)
                        }
                    });

                    match outcome {
                        Ok(response) => {
                            stats.record(attempt, attempt_start, None);
                            stats.usage = response.usage.clone();
                            stats.total_duration_ms = started.elapsed().as_millis() as u64;
                            info!(
                                attempt,
                                chars = response.text.len(),
                                tokens = response.usage.total(),
                                "Narrative generated"
                            );
                            return Ok((GenerationResult::ai(response.text), stats));
                        }
                        Err(err) => {
                            let classified =
                                ErrorClassifier::classify_report_error(&err, &provider_name);
                            stats.record(attempt, attempt_start, Some(&classified));
                            warn!(
                                attempt,
                                category = %classified.category,
                                error = %classified,
                                "Provider call failed"
                            );

                            if classified.category.is_auth() {
                                if self.fallback_on_auth_error {
                                    let reason = format!("credential rejected: {}", classified);
                                    return Ok(self.fallback(request, reason, stats, started));
                                }
                                stats.total_duration_ms = started.elapsed().as_millis() as u64;
                                return Err(ReportError::Authentication(classified.message));
                            }

                            if !classified.is_retryable() {
                                stats.total_duration_ms = started.elapsed().as_millis() as u64;
                                return Ok((GenerationResult::failure(classified.to_string()), stats));
                            }

                            if attempt >= self.policy.max_retries {
                                AttemptState::Exhausted { error: classified }
                            } else {
                                AttemptState::Backoff {
                                    attempt,
                                    error: classified,
                                }
                            }
                        }
                    }
                }
                AttemptState::Backoff { attempt, error } => {
                    let delay = self.policy.next_delay(&mut schedule, &error);
                    debug!(delay_ms = delay.as_millis() as u64, "Retrying after backoff");
                    sleep(delay).await;
                    AttemptState::Ready {
                        attempt: attempt + 1,
                    }
                }
                AttemptState::Exhausted { error } => {
                    let reason = format!(
                        "{} attempts failed, last error: {}",
                        self.policy.max_retries, error
                    );
                    return Ok(self.fallback(request, reason, stats, started));
                }
            };
        }
    }

    fn fallback(
        &self,
        request: &GenerationRequest,
        reason: impl Into<String>,
        mut stats: GenerationStats,
        started: Instant,
    ) -> (GenerationResult, GenerationStats) {
        let reason = reason.into();
        warn!(reason = %reason, "Using template narrative");

        let text = FallbackNarrator::render(request.summary());
        stats.fallback_reason = Some(reason);
        stats.total_duration_ms = started.elapsed().as_millis() as u64;
        (GenerationResult::fallback(text), stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::{LlmProvider, LlmResponse};
    use crate::types::{DataSummary, DatasetKind, NarrativeSource};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicU32;

    /// Replays a fixed script of outcomes, then succeeds
    struct MockProvider {
        script: Mutex<Vec<ReportError>>,
        calls: AtomicU32,
        cancel_after_call: Option<CancellationFlag>,
    }

    impl MockProvider {
        fn new(failures: Vec<ReportError>) -> Self {
            Self {
                script: Mutex::new(failures),
                calls: AtomicU32::new(0),
                cancel_after_call: None,
            }
        }

        fn cancelling(failures: Vec<ReportError>, flag: CancellationFlag) -> Self {
            Self {
                cancel_after_call: Some(flag),
                ..Self::new(failures)
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
        async fn generate(&self, _prompt: &str) -> Result<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(flag) = &self.cancel_after_call {
                flag.cancel();
            }
            let next = {
                let mut script = self.script.lock().unwrap();
                if script.is_empty() {
                    None
                } else {
                    Some(script.remove(0))
                }
            };
            match next {
                Some(err) => Err(err),
                None => Ok(LlmResponse::text_only("Rata-rata nilai mahasiswa adalah 3.55.")),
            }
        }

        fn name(&self) -> &str {
            "mock"
        }

        fn model(&self) -> &str {
            "mock-model"
        }
    }

    fn transient() -> ReportError {
        ReportError::Llm(LlmError::new(ErrorCategory::Transient, "503 overloaded"))
    }

    fn settings() -> PipelineSettings {
        PipelineSettings {
            backoff_base: Duration::ZERO,
            backoff_max: Duration::ZERO,
            jitter: false,
            ..PipelineSettings::default()
        }
    }

    fn request() -> GenerationRequest {
        let summary = DataSummary::builder(DatasetKind::Student, 3)
            .number("avg_grade", 3.55)
            .build()
            .unwrap();
        GenerationRequest::new("prompt", Arc::new(summary))
    }

    fn client(provider: Arc<MockProvider>, settings: &PipelineSettings) -> GenerationClient {
        GenerationClient::new(Some(provider as SharedProvider), settings)
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let provider = Arc::new(MockProvider::new(vec![]));
        let (result, stats) = client(provider.clone(), &settings())
            .execute(&request(), &CancellationFlag::new())
            .await
            .unwrap();

        assert_eq!(result.source(), Some(NarrativeSource::Ai));
        assert_eq!(provider.calls(), 1);
        assert_eq!(stats.call_count(), 1);
        assert!(stats.fallback_reason.is_none());
    }

    #[tokio::test]
    async fn test_transient_then_success() {
        let provider = Arc::new(MockProvider::new(vec![transient(), transient()]));
        let (result, stats) = client(provider.clone(), &settings())
            .execute(&request(), &CancellationFlag::new())
            .await
            .unwrap();

        assert_eq!(result.source(), Some(NarrativeSource::Ai));
        assert_eq!(provider.calls(), 3);
        assert!(!stats.attempts[0].success);
        assert!(stats.attempts[2].success);
    }

    #[tokio::test]
    async fn test_exhausted_retries_fall_back() {
        let provider = Arc::new(MockProvider::new(vec![transient(), transient(), transient()]));
        let (result, stats) = client(provider.clone(), &settings())
            .execute(&request(), &CancellationFlag::new())
            .await
            .unwrap();

        assert_eq!(result.source(), Some(NarrativeSource::Fallback));
        assert_eq!(provider.calls(), 3);
        assert!(stats.fallback_reason.unwrap().contains("3 attempts failed"));
        assert!(result.text().unwrap().contains("3.55"));
    }

    #[tokio::test]
    async fn test_timeout_is_retried() {
        let provider = Arc::new(MockProvider::new(vec![ReportError::timeout(
            "narrative request",
            Duration::from_secs(30),
        )]));
        let (result, _) = client(provider.clone(), &settings())
            .execute(&request(), &CancellationFlag::new())
            .await
            .unwrap();

        assert_eq!(result.source(), Some(NarrativeSource::Ai));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_auth_error_surfaces_without_retry() {
        let provider = Arc::new(MockProvider::new(vec![ReportError::Llm(LlmError::new(
            ErrorCategory::Auth,
            "API key not valid",
        ))]));
        let err = client(provider.clone(), &settings())
            .execute(&request(), &CancellationFlag::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ReportError::Authentication(_)));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_auth_error_fallback_policy() {
        let provider = Arc::new(MockProvider::new(vec![ReportError::Llm(LlmError::new(
            ErrorCategory::Auth,
            "API key not valid",
        ))]));
        let settings = PipelineSettings {
            fallback_on_auth_error: true,
            ..settings()
        };
        let (result, stats) = client(provider, &settings)
            .execute(&request(), &CancellationFlag::new())
            .await
            .unwrap();

        assert_eq!(result.source(), Some(NarrativeSource::Fallback));
        assert!(stats.fallback_reason.unwrap().contains("credential rejected"));
    }

    #[tokio::test]
    async fn test_bad_request_is_failure_without_retry() {
        let provider = Arc::new(MockProvider::new(vec![ReportError::Llm(LlmError::new(
            ErrorCategory::BadRequest,
            "prompt blocked: SAFETY",
        ))]));
        let (result, _) = client(provider.clone(), &settings())
            .execute(&request(), &CancellationFlag::new())
            .await
            .unwrap();

        match result {
            GenerationResult::Failure { reason } => assert!(reason.contains("SAFETY")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_offline_mode_makes_no_calls() {
        let provider = Arc::new(MockProvider::new(vec![]));
        let settings = PipelineSettings {
            offline_mode: true,
            ..settings()
        };
        let (result, stats) = client(provider.clone(), &settings)
            .execute(&request(), &CancellationFlag::new())
            .await
            .unwrap();

        assert_eq!(result.source(), Some(NarrativeSource::Fallback));
        assert_eq!(provider.calls(), 0);
        assert_eq!(stats.fallback_reason.as_deref(), Some("offline mode"));
    }

    #[tokio::test]
    async fn test_no_provider_falls_back() {
        let (result, stats) = GenerationClient::new(None, &settings())
            .execute(&request(), &CancellationFlag::new())
            .await
            .unwrap();

        assert_eq!(result.source(), Some(NarrativeSource::Fallback));
        assert_eq!(stats.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_between_attempts() {
        let flag = CancellationFlag::new();
        let provider = Arc::new(MockProvider::cancelling(vec![transient()], flag.clone()));
        let (result, stats) = client(provider.clone(), &settings())
            .execute(&request(), &flag)
            .await
            .unwrap();

        assert_eq!(result, GenerationResult::Cancelled);
        assert_eq!(provider.calls(), 1);
        assert_eq!(stats.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let flag = CancellationFlag::new();
        flag.cancel();
        let provider = Arc::new(MockProvider::new(vec![]));
        let (result, _) = client(provider.clone(), &settings())
            .execute(&request(), &flag)
            .await
            .unwrap();

        assert_eq!(result, GenerationResult::Cancelled);
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn test_backoff_schedule_is_capped_exponential() {
        let policy = RetryPolicy {
            max_retries: 4,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
            jitter: false,
        };

        let delays: Vec<Duration> = policy.backoff().collect();
        assert_eq!(delays.len(), 4);
        assert_eq!(delays[0], Duration::from_millis(100));
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        assert!(delays.iter().all(|d| *d <= Duration::from_millis(300)));
    }

    #[test]
    fn test_retry_hint_extends_delay() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(5),
            jitter: false,
        };
        let mut schedule = policy.backoff();
        let error = LlmError::new(ErrorCategory::RateLimit, "slow down")
            .retry_after(Duration::from_secs(2));
        assert_eq!(policy.next_delay(&mut schedule, &error), Duration::from_secs(2));
    }

    #[test]
    fn test_retry_hint_capped_at_max_delay() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter: false,
        };
        let mut schedule = policy.backoff();
        let error = LlmError::new(ErrorCategory::RateLimit, "slow down")
            .retry_after(Duration::from_secs(120));
        assert_eq!(policy.next_delay(&mut schedule, &error), Duration::from_secs(30));
    }
}
