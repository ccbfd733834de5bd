//! End-to-end pipeline scenarios against scripted providers

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use laporan::ai::{FallbackNarrator, LlmError, LlmProvider, LlmResponse};
use laporan::config::PipelineSettings;
use laporan::ingest::sample_summary;
use laporan::pipeline::{NarrativePipeline, ProgressRegistry, RunContext};
use laporan::report::MarkdownExporter;
use laporan::types::{
    DataSummary, DatasetKind, ErrorCategory, FindingKind, NarrativeSource, ReportError, Result,
    Severity, Verdict,
};
use laporan::{CancellationFlag, FactValidator, SharedProvider};

const PASSING_TEXT: &str = "Rata-rata nilai mahasiswa adalah 3.55 dari 3 data.";

struct ScriptedProvider {
    script: Mutex<VecDeque<Result<String>>>,
    calls: AtomicU32,
    cancel_on_call: Option<CancellationFlag>,
}

impl ScriptedProvider {
    fn new(script: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicU32::new(0),
            cancel_on_call: None,
        })
    }

    fn cancelling(script: Vec<Result<String>>, flag: CancellationFlag) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicU32::new(0),
            cancel_on_call: Some(flag),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn generate(&self, _prompt: &str) -> Result<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(flag) = &self.cancel_on_call {
            flag.cancel();
        }
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(LlmResponse::text_only(text)),
            Some(Err(e)) => Err(e),
            None => Ok(LlmResponse::text_only(PASSING_TEXT)),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }
}

fn settings() -> Arc<PipelineSettings> {
    Arc::new(PipelineSettings {
        backoff_base: Duration::ZERO,
        backoff_max: Duration::ZERO,
        jitter: false,
        ..PipelineSettings::default()
    })
}

fn pipeline(provider: &Arc<ScriptedProvider>) -> NarrativePipeline {
    let shared: SharedProvider = provider.clone();
    NarrativePipeline::new(settings(), Some(shared))
}

fn grade_summary() -> Arc<DataSummary> {
    Arc::new(
        DataSummary::builder(DatasetKind::Student, 3)
            .number("avg_grade", 3.55)
            .build()
            .unwrap(),
    )
}

fn transient() -> ReportError {
    ReportError::Llm(LlmError::new(ErrorCategory::Transient, "503 service unavailable"))
}

#[tokio::test]
async fn accurate_narrative_passes() {
    let provider = ScriptedProvider::new(vec![Ok(PASSING_TEXT.to_string())]);
    let report = pipeline(&provider)
        .run(grade_summary(), &RunContext::new())
        .await
        .unwrap();

    assert_eq!(report.source, NarrativeSource::Ai);
    assert_eq!(report.verdict(), Verdict::Pass);
    assert_eq!(report.validation.error_count(), 0);
    assert_eq!(report.validation.warning_count(), 0);
    assert_eq!(report.model, "scripted-1");
    assert_eq!(report.attempts, 1);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn wrong_figure_fails_with_one_error() {
    let provider = ScriptedProvider::new(vec![Ok(
        "Rata-rata nilai mahasiswa adalah 9.99.".to_string()
    )]);
    let report = pipeline(&provider)
        .run(grade_summary(), &RunContext::new())
        .await
        .unwrap();

    assert_eq!(report.verdict(), Verdict::Fail);
    let errors: Vec<_> = report.validation.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, FindingKind::FigureMismatch);
    assert_eq!(errors[0].expected.as_deref(), Some("3.55"));
    assert_eq!(errors[0].observed.as_deref(), Some("9.99"));
}

#[tokio::test]
async fn exhausted_retries_fall_back_and_pass() {
    let provider = ScriptedProvider::new(vec![Err(transient()), Err(transient()), Err(transient())]);
    let report = pipeline(&provider)
        .run(grade_summary(), &RunContext::new())
        .await
        .unwrap();

    assert_eq!(provider.calls(), 3);
    assert_eq!(report.source, NarrativeSource::Fallback);
    assert_eq!(report.verdict(), Verdict::Pass);
    assert_eq!(report.model, "template");
    assert!(report.fallback_reason.as_deref().unwrap().contains("3 attempts failed"));
}

#[tokio::test]
async fn empty_replies_are_retried() {
    let provider = ScriptedProvider::new(vec![Ok("   ".to_string()), Ok(PASSING_TEXT.to_string())]);
    let report = pipeline(&provider)
        .run(grade_summary(), &RunContext::new())
        .await
        .unwrap();

    assert_eq!(provider.calls(), 2);
    assert_eq!(report.source, NarrativeSource::Ai);
    assert_eq!(report.attempts, 2);
}

#[tokio::test]
async fn cancellation_after_first_attempt_returns_cancelled() {
    let ctx = RunContext::new();
    let provider = ScriptedProvider::cancelling(vec![Err(transient())], ctx.cancel.clone());

    let registry = Arc::new(ProgressRegistry::new());
    let run = registry.register();
    let ctx = RunContext {
        progress: Some(run.clone()),
        ..ctx
    };

    let err = pipeline(&provider)
        .run(grade_summary(), &ctx)
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::Cancelled));
    assert_eq!(provider.calls(), 1);
    let entry = run.snapshot().unwrap();
    assert!(entry.is_failed());
    assert_eq!(entry.status, "Error: Cancelled by caller");
}

#[tokio::test]
async fn rejected_credential_is_surfaced_without_retry() {
    let provider = ScriptedProvider::new(vec![Err(ReportError::Llm(LlmError::new(
        ErrorCategory::Auth,
        "401 invalid api key",
    )))]);
    let err = pipeline(&provider)
        .run(grade_summary(), &RunContext::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::Authentication(_)));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn bad_request_falls_back_with_reason() {
    let provider = ScriptedProvider::new(vec![Err(ReportError::Llm(LlmError::new(
        ErrorCategory::BadRequest,
        "400 prompt rejected",
    )))]);
    let report = pipeline(&provider)
        .run(grade_summary(), &RunContext::new())
        .await
        .unwrap();

    assert_eq!(provider.calls(), 1);
    assert_eq!(report.source, NarrativeSource::Fallback);
    assert_eq!(report.verdict(), Verdict::Pass);
    assert!(report.fallback_reason.as_deref().unwrap().contains("prompt rejected"));
}

#[tokio::test]
async fn offline_mode_never_calls_provider() {
    let provider = ScriptedProvider::new(Vec::new());
    let shared: SharedProvider = provider.clone();
    let pipeline = NarrativePipeline::new(Arc::new(PipelineSettings::offline()), Some(shared));

    let report = pipeline
        .run(grade_summary(), &RunContext::new())
        .await
        .unwrap();

    assert_eq!(provider.calls(), 0);
    assert_eq!(report.source, NarrativeSource::Fallback);
    assert_eq!(report.fallback_reason.as_deref(), Some("offline mode"));
}

#[test]
fn template_narratives_pass_strict_validation() {
    let validator = FactValidator::default();
    for kind in [DatasetKind::Student, DatasetKind::Finance] {
        let summary = sample_summary(kind).unwrap();
        let text = FallbackNarrator::render(&summary);
        let report = validator.validate_text(&text, &summary);

        let problems: Vec<_> = report
            .findings()
            .iter()
            .filter(|f| f.severity != Severity::Ok)
            .collect();
        assert!(problems.is_empty(), "{:?}: {:?}", kind, problems);
    }
}

#[tokio::test]
async fn same_inputs_give_same_report() {
    let provider = ScriptedProvider::new(Vec::new());
    let pipeline = pipeline(&provider);

    let first = pipeline.run(grade_summary(), &RunContext::new()).await.unwrap();
    let second = pipeline.run(grade_summary(), &RunContext::new()).await.unwrap();
    assert!(first.same_content(&second));
}

#[tokio::test]
async fn saved_run_reports_complete_progress() {
    let temp = TempDir::new().unwrap();
    let exporter = MarkdownExporter::new(temp.path());
    let registry = Arc::new(ProgressRegistry::new());
    let run = registry.register();
    let ctx = RunContext::new().with_progress(run.clone());

    let provider = ScriptedProvider::new(vec![Ok(PASSING_TEXT.to_string())]);
    let (report, exported) = pipeline(&provider)
        .run_to_file(grade_summary(), &ctx, &exporter)
        .await
        .unwrap();

    let entry = registry.get(&run.id()).unwrap();
    assert_eq!(entry.progress, 100);
    assert_eq!(entry.filename.as_deref(), Some(exported.filename.as_str()));

    let markdown = std::fs::read_to_string(&exported.markdown_path).unwrap();
    assert!(markdown.contains(PASSING_TEXT));
    assert!(markdown.contains(&report.validation_summary.to_string()));
}
