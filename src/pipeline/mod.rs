//! Narrative Pipeline
//!
//! Wires the stages together for one run:
//!
//! ```text
//! DataSummary → PromptBuilder → GenerationClient → FactValidator → ReportAssembler
//! ```
//!
//! The pipeline owns no mutable state. Each run reports stage milestones to
//! an optional [`RunProgress`] handle; any run that ends with an error marks
//! its entry as failed before returning.

pub mod progress;

pub use progress::{ProgressEntry, ProgressRegistry, RunProgress};

use std::sync::Arc;

use tracing::{info, warn};

use crate::ai::{
    CancellationFlag, FactValidator, FallbackNarrator, GenerationClient, GenerationStats,
    PromptBuilder, SharedProvider,
};
use crate::config::PipelineSettings;
use crate::constants::progress as milestone;
use crate::report::{ExportedReport, MarkdownExporter, ReportAssembler};
use crate::types::{AssembledReport, DataSummary, GenerationResult, ReportError, Result};

/// Per-run inputs that are not configuration
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub cancel: CancellationFlag,
    pub progress: Option<RunProgress>,
    pub custom_instruction: Option<String>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self, progress: RunProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.custom_instruction = Some(instruction.into());
        self
    }

    fn stage(&self, progress: i32, status: &str) {
        if let Some(handle) = &self.progress {
            handle.stage(progress, status);
        }
    }

    fn fail(&self, err: &ReportError) {
        if let Some(handle) = &self.progress {
            match err {
                ReportError::Cancelled => handle.fail("Cancelled by caller"),
                other => handle.fail(other),
            }
        }
    }
}

pub struct NarrativePipeline {
    settings: Arc<PipelineSettings>,
    client: GenerationClient,
    validator: FactValidator,
}

impl NarrativePipeline {
    pub fn new(settings: Arc<PipelineSettings>, provider: Option<SharedProvider>) -> Self {
        let client = GenerationClient::new(provider, &settings);
        let validator = FactValidator::from_settings(&settings);
        Self {
            settings,
            client,
            validator,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Produce an assembled report for the summary
    ///
    /// Errors: `InvalidSummary` from the prompt stage, `Authentication` when
    /// the credential is rejected, `Cancelled` when the caller cancelled.
    /// Every other generation problem ends in the template narrative.
    pub async fn run(&self, summary: Arc<DataSummary>, ctx: &RunContext) -> Result<AssembledReport> {
        let outcome = self.run_stages(summary, ctx).await;
        if let Err(err) = &outcome {
            ctx.fail(err);
        }
        outcome
    }

    /// Run and write the report, completing the progress entry with its filename
    pub async fn run_to_file(
        &self,
        summary: Arc<DataSummary>,
        ctx: &RunContext,
        exporter: &MarkdownExporter,
    ) -> Result<(AssembledReport, ExportedReport)> {
        let report = self.run(Arc::clone(&summary), ctx).await?;

        ctx.stage(milestone::SAVING, "Saving report");
        let exported = exporter.save(&report, &summary).inspect_err(|err| ctx.fail(err))?;

        if let Some(handle) = &ctx.progress {
            handle.complete(exported.filename.clone());
        }
        Ok((report, exported))
    }

    async fn run_stages(
        &self,
        summary: Arc<DataSummary>,
        ctx: &RunContext,
    ) -> Result<AssembledReport> {
        ctx.stage(milestone::STARTED, "Initializing");
        info!(
            "Generating {} report for {} records",
            summary.dataset_kind(),
            summary.record_count()
        );

        ctx.stage(milestone::PROMPT_BUILT, "Building prompt");
        let mut builder = PromptBuilder::from_settings(&self.settings);
        if let Some(instruction) = &ctx.custom_instruction {
            builder = builder.with_custom_instruction(instruction.clone());
        }
        let request = builder.build(Arc::clone(&summary))?;

        ctx.stage(milestone::GENERATING, "Generating narrative");
        let (result, mut stats) = self.client.execute(&request, &ctx.cancel).await?;

        let result = match result {
            GenerationResult::Cancelled => return Err(ReportError::Cancelled),
            GenerationResult::Failure { reason } => {
                warn!("Generation failed ({}), using template narrative", reason);
                stats.fallback_reason = Some(reason);
                GenerationResult::fallback(FallbackNarrator::render(&summary))
            }
            success => success,
        };

        ctx.stage(milestone::VALIDATING, "Validating facts");
        let validation = self.validator.validate(&result, &summary);
        info!(
            "Validation: {} (OK: {}, WARNING: {}, ERROR: {})",
            validation.verdict(),
            validation.ok_count(),
            validation.warning_count(),
            validation.error_count()
        );

        ctx.stage(milestone::ASSEMBLING, "Assembling report");
        let report = ReportAssembler::assemble_with_stats(&result, &summary, &validation, &stats)?;
        log_outcome(&report, &stats);

        Ok(report)
    }
}

fn log_outcome(report: &AssembledReport, stats: &GenerationStats) {
    match &report.fallback_reason {
        Some(reason) => info!(
            "Report assembled from template narrative after {} call(s): {}",
            stats.call_count(),
            reason
        ),
        None => info!(
            "Report assembled from {} narrative after {} call(s) in {}ms",
            report.model,
            stats.call_count(),
            stats.total_duration_ms
        ),
    }
}
