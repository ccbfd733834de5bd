//! Report Assembly
//!
//! Combines the narrative, the summary facts and the validation outcome into
//! an [`AssembledReport`]. Assembly is pure composition: no I/O and no
//! decisions beyond checking that its inputs are complete.

pub mod export;

pub use export::{ExportedReport, MarkdownExporter, SavedReport};

use chrono::Utc;

use crate::ai::GenerationStats;
use crate::constants::generation::FALLBACK_MODEL;
use crate::types::{
    AssembledReport, DataSummary, GenerationResult, NarrativeSource, ReportError, Result,
    SummaryFact, ValidationReport, ValidationSummary,
};

const UNKNOWN_MODEL: &str = "unknown";

pub struct ReportAssembler;

impl ReportAssembler {
    pub fn assemble(
        result: &GenerationResult,
        summary: &DataSummary,
        validation: &ValidationReport,
    ) -> Result<AssembledReport> {
        Self::build(result, summary, validation, None)
    }

    /// Assemble and record provider, attempt count and fallback reason
    pub fn assemble_with_stats(
        result: &GenerationResult,
        summary: &DataSummary,
        validation: &ValidationReport,
        stats: &GenerationStats,
    ) -> Result<AssembledReport> {
        Self::build(result, summary, validation, Some(stats))
    }

    fn build(
        result: &GenerationResult,
        summary: &DataSummary,
        validation: &ValidationReport,
        stats: Option<&GenerationStats>,
    ) -> Result<AssembledReport> {
        let (text, source) = match result {
            GenerationResult::Success { text, source } => (text, *source),
            GenerationResult::Failure { reason } => {
                return Err(ReportError::IncompleteInput(format!(
                    "generation failed without a narrative: {}",
                    reason
                )));
            }
            GenerationResult::Cancelled => {
                return Err(ReportError::IncompleteInput(
                    "generation was cancelled".to_string(),
                ));
            }
        };

        if text.trim().is_empty() {
            return Err(ReportError::IncompleteInput(
                "narrative text is empty".to_string(),
            ));
        }

        let model = match source {
            NarrativeSource::Fallback => FALLBACK_MODEL.to_string(),
            NarrativeSource::Ai => stats
                .and_then(|s| s.model.clone())
                .unwrap_or_else(|| UNKNOWN_MODEL.to_string()),
        };

        Ok(AssembledReport {
            dataset_kind: summary.dataset_kind(),
            record_count: summary.record_count(),
            narrative_text: text.clone(),
            summary_facts: Self::facts(summary),
            validation: validation.clone(),
            validation_summary: ValidationSummary::from(validation),
            source,
            generated_at: Utc::now(),
            model,
            attempts: stats.map(|s| s.call_count()).unwrap_or(0),
            fallback_reason: stats.and_then(|s| s.fallback_reason.clone()),
        })
    }

    fn facts(summary: &DataSummary) -> Vec<SummaryFact> {
        summary
            .metrics()
            .iter()
            .map(|m| SummaryFact {
                name: m.name.clone(),
                label: m.display_label(),
                value: m.display_value(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::FactValidator;
    use crate::types::{DatasetKind, Verdict};

    fn summary() -> DataSummary {
        DataSummary::builder(DatasetKind::Student, 3)
            .number("avg_grade", 3.55)
            .category("top_major", "Informatika")
            .build()
            .unwrap()
    }

    #[test]
    fn test_assemble_success() {
        let summary = summary();
        let result = GenerationResult::ai("Rata-rata nilai mahasiswa adalah 3.55 dari 3 data.");
        let validation = FactValidator::default().validate(&result, &summary);

        let report = ReportAssembler::assemble(&result, &summary, &validation).unwrap();
        assert_eq!(report.source, NarrativeSource::Ai);
        assert_eq!(report.verdict(), Verdict::Pass);
        assert_eq!(report.summary_facts.len(), 2);
        assert_eq!(report.summary_facts[0].label, "rata-rata nilai");
        assert_eq!(report.summary_facts[0].value, "3.55");
        assert_eq!(report.validation_summary.to_string(), "PASS (OK: 2, WARNING: 0, ERROR: 0)");
    }

    #[test]
    fn test_fallback_records_template_model_and_reason() {
        let summary = summary();
        let result = GenerationResult::fallback("Laporan ini mencakup 3 data mahasiswa.");
        let validation = FactValidator::default().validate(&result, &summary);
        let stats = GenerationStats {
            fallback_reason: Some("offline mode".to_string()),
            ..GenerationStats::default()
        };

        let report =
            ReportAssembler::assemble_with_stats(&result, &summary, &validation, &stats).unwrap();
        assert_eq!(report.model, FALLBACK_MODEL);
        assert_eq!(report.fallback_reason.as_deref(), Some("offline mode"));
        assert_eq!(report.attempts, 0);
    }

    #[test]
    fn test_incomplete_inputs_rejected() {
        let summary = summary();
        let validation = ValidationReport::new(Vec::new(), 0);

        for result in [
            GenerationResult::failure("bad request"),
            GenerationResult::Cancelled,
            GenerationResult::ai("   "),
        ] {
            let err = ReportAssembler::assemble(&result, &summary, &validation).unwrap_err();
            assert!(matches!(err, ReportError::IncompleteInput(_)));
        }
    }

    #[test]
    fn test_assembly_is_deterministic_apart_from_timestamp() {
        let summary = summary();
        let result = GenerationResult::ai("Rata-rata nilai mahasiswa adalah 3.55 dari 3 data.");
        let validation = FactValidator::default().validate(&result, &summary);

        let first = ReportAssembler::assemble(&result, &summary, &validation).unwrap();
        let second = ReportAssembler::assemble(&result, &summary, &validation).unwrap();
        assert!(first.same_content(&second));
    }
}
