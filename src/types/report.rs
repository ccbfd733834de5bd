//! Assembled report types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::narrative::NarrativeSource;
use super::summary::DatasetKind;
use super::validation::{Severity, ValidationReport, Verdict};

/// One summary metric as shown in the facts table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryFact {
    pub name: String,
    pub label: String,
    pub value: String,
}

/// Verdict plus finding counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub verdict: Verdict,
    pub ok: usize,
    pub warnings: usize,
    pub errors: usize,
}

impl From<&ValidationReport> for ValidationSummary {
    fn from(report: &ValidationReport) -> Self {
        Self {
            verdict: report.verdict(),
            ok: report.count(Severity::Ok),
            warnings: report.count(Severity::Warning),
            errors: report.count(Severity::Error),
        }
    }
}

impl fmt::Display for ValidationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (OK: {}, WARNING: {}, ERROR: {})",
            self.verdict, self.ok, self.warnings, self.errors
        )
    }
}

/// Final report handed to the exporter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledReport {
    pub dataset_kind: DatasetKind,
    pub record_count: u64,
    pub narrative_text: String,
    pub summary_facts: Vec<SummaryFact>,
    pub validation: ValidationReport,
    pub validation_summary: ValidationSummary,
    pub source: NarrativeSource,
    pub generated_at: DateTime<Utc>,
    /// Model that wrote the narrative, "template" for fallback
    pub model: String,
    /// Provider calls made for this report
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

impl AssembledReport {
    pub fn verdict(&self) -> Verdict {
        self.validation_summary.verdict
    }

    /// Equality on everything except the generation timestamp
    pub fn same_content(&self, other: &Self) -> bool {
        self.dataset_kind == other.dataset_kind
            && self.record_count == other.record_count
            && self.narrative_text == other.narrative_text
            && self.summary_facts == other.summary_facts
            && self.validation == other.validation
            && self.validation_summary == other.validation_summary
            && self.source == other.source
            && self.model == other.model
            && self.attempts == other.attempts
            && self.fallback_reason == other.fallback_reason
    }
}
