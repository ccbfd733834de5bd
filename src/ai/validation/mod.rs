//! Narrative Fact Validation
//!
//! Checks an AI narrative against the summary it was generated from.
//!
//! ## Checks
//!
//! - **Figures**: every number is traced to a metric through the words
//!   around it and compared within a relative tolerance
//! - **Length**: narratives below the minimum word count fail
//! - **Markers**: phrases that bring in outside context are flagged
//!
//! ## Figure Resolution
//!
//! 1. A metric named near the figure agrees with it: OK
//! 2. Named metrics all disagree: ERROR against the strongest match, unless
//!    the number reads as a date
//! 3. No metric named: OK if the value equals any metric, silent for small
//!    ordinals and dates, otherwise a WARNING

mod dictionary;
mod extract;
mod markers;

pub use dictionary::{MetricEntry, MetricIndex, RECORD_COUNT, within_tolerance};
pub use extract::{FigureMention, extract_figures, parse_number, word_count};
pub use markers::find_markers;

use tracing::debug;

use crate::config::PipelineSettings;
use crate::constants::validation::{DEFAULT_MIN_NARRATIVE_WORDS, DEFAULT_TOLERANCE_PCT};
use crate::types::{
    DataSummary, FindingKind, GenerationResult, NarrativeSource, ValidationFinding,
    ValidationReport,
};

#[derive(Debug, Clone, Copy)]
pub struct ValidatorConfig {
    /// Allowed relative deviation, percent of the expected value
    pub tolerance_pct: f64,
    pub min_narrative_words: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            tolerance_pct: DEFAULT_TOLERANCE_PCT,
            min_narrative_words: DEFAULT_MIN_NARRATIVE_WORDS,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FactValidator {
    config: ValidatorConfig,
}

impl FactValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self::new(ValidatorConfig {
            tolerance_pct: settings.validation_tolerance_pct,
            min_narrative_words: settings.min_narrative_words,
        })
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate a generation outcome
    ///
    /// Template narratives are built from the summary itself and get a single
    /// OK finding. Failed or cancelled generations fail validation.
    pub fn validate(&self, result: &GenerationResult, summary: &DataSummary) -> ValidationReport {
        match result {
            GenerationResult::Success {
                text,
                source: NarrativeSource::Ai,
            } => self.validate_text(text, summary),
            GenerationResult::Success {
                text,
                source: NarrativeSource::Fallback,
            } => ValidationReport::new(
                vec![ValidationFinding::ok(
                    FindingKind::FallbackUsed,
                    "",
                    "template narrative built directly from summary figures",
                )],
                word_count(text),
            ),
            GenerationResult::Failure { reason } => ValidationReport::new(
                vec![ValidationFinding::error(
                    FindingKind::MissingNarrative,
                    "",
                    format!("no narrative to validate: {}", reason),
                )],
                0,
            ),
            GenerationResult::Cancelled => ValidationReport::new(
                vec![ValidationFinding::error(
                    FindingKind::MissingNarrative,
                    "",
                    "no narrative to validate: generation was cancelled",
                )],
                0,
            ),
        }
    }

    /// Run every check on a narrative, whatever produced it
    pub fn validate_text(&self, text: &str, summary: &DataSummary) -> ValidationReport {
        let mut findings = Vec::new();
        let words = word_count(text);

        if words < self.config.min_narrative_words {
            findings.push(ValidationFinding::error(
                FindingKind::NarrativeTooShort,
                text.trim(),
                format!(
                    "narrative has {} words, at least {} required",
                    words, self.config.min_narrative_words
                ),
            ));
        }

        let index = MetricIndex::new(summary);
        for mention in extract_figures(text) {
            if let Some(finding) = self.check_figure(&index, &mention) {
                findings.push(finding);
            }
        }

        for marker in find_markers(text) {
            findings.push(ValidationFinding::warning(
                FindingKind::FabricationMarker,
                marker,
                format!("phrase '{}' suggests content not present in the data", marker),
            ));
        }

        let report = ValidationReport::new(findings, words);
        debug!(
            "Validated narrative: {} words, {} ok, {} warnings, {} errors",
            words,
            report.ok_count(),
            report.warning_count(),
            report.error_count()
        );
        report
    }

    fn check_figure(&self, index: &MetricIndex, mention: &FigureMention) -> Option<ValidationFinding> {
        let tolerance = self.config.tolerance_pct;
        let matches = index.keyword_matches(mention);

        // Step 1: a named metric agrees
        if let Some((entry, _)) = matches.iter().find(|(entry, _)| {
            mention
                .candidates
                .iter()
                .any(|c| within_tolerance(*c, entry.value, tolerance))
        }) {
            return Some(
                ValidationFinding::ok(
                    FindingKind::FigureVerified,
                    &mention.claim,
                    format!("{} matches {}", mention.raw, entry.label),
                )
                .for_metric(&entry.name),
            );
        }

        // Step 2: named metrics all disagree
        if let Some((entry, _)) = matches.first() {
            if dictionary::is_date_like(mention) {
                return None;
            }
            return Some(
                ValidationFinding::error(
                    FindingKind::FigureMismatch,
                    &mention.claim,
                    format!(
                        "{} is stated as {} but the data says {}",
                        entry.label, mention.raw, entry.display
                    ),
                )
                .with_comparison(&entry.display, &mention.raw)
                .for_metric(&entry.name),
            );
        }

        // Step 3: nothing named nearby
        if let Some(entry) = index.value_match(mention, tolerance) {
            return Some(
                ValidationFinding::ok(
                    FindingKind::FigureVerified,
                    &mention.claim,
                    format!("{} equals {}", mention.raw, entry.label),
                )
                .for_metric(&entry.name),
            );
        }
        if index.in_categories(mention) {
            return Some(ValidationFinding::ok(
                FindingKind::FigureVerified,
                &mention.claim,
                format!("{} appears in a categorical value", mention.raw),
            ));
        }
        if dictionary::is_incidental(mention) {
            return None;
        }

        Some(ValidationFinding::warning(
            FindingKind::UnverifiableFigure,
            &mention.claim,
            format!("{} does not correspond to any figure in the data", mention.raw),
        ))
    }
}
