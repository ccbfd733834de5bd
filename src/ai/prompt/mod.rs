//! Prompt Builder
//!
//! Renders a [`DataSummary`] into an Indonesian narrative prompt.
//!
//! ## Layout
//!
//! 1. **Role**: analyst persona
//! 2. **Rules**: grounding constraints (mandatory)
//! 3. **Structure**: report outline for the dataset kind
//! 4. **Data**: record count and numeric metrics (mandatory)
//! 5. **Categories**: categorical metrics
//! 6. **Instruction**: caller-supplied extra instruction
//! 7. **Closing**: start signal (mandatory)
//!
//! When the rendered prompt exceeds the character budget, the instruction
//! and structure sections shrink first, then the categorical section. Each
//! shortened section ends with an ellipsis so truncation is visible.
//! Numeric facts are never shortened.

mod templates;

pub use templates::PromptTemplates;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::PipelineSettings;
use crate::constants::prompt::ELLIPSIS;
use crate::types::{DataSummary, GenerationRequest, ReportError, Result};

/// How readily a section gives up characters when over budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Priority {
    /// Never truncated
    Required,
    /// Truncated only after every filler section
    Detail,
    /// Truncated first
    Filler,
}

#[derive(Debug, Clone)]
struct PromptSection {
    name: &'static str,
    header: Option<&'static str>,
    body: String,
    priority: Priority,
}

impl PromptSection {
    fn new(name: &'static str, header: Option<&'static str>, body: String, priority: Priority) -> Self {
        Self {
            name,
            header,
            body,
            priority,
        }
    }

    fn render(&self) -> String {
        match self.header {
            Some(h) => format!("{}:\n{}", h, self.body),
            None => self.body.clone(),
        }
    }

    fn body_chars(&self) -> usize {
        self.body.chars().count()
    }

    /// Shrink the body to at most `target` characters, ellipsis included
    fn truncate_to(&mut self, target: usize) {
        let ellipsis = ELLIPSIS.chars().count();
        let keep = target.saturating_sub(ellipsis);
        let head: String = self.body.chars().take(keep).collect();
        self.body = format!("{}{}", head.trim_end(), ELLIPSIS);
    }
}

const SECTION_SEPARATOR: &str = "\n\n";

fn render_all(sections: &[PromptSection]) -> String {
    sections
        .iter()
        .map(PromptSection::render)
        .collect::<Vec<_>>()
        .join(SECTION_SEPARATOR)
}

/// Builds narrative prompts within a character budget
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    max_chars: usize,
    custom_instruction: Option<String>,
}

impl PromptBuilder {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars,
            custom_instruction: None,
        }
    }

    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self::new(settings.prompt_max_chars)
    }

    /// Extra instruction appended after the data, lowest priority
    pub fn with_custom_instruction(mut self, instruction: impl Into<String>) -> Self {
        let instruction = instruction.into();
        if !instruction.trim().is_empty() {
            self.custom_instruction = Some(instruction);
        }
        self
    }

    /// Render the prompt for a summary
    ///
    /// Fails with [`ReportError::InvalidSummary`] when the summary has no
    /// records, or when the mandatory sections alone exceed the budget.
    pub fn build(&self, summary: Arc<DataSummary>) -> Result<GenerationRequest> {
        if summary.record_count() == 0 {
            return Err(ReportError::InvalidSummary(
                "summary has no records to report on".to_string(),
            ));
        }

        let mut sections = self.sections(&summary);
        let truncated = self.fit_to_budget(&mut sections)?;

        if !truncated.is_empty() {
            warn!(
                "Prompt over budget ({} chars), truncated: {}",
                self.max_chars,
                truncated.join(", ")
            );
        }

        let prompt = render_all(&sections);
        debug!("Built prompt: {} chars", prompt.chars().count());

        Ok(GenerationRequest::new(prompt, summary).with_truncated(truncated))
    }

    fn sections(&self, summary: &DataSummary) -> Vec<PromptSection> {
        let mut sections = vec![
            PromptSection::new("role", None, PromptTemplates::role().to_string(), Priority::Required),
            PromptSection::new(
                "rules",
                Some("PENTING"),
                PromptTemplates::rules()
                    .iter()
                    .map(|r| format!("- {}", r))
                    .collect::<Vec<_>>()
                    .join("\n"),
                Priority::Required,
            ),
            PromptSection::new(
                "structure",
                None,
                PromptTemplates::structure(summary.dataset_kind()).to_string(),
                Priority::Filler,
            ),
            PromptSection::new("data", Some("DATA YANG HARUS DIANALISIS"), Self::data_body(summary), Priority::Required),
        ];

        let categories: Vec<String> = summary
            .categorical_metrics()
            .map(|(m, value)| format!("- {} ({}): {}", m.display_label(), m.name, value))
            .collect();
        if !categories.is_empty() {
            sections.push(PromptSection::new(
                "categories",
                Some("DATA KATEGORI"),
                categories.join("\n"),
                Priority::Detail,
            ));
        }

        if let Some(instruction) = &self.custom_instruction {
            sections.push(PromptSection::new(
                "instruction",
                Some("INSTRUKSI TAMBAHAN"),
                instruction.trim().to_string(),
                Priority::Filler,
            ));
        }

        sections.push(PromptSection::new(
            "closing",
            None,
            PromptTemplates::closing().to_string(),
            Priority::Required,
        ));

        sections
    }

    fn data_body(summary: &DataSummary) -> String {
        let kind = summary.dataset_kind();
        let mut lines = vec![
            format!("- Jenis laporan: {}", kind.report_title()),
            format!("- Jumlah data: {} {}", summary.record_count(), kind.record_noun()),
        ];

        for (metric, _) in summary.numeric_metrics() {
            lines.push(format!(
                "- {} ({}): {}",
                metric.display_label(),
                metric.name,
                metric.display_value()
            ));
        }

        lines.join("\n")
    }

    /// Shrink low-priority sections until the prompt fits
    fn fit_to_budget(&self, sections: &mut [PromptSection]) -> Result<Vec<&'static str>> {
        let mut truncated = Vec::new();

        for priority in [Priority::Filler, Priority::Detail] {
            // Later sections give way first
            for idx in (0..sections.len()).rev() {
                let total = render_all(sections).chars().count();
                if total <= self.max_chars {
                    return Ok(truncated);
                }
                if sections[idx].priority != priority {
                    continue;
                }

                let excess = total - self.max_chars;
                let target = sections[idx].body_chars().saturating_sub(excess);
                sections[idx].truncate_to(target);
                truncated.push(sections[idx].name);
            }
        }

        let total = render_all(sections).chars().count();
        if total <= self.max_chars {
            return Ok(truncated);
        }

        Err(ReportError::InvalidSummary(format!(
            "mandatory prompt content needs {} chars but the budget is {}",
            total, self.max_chars
        )))
    }
}
