//! Validate Command
//!
//! Checks an existing narrative file against a summary without calling any
//! provider.

use std::fs;
use std::path::Path;

use crate::ai::FactValidator;
use crate::cli::ui::Output;
use crate::config::PipelineSettings;
use crate::ingest;
use crate::types::{Result, Verdict};

pub fn run(
    settings: &PipelineSettings,
    summary_path: &Path,
    narrative_path: &Path,
    format: &str,
) -> Result<Verdict> {
    let summary = ingest::load_summary(summary_path)?;
    let narrative = fs::read_to_string(narrative_path)?;

    let report = FactValidator::from_settings(settings).validate_text(&narrative, &summary);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report.verdict());
    }

    let out = Output::new();
    out.header("Fact Validation");
    out.field("Summary", summary_path.display());
    out.field("Narrative", narrative_path.display());
    out.field("Words", report.word_count);
    out.verdict(
        report.verdict(),
        format!(
            "(OK: {}, WARNING: {}, ERROR: {})",
            report.ok_count(),
            report.warning_count(),
            report.error_count()
        ),
    );

    if !report.findings().is_empty() {
        out.section("Findings");
        out.findings(&report, true);
    }

    Ok(report.verdict())
}
