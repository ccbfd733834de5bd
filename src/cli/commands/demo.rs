//! Demo Command
//!
//! Generates one student and one finance report from built-in sample
//! summaries.

use std::sync::Arc;

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::ingest::sample_summary;
use crate::pipeline::{ProgressRegistry, RunContext};
use crate::types::{DatasetKind, Result};

pub async fn run(ctx: &CommandContext) -> Result<()> {
    let out = Output::new();
    out.header("Laporan: Demo");
    if ctx.settings.offline_mode {
        out.info("Offline mode: narratives come from the template");
    } else if ctx.provider.is_none() {
        out.warning("No AI provider configured: narratives come from the template");
    }

    let pipeline = ctx.pipeline();
    let exporter = ctx.exporter(None);
    let registry = Arc::new(ProgressRegistry::new());

    for kind in [DatasetKind::Student, DatasetKind::Finance] {
        out.section(kind.report_title());
        let summary = Arc::new(sample_summary(kind)?);
        let run_ctx = RunContext::new().with_progress(registry.register());

        let (report, exported) = pipeline.run_to_file(summary, &run_ctx, &exporter).await?;
        out.report(&report);
        out.findings(&report.validation, false);
        out.success(&format!("Saved: {}", exported.markdown_path.display()));
    }

    Ok(())
}
