//! Generate Command
//!
//! Builds a summary from the input file, runs the pipeline and writes the
//! Markdown report.
//!
//! Usage:
//!   laporan generate --summary summary.json
//!   laporan generate --records data.csv [more.csv DIR URL ...] [--offline] [--output DIR]
//!   laporan generate --data-dir data [--folders students,finance] [--prompt TEXT]

use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::ingest::{self, Source};
use crate::pipeline::{ProgressRegistry, RunContext};
use crate::types::{DataSummary, ReportError, Result};

/// Where the data comes from
#[derive(Debug, Clone)]
pub enum Input {
    Summary(PathBuf),
    /// Record files, CSV folders or CSV URLs, combined
    Records(Vec<Source>),
    /// Named dataset folders under a base directory
    Folders { base: PathBuf, folders: Vec<String> },
}

impl Input {
    pub async fn load(&self) -> Result<DataSummary> {
        match self {
            Input::Summary(path) => ingest::load_summary(path),
            Input::Records(sources) => match sources.as_slice() {
                [Source::File(path)] => ingest::summarize(&ingest::load_records(path)?),
                _ => ingest::summarize(&ingest::aggregate(sources).await?),
            },
            Input::Folders { base, folders } => {
                ingest::summarize(&ingest::aggregate_folders(base, folders)?)
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Input::Summary(path) => path.display().to_string(),
            Input::Records(sources) => sources
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            Input::Folders { base, folders } => {
                format!("{} ({})", base.display(), folders.join(", "))
            }
        }
    }
}

pub struct GenerateOptions {
    pub input: Input,
    pub output: Option<PathBuf>,
    pub prompt: Option<String>,
}

pub async fn run(ctx: &CommandContext, options: GenerateOptions) -> Result<()> {
    let out = Output::new();
    out.header("Laporan: Generate Report");
    out.field("Input", options.input.describe());

    let summary = Arc::new(options.input.load().await?);
    out.field("Kind", summary.dataset_kind());
    out.field("Records", summary.record_count());
    out.field("Metrics", summary.metrics().len());

    let exporter = ctx.exporter(options.output);
    let registry = Arc::new(ProgressRegistry::new());
    let mut run_ctx = RunContext::new().with_progress(registry.register());
    if let Some(prompt) = options.prompt {
        run_ctx = run_ctx.with_instruction(prompt);
    }

    let (report, exported) = ctx
        .pipeline()
        .run_to_file(summary, &run_ctx, &exporter)
        .await
        .inspect_err(|e| {
            if let ReportError::Authentication(_) = e {
                out.error("API key rejected. Check GEMINI_API_KEY / OPENAI_API_KEY.");
            }
        })?;

    out.section("Result");
    out.report(&report);
    out.findings(&report.validation, false);
    println!();
    out.success(&format!("Report saved: {}", exported.markdown_path.display()));
    out.info(&format!("Metadata: {}", exported.metadata_path.display()));

    Ok(())
}
