//! Laporan - Indonesian Narrative Reports with Fact Validation
//!
//! Turns a numeric/categorical summary of an institutional dataset into an
//! Indonesian narrative report, then checks every figure in the narrative
//! against the summary it was written from.
//!
//! ## Core Features
//!
//! - **Retry with Fallback**: transient provider failures are retried with
//!   exponential backoff, then replaced by a deterministic template narrative
//! - **Fact Validation**: figures and keywords are extracted from the text and
//!   reconciled with the summary, yielding a PASS / WARN / FAIL verdict
//! - **Progress Registry**: run-id keyed progress for pollers
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use laporan::{NarrativePipeline, PipelineSettings, RunContext};
//! use laporan::ingest::sample_summary;
//! use laporan::types::DatasetKind;
//!
//! let pipeline = NarrativePipeline::new(Arc::new(PipelineSettings::offline()), None);
//! let summary = Arc::new(sample_summary(DatasetKind::Student)?);
//! let report = pipeline.run(summary, &RunContext::new()).await?;
//! println!("{}", report.validation_summary);
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: prompt rendering, providers, retry client, fact validation
//! - [`pipeline`]: stage wiring and progress registry
//! - [`report`]: report assembly and Markdown export
//! - [`ingest`]: summaries from CSV/JSON records and aggregated sources
//! - [`config`]: layered configuration

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod ingest;
pub mod pipeline;
pub mod report;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader, PipelineSettings};
pub use types::error::{ErrorCategory, ReportError, Result};
pub use types::{
    AssembledReport, DataSummary, DatasetKind, GenerationResult, ValidationReport, Verdict,
};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use pipeline::{NarrativePipeline, ProgressEntry, ProgressRegistry, RunContext, RunProgress};
pub use report::{MarkdownExporter, ReportAssembler};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{
    CancellationFlag, FactValidator, GenerationClient, LlmProvider, LlmResponse, PromptBuilder,
    SharedProvider, with_timeout,
};
