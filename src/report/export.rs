//! Markdown export
//!
//! Layout under the output directory:
//!
//! ```text
//! reports/
//! ├── student_reports/student_report_20240512_101500.md
//! ├── finance_reports/finance_report_20240512_101500.md
//! ├── general_reports/general_report_20240512_101500.md
//! └── metadata/student_report_20240512_101500_metadata.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::constants::output::{
    FILENAME_TIMESTAMP, FINANCE_DIR, GENERAL_DIR, METADATA_DIR, STUDENT_DIR,
};
use crate::types::{AssembledReport, DataSummary, DatasetKind, ReportError, Result};

/// Files written for one report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedReport {
    pub filename: String,
    pub markdown_path: PathBuf,
    pub metadata_path: PathBuf,
}

/// A report found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedReport {
    pub filename: String,
    pub path: PathBuf,
    pub kind: DatasetKind,
    pub modified: DateTime<Utc>,
}

#[derive(Serialize)]
struct ReportMetadata<'a> {
    filename: &'a str,
    saved_at: DateTime<Utc>,
    summary_sha256: String,
    #[serde(flatten)]
    report: &'a AssembledReport,
    summary: &'a DataSummary,
}

pub struct MarkdownExporter {
    output_dir: PathBuf,
}

impl MarkdownExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create the per-kind and metadata directories
    pub fn prepare(&self) -> Result<()> {
        for dir in [STUDENT_DIR, FINANCE_DIR, GENERAL_DIR, METADATA_DIR] {
            fs::create_dir_all(self.output_dir.join(dir))?;
        }
        Ok(())
    }

    pub fn kind_dir(&self, kind: DatasetKind) -> PathBuf {
        let dir = match kind {
            DatasetKind::Student => STUDENT_DIR,
            DatasetKind::Finance => FINANCE_DIR,
            DatasetKind::Unknown => GENERAL_DIR,
        };
        self.output_dir.join(dir)
    }

    /// Write the Markdown report and its metadata JSON
    pub fn save(&self, report: &AssembledReport, summary: &DataSummary) -> Result<ExportedReport> {
        self.prepare()?;

        let stem = self.unique_stem(report)?;
        let filename = format!("{}.md", stem);
        let markdown_path = self.kind_dir(report.dataset_kind).join(&filename);
        let metadata_path = self
            .output_dir
            .join(METADATA_DIR)
            .join(format!("{}_metadata.json", stem));

        fs::write(&markdown_path, Self::render_markdown(report))?;

        let metadata = ReportMetadata {
            filename: &filename,
            saved_at: Utc::now(),
            summary_sha256: summary_fingerprint(summary)?,
            report,
            summary,
        };
        fs::write(&metadata_path, serde_json::to_string_pretty(&metadata)?)?;

        info!("Saved report: {}", markdown_path.display());
        debug!("Saved metadata: {}", metadata_path.display());

        Ok(ExportedReport {
            filename,
            markdown_path,
            metadata_path,
        })
    }

    /// `<kind>_report_<timestamp>`, suffixed `_2`, `_3` on collision
    fn unique_stem(&self, report: &AssembledReport) -> Result<String> {
        let base = format!(
            "{}_report_{}",
            file_prefix(report.dataset_kind),
            report.generated_at.format(FILENAME_TIMESTAMP)
        );
        let dir = self.kind_dir(report.dataset_kind);

        if !dir.join(format!("{}.md", base)).exists() {
            return Ok(base);
        }
        (2..1000)
            .map(|n| format!("{}_{}", base, n))
            .find(|stem| !dir.join(format!("{}.md", stem)).exists())
            .ok_or_else(|| ReportError::Export(format!("too many reports named {}", base)))
    }

    pub fn render_markdown(report: &AssembledReport) -> String {
        let mut md = String::new();

        md.push_str(&format!("# {}\n\n", report.dataset_kind.report_title()));
        md.push_str(&format!(
            "> Generated: {}  \n",
            report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        md.push_str(&format!("> Source: {}  \n", report.source));
        md.push_str(&format!("> Verdict: {}  \n", report.validation_summary));
        md.push_str(&format!("> Model: {}  \n", report.model));
        md.push_str(&format!("> Records: {}\n", report.record_count));
        if let Some(reason) = &report.fallback_reason {
            md.push_str(&format!(">\n> Fallback reason: {}\n", reason));
        }
        md.push_str("\n---\n\n");

        md.push_str(report.narrative_text.trim());
        md.push_str("\n\n---\n\n");

        if !report.summary_facts.is_empty() {
            md.push_str("## Ringkasan Data\n\n");
            md.push_str("| Metrik | Kunci | Nilai |\n");
            md.push_str("|--------|-------|-------|\n");
            for fact in &report.summary_facts {
                md.push_str(&format!(
                    "| {} | `{}` | {} |\n",
                    escape_cell(&fact.label),
                    fact.name,
                    escape_cell(&fact.value)
                ));
            }
            md.push('\n');
        }

        md.push_str("## Validasi Fakta\n\n");
        md.push_str(&format!("**{}**\n\n", report.validation_summary));
        for finding in report.validation.findings() {
            md.push_str(&format!(
                "- {} **{}** {}",
                finding.severity.icon(),
                finding.severity,
                finding.message
            ));
            if let (Some(expected), Some(observed)) = (&finding.expected, &finding.observed) {
                md.push_str(&format!(" (expected {}, observed {})", expected, observed));
            }
            md.push('\n');
        }

        md
    }

    /// Saved reports, newest first
    pub fn list(&self, kind: Option<DatasetKind>) -> Result<Vec<SavedReport>> {
        let kinds = match kind {
            Some(k) => vec![k],
            None => vec![DatasetKind::Student, DatasetKind::Finance, DatasetKind::Unknown],
        };

        let mut reports = Vec::new();
        for kind in kinds {
            let pattern = self
                .kind_dir(kind)
                .join(format!("{}_report_*.md", file_prefix(kind)));
            let pattern = pattern.to_string_lossy();

            let paths = glob::glob(&pattern)
                .map_err(|e| ReportError::Export(format!("invalid pattern {}: {}", pattern, e)))?;

            for path in paths.flatten() {
                let modified: DateTime<Utc> = fs::metadata(&path)?.modified()?.into();
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                reports.push(SavedReport {
                    filename,
                    path,
                    kind,
                    modified,
                });
            }
        }

        reports.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| b.filename.cmp(&a.filename))
        });
        Ok(reports)
    }
}

fn file_prefix(kind: DatasetKind) -> &'static str {
    match kind {
        DatasetKind::Student => "student",
        DatasetKind::Finance => "finance",
        DatasetKind::Unknown => "general",
    }
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}

/// SHA-256 of the summary's JSON form
pub fn summary_fingerprint(summary: &DataSummary) -> Result<String> {
    let bytes = serde_json::to_vec(summary)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::FactValidator;
    use crate::report::ReportAssembler;
    use crate::types::{GenerationResult, Metric};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn summary() -> DataSummary {
        DataSummary::builder(DatasetKind::Finance, 48)
            .metric(Metric::number("total_pendapatan", 1_250_000.0).with_unit("Rp"))
            .build()
            .unwrap()
    }

    fn report(summary: &DataSummary) -> AssembledReport {
        let result =
            GenerationResult::ai("Total pendapatan tercatat Rp 1250000 dari 48 transaksi bulan ini.");
        let validation = FactValidator::default().validate(&result, summary);
        let mut report = ReportAssembler::assemble(&result, summary, &validation).unwrap();
        report.generated_at = Utc.with_ymd_and_hms(2024, 5, 12, 10, 15, 0).unwrap();
        report
    }

    #[test]
    fn test_prepare_creates_layout() {
        let temp = TempDir::new().unwrap();
        let exporter = MarkdownExporter::new(temp.path());
        exporter.prepare().unwrap();

        for dir in [STUDENT_DIR, FINANCE_DIR, GENERAL_DIR, METADATA_DIR] {
            assert!(temp.path().join(dir).is_dir());
        }
    }

    #[test]
    fn test_save_writes_markdown_and_metadata() {
        let temp = TempDir::new().unwrap();
        let exporter = MarkdownExporter::new(temp.path());
        let summary = summary();

        let saved = exporter.save(&report(&summary), &summary).unwrap();
        assert_eq!(saved.filename, "finance_report_20240512_101500.md");
        assert!(saved.markdown_path.starts_with(temp.path().join(FINANCE_DIR)));

        let md = fs::read_to_string(&saved.markdown_path).unwrap();
        assert!(md.starts_with("# Laporan Keuangan"));
        assert!(md.contains("> Source: AI"));
        assert!(md.contains("> Records: 48"));
        assert!(md.contains("| total pendapatan | `total_pendapatan` | Rp 1250000 |"));
        assert!(md.contains("## Validasi Fakta"));

        let metadata: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&saved.metadata_path).unwrap()).unwrap();
        assert_eq!(metadata["filename"], "finance_report_20240512_101500.md");
        assert_eq!(metadata["source"], "AI");
        assert_eq!(
            metadata["summary_sha256"].as_str().unwrap(),
            summary_fingerprint(&summary).unwrap()
        );
        assert_eq!(metadata["summary"]["record_count"], 48);
    }

    #[test]
    fn test_same_timestamp_gets_suffix() {
        let temp = TempDir::new().unwrap();
        let exporter = MarkdownExporter::new(temp.path());
        let summary = summary();
        let report = report(&summary);

        let first = exporter.save(&report, &summary).unwrap();
        let second = exporter.save(&report, &summary).unwrap();
        assert_ne!(first.markdown_path, second.markdown_path);
        assert_eq!(second.filename, "finance_report_20240512_101500_2.md");
    }

    #[test]
    fn test_list_filters_by_kind() {
        let temp = TempDir::new().unwrap();
        let exporter = MarkdownExporter::new(temp.path());
        let summary = summary();
        exporter.save(&report(&summary), &summary).unwrap();

        assert_eq!(exporter.list(None).unwrap().len(), 1);
        assert_eq!(exporter.list(Some(DatasetKind::Finance)).unwrap().len(), 1);
        assert!(exporter.list(Some(DatasetKind::Student)).unwrap().is_empty());
    }

    #[test]
    fn test_fingerprint_is_stable() {
        assert_eq!(
            summary_fingerprint(&summary()).unwrap(),
            summary_fingerprint(&summary()).unwrap()
        );
        assert_eq!(summary_fingerprint(&summary()).unwrap().len(), 64);
    }
}
