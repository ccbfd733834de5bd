//! Reports Command
//!
//! Lists saved reports, newest first.

use std::path::Path;

use crate::cli::ui::Output;
use crate::report::MarkdownExporter;
use crate::types::{DatasetKind, Result};

pub fn run(output_dir: &Path, kind: Option<DatasetKind>) -> Result<()> {
    let out = Output::new();
    let reports = MarkdownExporter::new(output_dir).list(kind)?;

    if reports.is_empty() {
        out.info(&format!("No reports found in {}", output_dir.display()));
        return Ok(());
    }

    out.header(&format!("Reports in {}", output_dir.display()));
    for report in &reports {
        println!(
            "  {:<8} {}  {}",
            report.kind.as_str(),
            report.modified.format("%Y-%m-%d %H:%M"),
            report.filename
        );
    }
    println!();
    out.info(&format!("{} report(s)", reports.len()));
    Ok(())
}
