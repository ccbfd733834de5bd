//! Template narrative used when the AI path is unavailable
//!
//! Every figure is copied from the summary through the shared number
//! formatter and placed right after its label, so the text passes strict
//! fact validation on its own.

use crate::types::DataSummary;

pub struct FallbackNarrator;

impl FallbackNarrator {
    pub fn render(summary: &DataSummary) -> String {
        let kind = summary.dataset_kind();
        let mut out = String::new();

        out.push_str(&format!("# {}\n\n", kind.report_title()));
        out.push_str("## Ringkasan\n\n");
        out.push_str(&format!(
            "Laporan ini mencakup {} {}.\n\n",
            summary.record_count(),
            kind.record_noun()
        ));

        let numeric: Vec<String> = summary
            .numeric_metrics()
            .map(|(metric, _)| {
                format!(
                    "- {} tercatat sebesar {}.",
                    capitalize(&metric.display_label()),
                    metric.display_value()
                )
            })
            .collect();
        if !numeric.is_empty() {
            out.push_str("## Data Utama\n\n");
            out.push_str(&numeric.join("\n"));
            out.push_str("\n\n");
        }

        let categories: Vec<String> = summary
            .categorical_metrics()
            .map(|(metric, value)| format!("- {}: {}.", capitalize(&metric.display_label()), value))
            .collect();
        if !categories.is_empty() {
            out.push_str("## Data Kategori\n\n");
            out.push_str(&categories.join("\n"));
            out.push_str("\n\n");
        }

        out.push_str("## Catatan\n\n");
        out.push_str(
            "Narasi ini disusun otomatis dari ringkasan data menggunakan templat standar. \
Seluruh angka diambil langsung dari ringkasan data tanpa interpretasi tambahan.",
        );
        out.push('\n');

        out
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
