use console::style;

use crate::types::{AssembledReport, Severity, ValidationFinding, ValidationReport, Verdict};

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    pub fn field(&self, key: &str, value: impl std::fmt::Display) {
        println!("  {:<12} {}", style(key).dim(), value);
    }

    pub fn verdict(&self, verdict: Verdict, detail: impl std::fmt::Display) {
        let label = match verdict {
            Verdict::Pass => style(verdict.to_string()).green().bold(),
            Verdict::Warn => style(verdict.to_string()).yellow().bold(),
            Verdict::Fail => style(verdict.to_string()).red().bold(),
        };
        println!("  {:<12} {} {}", style("Verdict").dim(), label, detail);
    }

    pub fn finding(&self, finding: &ValidationFinding) {
        let icon = match finding.severity {
            Severity::Ok => style(finding.severity.icon()).green(),
            Severity::Warning => style(finding.severity.icon()).yellow(),
            Severity::Error => style(finding.severity.icon()).red(),
        };
        print!("  {} {}", icon, finding.message);
        if let (Some(expected), Some(observed)) = (&finding.expected, &finding.observed) {
            print!(
                " {}",
                style(format!("(expected {}, observed {})", expected, observed)).dim()
            );
        }
        println!();
    }

    /// Findings list, OK entries only when `verbose`
    pub fn findings(&self, report: &ValidationReport, verbose: bool) {
        for finding in report.findings() {
            if verbose || finding.severity != Severity::Ok {
                self.finding(finding);
            }
        }
    }

    pub fn report(&self, report: &AssembledReport) {
        self.field("Kind", report.dataset_kind);
        self.field("Records", report.record_count);
        self.field("Source", report.source);
        self.field("Model", &report.model);
        self.field("Attempts", report.attempts);
        if let Some(reason) = &report.fallback_reason {
            self.field("Fallback", reason);
        }
        self.verdict(
            report.verdict(),
            format!(
                "(OK: {}, WARNING: {}, ERROR: {})",
                report.validation_summary.ok,
                report.validation_summary.warnings,
                report.validation_summary.errors
            ),
        );
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
