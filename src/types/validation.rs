//! Fact validation findings and verdicts

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Ok,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Ok => write!(f, "OK"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

impl Severity {
    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Ok => "✓",
            Severity::Warning => "⚠",
            Severity::Error => "✗",
        }
    }
}

/// What a finding is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// Figure matched its metric within tolerance
    FigureVerified,
    /// Figure disagrees with the metric it refers to
    FigureMismatch,
    /// Figure could not be traced to any metric
    UnverifiableFigure,
    /// Narrative shorter than the configured minimum
    NarrativeTooShort,
    /// Phrase typical of invented context or hedging
    FabricationMarker,
    /// Template narrative, built directly from the summary
    FallbackUsed,
    /// No narrative text to check
    MissingNarrative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationFinding {
    pub severity: Severity,
    pub kind: FindingKind,
    /// Text fragment the finding refers to
    pub claim: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed: Option<String>,
    /// Metric the claim was matched to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    pub message: String,
}

impl ValidationFinding {
    pub fn ok(kind: FindingKind, claim: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Ok, kind, claim, message)
    }

    pub fn warning(
        kind: FindingKind,
        claim: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Warning, kind, claim, message)
    }

    pub fn error(kind: FindingKind, claim: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, kind, claim, message)
    }

    fn new(
        severity: Severity,
        kind: FindingKind,
        claim: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            kind,
            claim: claim.into(),
            expected: None,
            observed: None,
            metric: None,
            message: message.into(),
        }
    }

    pub fn with_comparison(
        mut self,
        expected: impl Into<String>,
        observed: impl Into<String>,
    ) -> Self {
        self.expected = Some(expected.into());
        self.observed = Some(observed.into());
        self
    }

    pub fn for_metric(mut self, metric: impl Into<String>) -> Self {
        self.metric = Some(metric.into());
        self
    }
}

impl fmt::Display for ValidationFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.severity.icon(), self.severity, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Warn,
    Fail,
}

impl Verdict {
    /// FAIL on any error, WARN on any warning, PASS otherwise
    pub fn from_findings(findings: &[ValidationFinding]) -> Self {
        if findings.iter().any(|f| f.severity == Severity::Error) {
            Verdict::Fail
        } else if findings.iter().any(|f| f.severity == Severity::Warning) {
            Verdict::Warn
        } else {
            Verdict::Pass
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASS"),
            Verdict::Warn => write!(f, "WARN"),
            Verdict::Fail => write!(f, "FAIL"),
        }
    }
}

/// Ordered findings with the verdict derived from them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    findings: Vec<ValidationFinding>,
    verdict: Verdict,
    /// Words counted in the narrative
    pub word_count: usize,
}

impl ValidationReport {
    pub fn new(findings: Vec<ValidationFinding>, word_count: usize) -> Self {
        let verdict = Verdict::from_findings(&findings);
        Self {
            findings,
            verdict,
            word_count,
        }
    }

    pub fn findings(&self) -> &[ValidationFinding] {
        &self.findings
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn ok_count(&self) -> usize {
        self.count(Severity::Ok)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationFinding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Error)
    }

    pub fn has_errors(&self) -> bool {
        self.verdict == Verdict::Fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_from_findings() {
        assert_eq!(Verdict::from_findings(&[]), Verdict::Pass);

        let ok = ValidationFinding::ok(FindingKind::FigureVerified, "3.55", "matched");
        let warn = ValidationFinding::warning(FindingKind::UnverifiableFigure, "42", "unknown");
        let err = ValidationFinding::error(FindingKind::FigureMismatch, "9.99", "mismatch");

        assert_eq!(Verdict::from_findings(&[ok.clone()]), Verdict::Pass);
        assert_eq!(Verdict::from_findings(&[ok.clone(), warn.clone()]), Verdict::Warn);
        assert_eq!(Verdict::from_findings(&[ok, warn, err]), Verdict::Fail);
    }

    #[test]
    fn test_report_counts() {
        let report = ValidationReport::new(
            vec![
                ValidationFinding::ok(FindingKind::FigureVerified, "3.55", "matched"),
                ValidationFinding::error(FindingKind::FigureMismatch, "9.99", "mismatch")
                    .with_comparison("3.55", "9.99")
                    .for_metric("avg_grade"),
            ],
            6,
        );

        assert_eq!(report.verdict(), Verdict::Fail);
        assert_eq!(report.ok_count(), 1);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.warning_count(), 0);
        assert!(report.has_errors());
        let err = report.errors().next().unwrap();
        assert_eq!(err.expected.as_deref(), Some("3.55"));
        assert_eq!(err.metric.as_deref(), Some("avg_grade"));
    }
}
