pub mod domain;
pub mod error;
pub mod narrative;
pub mod report;
pub mod summary;
pub mod validation;

pub use domain::{DomainTerm, indonesian_label, metric_aliases};
pub use error::{ErrorCategory, ErrorClassifier, LlmError, ReportError, Result};
pub use narrative::{GenerationRequest, GenerationResult, NarrativeSource};
pub use report::{AssembledReport, SummaryFact, ValidationSummary};
pub use summary::{DataSummary, DatasetKind, Metric, MetricValue, SummaryBuilder, format_number};
pub use validation::{FindingKind, Severity, ValidationFinding, ValidationReport, Verdict};

// =============================================================================
// Domain Newtypes
// =============================================================================

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// Type-safe wrapper for pipeline run IDs
///
/// Prevents accidental mixing of run IDs with other string types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| ReportError::Config(format!("invalid run id '{}': {}", s, e)))
    }
}
