//! Generation request and result types

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::summary::DataSummary;

/// Where a narrative came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NarrativeSource {
    Ai,
    Fallback,
}

impl fmt::Display for NarrativeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ai => write!(f, "AI"),
            Self::Fallback => write!(f, "FALLBACK"),
        }
    }
}

/// Prompt paired with the summary it was rendered from
///
/// The summary is shared, never copied, so the validator later checks the
/// narrative against the exact facts the prompt contained.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    prompt: String,
    summary: Arc<DataSummary>,
    truncated_sections: Vec<&'static str>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, summary: Arc<DataSummary>) -> Self {
        Self {
            prompt: prompt.into(),
            summary,
            truncated_sections: Vec::new(),
        }
    }

    pub(crate) fn with_truncated(mut self, sections: Vec<&'static str>) -> Self {
        self.truncated_sections = sections;
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn summary(&self) -> &Arc<DataSummary> {
        &self.summary
    }

    /// Sections shortened to fit the prompt budget
    pub fn truncated_sections(&self) -> &[&'static str] {
        &self.truncated_sections
    }
}

/// Outcome of the generation stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationResult {
    Success {
        text: String,
        source: NarrativeSource,
    },
    Failure {
        reason: String,
    },
    Cancelled,
}

impl GenerationResult {
    pub fn ai(text: impl Into<String>) -> Self {
        Self::Success {
            text: text.into(),
            source: NarrativeSource::Ai,
        }
    }

    pub fn fallback(text: impl Into<String>) -> Self {
        Self::Success {
            text: text.into(),
            source: NarrativeSource::Fallback,
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Success { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn source(&self) -> Option<NarrativeSource> {
        match self {
            Self::Success { source, .. } => Some(*source),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_accessors() {
        let ai = GenerationResult::ai("Rata-rata nilai 3.55.");
        assert_eq!(ai.text(), Some("Rata-rata nilai 3.55."));
        assert_eq!(ai.source(), Some(NarrativeSource::Ai));

        let failed = GenerationResult::failure("bad request");
        assert!(!failed.is_success());
        assert_eq!(failed.text(), None);
        assert_eq!(GenerationResult::Cancelled.source(), None);
    }

    #[test]
    fn test_source_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&NarrativeSource::Fallback).unwrap(),
            "\"FALLBACK\""
        );
        assert_eq!(NarrativeSource::Ai.to_string(), "AI");
    }
}
