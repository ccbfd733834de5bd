//! Data summary types
//!
//! A [`DataSummary`] is the only source of truth a narrative may draw numbers
//! from. It is built once, validated once, and shared read-only by every
//! pipeline stage afterwards.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::domain::indonesian_label;
use super::error::{ReportError, Result};

// =============================================================================
// Dataset Kind
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DatasetKind {
    #[serde(alias = "student")]
    Student,
    #[serde(alias = "finance")]
    Finance,
    #[default]
    #[serde(alias = "unknown")]
    Unknown,
}

impl DatasetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Finance => "finance",
            Self::Unknown => "unknown",
        }
    }

    /// Report title used by prompts, fallback and export
    pub fn report_title(&self) -> &'static str {
        match self {
            Self::Student => "Laporan Performa Akademik Mahasiswa",
            Self::Finance => "Laporan Keuangan",
            Self::Unknown => "Laporan Analisis Data",
        }
    }

    /// Indonesian noun for one record of this kind
    pub fn record_noun(&self) -> &'static str {
        match self {
            Self::Student => "data mahasiswa",
            Self::Finance => "data transaksi",
            Self::Unknown => "data",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Student => write!(f, "STUDENT"),
            Self::Finance => write!(f, "FINANCE"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl FromStr for DatasetKind {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "student" | "students" | "mahasiswa" | "akademik" => Ok(Self::Student),
            "finance" | "financial" | "keuangan" => Ok(Self::Finance),
            "unknown" | "generic" | "umum" => Ok(Self::Unknown),
            other => Err(ReportError::InvalidSummary(format!(
                "unknown dataset kind '{}'",
                other
            ))),
        }
    }
}

// =============================================================================
// Metrics
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Category(String),
}

impl MetricValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Category(_) => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{}", format_number(*v)),
            Self::Category(s) => write!(f, "{}", s),
        }
    }
}

/// Named metric with an optional Indonesian label and unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub value: MetricValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Metric {
    pub fn number(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value: MetricValue::Number(value),
            label: None,
            unit: None,
        }
    }

    pub fn category(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: MetricValue::Category(value.into()),
            label: None,
            unit: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn as_number(&self) -> Option<f64> {
        self.value.as_number()
    }

    /// Explicit label, or one derived from the key
    pub fn display_label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| indonesian_label(&self.name))
    }

    /// Value with its unit, numbers rendered by [`format_number`]
    pub fn display_value(&self) -> String {
        let value = self.value.to_string();
        match self.unit.as_deref() {
            Some("%") => format!("{}%", value),
            Some(unit) if unit.eq_ignore_ascii_case("rp") => format!("Rp {}", value),
            Some(unit) => format!("{} {}", value, unit),
            None => value,
        }
    }
}

/// Canonical number rendering shared by prompt, fallback and export
///
/// Uses the shortest representation that round-trips, so the figure a
/// reader sees is exactly the figure the validator compares against.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    value.to_string()
}

// =============================================================================
// Data Summary
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSummary")]
pub struct DataSummary {
    dataset_kind: DatasetKind,
    record_count: u64,
    metrics: Vec<Metric>,
}

#[derive(Deserialize)]
struct RawSummary {
    #[serde(default)]
    dataset_kind: DatasetKind,
    record_count: u64,
    #[serde(default)]
    metrics: Vec<Metric>,
}

impl TryFrom<RawSummary> for DataSummary {
    type Error = ReportError;

    fn try_from(raw: RawSummary) -> Result<Self> {
        let mut builder = DataSummary::builder(raw.dataset_kind, raw.record_count);
        for metric in raw.metrics {
            builder = builder.metric(metric);
        }
        builder.build()
    }
}

impl DataSummary {
    pub fn builder(dataset_kind: DatasetKind, record_count: u64) -> SummaryBuilder {
        SummaryBuilder {
            dataset_kind,
            record_count,
            metrics: Vec::new(),
        }
    }

    pub fn dataset_kind(&self) -> DatasetKind {
        self.dataset_kind
    }

    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    /// Metrics in insertion order
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn get(&self, name: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.name == name)
    }

    pub fn numeric_metrics(&self) -> impl Iterator<Item = (&Metric, f64)> {
        self.metrics
            .iter()
            .filter_map(|m| m.as_number().map(|v| (m, v)))
    }

    pub fn categorical_metrics(&self) -> impl Iterator<Item = (&Metric, &str)> {
        self.metrics.iter().filter_map(|m| match &m.value {
            MetricValue::Category(s) => Some((m, s.as_str())),
            MetricValue::Number(_) => None,
        })
    }
}

/// Builder enforcing finite values and unique metric names
#[derive(Debug)]
pub struct SummaryBuilder {
    dataset_kind: DatasetKind,
    record_count: u64,
    metrics: Vec<Metric>,
}

impl SummaryBuilder {
    pub fn metric(mut self, metric: Metric) -> Self {
        self.metrics.push(metric);
        self
    }

    pub fn number(self, name: impl Into<String>, value: f64) -> Self {
        self.metric(Metric::number(name, value))
    }

    pub fn category(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metric(Metric::category(name, value))
    }

    pub fn build(self) -> Result<DataSummary> {
        let mut seen = HashSet::new();

        for metric in &self.metrics {
            let name = metric.name.trim();
            if name.is_empty() {
                return Err(ReportError::InvalidSummary(
                    "metric name must not be empty".to_string(),
                ));
            }
            if !seen.insert(name.to_string()) {
                return Err(ReportError::InvalidSummary(format!(
                    "duplicate metric '{}'",
                    name
                )));
            }
            if let MetricValue::Number(v) = metric.value
                && !v.is_finite()
            {
                return Err(ReportError::InvalidSummary(format!(
                    "metric '{}' is not a finite number",
                    name
                )));
            }
        }

        Ok(DataSummary {
            dataset_kind: self.dataset_kind,
            record_count: self.record_count,
            metrics: self.metrics,
        })
    }
}
