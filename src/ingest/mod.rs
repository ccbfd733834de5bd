//! Data ingestion
//!
//! Turns input files into a [`DataSummary`]:
//!
//! - summary JSON, deserialized and validated as-is
//! - record files (CSV with a header row, or a JSON array of flat objects),
//!   summarized column by column
//! - several record sources at once, see [`aggregate`]
//!
//! Numeric columns yield `<col>_mean`, `_median`, `_min`, `_max` and `_std`
//! rounded to two decimals. Text columns yield `<col>_unique` and
//! `<col>_most_common`. Columns named with "(Rp)" carry the rupiah unit.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use crate::types::domain::key_tokens;
use crate::types::{DataSummary, DatasetKind, Metric, ReportError, Result};

mod aggregate;
mod tabular;

pub use aggregate::{Source, aggregate, aggregate_folders};
pub use tabular::table_from_csv;

const STUDENT_KEYWORDS: &[&str] = &["student", "mahasiswa", "nama", "grade", "nilai", "ipk", "gpa"];
const FINANCE_KEYWORDS: &[&str] = &[
    "finance",
    "keuangan",
    "biaya",
    "pembayaran",
    "tagihan",
    "revenue",
    "expense",
    "pemasukan",
    "pengeluaran",
    "saldo",
];
/// Identifier columns never summarized as numbers in student data
const IDENTIFIER_TOKENS: &[&str] = &["nim", "id", "kode"];

// =============================================================================
// Table
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Empty,
}

impl From<&Value> for Cell {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Empty,
            Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Empty),
            Value::String(s) if s.trim().is_empty() => Cell::Empty,
            Value::String(s) => Cell::Text(s.trim().to_string()),
            Value::Bool(b) => Cell::Text(b.to_string()),
            other => Cell::Text(other.to_string()),
        }
    }
}

/// One row keyed by column name
pub type Record = BTreeMap<String, Cell>;

/// Rows of named cells; columns in alphabetical order
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Columns are the union of every record's keys
    pub fn from_records(records: Vec<Record>) -> Self {
        let columns: Vec<String> = records
            .iter()
            .flat_map(|record| record.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let rows = records
            .into_iter()
            .map(|mut record| {
                columns
                    .iter()
                    .map(|col| record.remove(col).unwrap_or(Cell::Empty))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn into_records(self) -> impl Iterator<Item = Record> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(move |row| columns.iter().cloned().zip(row).collect())
    }

    /// Set `name` to the same text in every row
    pub fn with_column(self, name: &str, value: &str) -> Self {
        let records = self
            .into_records()
            .map(|mut record| {
                record.insert(name.to_string(), Cell::Text(value.to_string()));
                record
            })
            .collect();
        Self::from_records(records)
    }

    /// Stack tables; a column missing from one table is empty in its rows
    pub fn concat(tables: impl IntoIterator<Item = Table>) -> Self {
        Self::from_records(tables.into_iter().flat_map(Table::into_records).collect())
    }

    pub fn column(&self, idx: usize) -> impl Iterator<Item = &Cell> {
        self.rows.iter().filter_map(move |row| row.get(idx))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// =============================================================================
// Loading
// =============================================================================

pub fn load_summary(path: &Path) -> Result<DataSummary> {
    let content = fs::read_to_string(path)
        .map_err(|e| ReportError::ingest(path.display().to_string(), e.to_string()))?;
    let summary: DataSummary = serde_json::from_str(&content)
        .map_err(|e| ReportError::ingest(path.display().to_string(), e.to_string()))?;

    info!(
        "Loaded summary: {} ({} records, {} metrics)",
        summary.dataset_kind(),
        summary.record_count(),
        summary.metrics().len()
    );
    Ok(summary)
}

/// Records from a `.csv` file, or a JSON array for any other extension
pub fn load_records(path: &Path) -> Result<Table> {
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    let table = if is_csv {
        let file = fs::File::open(path)
            .map_err(|e| ReportError::ingest(path.display().to_string(), e.to_string()))?;
        table_from_csv(file)
    } else {
        let content = fs::read_to_string(path)
            .map_err(|e| ReportError::ingest(path.display().to_string(), e.to_string()))?;
        serde_json::from_str::<Value>(&content)
            .map_err(|e| e.to_string())
            .and_then(|value| table_from_value(&value))
    }
    .map_err(|msg| ReportError::ingest(path.display().to_string(), msg))?;

    info!("Loaded {} records with {} columns", table.len(), table.columns.len());
    Ok(table)
}

fn table_from_value(value: &Value) -> std::result::Result<Table, String> {
    let Value::Array(items) = value else {
        return Err("expected a JSON array of records".to_string());
    };

    let records = items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => Ok(map
                .iter()
                .map(|(key, value)| (key.clone(), Cell::from(value)))
                .collect()),
            _ => Err(format!("record {} is not an object", i)),
        })
        .collect::<std::result::Result<Vec<Record>, String>>()?;

    Ok(Table::from_records(records))
}

// =============================================================================
// Summarizing
// =============================================================================

/// Guess the dataset kind from column names
pub fn detect_kind(columns: &[String]) -> DatasetKind {
    let joined = columns.join(" ").to_lowercase();
    if STUDENT_KEYWORDS.iter().any(|k| joined.contains(k)) {
        DatasetKind::Student
    } else if FINANCE_KEYWORDS.iter().any(|k| joined.contains(k)) {
        DatasetKind::Finance
    } else {
        DatasetKind::Unknown
    }
}

pub fn summarize(table: &Table) -> Result<DataSummary> {
    let kind = detect_kind(&table.columns);
    let mut builder = DataSummary::builder(kind, table.len() as u64);

    for (idx, column) in table.columns.iter().enumerate() {
        let (key, unit) = metric_key(column);
        if key.is_empty() {
            continue;
        }

        let cells: Vec<&Cell> = table
            .column(idx)
            .filter(|c| !matches!(c, Cell::Empty))
            .collect();
        if cells.is_empty() {
            continue;
        }

        let numbers: Option<Vec<f64>> = cells
            .iter()
            .map(|c| match c {
                Cell::Number(v) => Some(*v),
                _ => None,
            })
            .collect();

        match numbers {
            Some(values) => {
                if kind == DatasetKind::Student && is_identifier(&key) {
                    debug!("Skipping identifier column: {}", column);
                    continue;
                }
                for (stat, value) in numeric_stats(&values) {
                    let mut metric = Metric::number(format!("{}_{}", key, stat), round2(value));
                    if let Some(unit) = unit {
                        metric = metric.with_unit(unit);
                    }
                    builder = builder.metric(metric);
                }
            }
            None => {
                let texts: Vec<String> = cells
                    .iter()
                    .map(|c| match c {
                        Cell::Number(v) => crate::types::format_number(*v),
                        Cell::Text(s) => s.clone(),
                        Cell::Empty => String::new(),
                    })
                    .collect();
                let (unique, most_common) = categorical_stats(&texts);
                builder = builder.number(format!("{}_unique", key), unique as f64);
                if let Some(value) = most_common {
                    builder = builder.category(format!("{}_most_common", key), value);
                }
            }
        }
    }

    let summary = builder.build()?;
    info!(
        "Summarized {} records as {} ({} metrics)",
        summary.record_count(),
        summary.dataset_kind(),
        summary.metrics().len()
    );
    Ok(summary)
}

/// Normalized key and unit for a column header (`"Saldo (Rp)"` -> `saldo`, Rp)
fn metric_key(column: &str) -> (String, Option<&'static str>) {
    let lower = column.to_lowercase();
    let mut unit = None;
    let cleaned: String = lower
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let tokens: Vec<&str> = cleaned
        .split_whitespace()
        .filter(|t| match *t {
            "rp" | "idr" => {
                unit = Some("Rp");
                false
            }
            "persen" => {
                unit = Some("%");
                false
            }
            _ => true,
        })
        .collect();

    if lower.contains('%') {
        unit = Some("%");
    }
    (tokens.join("_"), unit)
}

fn is_identifier(key: &str) -> bool {
    key_tokens(key)
        .iter()
        .any(|t| IDENTIFIER_TOKENS.contains(&t.as_str()))
}

fn numeric_stats(values: &[f64]) -> Vec<(&'static str, f64)> {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    // Sample standard deviation; a single value has none
    let std = if values.len() > 1 {
        (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
    } else {
        0.0
    };

    vec![
        ("mean", mean),
        ("median", median),
        ("min", sorted[0]),
        ("max", sorted[sorted.len() - 1]),
        ("std", std),
    ]
}

/// Distinct count and most frequent value; ties go to the value seen first
fn categorical_stats(values: &[String]) -> (usize, Option<String>) {
    let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for (pos, value) in values.iter().enumerate() {
        let entry = counts.entry(value.as_str()).or_insert((0, pos));
        entry.0 += 1;
    }

    let most_common = counts
        .iter()
        .max_by(|a, b| a.1.0.cmp(&b.1.0).then_with(|| b.1.1.cmp(&a.1.1)))
        .map(|(value, _)| value.to_string());
    (counts.len(), most_common)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// =============================================================================
// Samples
// =============================================================================

/// Built-in summaries for demos and smoke tests
pub fn sample_summary(kind: DatasetKind) -> Result<DataSummary> {
    let builder = match kind {
        DatasetKind::Student => DataSummary::builder(DatasetKind::Student, 30)
            .number("nilai_uts_mean", 80.37)
            .number("nilai_uts_max", 95.0)
            .number("nilai_uts_min", 65.0)
            .number("nilai_uas_mean", 79.83)
            .number("nilai_uas_std", 11.62)
            .number("nilai_tugas_mean", 85.1)
            .number("nilai_akhir_mean", 81.47)
            .number("nilai_akhir_median", 82.0)
            .number("ipk_mean", 3.28)
            .number("ipk_max", 3.97)
            .number("ipk_min", 2.56)
            .number("status_unique", 2.0)
            .category("status_most_common", "Aktif"),
        DatasetKind::Finance => DataSummary::builder(DatasetKind::Finance, 48)
            .metric(Metric::number("pemasukan_mean", 31_250_000.0).with_unit("Rp"))
            .metric(Metric::number("pemasukan_max", 198_400_000.0).with_unit("Rp"))
            .metric(Metric::number("pengeluaran_mean", 36_875_000.0).with_unit("Rp"))
            .metric(Metric::number("pengeluaran_max", 119_250_000.0).with_unit("Rp"))
            .metric(Metric::number("saldo_mean", -5_625_000.0).with_unit("Rp"))
            .metric(Metric::number("saldo_min", -118_500_000.0).with_unit("Rp"))
            .number("kategori_unique", 8.0)
            .category("kategori_most_common", "Biaya Operasional"),
        DatasetKind::Unknown => DataSummary::builder(DatasetKind::Unknown, 12)
            .number("nilai_mean", 42.5)
            .number("nilai_max", 97.0)
            .category("kelompok_most_common", "A"),
    };

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn student_table() -> Table {
        table_from_value(&json!([
            {"NIM": 2100001, "Nama Mahasiswa": "Siti Rahman", "IPK": 3.5, "Status": "Aktif"},
            {"NIM": 2100002, "Nama Mahasiswa": "Budi Santoso", "IPK": 3.0, "Status": "Aktif"},
            {"NIM": 2100003, "Nama Mahasiswa": "Dewi Putri", "IPK": 4.0, "Status": "Cuti"},
        ]))
        .unwrap()
    }

    #[test]
    fn test_table_columns_alphabetical() {
        let table = student_table();
        assert_eq!(table.columns, vec!["IPK", "NIM", "Nama Mahasiswa", "Status"]);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_concat_unions_columns() {
        let a = table_from_value(&json!([{"Nilai": 80}])).unwrap();
        let b = table_from_value(&json!([{"Saldo": 5}]))
            .unwrap()
            .with_column("source_file", "kas.csv");

        let combined = Table::concat([a, b]);
        assert_eq!(combined.columns, vec!["Nilai", "Saldo", "source_file"]);
        assert_eq!(combined.rows[0], vec![Cell::Number(80.0), Cell::Empty, Cell::Empty]);
        assert_eq!(
            combined.rows[1],
            vec![Cell::Empty, Cell::Number(5.0), Cell::Text("kas.csv".into())]
        );
    }

    #[test]
    fn test_rejects_non_array() {
        assert!(table_from_value(&json!({"a": 1})).is_err());
        assert!(table_from_value(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_detect_kind() {
        let cols = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(detect_kind(&cols(&["Nama Mahasiswa", "IPK"])), DatasetKind::Student);
        assert_eq!(detect_kind(&cols(&["Bulan", "Pemasukan (Rp)"])), DatasetKind::Finance);
        assert_eq!(detect_kind(&cols(&["a", "b"])), DatasetKind::Unknown);
    }

    #[test]
    fn test_summarize_student_records() {
        let summary = summarize(&student_table()).unwrap();

        assert_eq!(summary.dataset_kind(), DatasetKind::Student);
        assert_eq!(summary.record_count(), 3);
        assert_eq!(summary.get("ipk_mean").unwrap().as_number(), Some(3.5));
        assert_eq!(summary.get("ipk_median").unwrap().as_number(), Some(3.5));
        assert_eq!(summary.get("ipk_min").unwrap().as_number(), Some(3.0));
        assert_eq!(summary.get("ipk_std").unwrap().as_number(), Some(0.5));
        assert!(summary.get("nim_mean").is_none());
        assert_eq!(summary.get("status_unique").unwrap().as_number(), Some(2.0));
        assert_eq!(
            summary.get("status_most_common").unwrap().value.to_string(),
            "Aktif"
        );
    }

    #[test]
    fn test_rupiah_columns_get_unit() {
        let table = table_from_value(&json!([
            {"Bulan": "Januari", "Saldo (Rp)": 1000},
            {"Bulan": "Februari", "Saldo (Rp)": -500},
        ]))
        .unwrap();
        let summary = summarize(&table).unwrap();

        let saldo = summary.get("saldo_mean").unwrap();
        assert_eq!(saldo.unit.as_deref(), Some("Rp"));
        assert_eq!(saldo.as_number(), Some(250.0));
        assert_eq!(saldo.display_value(), "Rp 250");
    }

    #[test]
    fn test_load_records_and_summary_files() {
        let temp = TempDir::new().unwrap();

        let records = temp.path().join("records.json");
        fs::write(&records, r#"[{"Nilai": 80}, {"Nilai": 90}]"#).unwrap();
        let table = load_records(&records).unwrap();
        assert_eq!(summarize(&table).unwrap().get("nilai_mean").unwrap().as_number(), Some(85.0));

        let csv_path = temp.path().join("records.CSV");
        fs::write(&csv_path, "Nilai,Status\n70,Aktif\n90,Cuti\n").unwrap();
        let table = load_records(&csv_path).unwrap();
        let summary = summarize(&table).unwrap();
        assert_eq!(summary.get("nilai_mean").unwrap().as_number(), Some(80.0));
        assert_eq!(summary.get("status_unique").unwrap().as_number(), Some(2.0));

        let summary_path = temp.path().join("summary.json");
        fs::write(
            &summary_path,
            r#"{"dataset_kind": "STUDENT", "record_count": 3,
                "metrics": [{"name": "avg_grade", "value": 3.55}]}"#,
        )
        .unwrap();
        let summary = load_summary(&summary_path).unwrap();
        assert_eq!(summary.get("avg_grade").unwrap().as_number(), Some(3.55));

        let err = load_summary(&temp.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ReportError::Ingest { .. }));
    }

    #[test]
    fn test_samples_build() {
        for kind in [DatasetKind::Student, DatasetKind::Finance, DatasetKind::Unknown] {
            let summary = sample_summary(kind).unwrap();
            assert_eq!(summary.dataset_kind(), kind);
            assert!(summary.record_count() > 0);
        }
    }
}
