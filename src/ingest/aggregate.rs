//! Multi-source record aggregation
//!
//! A source is a record file, a folder of CSV files or an http(s) URL serving
//! CSV. Every row is tagged with `source_type` and `source_file` before the
//! tables are stacked. A source that cannot be read is logged and skipped;
//! aggregation fails only when nothing usable remains.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};
use url::Url;

use super::{Table, load_records, table_from_csv};
use crate::constants::ingest::{
    FETCH_TIMEOUT_SECS, SOURCE_FILE_COLUMN, SOURCE_TYPE_COLUMN, SOURCE_TYPE_LOCAL,
    SOURCE_TYPE_REMOTE,
};
use crate::types::{ReportError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    File(PathBuf),
    Folder(PathBuf),
    Remote(Url),
}

impl Source {
    /// URL when it starts with `http://` or `https://`, otherwise a path
    pub fn parse(input: &str) -> Result<Self> {
        if input.starts_with("http://") || input.starts_with("https://") {
            let url = Url::parse(input).map_err(|e| ReportError::ingest(input, e.to_string()))?;
            return Ok(Self::Remote(url));
        }
        let path = PathBuf::from(input);
        if path.is_dir() {
            Ok(Self::Folder(path))
        } else {
            Ok(Self::File(path))
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) | Self::Folder(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => write!(f, "{}", url),
        }
    }
}

/// Read every source and stack the results
pub async fn aggregate(sources: &[Source]) -> Result<Table> {
    let mut tables = Vec::new();

    for source in sources {
        let loaded = match source {
            Source::File(path) => load_records(path).map(|table| {
                vec![table.with_column(SOURCE_TYPE_COLUMN, SOURCE_TYPE_LOCAL)
                    .with_column(SOURCE_FILE_COLUMN, &file_name(path))]
            }),
            Source::Folder(path) => read_folder(path),
            Source::Remote(url) => fetch(url).await.map(|table| {
                vec![table.with_column(SOURCE_TYPE_COLUMN, SOURCE_TYPE_REMOTE)
                    .with_column(SOURCE_FILE_COLUMN, &remote_name(url))]
            }),
        };

        match loaded {
            Ok(loaded) => tables.extend(loaded.into_iter().filter(|t| !t.is_empty())),
            Err(e) => warn!("Failed to ingest {}: {}", source, e),
        }
    }

    combine(tables, || {
        sources
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    })
}

/// Stack the CSV files of the named folders under `base`
pub fn aggregate_folders(base: &Path, folders: &[String]) -> Result<Table> {
    let mut tables = Vec::new();
    for folder in folders {
        let path = base.join(folder);
        if !path.is_dir() {
            warn!("Folder not found: {}", path.display());
            continue;
        }
        match read_folder(&path) {
            Ok(loaded) => tables.extend(loaded.into_iter().filter(|t| !t.is_empty())),
            Err(e) => warn!("Failed to read {}: {}", path.display(), e),
        }
    }

    combine(tables, || base.display().to_string())
}

fn combine(tables: Vec<Table>, label: impl FnOnce() -> String) -> Result<Table> {
    if tables.is_empty() {
        return Err(ReportError::ingest(
            label(),
            "no valid data ingested from the given sources",
        ));
    }
    let count = tables.len();
    let combined = Table::concat(tables);
    info!(
        "Aggregated {} sources ({} rows, {} columns)",
        count,
        combined.len(),
        combined.columns.len()
    );
    Ok(combined)
}

/// Each CSV file in the folder, tagged with the folder name as its type
fn read_folder(folder: &Path) -> Result<Vec<Table>> {
    let pattern = folder.join("*.csv");
    let entries = glob::glob(&pattern.to_string_lossy())
        .map_err(|e| ReportError::ingest(folder.display().to_string(), e.to_string()))?;
    let source_type = file_name(folder);

    let mut paths: Vec<PathBuf> = entries.filter_map(|entry| entry.ok()).collect();
    paths.sort();

    let mut tables = Vec::with_capacity(paths.len());
    for path in paths {
        match load_records(&path) {
            Ok(table) => {
                info!("  Loaded {} ({} rows)", file_name(&path), table.len());
                tables.push(
                    table
                        .with_column(SOURCE_TYPE_COLUMN, &source_type)
                        .with_column(SOURCE_FILE_COLUMN, &file_name(&path)),
                );
            }
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }

    if tables.is_empty() {
        warn!("No CSV files found in {}", folder.display());
    }
    Ok(tables)
}

async fn fetch(url: &Url) -> Result<Table> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .build()
        .map_err(|e| ReportError::ingest(url.as_str(), e.to_string()))?;

    info!("Fetching {}", url);
    let body = client
        .get(url.clone())
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|e| ReportError::ingest(url.as_str(), e.to_string()))?
        .text()
        .await
        .map_err(|e| ReportError::ingest(url.as_str(), e.to_string()))?;

    table_from_csv(body.as_bytes()).map_err(|msg| ReportError::ingest(url.as_str(), msg))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Last path segment, `.csv` appended when missing
fn remote_name(url: &Url) -> String {
    let last = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .unwrap_or("remote");
    if last.to_lowercase().ends_with(".csv") {
        last.to_string()
    } else {
        format!("{}.csv", last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{Cell, summarize};
    use std::fs;
    use tempfile::TempDir;

    fn data_dir() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("students")).unwrap();
        fs::create_dir(temp.path().join("finance")).unwrap();
        fs::write(
            temp.path().join("students/angkatan_2021.csv"),
            "Nama,IPK\nSiti,3.5\nBudi,3.0\n",
        )
        .unwrap();
        fs::write(
            temp.path().join("students/angkatan_2022.csv"),
            "Nama,IPK\nDewi,4.0\n",
        )
        .unwrap();
        fs::write(
            temp.path().join("finance/kas.csv"),
            "Bulan,Saldo (Rp)\nJanuari,1000\n",
        )
        .unwrap();
        temp
    }

    fn column_values(table: &Table, name: &str) -> Vec<Cell> {
        let idx = table.columns.iter().position(|c| c == name).unwrap();
        table.column(idx).cloned().collect()
    }

    #[test]
    fn test_folders_are_tagged_and_stacked() {
        let temp = data_dir();
        let folders: Vec<String> = ["students", "finance", "akreditasi"]
            .iter()
            .map(|f| f.to_string())
            .collect();
        let table = aggregate_folders(temp.path(), &folders).unwrap();

        assert_eq!(table.len(), 4);
        assert_eq!(
            column_values(&table, SOURCE_TYPE_COLUMN),
            vec![
                Cell::Text("students".into()),
                Cell::Text("students".into()),
                Cell::Text("students".into()),
                Cell::Text("finance".into()),
            ]
        );
        assert_eq!(
            column_values(&table, SOURCE_FILE_COLUMN)[2],
            Cell::Text("angkatan_2022.csv".into())
        );

        let summary = summarize(&table).unwrap();
        assert_eq!(summary.record_count(), 4);
        assert_eq!(summary.get("ipk_mean").unwrap().as_number(), Some(3.5));
        assert_eq!(summary.get("source_type_unique").unwrap().as_number(), Some(2.0));
    }

    #[test]
    fn test_selected_folders_only() {
        let temp = data_dir();
        let table = aggregate_folders(temp.path(), &["finance".to_string()]).unwrap();
        assert_eq!(table.len(), 1);
        assert!(aggregate_folders(temp.path(), &["akreditasi".to_string()]).is_err());
    }

    #[tokio::test]
    async fn test_mixed_sources_skip_unreadable() {
        let temp = data_dir();
        let json = temp.path().join("extra.json");
        fs::write(&json, r#"[{"Nama": "Rina", "IPK": 3.8}]"#).unwrap();

        let sources = vec![
            Source::parse(temp.path().join("students").to_str().unwrap()).unwrap(),
            Source::parse(json.to_str().unwrap()).unwrap(),
            Source::File(temp.path().join("missing.csv")),
        ];
        assert!(matches!(sources[0], Source::Folder(_)));

        let table = aggregate(&sources).await.unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(
            column_values(&table, SOURCE_TYPE_COLUMN)[3],
            Cell::Text(SOURCE_TYPE_LOCAL.into())
        );
        assert_eq!(
            column_values(&table, SOURCE_FILE_COLUMN)[3],
            Cell::Text("extra.json".into())
        );
    }

    #[tokio::test]
    async fn test_nothing_usable_is_an_error() {
        let temp = TempDir::new().unwrap();
        let err = aggregate(&[Source::File(temp.path().join("missing.csv"))])
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Ingest { .. }));
    }

    #[test]
    fn test_parse_remote_source() {
        let source = Source::parse("https://data.example.ac.id/api/mahasiswa").unwrap();
        let Source::Remote(url) = &source else {
            panic!("expected a remote source");
        };
        assert_eq!(remote_name(url), "mahasiswa.csv");
        assert_eq!(
            remote_name(&Url::parse("https://example.com/files/kas.CSV").unwrap()),
            "kas.CSV"
        );
        assert!(Source::parse("https://").is_err());
    }
}
