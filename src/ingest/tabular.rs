//! CSV records with a header row

use std::io::Read;

use super::{Cell, Record, Table};

/// Parse CSV into a table; short rows leave their missing columns empty
pub fn table_from_csv<R: Read>(reader: R) -> std::result::Result<Table, String> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err("CSV has no header row".to_string());
    }

    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row.map_err(|e| format!("row {}: {}", line + 1, e))?;
        let record: Record = headers
            .iter()
            .zip(row.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, field)| (header.clone(), parse_field(field)))
            .collect();
        records.push(record);
    }

    Ok(Table::from_records(records))
}

fn parse_field(field: &str) -> Cell {
    if field.is_empty() {
        return Cell::Empty;
    }
    match field.parse::<f64>() {
        Ok(value) if value.is_finite() => Cell::Number(value),
        _ => Cell::Text(field.to_string()),
    }
}
