//! Equipment list loading.
//!
//! Lists arrive either as a JSON array of objects or as a CSV file with a
//! header row. Both are read into [`RawRecord`]s untouched apart from
//! trimming; normalisation through the synonym table happens in the engine.

use std::{io::Read, path::Path};

use serde_json::Value;
use tracing::instrument;

use crate::{
    domain::RawRecord,
    storage::{open, Format, StorageError},
};

/// Loads an equipment list from a `.json` or `.csv` file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, has an unsupported
/// extension, or is not a list of records.
#[instrument(level = "debug")]
pub fn load_equipment(path: &Path) -> Result<Vec<RawRecord>, StorageError> {
    let format = Format::of(path)?;
    let reader = open(path)?;
    let records = match format {
        Format::Json => read_equipment_json(reader).map_err(|source| StorageError::Json {
            path: path.to_path_buf(),
            source,
        })?,
        Format::Csv => read_equipment_csv(reader).map_err(|source| StorageError::Csv {
            path: path.to_path_buf(),
            source,
        })?,
    };
    tracing::debug!(rows = records.len(), "loaded equipment list");
    Ok(records)
}

/// Reads a JSON array of objects.
///
/// Scalar values are converted to strings; `null`, arrays and nested objects
/// are dropped.
///
/// # Errors
///
/// Returns an error if the input is not a JSON array of objects.
pub fn read_equipment_json<R: Read>(reader: R) -> Result<Vec<RawRecord>, serde_json::Error> {
    let rows: Vec<serde_json::Map<String, Value>> = serde_json::from_reader(reader)?;
    Ok(rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .filter_map(|(column, value)| {
                    let value = match value {
                        Value::String(value) => value,
                        Value::Number(number) => number.to_string(),
                        Value::Bool(flag) => (if flag { "Y" } else { "N" }).to_string(),
                        Value::Null | Value::Array(_) | Value::Object(_) => return None,
                    };
                    Some((column, value.trim().to_string()))
                })
                .collect()
        })
        .collect())
}

/// Reads a CSV file with a header row. Blank rows are skipped.
///
/// # Errors
///
/// Returns an error if the CSV is malformed.
pub fn read_equipment_csv<R: Read>(reader: R) -> Result<Vec<RawRecord>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let record: RawRecord = headers
            .iter()
            .zip(row.iter())
            .map(|(column, value)| (column.to_string(), value.to_string()))
            .collect();
        if record.values().all(String::is_empty) {
            continue;
        }
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn json_scalars_become_strings() {
        let json = r#"[
            {"equipmentNumber": " UH101 ", "description": "Panel", "commissioning": "Y"},
            {"equipment_number": 42, "commissioningYN": true, "parentEquipmentNumber": null},
            {"equipmentNumber": "T01", "tags": ["a", "b"]}
        ]"#;

        let records = read_equipment_json(json.as_bytes()).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["equipmentNumber"], "UH101");
        assert_eq!(records[1]["equipment_number"], "42");
        assert_eq!(records[1]["commissioningYN"], "Y");
        assert!(!records[1].contains_key("parentEquipmentNumber"));
        assert!(!records[2].contains_key("tags"));
    }

    #[test]
    fn json_must_be_an_array_of_objects() {
        assert!(read_equipment_json(r#"{"equipmentNumber": "T01"}"#.as_bytes()).is_err());
        assert!(read_equipment_json("[1, 2]".as_bytes()).is_err());
    }

    #[test]
    fn csv_rows_are_keyed_by_header() {
        let csv = "equipmentNumber,description,parentEquipmentNumber\n\
                   UH101, Panel ,\n\
                   ,,\n\
                   UH101-F,Relay,UH101\n";

        let records = read_equipment_csv(csv.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["description"], "Panel");
        assert_eq!(records[1]["parentEquipmentNumber"], "UH101");
    }

    #[test]
    fn load_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();

        let json = dir.path().join("list.json");
        std::fs::write(&json, r#"[{"equipmentNumber": "T01"}]"#).unwrap();
        assert_eq!(load_equipment(&json).unwrap().len(), 1);

        let csv = dir.path().join("list.CSV");
        let mut file = std::fs::File::create(&csv).unwrap();
        writeln!(file, "equipmentNumber\nT01\nT02").unwrap();
        assert_eq!(load_equipment(&csv).unwrap().len(), 2);

        let other = dir.path().join("list.xlsx");
        std::fs::write(&other, "").unwrap();
        assert!(matches!(
            load_equipment(&other),
            Err(StorageError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let error = load_equipment(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(error, StorageError::Read { .. }));
        assert!(error.to_string().starts_with("failed to read"));
    }
}
