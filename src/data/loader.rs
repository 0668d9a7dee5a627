// ============================================================
// Layer 4 - CSV Loader
// ============================================================
// Reads and writes the pipeline's working files (raw CSV and
// cleaned CSV) using the `csv` crate.
//
// Reading:
//   1. Map every header onto a known `Column`
//      (unknown headers are logged and ignored)
//   2. Parse each cell according to the column's kind;
//      empty or unparsable cells become missing values
//   3. Collect rows into a `Dataset` along with the set of
//      columns that were present
//
// Writing emits exactly the present columns, in canonical
// order, with missing values as empty cells.

use std::path::Path;

use anyhow::{Context, Result};

use crate::data::dataset::Dataset;
use crate::domain::column::{Column, ColumnSet};
use crate::domain::record::{Row, Value};

/// Read a CSV file into a typed dataset
pub fn read_csv<R: Row>(path: &Path) -> Result<Dataset<R>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Cannot open CSV '{}'", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Cannot read CSV header of '{}'", path.display()))?
        .clone();

    // Position of every recognised column in the file
    let mut columns   = ColumnSet::new();
    let mut positions = Vec::new();
    for (idx, name) in headers.iter().enumerate() {
        match Column::from_header(name) {
            Some(column) if !columns.contains(column) => {
                columns.insert(column);
                positions.push((idx, column));
            }
            Some(column) => {
                tracing::warn!("Duplicate column '{}' in '{}', keeping the first", column, path.display());
            }
            None => {
                tracing::warn!("Ignoring unknown column '{}' in '{}'", name, path.display());
            }
        }
    }

    let mut records = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result
            .with_context(|| format!("Malformed CSV row {} in '{}'", line + 2, path.display()))?;

        let mut row = R::default();
        for &(idx, column) in &positions {
            let cell = record.get(idx).unwrap_or("");
            row.set(column, Value::parse(column.kind(), cell));
        }
        records.push(row);
    }

    tracing::debug!(
        "Read {} rows × {} columns from '{}'",
        records.len(),
        columns.len(),
        path.display()
    );
    Ok(Dataset::new(columns, records))
}

/// Write a dataset to CSV, replacing any existing file
pub fn write_csv<R: Row>(dataset: &Dataset<R>, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Cannot create CSV '{}'", path.display()))?;

    let columns: Vec<Column> = dataset.columns.iter().collect();
    writer.write_record(columns.iter().map(|c| c.header()))?;

    for row in &dataset.records {
        writer.write_record(columns.iter().map(|c| row.get(*c).to_string()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Cannot flush CSV '{}'", path.display()))?;

    tracing::debug!("Wrote {} rows to '{}'", dataset.len(), path.display());
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::{CleanedRecord, RawRecord};
    use std::fs;

    const SAMPLE: &str = "\
year,gender,age,location,race:AfricanAmerican,race:Asian,smoking_history,bmi,diabetes,extra
2020,Female,32.0,Alabama,0,1,never,27.32,0,x
2015,Male,,Alaska,1,0,No Info,,1,y
";

    #[test]
    fn test_reads_known_columns_and_missing_cells() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.csv");
        fs::write(&path, SAMPLE).unwrap();

        let data: Dataset<RawRecord> = read_csv(&path).unwrap();
        assert_eq!(data.len(), 2);
        assert!(data.columns.contains(Column::RaceAsian));
        assert!(!data.columns.contains(Column::RaceOther));
        assert_eq!(data.columns.len(), 9);

        assert_eq!(data.records[0].gender.as_deref(), Some("Female"));
        assert_eq!(data.records[0].race_asian, Some(1));
        assert_eq!(data.records[1].age, None);
        assert_eq!(data.records[1].bmi, None);
        assert_eq!(data.records[1].smoking_history.as_deref(), Some("No Info"));
    }

    #[test]
    fn test_write_then_read_keeps_columns_and_values() {
        let dir  = tempfile::tempdir().unwrap();
        let src  = dir.path().join("raw.csv");
        let dst  = dir.path().join("out/clean.csv");
        fs::write(&src, SAMPLE).unwrap();

        let raw: Dataset<RawRecord> = read_csv(&src).unwrap();
        let cleaned = Dataset::new(
            raw.columns.clone(),
            raw.records.into_iter().map(CleanedRecord::from).collect(),
        );
        write_csv(&cleaned, &dst).unwrap();

        let header = fs::read_to_string(&dst).unwrap();
        assert!(header.starts_with("year,gender,age,location,race:AfricanAmerican,race:Asian,smoking_history,bmi,diabetes\n"));

        let back: Dataset<CleanedRecord> = read_csv(&dst).unwrap();
        assert_eq!(back, cleaned);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let res: Result<Dataset<RawRecord>> = read_csv(&dir.path().join("nope.csv"));
        assert!(res.is_err());
    }
}
